//! Read terminals: lists, entities, counts, pages, scalars and raw SQL.

use crate::db::Session;
use crate::error::DbResult;
use crate::models::row::from_scalar;
use crate::models::{PageList, Row, Statement, Value, from_row, to_columns};
use crate::query::builder::{Clauses, TableQuery};
use crate::query::render::Renderer;
use crate::query::table::TableRow;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

impl<T: TableRow> TableQuery<T> {
    pub(crate) fn renderer<'a>(&'a self, clauses: &'a Clauses) -> Renderer<'a> {
        Renderer::new(self.set.context().dialect(), self.set.table_name(), clauses)
    }

    pub(crate) async fn session(&self) -> DbResult<Session> {
        self.set.context().original(&self.chain).await
    }

    /// Columns to read: the distinct select list minus omitted columns, or
    /// every column of the row shape when only omissions were given.
    fn read_columns(&self) -> DbResult<Vec<String>> {
        let omit = self.clauses.distinct_omit();
        let select = self.clauses.distinct_select();
        let columns: Vec<String> = if !select.is_empty() {
            select
        } else if omit.is_empty() {
            return Ok(vec!["*".to_string()]);
        } else {
            to_columns(&T::default())?
                .into_iter()
                .map(|(column, _)| column)
                .collect()
        };
        Ok(columns.into_iter().filter(|c| !omit.contains(c)).collect())
    }

    async fn fetch_rows(&self, clauses: &Clauses, columns: &[String]) -> DbResult<Vec<Row>> {
        let statement = self.renderer(clauses).select(columns);
        self.session().await?.fetch_all(&statement).await
    }

    /// Clauses reading the single column `field`.
    fn field_clauses(&self, field: &str, limit: Option<u64>) -> Clauses {
        Clauses {
            select: vec![field.to_string()],
            omit: Vec::new(),
            limit: limit.or(self.clauses.limit),
            ..self.clauses.clone()
        }
    }

    pub async fn to_list(&self) -> DbResult<Vec<T>> {
        let columns = self.read_columns()?;
        let rows = self.fetch_rows(&self.clauses, &columns).await?;
        rows.into_iter().map(from_row).collect()
    }

    pub async fn to_array(&self) -> DbResult<Box<[T]>> {
        Ok(self.to_list().await?.into_boxed_slice())
    }

    /// First matching row, or the default row when nothing matched.
    pub async fn to_entity(&self) -> DbResult<T> {
        Ok(self
            .limit(1)
            .to_list()
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    /// Number of rows matching the where clauses.
    pub async fn count(&self) -> DbResult<i64> {
        let statement = self.renderer(&self.clauses).count();
        let rows = self.session().await?.fetch_all(&statement).await?;
        first_value(rows)
    }

    pub async fn is_exists(&self) -> DbResult<bool> {
        Ok(self.count().await? > 0)
    }

    /// One page of rows plus the total count of the filtered query.
    ///
    /// `page_index` is 1-based; `0` is treated as the first page. A page
    /// whose offset does not fit in a `u64` lies past the last row and is
    /// empty.
    pub async fn to_page_list(&self, page_size: u64, page_index: u64) -> DbResult<PageList<T>> {
        let record_count = self.count().await?;
        let Some(offset) = page_index.saturating_sub(1).checked_mul(page_size) else {
            return Ok(PageList::new(Vec::new(), record_count));
        };
        if page_size == 0 {
            return Ok(PageList::new(Vec::new(), record_count));
        }
        let list = self.limit(page_size).offset(offset).to_list().await?;
        Ok(PageList::new(list, record_count))
    }

    /// First row's `field`, or `V::default()` when nothing matched.
    pub async fn get_value<V>(&self, field: &str) -> DbResult<V>
    where
        V: Serialize + DeserializeOwned + Default,
    {
        let clauses = self.field_clauses(field, Some(1));
        let rows = self.fetch_rows(&clauses, &clauses.select).await?;
        first_value(rows)
    }

    /// `field` of every matching row.
    pub async fn get_values<V>(&self, field: &str) -> DbResult<Vec<V>>
    where
        V: Serialize + DeserializeOwned + Default,
    {
        let clauses = self.field_clauses(field, None);
        let rows = self.fetch_rows(&clauses, &clauses.select).await?;
        rows.into_iter()
            .map(|row| from_scalar(row.into_iter().next().map(|(_, v)| v).unwrap_or_default()))
            .collect()
    }

    pub async fn get_string(&self, field: &str) -> DbResult<String> {
        self.get_value(field).await
    }

    pub async fn get_int(&self, field: &str) -> DbResult<i32> {
        self.get_value(field).await
    }

    pub async fn get_long(&self, field: &str) -> DbResult<i64> {
        self.get_value(field).await
    }

    pub async fn get_bool(&self, field: &str) -> DbResult<bool> {
        self.get_value(field).await
    }

    pub async fn get_float32(&self, field: &str) -> DbResult<f32> {
        self.get_value(field).await
    }

    pub async fn get_float64(&self, field: &str) -> DbResult<f64> {
        self.get_value(field).await
    }

    pub async fn get_strings(&self, field: &str) -> DbResult<Vec<String>> {
        self.get_values(field).await
    }

    pub async fn get_ints(&self, field: &str) -> DbResult<Vec<i32>> {
        self.get_values(field).await
    }

    pub async fn get_longs(&self, field: &str) -> DbResult<Vec<i64>> {
        self.get_values(field).await
    }

    pub async fn get_bools(&self, field: &str) -> DbResult<Vec<bool>> {
        self.get_values(field).await
    }

    pub async fn get_float32s(&self, field: &str) -> DbResult<Vec<f32>> {
        self.get_values(field).await
    }

    pub async fn get_float64s(&self, field: &str) -> DbResult<Vec<f64>> {
        self.get_values(field).await
    }

    fn raw_statement(&self, sql: &str, args: Vec<Value>) -> Statement {
        Statement::new(self.set.replace_names(sql), args)
    }

    /// Execute raw SQL with `{database}`/`{table}` substitution.
    pub async fn execute_sql(&self, sql: &str, args: Vec<Value>) -> DbResult<u64> {
        let statement = self.raw_statement(sql, args);
        self.session().await?.execute(&statement).await
    }

    /// First row of raw SQL, or the default row.
    pub async fn execute_sql_to_entity(&self, sql: &str, args: Vec<Value>) -> DbResult<T> {
        Ok(self
            .execute_sql_to_list(sql, args)
            .await?
            .into_iter()
            .next()
            .unwrap_or_default())
    }

    pub async fn execute_sql_to_array(&self, sql: &str, args: Vec<Value>) -> DbResult<Box<[T]>> {
        Ok(self.execute_sql_to_list(sql, args).await?.into_boxed_slice())
    }

    pub async fn execute_sql_to_list(&self, sql: &str, args: Vec<Value>) -> DbResult<Vec<T>> {
        let statement = self.raw_statement(sql, args);
        let rows = self.session().await?.fetch_all(&statement).await?;
        rows.into_iter().map(from_row).collect()
    }
}

/// First column of the first row, defaulting when there is none.
fn first_value<V>(rows: Vec<Row>) -> DbResult<V>
where
    V: Serialize + DeserializeOwned + Default,
{
    let value = rows
        .into_iter()
        .next()
        .and_then(|row| row.into_iter().next().map(|(_, v)| v))
        .unwrap_or(JsonValue::Null);
    from_scalar(value)
}

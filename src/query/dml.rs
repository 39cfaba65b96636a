//! Write terminals: inserts, upserts, updates and deletes.

use crate::db::Chain;
use crate::error::{DbError, DbResult};
use crate::models::{Statement, Value, to_columns};
use crate::query::builder::TableQuery;
use crate::query::table::TableRow;
use tracing::warn;

#[derive(Debug, Clone, Copy)]
enum InsertMode<'a> {
    Plain,
    Ignore,
    Upsert(&'a [String]),
}

impl<T: TableRow> TableQuery<T> {
    /// Serialized columns of `row` that survive the select and omit lists.
    fn write_columns(&self, row: &T) -> DbResult<Vec<(String, Value)>> {
        Ok(to_columns(row)?
            .into_iter()
            .filter(|(column, _)| self.clauses.keeps_column(column))
            .collect())
    }

    /// Single-column key left unset (zero or NULL) in every row; the
    /// database assigns it.
    fn generated_key(&self, rows: &[Vec<(String, Value)>]) -> Option<String> {
        let [key] = self.set.primary_keys() else {
            return None;
        };
        let unset = rows.iter().all(|row| {
            row.iter()
                .find(|(column, _)| column == key)
                .is_none_or(|(_, value)| matches!(value, Value::Null | Value::Int(0)))
        });
        unset.then(|| key.clone())
    }

    fn insert_statements(
        &self,
        rows: &[T],
        batch_size: usize,
        mode: InsertMode<'_>,
    ) -> DbResult<Vec<Statement>> {
        let mut values = rows
            .iter()
            .map(|row| self.write_columns(row))
            .collect::<DbResult<Vec<_>>>()?;

        if !matches!(mode, InsertMode::Upsert(_)) {
            if let Some(key) = self.generated_key(&values) {
                for row in &mut values {
                    row.retain(|(column, _)| *column != key);
                }
            }
        }

        let columns: Vec<String> = match values.first() {
            Some(first) => first.iter().map(|(column, _)| column.clone()).collect(),
            None => return Ok(Vec::new()),
        };
        if columns.is_empty() {
            return Err(DbError::query(format!(
                "insert into '{}' has no columns",
                self.set.table_name()
            )));
        }

        let dialect = self.set.context().dialect();
        let batch_size = if dialect.full_batch_insert() || batch_size == 0 {
            values.len()
        } else {
            batch_size
        };

        let table = self.set.table_name();
        let keys = self.set.primary_keys();
        values
            .chunks(batch_size)
            .map(|batch| {
                let sql = match mode {
                    InsertMode::Plain => dialect.insert_sql(table, &columns, batch.len()),
                    InsertMode::Ignore => {
                        dialect.insert_ignore_sql(table, &columns, batch.len(), keys)
                    }
                    InsertMode::Upsert(conflict) => {
                        dialect.upsert_sql(table, &columns, batch.len(), conflict)?
                    }
                };
                let args = batch
                    .iter()
                    .flat_map(|row| row.iter().map(|(_, value)| value.clone()))
                    .collect();
                Ok(Statement::new(sql, args))
            })
            .collect()
    }

    /// Run `statements` in order; more than one runs inside a transaction on
    /// this query's chain.
    async fn execute_batches(&self, statements: Vec<Statement>) -> DbResult<u64> {
        let context = self.set.context();
        if statements.len() <= 1 {
            let mut total = 0;
            for statement in &statements {
                total += self.session().await?.execute(statement).await?;
            }
            return Ok(total);
        }

        context
            .transaction(&self.chain, |chain: Chain| async move {
                let session = context.original(&chain).await?;
                let mut total = 0;
                for statement in &statements {
                    total += session.execute(statement).await?;
                }
                Ok::<_, DbError>(total)
            })
            .await
    }

    async fn insert_rows(
        &self,
        rows: &[T],
        batch_size: usize,
        mode: InsertMode<'_>,
    ) -> DbResult<u64> {
        let statements = self.insert_statements(rows, batch_size, mode)?;
        self.execute_batches(statements).await
    }

    /// Insert one row.
    ///
    /// A single-column primary key holding `0` or NULL is left out of the
    /// statement so the database assigns it; a row cannot be inserted with
    /// key `0` through this path.
    pub async fn insert(&self, row: &T) -> DbResult<u64> {
        self.insert_rows(std::slice::from_ref(row), 1, InsertMode::Plain)
            .await
    }

    /// Insert, skipping the row when it conflicts on a unique or primary key.
    pub async fn insert_ignore(&self, row: &T) -> DbResult<u64> {
        self.insert_rows(std::slice::from_ref(row), 1, InsertMode::Ignore)
            .await
    }

    /// Insert `rows` in batches of `batch_size` (all at once when `0`).
    ///
    /// On ClickHouse the whole list is always sent as one batch. As with
    /// [`TableQuery::insert`], a single-column key that is `0` or NULL in
    /// every row is omitted and assigned by the database.
    pub async fn insert_list(&self, rows: &[T], batch_size: usize) -> DbResult<u64> {
        self.insert_rows(rows, batch_size, InsertMode::Plain).await
    }

    pub async fn insert_ignore_list(&self, rows: &[T], batch_size: usize) -> DbResult<u64> {
        self.insert_rows(rows, batch_size, InsertMode::Ignore).await
    }

    /// Insert `row`, or overwrite every other column when it conflicts on
    /// `conflict`.
    pub async fn update_or_insert(&self, row: &T, conflict: &[&str]) -> DbResult<u64> {
        let conflict: Vec<String> = conflict.iter().map(|c| c.to_string()).collect();
        self.insert_rows(std::slice::from_ref(row), 1, InsertMode::Upsert(&conflict))
            .await
    }

    /// [`TableQuery::update_or_insert`] keyed on the primary key.
    pub async fn update_or_insert_by_primary(&self, row: &T) -> DbResult<u64> {
        let keys = self.set.primary_keys().to_vec();
        self.insert_rows(std::slice::from_ref(row), 1, InsertMode::Upsert(&keys))
            .await
    }

    pub async fn update_or_insert_list(
        &self,
        rows: &[T],
        conflict: &[&str],
        batch_size: usize,
    ) -> DbResult<u64> {
        let conflict: Vec<String> = conflict.iter().map(|c| c.to_string()).collect();
        self.insert_rows(rows, batch_size, InsertMode::Upsert(&conflict))
            .await
    }

    pub async fn update_or_insert_list_by_primary(
        &self,
        rows: &[T],
        batch_size: usize,
    ) -> DbResult<u64> {
        let keys = self.set.primary_keys().to_vec();
        self.insert_rows(rows, batch_size, InsertMode::Upsert(&keys))
            .await
    }

    /// Renders an UPDATE. Without any where clause it is refused when
    /// `require_filter` is set, and otherwise runs against every row.
    async fn run_update(
        &self,
        assignments: Vec<(String, Vec<Value>)>,
        require_filter: bool,
    ) -> DbResult<u64> {
        if assignments.is_empty() {
            return Err(DbError::query(format!(
                "update of '{}' has no columns to set",
                self.set.table_name()
            )));
        }
        if self.clauses.wheres.is_empty() {
            if require_filter {
                return Err(DbError::query(format!(
                    "update of '{}' without a where clause",
                    self.set.table_name()
                )));
            }
            warn!(
                database = %self.set.context().database_name(),
                table = %self.set.table_name(),
                "Updating every row: no where clause"
            );
        }
        let statement = self.renderer(&self.clauses).update(assignments);
        self.session().await?.execute(&statement).await
    }

    /// Overwrite every mapped non-key column of the matching rows with the
    /// values in `row`. Narrow the columns with `select`/`omit`.
    ///
    /// Without where clauses the row's own primary key selects the target.
    pub async fn update(&self, row: &T) -> DbResult<u64> {
        let dialect = self.set.context().dialect();
        let keys = self.set.primary_keys();
        let columns = to_columns(row)?;

        let query = if self.clauses.wheres.is_empty() {
            columns
                .iter()
                .filter(|(column, _)| keys.contains(column))
                .fold(self.clone(), |query, (column, value)| {
                    query.where_(
                        format!("{} = ?", dialect.quote(column)),
                        vec![value.clone()],
                    )
                })
        } else {
            self.clone()
        };

        let assignments = columns
            .into_iter()
            .filter(|(column, _)| !keys.contains(column) && self.clauses.keeps_column(column))
            .map(|(column, value)| (format!("{} = ?", dialect.quote(&column)), vec![value]))
            .collect();
        query.run_update(assignments, true).await
    }

    /// Set one column on the matching rows.
    pub async fn update_value(&self, column: &str, value: impl Into<Value>) -> DbResult<u64> {
        let dialect = self.set.context().dialect();
        let assignment = (format!("{} = ?", dialect.quote(column)), vec![value.into()]);
        self.run_update(vec![assignment], true).await
    }

    /// Set `field` to a raw expression: `expr("price", "price * ? + ?", ..)`.
    ///
    /// With no where clause every row in the table is updated.
    pub async fn expr(&self, field: &str, expr: &str, args: Vec<Value>) -> DbResult<u64> {
        self.exprs(vec![(field, expr, args)]).await
    }

    /// [`TableQuery::expr`] for several columns in one statement.
    pub async fn exprs(&self, fields: Vec<(&str, &str, Vec<Value>)>) -> DbResult<u64> {
        let dialect = self.set.context().dialect();
        let assignments = fields
            .into_iter()
            .filter(|(field, expr, _)| !field.trim().is_empty() && !expr.trim().is_empty())
            .map(|(field, expr, args)| (format!("{} = {}", dialect.quote(field), expr), args))
            .collect();
        self.run_update(assignments, false).await
    }

    /// Delete the matching rows. With no where clause every row in the
    /// table is deleted.
    pub async fn delete(&self) -> DbResult<u64> {
        if self.clauses.wheres.is_empty() {
            warn!(
                database = %self.set.context().database_name(),
                table = %self.set.table_name(),
                "Deleting every row: no where clause"
            );
        }
        let statement = self.renderer(&self.clauses).delete();
        self.session().await?.execute(&statement).await
    }
}

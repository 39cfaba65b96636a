//! Clause accumulation.
//!
//! Every clause method takes `&self` and returns a new [`TableQuery`] owning
//! its own clause lists, so a handle can be branched freely:
//!
//! ```ignore
//! let active = users.query(&chain).where_eq("active", true);
//! let admins = active.where_eq("role", "admin").to_list().await?;
//! let count = active.count().await?; // no role predicate
//! ```

use crate::db::{Chain, IndexHint};
use crate::models::Value;
use crate::query::table::{TableRow, TableSet};

/// One predicate with its `?` arguments.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct WhereClause {
    pub(crate) sql: String,
    pub(crate) args: Vec<Value>,
}

/// Pending clauses, rendered once per terminal call.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Clauses {
    pub(crate) select: Vec<String>,
    pub(crate) omit: Vec<String>,
    pub(crate) wheres: Vec<WhereClause>,
    pub(crate) orders: Vec<String>,
    pub(crate) limit: Option<u64>,
    pub(crate) offset: Option<u64>,
    pub(crate) index_hint: Option<IndexHint>,
    pub(crate) final_hint: bool,
}

impl Clauses {
    /// Select list without duplicates, first occurrence wins.
    pub(crate) fn distinct_select(&self) -> Vec<String> {
        distinct(&self.select)
    }

    pub(crate) fn distinct_omit(&self) -> Vec<String> {
        distinct(&self.omit)
    }

    /// Whether `column` survives the select and omit lists.
    pub(crate) fn keeps_column(&self, column: &str) -> bool {
        (self.select.is_empty() || self.select.iter().any(|c| c == column))
            && !self.omit.iter().any(|c| c == column)
    }
}

fn distinct(items: &[String]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(items.len());
    for item in items {
        if !seen.contains(item) {
            seen.push(item.clone());
        }
    }
    seen
}

/// Query on one table and chain with its pending clauses.
pub struct TableQuery<T> {
    pub(crate) set: TableSet<T>,
    pub(crate) chain: Chain,
    pub(crate) clauses: Clauses,
}

impl<T> Clone for TableQuery<T> {
    fn clone(&self) -> Self {
        Self {
            set: self.set.clone(),
            chain: self.chain.clone(),
            clauses: self.clauses.clone(),
        }
    }
}

impl<T> std::fmt::Debug for TableQuery<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableQuery")
            .field("set", &self.set)
            .field("chain", &self.chain)
            .field("clauses", &self.clauses)
            .finish()
    }
}

impl<T: TableRow> TableQuery<T> {
    pub(crate) fn new(set: TableSet<T>, chain: Chain) -> Self {
        Self {
            set,
            chain,
            clauses: Clauses::default(),
        }
    }

    pub fn table(&self) -> &TableSet<T> {
        &self.set
    }

    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    fn with(&self, f: impl FnOnce(&mut Clauses)) -> Self {
        let mut next = self.clone();
        f(&mut next.clauses);
        next
    }

    fn push_where(&self, sql: String, args: Vec<Value>) -> Self {
        if sql.trim().is_empty() || args.iter().any(Value::is_null) {
            return self.clone();
        }
        self.with(|c| c.wheres.push(WhereClause { sql, args }))
    }

    pub fn select<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns
            .into_iter()
            .map(Into::into)
            .filter(|c| !c.trim().is_empty())
            .collect();
        self.with(|c| c.select.extend(columns))
    }

    pub fn omit<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let columns: Vec<String> = columns
            .into_iter()
            .map(Into::into)
            .filter(|c| !c.trim().is_empty())
            .collect();
        self.with(|c| c.omit.extend(columns))
    }

    /// Raw predicate with `?` markers. Blank predicates and predicates with
    /// a NULL argument are dropped.
    pub fn where_(&self, sql: impl Into<String>, args: Vec<Value>) -> Self {
        self.push_where(sql.into(), args)
    }

    pub fn where_eq(&self, column: &str, value: impl Into<Value>) -> Self {
        self.push_where(format!("{} = ?", column), vec![value.into()])
    }

    pub fn where_gt(&self, column: &str, value: impl Into<Value>) -> Self {
        self.push_where(format!("{} > ?", column), vec![value.into()])
    }

    pub fn where_gte(&self, column: &str, value: impl Into<Value>) -> Self {
        self.push_where(format!("{} >= ?", column), vec![value.into()])
    }

    pub fn where_lt(&self, column: &str, value: impl Into<Value>) -> Self {
        self.push_where(format!("{} < ?", column), vec![value.into()])
    }

    pub fn where_lte(&self, column: &str, value: impl Into<Value>) -> Self {
        self.push_where(format!("{} <= ?", column), vec![value.into()])
    }

    /// `column in (..)`. An empty list matches nothing.
    pub fn where_in<I, V>(&self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.push_where(format!("{} in ?", column), vec![Value::list(values)])
    }

    /// `column like '%value%'`.
    pub fn where_like(&self, column: &str, value: impl Into<Value>) -> Self {
        let pattern = match value.into() {
            Value::Null => Value::Null,
            Value::String(s) => Value::String(format!("%{}%", s)),
            other => Value::String(format!("%{}%", other.to_json())),
        };
        self.push_where(format!("{} like ?", column), vec![pattern])
    }

    /// `column >= min and column <= max`.
    pub fn where_between(
        &self,
        column: &str,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        self.push_where(
            format!("{} >= ? and {} <= ?", column, column),
            vec![min.into(), max.into()],
        )
    }

    pub fn where_if(&self, condition: bool, sql: impl Into<String>, args: Vec<Value>) -> Self {
        if !condition {
            return self.clone();
        }
        self.where_(sql, args)
    }

    pub fn where_eq_if(&self, condition: bool, column: &str, value: impl Into<Value>) -> Self {
        if !condition {
            return self.clone();
        }
        self.where_eq(column, value)
    }

    pub fn where_gt_if(&self, condition: bool, column: &str, value: impl Into<Value>) -> Self {
        if !condition {
            return self.clone();
        }
        self.where_gt(column, value)
    }

    pub fn where_gte_if(&self, condition: bool, column: &str, value: impl Into<Value>) -> Self {
        if !condition {
            return self.clone();
        }
        self.where_gte(column, value)
    }

    pub fn where_lt_if(&self, condition: bool, column: &str, value: impl Into<Value>) -> Self {
        if !condition {
            return self.clone();
        }
        self.where_lt(column, value)
    }

    pub fn where_lte_if(&self, condition: bool, column: &str, value: impl Into<Value>) -> Self {
        if !condition {
            return self.clone();
        }
        self.where_lte(column, value)
    }

    pub fn where_in_if<I, V>(&self, condition: bool, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        if !condition {
            return self.clone();
        }
        self.where_in(column, values)
    }

    pub fn where_like_if(&self, condition: bool, column: &str, value: impl Into<Value>) -> Self {
        if !condition {
            return self.clone();
        }
        self.where_like(column, value)
    }

    pub fn where_between_if(
        &self,
        condition: bool,
        column: &str,
        min: impl Into<Value>,
        max: impl Into<Value>,
    ) -> Self {
        if !condition {
            return self.clone();
        }
        self.where_between(column, min, max)
    }

    /// Append `sql` with `value` unless the value is NULL (`None`).
    pub fn where_ignore_nil(&self, sql: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push_where(sql.into(), vec![value.into()])
    }

    /// Append `sql` with `value` only when `value > 0`.
    pub fn where_ignore_less_zero(&self, sql: impl Into<String>, value: i64) -> Self {
        if value <= 0 {
            return self.clone();
        }
        self.push_where(sql.into(), vec![Value::Int(value)])
    }

    /// Raw ORDER BY term. Terms apply in call order.
    pub fn order(&self, expr: impl Into<String>) -> Self {
        let expr = expr.into();
        if expr.trim().is_empty() {
            return self.clone();
        }
        self.with(|c| c.orders.push(expr))
    }

    pub fn order_if(&self, condition: bool, expr: impl Into<String>) -> Self {
        if !condition {
            return self.clone();
        }
        self.order(expr)
    }

    pub fn desc(&self, field: &str) -> Self {
        self.order(format!("{} desc", field))
    }

    pub fn desc_if(&self, condition: bool, field: &str) -> Self {
        if !condition {
            return self.clone();
        }
        self.desc(field)
    }

    pub fn desc_if_else(&self, condition: bool, true_field: &str, false_field: &str) -> Self {
        self.desc(if condition { true_field } else { false_field })
    }

    pub fn asc(&self, field: &str) -> Self {
        self.order(format!("{} asc", field))
    }

    pub fn asc_if(&self, condition: bool, field: &str) -> Self {
        if !condition {
            return self.clone();
        }
        self.asc(field)
    }

    pub fn asc_if_else(&self, condition: bool, true_field: &str, false_field: &str) -> Self {
        self.asc(if condition { true_field } else { false_field })
    }

    /// Cap the number of rows. `0` removes the cap.
    pub fn limit(&self, limit: u64) -> Self {
        self.with(|c| c.limit = (limit > 0).then_some(limit))
    }

    pub fn offset(&self, offset: u64) -> Self {
        self.with(|c| c.offset = (offset > 0).then_some(offset))
    }

    pub fn force_index<I, S>(&self, indexes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = indexes.into_iter().map(Into::into).collect();
        self.with(|c| c.index_hint = Some(IndexHint::Force(names)))
    }

    pub fn use_index<I, S>(&self, indexes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names = indexes.into_iter().map(Into::into).collect();
        self.with(|c| c.index_hint = Some(IndexHint::Use(names)))
    }

    /// Read-time merge hint; only rendered on ClickHouse.
    pub fn with_final(&self) -> Self {
        self.with(|c| c.final_hint = true)
    }
}

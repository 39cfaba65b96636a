//! Single-pass statement rendering from accumulated clauses.
//!
//! Clauses apply in a fixed order: select, omit, where, order, limit,
//! offset, index hint, final hint.

use crate::db::Dialect;
use crate::models::{Statement, Value};
use crate::query::builder::Clauses;

pub(crate) struct Renderer<'a> {
    dialect: Dialect,
    table: &'a str,
    clauses: &'a Clauses,
}

impl<'a> Renderer<'a> {
    pub(crate) fn new(dialect: Dialect, table: &'a str, clauses: &'a Clauses) -> Self {
        Self {
            dialect,
            table,
            clauses,
        }
    }

    /// `SELECT <columns> FROM ..` with every clause applied.
    pub(crate) fn select(&self, columns: &[String]) -> Statement {
        let mut statement = Statement::raw(format!(
            "SELECT {} FROM {}",
            self.dialect.column_list(columns),
            self.from_target()
        ));
        self.push_where(&mut statement);

        let paging = self.clauses.limit.is_some() || self.clauses.offset.is_some();
        if !self.clauses.orders.is_empty() {
            statement.push_sql(&format!(" ORDER BY {}", self.clauses.orders.join(", ")));
        } else if paging && self.dialect == Dialect::SqlServer {
            statement.push_sql(" ORDER BY (SELECT NULL)");
        }
        statement.push_sql(
            &self
                .dialect
                .limit_offset(self.clauses.limit, self.clauses.offset),
        );
        statement
    }

    /// `SELECT COUNT(*)` over the filtered table; order and paging are
    /// ignored.
    pub(crate) fn count(&self) -> Statement {
        let mut statement = Statement::raw(format!("SELECT COUNT(*) FROM {}", self.from_target()));
        self.push_where(&mut statement);
        statement
    }

    /// UPDATE with `assignments` (`col = ?` fragments plus their arguments).
    pub(crate) fn update(&self, assignments: Vec<(String, Vec<Value>)>) -> Statement {
        let mut statement = Statement::raw(self.dialect.update_prefix(self.table));
        let mut first = true;
        for (fragment, args) in assignments {
            if !first {
                statement.push_sql(", ");
            }
            first = false;
            statement.push_sql(&fragment).push_args(args);
        }
        self.push_where(&mut statement);
        statement
    }

    /// DELETE of every row matching the where clauses.
    pub(crate) fn delete(&self) -> Statement {
        let mut statement = Statement::raw(self.dialect.delete_prefix(self.table));
        if self.clauses.wheres.is_empty() && self.dialect.uses_mutations() {
            // Mutations require a WHERE clause
            statement.push_sql(" WHERE 1");
        }
        self.push_where(&mut statement);
        statement
    }

    /// Quoted table followed by the index and final hints.
    fn from_target(&self) -> String {
        let mut target = self.dialect.quote(self.table);
        if let Some(hint) = &self.clauses.index_hint {
            target.push_str(&self.dialect.index_hint(hint));
        }
        if self.clauses.final_hint {
            target.push_str(self.dialect.final_hint());
        }
        target
    }

    fn push_where(&self, statement: &mut Statement) {
        for (i, clause) in self.clauses.wheres.iter().enumerate() {
            let joiner = if i == 0 { " WHERE " } else { " AND " };
            statement
                .push_sql(joiner)
                .push_sql("(")
                .push_sql(&clause.sql)
                .push_sql(")")
                .push_args(clause.args.iter().cloned());
        }
    }
}

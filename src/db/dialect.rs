//! Engine-specific SQL rendering.
//!
//! Table queries are built with `?` markers and engine-neutral clause lists;
//! everything that differs between engines is rendered here.

use crate::db::driver::IdxField;
use crate::error::{DbError, DbResult};
use crate::models::{Statement, Value};

/// SQL dialects the query builder can render for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    MySql,
    Postgres,
    Sqlite,
    SqlServer,
    ClickHouse,
}

/// Index hint attached after the table name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexHint {
    Force(Vec<String>),
    Use(Vec<String>),
}

impl Dialect {
    /// Map a configuration data type tag to a dialect.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::MySql),
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "sqlite" | "sqlite3" => Some(Self::Sqlite),
            "sqlserver" | "mssql" => Some(Self::SqlServer),
            "clickhouse" => Some(Self::ClickHouse),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgres",
            Self::Sqlite => "sqlite",
            Self::SqlServer => "sqlserver",
            Self::ClickHouse => "clickhouse",
        }
    }

    /// Placeholder for the 1-based argument `index`.
    pub fn placeholder(&self, index: usize) -> String {
        match self {
            Self::Postgres => format!("${}", index),
            Self::SqlServer => format!("@p{}", index),
            _ => "?".to_string(),
        }
    }

    /// Quote an identifier, leaving expressions untouched.
    ///
    /// Dotted names are quoted per segment; anything that is not a plain
    /// identifier (`count(*)`, `age desc`) is returned as-is.
    pub fn quote(&self, ident: &str) -> String {
        let ident = ident.trim();
        let plain = !ident.is_empty()
            && ident
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !plain || ident == "*" {
            return ident.to_string();
        }
        ident
            .split('.')
            .map(|part| match self {
                Self::MySql | Self::ClickHouse => format!("`{}`", part),
                Self::SqlServer => format!("[{}]", part),
                Self::Postgres | Self::Sqlite => format!("\"{}\"", part),
            })
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Index hint rendered directly after the table name.
    pub fn index_hint(&self, hint: &IndexHint) -> String {
        let (forced, names) = match hint {
            IndexHint::Force(names) => (true, names),
            IndexHint::Use(names) => (false, names),
        };
        if names.is_empty() {
            return String::new();
        }
        let list = names.join(", ");
        match self {
            Self::MySql if forced => format!(" FORCE INDEX ({})", list),
            Self::MySql => format!(" USE INDEX ({})", list),
            Self::SqlServer => format!(" WITH (INDEX({}))", list),
            Self::Sqlite if forced && names.len() == 1 => format!(" INDEXED BY {}", names[0]),
            _ => String::new(),
        }
    }

    /// Read-time merge hint for merge-tree engines.
    pub fn final_hint(&self) -> &'static str {
        match self {
            Self::ClickHouse => " FINAL",
            _ => "",
        }
    }

    /// Trailing LIMIT/OFFSET clause.
    ///
    /// SQL Server pages with `OFFSET .. FETCH`, which needs an ORDER BY; the
    /// renderer supplies `ORDER BY (SELECT NULL)` when none was given.
    pub fn limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> String {
        match (self, limit, offset) {
            (_, None, None) => String::new(),
            (Self::SqlServer, limit, offset) => {
                let mut sql = format!(" OFFSET {} ROWS", offset.unwrap_or(0));
                if let Some(limit) = limit {
                    sql.push_str(&format!(" FETCH NEXT {} ROWS ONLY", limit));
                }
                sql
            }
            (_, Some(limit), None) => format!(" LIMIT {}", limit),
            (_, Some(limit), Some(offset)) => format!(" LIMIT {} OFFSET {}", limit, offset),
            (Self::Sqlite, None, Some(offset)) => format!(" LIMIT -1 OFFSET {}", offset),
            (Self::MySql, None, Some(offset)) => {
                format!(" LIMIT 18446744073709551615 OFFSET {}", offset)
            }
            (_, None, Some(offset)) => format!(" OFFSET {}", offset),
        }
    }

    /// Whether batched inserts must send the whole list in one statement.
    ///
    /// ClickHouse batches corrupt under partial batches, so the caller's
    /// batch size is overridden with the list length.
    pub fn full_batch_insert(&self) -> bool {
        matches!(self, Self::ClickHouse)
    }

    /// Whether UPDATE/DELETE are issued as `ALTER TABLE` mutations.
    pub fn uses_mutations(&self) -> bool {
        matches!(self, Self::ClickHouse)
    }

    /// `INSERT` for `rows` rows of `columns`.
    pub fn insert_sql(&self, table: &str, columns: &[String], rows: usize) -> String {
        format!(
            "INSERT INTO {} ({}) VALUES {}",
            self.quote(table),
            self.column_list(columns),
            values_clause(columns.len(), rows)
        )
    }

    /// `INSERT` that skips rows conflicting on a unique or primary key.
    ///
    /// SQL Server has no ignore form; a `MERGE` keyed on `keys` is used
    /// instead, falling back to a plain insert when the table has no key.
    pub fn insert_ignore_sql(
        &self,
        table: &str,
        columns: &[String],
        rows: usize,
        keys: &[String],
    ) -> String {
        let table_q = self.quote(table);
        let cols = self.column_list(columns);
        let values = values_clause(columns.len(), rows);
        match self {
            Self::MySql => format!("INSERT IGNORE INTO {} ({}) VALUES {}", table_q, cols, values),
            Self::Sqlite => format!(
                "INSERT OR IGNORE INTO {} ({}) VALUES {}",
                table_q, cols, values
            ),
            Self::Postgres => format!(
                "INSERT INTO {} ({}) VALUES {} ON CONFLICT DO NOTHING",
                table_q, cols, values
            ),
            Self::SqlServer if !keys.is_empty() => {
                self.merge_sql(table, columns, rows, keys, false)
            }
            Self::SqlServer | Self::ClickHouse => self.insert_sql(table, columns, rows),
        }
    }

    /// Insert-or-update keyed on `conflict` columns; every other column is
    /// overwritten on conflict.
    pub fn upsert_sql(
        &self,
        table: &str,
        columns: &[String],
        rows: usize,
        conflict: &[String],
    ) -> DbResult<String> {
        if conflict.is_empty() {
            return Err(DbError::query(format!(
                "upsert on '{}' requires at least one conflict column",
                table
            )));
        }
        let updates: Vec<&String> = columns.iter().filter(|c| !conflict.contains(c)).collect();
        let insert = self.insert_sql(table, columns, rows);

        let sql = match self {
            Self::MySql => {
                let set = if updates.is_empty() {
                    let key = self.quote(&conflict[0]);
                    format!("{} = {}", key, key)
                } else {
                    updates
                        .iter()
                        .map(|c| format!("{} = VALUES({})", self.quote(c), self.quote(c)))
                        .collect::<Vec<_>>()
                        .join(", ")
                };
                format!("{} ON DUPLICATE KEY UPDATE {}", insert, set)
            }
            Self::Postgres | Self::Sqlite => {
                let target = self.column_list(conflict);
                if updates.is_empty() {
                    format!("{} ON CONFLICT ({}) DO NOTHING", insert, target)
                } else {
                    let set = updates
                        .iter()
                        .map(|c| format!("{} = excluded.{}", self.quote(c), self.quote(c)))
                        .collect::<Vec<_>>()
                        .join(", ");
                    format!("{} ON CONFLICT ({}) DO UPDATE SET {}", insert, target, set)
                }
            }
            Self::SqlServer => self.merge_sql(table, columns, rows, conflict, true),
            // ReplacingMergeTree tables collapse duplicates on merge.
            Self::ClickHouse => insert,
        };
        Ok(sql)
    }

    fn merge_sql(
        &self,
        table: &str,
        columns: &[String],
        rows: usize,
        keys: &[String],
        update: bool,
    ) -> String {
        let cols = self.column_list(columns);
        let on = keys
            .iter()
            .map(|k| format!("target.{} = source.{}", self.quote(k), self.quote(k)))
            .collect::<Vec<_>>()
            .join(" AND ");
        let mut sql = format!(
            "MERGE INTO {} AS target USING (VALUES {}) AS source ({}) ON {}",
            self.quote(table),
            values_clause(columns.len(), rows),
            cols,
            on
        );
        let updates: Vec<String> = columns
            .iter()
            .filter(|c| !keys.contains(c))
            .map(|c| format!("target.{} = source.{}", self.quote(c), self.quote(c)))
            .collect();
        if update && !updates.is_empty() {
            sql.push_str(&format!(" WHEN MATCHED THEN UPDATE SET {}", updates.join(", ")));
        }
        let source_cols = columns
            .iter()
            .map(|c| format!("source.{}", self.quote(c)))
            .collect::<Vec<_>>()
            .join(", ");
        sql.push_str(&format!(
            " WHEN NOT MATCHED THEN INSERT ({}) VALUES ({});",
            cols, source_cols
        ));
        sql
    }

    /// Leading part of an UPDATE up to and including the SET keyword.
    pub fn update_prefix(&self, table: &str) -> String {
        if self.uses_mutations() {
            format!("ALTER TABLE {} UPDATE ", self.quote(table))
        } else {
            format!("UPDATE {} SET ", self.quote(table))
        }
    }

    /// Leading part of a DELETE, before the WHERE clause.
    pub fn delete_prefix(&self, table: &str) -> String {
        if self.uses_mutations() {
            format!("ALTER TABLE {} DELETE", self.quote(table))
        } else {
            format!("DELETE FROM {}", self.quote(table))
        }
    }

    /// Index DDL: `CREATE [UNIQUE ]INDEX name ON table (fields);`
    pub fn create_index(&self, table: &str, index_name: &str, field: &IdxField) -> String {
        match self {
            Self::ClickHouse => format!(
                "ALTER TABLE {} ADD INDEX {} ({}) TYPE minmax GRANULARITY 3;",
                table, index_name, field.fields
            ),
            _ => format!(
                "CREATE {}INDEX {} ON {} ({});",
                if field.unique { "UNIQUE " } else { "" },
                index_name,
                table,
                field.fields
            ),
        }
    }

    /// Query returning the server's current time.
    pub fn now_sql(&self) -> &'static str {
        match self {
            Self::SqlServer => "SELECT GETDATE()",
            Self::Sqlite => "SELECT datetime('now')",
            _ => "SELECT now()",
        }
    }

    /// Query listing user databases visible to the connection.
    pub fn database_list_sql(&self) -> &'static str {
        match self {
            Self::MySql => {
                "SELECT SCHEMA_NAME FROM information_schema.SCHEMATA WHERE SCHEMA_NAME NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys')"
            }
            Self::SqlServer => {
                "SELECT name FROM sys.databases WHERE name NOT IN ('master', 'tempdb', 'model', 'msdb')"
            }
            Self::Postgres => "SELECT datname FROM pg_database WHERE datistemplate = false",
            Self::ClickHouse => {
                "SELECT name FROM system.databases WHERE name NOT IN ('system', 'INFORMATION_SCHEMA', 'information_schema', 'default')"
            }
            Self::Sqlite => "SELECT name FROM pragma_database_list",
        }
    }

    /// Query listing base tables of `database`.
    pub fn table_list_sql(&self, database: &str) -> Statement {
        match self {
            Self::MySql => Statement::new(
                "SELECT TABLE_NAME FROM information_schema.TABLES WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'",
                vec![Value::from(database)],
            ),
            Self::SqlServer => Statement::new(
                "SELECT TABLE_NAME FROM INFORMATION_SCHEMA.TABLES WHERE TABLE_TYPE = 'BASE TABLE' AND TABLE_CATALOG = ?",
                vec![Value::from(database)],
            ),
            Self::Sqlite => Statement::raw(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
            ),
            Self::Postgres => Statement::raw(
                "SELECT table_name FROM information_schema.tables WHERE table_schema = 'public' AND table_type = 'BASE TABLE'",
            ),
            Self::ClickHouse => Statement::new(
                "SELECT name FROM system.tables WHERE database = ? AND engine <> 'View'",
                vec![Value::from(database)],
            ),
        }
    }

    /// Query counting indexes named `index` on `table`.
    pub fn index_exists_sql(&self, table: &str, index: &str) -> Statement {
        let sql = match self {
            Self::MySql => {
                "SELECT COUNT(*) FROM information_schema.STATISTICS WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ? AND INDEX_NAME = ?"
            }
            Self::Postgres => "SELECT COUNT(*) FROM pg_indexes WHERE tablename = ? AND indexname = ?",
            Self::Sqlite => {
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = ? AND name = ?"
            }
            Self::SqlServer => {
                "SELECT COUNT(*) FROM sys.indexes WHERE object_id = OBJECT_ID(?) AND name = ?"
            }
            Self::ClickHouse => {
                "SELECT COUNT(*) FROM system.data_skipping_indices WHERE table = ? AND name = ?"
            }
        };
        Statement::new(sql, vec![Value::from(table), Value::from(index)])
    }

    /// `OPTIMIZE TABLE .. FINAL` for merge-tree tables.
    pub fn optimize_final_sql(&self, table: &str) -> DbResult<String> {
        match self {
            Self::ClickHouse => Ok(format!("OPTIMIZE TABLE {} FINAL", self.quote(table))),
            other => Err(DbError::query(format!(
                "OPTIMIZE .. FINAL is only supported on clickhouse, not {}",
                other.name()
            ))),
        }
    }

    pub(crate) fn column_list(&self, columns: &[String]) -> String {
        columns
            .iter()
            .map(|c| self.quote(c))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Rewrite `?` markers into this dialect's placeholders.
    ///
    /// List arguments expand to `(?, ?, ..)`; an empty list becomes `(NULL)`
    /// so `col in ?` matches nothing. Markers inside quoted text and comments
    /// are left alone.
    pub fn prepare(&self, statement: &Statement) -> DbResult<Statement> {
        let mut sql = String::with_capacity(statement.sql.len() + 16);
        let mut args = Vec::with_capacity(statement.args.len());
        let mut pending = statement.args.iter();
        let mut used = 0usize;
        let mut state = ScanState::Normal;
        let backslash_escapes = matches!(self, Self::MySql | Self::ClickHouse);
        let mut chars = statement.sql.chars().peekable();

        while let Some(c) = chars.next() {
            match state {
                ScanState::Normal => match c {
                    '?' => {
                        let arg = pending.next().ok_or_else(|| {
                            DbError::query(format!(
                                "statement has more placeholders than the {} arguments supplied: {}",
                                statement.args.len(),
                                statement.sql
                            ))
                        })?;
                        used += 1;
                        match arg {
                            Value::List(items) if items.is_empty() => sql.push_str("(NULL)"),
                            Value::List(items) => {
                                sql.push('(');
                                for (i, item) in items.iter().enumerate() {
                                    if i > 0 {
                                        sql.push_str(", ");
                                    }
                                    args.push(item.clone());
                                    sql.push_str(&self.placeholder(args.len()));
                                }
                                sql.push(')');
                            }
                            other => {
                                args.push(other.clone());
                                sql.push_str(&self.placeholder(args.len()));
                            }
                        }
                        continue;
                    }
                    '\'' => state = ScanState::SingleQuoted,
                    '"' => state = ScanState::DoubleQuoted,
                    '`' => state = ScanState::Backtick,
                    '-' if chars.peek() == Some(&'-') => state = ScanState::LineComment,
                    '/' if chars.peek() == Some(&'*') => state = ScanState::BlockComment,
                    _ => {}
                },
                ScanState::SingleQuoted => {
                    if c == '\\' && backslash_escapes {
                        sql.push(c);
                        if let Some(next) = chars.next() {
                            sql.push(next);
                        }
                        continue;
                    }
                    if c == '\'' {
                        state = ScanState::Normal;
                    }
                }
                ScanState::DoubleQuoted => {
                    if c == '"' {
                        state = ScanState::Normal;
                    }
                }
                ScanState::Backtick => {
                    if c == '`' {
                        state = ScanState::Normal;
                    }
                }
                ScanState::LineComment => {
                    if c == '\n' {
                        state = ScanState::Normal;
                    }
                }
                ScanState::BlockComment => {
                    if c == '*' && chars.peek() == Some(&'/') {
                        sql.push(c);
                        if let Some(next) = chars.next() {
                            sql.push(next);
                        }
                        state = ScanState::Normal;
                        continue;
                    }
                }
            }
            sql.push(c);
        }

        if used < statement.args.len() {
            return Err(DbError::query(format!(
                "statement has {} placeholders but {} arguments were supplied: {}",
                used,
                statement.args.len(),
                statement.sql
            )));
        }

        Ok(Statement { sql, args })
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    Backtick,
    LineComment,
    BlockComment,
}

fn values_clause(columns: usize, rows: usize) -> String {
    let row = format!("({})", vec!["?"; columns].join(", "));
    vec![row; rows].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::args;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_from_tag() {
        assert_eq!(Dialect::from_tag("MySQL"), Some(Dialect::MySql));
        assert_eq!(Dialect::from_tag("postgresql"), Some(Dialect::Postgres));
        assert_eq!(Dialect::from_tag("clickhouse"), Some(Dialect::ClickHouse));
        assert_eq!(Dialect::from_tag("memdb"), None);
    }

    #[test]
    fn test_quote() {
        assert_eq!(Dialect::MySql.quote("user"), "`user`");
        assert_eq!(Dialect::Postgres.quote("public.user"), "\"public\".\"user\"");
        assert_eq!(Dialect::SqlServer.quote("id"), "[id]");
        assert_eq!(Dialect::MySql.quote("count(*)"), "count(*)");
        assert_eq!(Dialect::MySql.quote("*"), "*");
    }

    #[test]
    fn test_prepare_postgres_numbering() {
        let stmt = Statement::new("select * from t where a = ? and b in ?", args![1, Value::list([2, 3])]);
        let prepared = Dialect::Postgres.prepare(&stmt).unwrap();
        assert_eq!(prepared.sql, "select * from t where a = $1 and b in ($2, $3)");
        assert_eq!(prepared.args.len(), 3);
    }

    #[test]
    fn test_prepare_skips_quoted_markers() {
        let stmt = Statement::new("select '?', \"a?\" from t -- ?\nwhere a = ?", args![1]);
        let prepared = Dialect::Postgres.prepare(&stmt).unwrap();
        assert_eq!(prepared.sql, "select '?', \"a?\" from t -- ?\nwhere a = $1");
    }

    #[test]
    fn test_prepare_mysql_backslash_escape() {
        let stmt = Statement::new("select 'it\\'s ?' where a = ?", args![1]);
        let prepared = Dialect::MySql.prepare(&stmt).unwrap();
        assert_eq!(prepared.sql, "select 'it\\'s ?' where a = ?");
        assert_eq!(prepared.args, args![1]);
    }

    #[test]
    fn test_prepare_argument_mismatch() {
        let too_few = Statement::new("a = ? and b = ?", args![1]);
        assert!(Dialect::MySql.prepare(&too_few).is_err());
        let too_many = Statement::new("a = ?", args![1, 2]);
        assert!(Dialect::MySql.prepare(&too_many).is_err());
    }

    #[test]
    fn test_prepare_empty_list() {
        let stmt = Statement::new("id in ?", vec![Value::List(vec![])]);
        let prepared = Dialect::Sqlite.prepare(&stmt).unwrap();
        assert_eq!(prepared.sql, "id in (NULL)");
        assert!(prepared.args.is_empty());
    }

    #[test]
    fn test_limit_offset() {
        assert_eq!(Dialect::MySql.limit_offset(Some(10), Some(20)), " LIMIT 10 OFFSET 20");
        assert_eq!(Dialect::Sqlite.limit_offset(None, Some(5)), " LIMIT -1 OFFSET 5");
        assert_eq!(
            Dialect::SqlServer.limit_offset(Some(10), None),
            " OFFSET 0 ROWS FETCH NEXT 10 ROWS ONLY"
        );
        assert_eq!(Dialect::Postgres.limit_offset(None, None), "");
    }

    #[test]
    fn test_index_hints() {
        let force = IndexHint::Force(cols(&["idx_age"]));
        assert_eq!(Dialect::MySql.index_hint(&force), " FORCE INDEX (idx_age)");
        assert_eq!(Dialect::SqlServer.index_hint(&force), " WITH (INDEX(idx_age))");
        assert_eq!(Dialect::Sqlite.index_hint(&force), " INDEXED BY idx_age");
        assert_eq!(Dialect::Postgres.index_hint(&force), "");
        let use_hint = IndexHint::Use(cols(&["a", "b"]));
        assert_eq!(Dialect::MySql.index_hint(&use_hint), " USE INDEX (a, b)");
    }

    #[test]
    fn test_final_hint_only_clickhouse() {
        assert_eq!(Dialect::ClickHouse.final_hint(), " FINAL");
        assert_eq!(Dialect::MySql.final_hint(), "");
    }

    #[test]
    fn test_insert_ignore_per_engine() {
        let columns = cols(&["id", "name"]);
        assert!(
            Dialect::MySql
                .insert_ignore_sql("user", &columns, 1, &[])
                .starts_with("INSERT IGNORE INTO `user`")
        );
        assert!(
            Dialect::Sqlite
                .insert_ignore_sql("user", &columns, 1, &[])
                .starts_with("INSERT OR IGNORE INTO")
        );
        assert!(
            Dialect::Postgres
                .insert_ignore_sql("user", &columns, 2, &[])
                .ends_with("VALUES (?, ?), (?, ?) ON CONFLICT DO NOTHING")
        );
        assert!(
            Dialect::SqlServer
                .insert_ignore_sql("user", &columns, 1, &cols(&["id"]))
                .starts_with("MERGE INTO [user]")
        );
    }

    #[test]
    fn test_upsert_sql() {
        let columns = cols(&["id", "name", "age"]);
        let key = cols(&["id"]);
        assert_eq!(
            Dialect::MySql.upsert_sql("user", &columns, 1, &key).unwrap(),
            "INSERT INTO `user` (`id`, `name`, `age`) VALUES (?, ?, ?) ON DUPLICATE KEY UPDATE `name` = VALUES(`name`), `age` = VALUES(`age`)"
        );
        assert_eq!(
            Dialect::Sqlite.upsert_sql("user", &columns, 1, &key).unwrap(),
            "INSERT INTO \"user\" (\"id\", \"name\", \"age\") VALUES (?, ?, ?) ON CONFLICT (\"id\") DO UPDATE SET \"name\" = excluded.\"name\", \"age\" = excluded.\"age\""
        );
        assert!(Dialect::Postgres.upsert_sql("user", &columns, 1, &[]).is_err());
        let merge = Dialect::SqlServer.upsert_sql("user", &columns, 1, &key).unwrap();
        assert!(merge.contains("WHEN MATCHED THEN UPDATE SET target.[name] = source.[name]"));
    }

    #[test]
    fn test_create_index() {
        let unique = IdxField::new(true, "name, age");
        assert_eq!(
            Dialect::MySql.create_index("user", "idx_name_age", &unique),
            "CREATE UNIQUE INDEX idx_name_age ON user (name, age);"
        );
        let plain = IdxField::new(false, "age");
        assert_eq!(
            Dialect::Postgres.create_index("user", "idx_age", &plain),
            "CREATE INDEX idx_age ON user (age);"
        );
    }

    #[test]
    fn test_mutation_prefixes() {
        assert_eq!(Dialect::ClickHouse.delete_prefix("t"), "ALTER TABLE `t` DELETE");
        assert_eq!(Dialect::ClickHouse.update_prefix("t"), "ALTER TABLE `t` UPDATE ");
        assert_eq!(Dialect::Postgres.delete_prefix("t"), "DELETE FROM \"t\"");
    }

    #[test]
    fn test_optimize_final() {
        assert_eq!(
            Dialect::ClickHouse.optimize_final_sql("events").unwrap(),
            "OPTIMIZE TABLE `events` FINAL"
        );
        assert!(Dialect::MySql.optimize_final_sql("events").is_err());
    }

    #[test]
    fn test_full_batch_insert() {
        assert!(Dialect::ClickHouse.full_batch_insert());
        assert!(!Dialect::MySql.full_batch_insert());
    }
}

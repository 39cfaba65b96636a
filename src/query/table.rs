//! Table binding: row shapes, table handles and migration.

use crate::db::driver::IdxField;
use crate::db::{Chain, DbContext};
use crate::error::DbResult;
use crate::query::builder::TableQuery;
use crate::query::merge_tree::MergeTreeSet;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use tracing::{info, warn};

/// A row shape bound to a table.
///
/// Field names as serialized by serde are the column names; use
/// `#[serde(rename = "..")]` to override a column name.
///
/// ```ignore
/// #[derive(Debug, Default, Serialize, Deserialize)]
/// struct UserPo {
///     id: i64,
///     name: String,
/// }
///
/// impl TableRow for UserPo {
///     const PRIMARY_KEY: &'static [&'static str] = &["id"];
/// }
/// ```
pub trait TableRow: Serialize + DeserializeOwned + Default + Send + Sync + 'static {
    /// Primary key columns. Keyless shapes leave this empty and must not use
    /// primary-key based operations.
    const PRIMARY_KEY: &'static [&'static str] = &[];

    /// Table name used when none is given explicitly.
    fn table_name() -> String {
        default_table_name(std::any::type_name::<Self>())
    }

    /// DDL run by [`TableSet::migrate`] when the table does not exist.
    /// `{database}` and `{table}` are substituted.
    fn create_table_sql() -> Option<String> {
        None
    }

    /// Indexes created by [`TableSet::migrate`] when missing, keyed by name.
    fn indexes() -> Vec<(String, IdxField)> {
        Vec::new()
    }
}

/// Snake-case the last path segment of a type name: `app::UserPO` becomes
/// `user_po`.
pub fn default_table_name(type_name: &str) -> String {
    let base = type_name.split('<').next().unwrap_or(type_name);
    let base = base.rsplit("::").next().unwrap_or(base);

    let chars: Vec<char> = base.chars().collect();
    let mut name = String::with_capacity(chars.len() + 4);
    for (i, &c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let boundary = prev.is_ascii_lowercase()
                || prev.is_ascii_digit()
                || (prev.is_ascii_uppercase() && next_lower);
            if boundary && !name.ends_with('_') {
                name.push('_');
            }
        }
        name.push(c.to_ascii_lowercase());
    }
    name
}

/// Options for [`DbContext::table_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    /// Explicit table name.
    pub name: Option<String>,
    /// Create the table and its indexes when missing
    /// (see [`DbContext::init_table`]).
    pub migrate: bool,
}

impl TableOptions {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_migrate(mut self) -> Self {
        self.migrate = true;
        self
    }
}

/// Root handle for one table. Clause accumulation starts from
/// [`TableSet::query`].
pub struct TableSet<T> {
    context: DbContext,
    table_name: String,
    primary_keys: Vec<String>,
    migrate: bool,
    _row: PhantomData<fn() -> T>,
}

impl<T> Clone for TableSet<T> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            table_name: self.table_name.clone(),
            primary_keys: self.primary_keys.clone(),
            migrate: self.migrate,
            _row: PhantomData,
        }
    }
}

impl<T> std::fmt::Debug for TableSet<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TableSet")
            .field("database", &self.context.database_name())
            .field("table_name", &self.table_name)
            .field("primary_keys", &self.primary_keys)
            .finish()
    }
}

impl<T: TableRow> TableSet<T> {
    pub(crate) fn new(context: DbContext, options: TableOptions) -> Self {
        let table_name = options
            .name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(T::table_name);
        Self {
            context,
            table_name,
            primary_keys: T::PRIMARY_KEY.iter().map(|k| k.to_string()).collect(),
            migrate: options.migrate,
            _row: PhantomData,
        }
    }

    pub fn context(&self) -> &DbContext {
        &self.context
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    pub fn primary_keys(&self) -> &[String] {
        &self.primary_keys
    }

    pub fn set_table_name(&mut self, table_name: impl Into<String>) -> &mut Self {
        self.table_name = table_name.into();
        self
    }

    pub fn migrate_enabled(&self) -> bool {
        self.migrate
    }

    /// Substitute `{database}` and `{table}`.
    pub fn replace_names(&self, sql: &str) -> String {
        self.context
            .replace_database(sql)
            .replace("{table}", &self.table_name)
    }

    /// Start a query on `chain` with no pending clauses.
    pub fn query(&self, chain: &Chain) -> TableQuery<T> {
        TableQuery::new(self.clone(), chain.clone())
    }

    /// Merge-tree maintenance for this table.
    pub fn merge_tree(&self, chain: &Chain) -> MergeTreeSet {
        MergeTreeSet::new(self.context.clone(), self.table_name.clone(), chain.clone())
    }

    /// Create the table from [`TableRow::create_table_sql`] when missing,
    /// then create every missing index from [`TableRow::indexes`].
    pub async fn migrate(&self, chain: &Chain) -> DbResult<()> {
        if !self.context.has_table(chain, &self.table_name).await? {
            match T::create_table_sql() {
                Some(ddl) => {
                    self.context
                        .execute_sql(chain, &self.replace_names(&ddl), Vec::new())
                        .await?;
                    info!(table = %self.table_name, "Created table");
                }
                None => warn!(table = %self.table_name, "Table missing and no DDL provided"),
            }
        }

        let dialect = self.context.dialect();
        for (index_name, field) in T::indexes() {
            let exists = dialect.index_exists_sql(&self.table_name, &index_name);
            let count: i64 = self
                .context
                .execute_sql_to_value(chain, &exists.sql, exists.args)
                .await?;
            if count > 0 {
                continue;
            }
            let ddl = self
                .context
                .driver()
                .create_index(&self.table_name, &index_name, &field);
            self.context.execute_sql(chain, &ddl, Vec::new()).await?;
            info!(table = %self.table_name, index = %index_name, "Created index");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_name() {
        assert_eq!(default_table_name("app::models::UserPO"), "user_po");
        assert_eq!(default_table_name("OrderItem"), "order_item");
        assert_eq!(default_table_name("HTTPLog"), "http_log");
        assert_eq!(default_table_name("crate::Wrapper<app::Inner>"), "wrapper");
        assert_eq!(default_table_name("Account2Fa"), "account2_fa");
    }

    #[test]
    fn test_table_options() {
        let options = TableOptions::named("user").with_migrate();
        assert_eq!(options.name.as_deref(), Some("user"));
        assert!(options.migrate);
    }
}

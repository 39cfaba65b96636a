//! ClickHouse merge-tree maintenance.

use crate::db::{Chain, DbContext};
use crate::error::DbResult;
use crate::models::Statement;
use tracing::info;

/// Maintenance operations for merge-tree (ClickHouse) tables.
#[derive(Debug, Clone)]
pub struct MergeTreeSet {
    context: DbContext,
    table_name: String,
    chain: Chain,
}

impl MergeTreeSet {
    pub(crate) fn new(context: DbContext, table_name: String, chain: Chain) -> Self {
        Self {
            context,
            table_name,
            chain,
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Force an unscheduled merge of every part. Fails with a query error
    /// on engines without merge trees.
    pub async fn optimize_final(&self) -> DbResult<u64> {
        let sql = self.context.dialect().optimize_final_sql(&self.table_name)?;
        let affected = self
            .context
            .original(&self.chain)
            .await?
            .execute(&Statement::raw(sql))
            .await?;
        info!(table = %self.table_name, "Optimized table");
        Ok(affected)
    }
}

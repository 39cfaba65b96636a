use crate::db::Chain;
use crate::error::{DbError, DbResult};
use crate::models::{PageList, Value};
use crate::query::{TableQuery, TableRow, TableSet};
use crate::repository::Repository;
use async_trait::async_trait;
use std::marker::PhantomData;

/// [`Repository`] backed by a [`TableSet`] of row shape `P`.
///
/// Domain objects convert with `From` in both directions.
pub struct DefaultRepository<P, D> {
    table: TableSet<P>,
    primary_key: String,
    _domain: PhantomData<fn() -> D>,
}

impl<P: TableRow, D> DefaultRepository<P, D> {
    /// Fails with a query error when the row shape has no primary key.
    pub fn new(table: TableSet<P>) -> DbResult<Self> {
        let primary_key = table.primary_keys().first().cloned().ok_or_else(|| {
            DbError::query(format!(
                "table '{}' has no primary key for a repository",
                table.table_name()
            ))
        })?;
        Ok(Self {
            table,
            primary_key,
            _domain: PhantomData,
        })
    }

    pub fn table(&self) -> &TableSet<P> {
        &self.table
    }

    fn by_id(&self, chain: &Chain, id: Value) -> TableQuery<P> {
        self.table.query(chain).where_eq(&self.primary_key, id)
    }
}

impl<P, D> std::fmt::Debug for DefaultRepository<P, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultRepository")
            .field("table", &self.table)
            .field("primary_key", &self.primary_key)
            .finish()
    }
}

#[async_trait]
impl<P, D> Repository<D> for DefaultRepository<P, D>
where
    P: TableRow + From<D>,
    D: From<P> + Clone + Send + Sync + 'static,
{
    async fn to_entity(&self, chain: &Chain, id: Value) -> DbResult<D> {
        Ok(self.by_id(chain, id).to_entity().await?.into())
    }

    async fn add(&self, chain: &Chain, entity: &D) -> DbResult<u64> {
        let row = P::from(entity.clone());
        self.table.query(chain).insert(&row).await
    }

    async fn add_list(&self, chain: &Chain, entities: &[D], batch_size: usize) -> DbResult<u64> {
        let rows: Vec<P> = entities.iter().cloned().map(P::from).collect();
        self.table.query(chain).insert_list(&rows, batch_size).await
    }

    async fn add_ignore_list(
        &self,
        chain: &Chain,
        entities: &[D],
        batch_size: usize,
    ) -> DbResult<u64> {
        let rows: Vec<P> = entities.iter().cloned().map(P::from).collect();
        self.table
            .query(chain)
            .insert_ignore_list(&rows, batch_size)
            .await
    }

    async fn to_list(&self, chain: &Chain) -> DbResult<Vec<D>> {
        let rows = self.table.query(chain).to_list().await?;
        Ok(rows.into_iter().map(D::from).collect())
    }

    async fn to_page_list(
        &self,
        chain: &Chain,
        page_size: u64,
        page_index: u64,
    ) -> DbResult<PageList<D>> {
        let page = self
            .table
            .query(chain)
            .desc(&self.primary_key)
            .to_page_list(page_size, page_index)
            .await?;
        Ok(page.map(D::from))
    }

    async fn count(&self, chain: &Chain) -> DbResult<i64> {
        self.table.query(chain).count().await
    }

    async fn update(&self, chain: &Chain, id: Value, entity: &D) -> DbResult<u64> {
        let row = P::from(entity.clone());
        self.by_id(chain, id).update(&row).await
    }

    async fn delete(&self, chain: &Chain, id: Value) -> DbResult<u64> {
        if id.is_null() {
            return Err(DbError::query("repository delete requires an id"));
        }
        self.by_id(chain, id).delete().await
    }

    async fn is_exists(&self, chain: &Chain, id: Value) -> DbResult<bool> {
        self.by_id(chain, id).is_exists().await
    }
}

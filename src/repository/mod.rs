//! CRUD facade over a table, mapping domain objects to and from row shapes.

mod default;
mod registry;

pub use default::DefaultRepository;
pub use registry::Repositories;

use crate::db::Chain;
use crate::error::DbResult;
use crate::models::{PageList, Value};
use async_trait::async_trait;

/// Storage operations for domain objects of type `D`.
///
/// Every call runs on `chain`, so repositories take part in the chain's open
/// transactions.
#[async_trait]
pub trait Repository<D>: Send + Sync {
    /// Object with primary key `id`, or the default object when missing.
    async fn to_entity(&self, chain: &Chain, id: Value) -> DbResult<D>;

    async fn add(&self, chain: &Chain, entity: &D) -> DbResult<u64>;

    async fn add_list(&self, chain: &Chain, entities: &[D], batch_size: usize) -> DbResult<u64>;

    async fn add_ignore_list(
        &self,
        chain: &Chain,
        entities: &[D],
        batch_size: usize,
    ) -> DbResult<u64>;

    async fn to_list(&self, chain: &Chain) -> DbResult<Vec<D>>;

    /// One page ordered by primary key, newest first.
    async fn to_page_list(
        &self,
        chain: &Chain,
        page_size: u64,
        page_index: u64,
    ) -> DbResult<PageList<D>>;

    async fn count(&self, chain: &Chain) -> DbResult<i64>;

    async fn update(&self, chain: &Chain, id: Value, entity: &D) -> DbResult<u64>;

    async fn delete(&self, chain: &Chain, id: Value) -> DbResult<u64>;

    async fn is_exists(&self, chain: &Chain, id: Value) -> DbResult<bool>;
}

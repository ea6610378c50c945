use crate::{db::DatabaseAccess, errors::ServiceError};
use async_trait::async_trait;

pub mod order_queries;
pub mod product_queries;

/// Trait representing a generic asynchronous read-only query.
#[async_trait]
pub trait Query: Send + Sync {
    type Result: Send + Sync;

    /// Executes the query using the provided database access wrapper
    async fn execute(&self, db: &DatabaseAccess) -> Result<Self::Result, ServiceError>;
}

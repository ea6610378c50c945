pub mod orders;
pub mod products;
pub mod status_history;
pub mod stock_ledger;

use crate::db::DbPool;
use std::sync::Arc;

/// Services shared by every request handler.
#[derive(Clone)]
pub struct AppServices {
    pub orders: orders::OrderService,
    pub products: products::ProductService,
}

impl AppServices {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            orders: orders::OrderService::new(db_pool.clone()),
            products: products::ProductService::new(db_pool),
        }
    }
}

use async_trait::async_trait;
use sea_orm::{sea_query::Expr, EntityTrait, QueryFilter, QueryOrder};
use tracing::{debug, instrument};

use super::Query;
use crate::{
    db::DatabaseAccess,
    entities::product::{self, Entity as Product},
    errors::ServiceError,
};

/// All products ordered by id.
#[derive(Debug, Clone, Default)]
pub struct ListProductsQuery;

#[async_trait]
impl Query for ListProductsQuery {
    type Result = Vec<product::Model>;

    #[instrument(skip(self, db))]
    async fn execute(&self, db: &DatabaseAccess) -> Result<Self::Result, ServiceError> {
        debug!("Executing ListProductsQuery");
        db.execute("list_products", |pool| {
            Product::find()
                .order_by_asc(product::Column::Id)
                .all(pool)
        })
        .await
    }
}

#[derive(Debug, Clone)]
pub struct GetProductQuery {
    pub product_id: i32,
}

#[async_trait]
impl Query for GetProductQuery {
    type Result = product::Model;

    #[instrument(skip(self, db), fields(product_id = self.product_id))]
    async fn execute(&self, db: &DatabaseAccess) -> Result<Self::Result, ServiceError> {
        let product_id = self.product_id;
        db.execute("get_product", |pool| Product::find_by_id(product_id).one(pool))
            .await?
            .ok_or_else(|| ServiceError::product_not_found(product_id))
    }
}

/// Products whose on-hand quantity has fallen to or below their reorder
/// threshold, ordered by id.
#[derive(Debug, Clone, Default)]
pub struct LowStockProductsQuery;

#[async_trait]
impl Query for LowStockProductsQuery {
    type Result = Vec<product::Model>;

    #[instrument(skip(self, db))]
    async fn execute(&self, db: &DatabaseAccess) -> Result<Self::Result, ServiceError> {
        debug!("Executing LowStockProductsQuery");
        db.execute("list_low_stock_products", |pool| {
            Product::find()
                .filter(
                    Expr::col(product::Column::QuantityOnHand)
                        .lte(Expr::col(product::Column::ReorderThreshold)),
                )
                .order_by_asc(product::Column::Id)
                .all(pool)
        })
        .await
    }
}

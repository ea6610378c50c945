use async_trait::async_trait;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, LoaderTrait, QueryFilter, QueryOrder, QueryTrait,
};
use std::collections::HashMap;
use tracing::{debug, instrument};

use super::Query;
use crate::{
    db::DatabaseAccess,
    entities::{
        order::{self, Entity as Order},
        order_item::{self, Entity as OrderItem},
        product::{self, Entity as Product},
        status_history, OrderStatus,
    },
    errors::ServiceError,
    services::status_history::StatusHistoryLog,
};

/// An order line together with the product it references.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub item: order_item::Model,
    pub product: Option<product::Model>,
}

/// Everything the detail view shows for one order.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDetails {
    pub order: order::Model,
    pub items: Vec<OrderLine>,
    pub history: Vec<status_history::Model>,
}

/// An order with its lines, as returned by listings.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderSummary {
    pub order: order::Model,
    pub items: Vec<order_item::Model>,
}

/// Loads an order with its lines (products attached) and its history.
///
/// Generic over the connection so the lifecycle engine can read back what it
/// just wrote before committing.
pub async fn load_order_details<C: ConnectionTrait>(
    conn: &C,
    order_id: i32,
) -> Result<OrderDetails, ServiceError> {
    let order = Order::find_by_id(order_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::order_not_found(order_id))?;

    let items = OrderItem::find()
        .filter(order_item::Column::OrderId.eq(order_id))
        .order_by_asc(order_item::Column::Id)
        .all(conn)
        .await?;

    let product_ids: Vec<i32> = items.iter().map(|i| i.product_id).collect();
    let products: HashMap<i32, product::Model> = Product::find()
        .filter(product::Column::Id.is_in(product_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let items = items
        .into_iter()
        .map(|item| {
            // a product may back several lines of the same order
            let product = products.get(&item.product_id).cloned();
            OrderLine { item, product }
        })
        .collect();

    let history = StatusHistoryLog::list_for(conn, order_id).await?;

    Ok(OrderDetails {
        order,
        items,
        history,
    })
}

/// Lists orders, newest first, optionally restricted to one status.
#[derive(Debug, Clone, Default)]
pub struct ListOrdersQuery {
    pub status: Option<OrderStatus>,
}

#[async_trait]
impl Query for ListOrdersQuery {
    type Result = Vec<OrderSummary>;

    #[instrument(skip(self, db), fields(status = ?self.status))]
    async fn execute(&self, db: &DatabaseAccess) -> Result<Self::Result, ServiceError> {
        debug!("Executing ListOrdersQuery");
        let status = self.status;

        let orders = db
            .execute("list_orders", |pool| {
                Order::find()
                    .apply_if(status, |q, s| q.filter(order::Column::Status.eq(s)))
                    .order_by_desc(order::Column::CreatedAt)
                    .order_by_desc(order::Column::Id)
                    .all(pool)
            })
            .await?;

        let items = orders.load_many(OrderItem, db.get_pool()).await?;

        Ok(orders
            .into_iter()
            .zip(items)
            .map(|(order, mut items)| {
                items.sort_by_key(|i| i.id);
                OrderSummary { order, items }
            })
            .collect())
    }
}

/// Fetches a single order with lines, products and history.
#[derive(Debug, Clone)]
pub struct GetOrderQuery {
    pub order_id: i32,
}

#[async_trait]
impl Query for GetOrderQuery {
    type Result = OrderDetails;

    #[instrument(skip(self, db), fields(order_id = self.order_id))]
    async fn execute(&self, db: &DatabaseAccess) -> Result<Self::Result, ServiceError> {
        debug!("Executing GetOrderQuery");
        load_order_details(db.get_pool(), self.order_id).await
    }
}

/// Status history for one order, oldest first.
#[derive(Debug, Clone)]
pub struct GetOrderHistoryQuery {
    pub order_id: i32,
}

#[async_trait]
impl Query for GetOrderHistoryQuery {
    type Result = Vec<status_history::Model>;

    #[instrument(skip(self, db), fields(order_id = self.order_id))]
    async fn execute(&self, db: &DatabaseAccess) -> Result<Self::Result, ServiceError> {
        debug!("Executing GetOrderHistoryQuery");
        StatusHistoryLog::list_for_existing(db.get_pool(), self.order_id).await
    }
}

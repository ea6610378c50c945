use std::sync::Arc;

use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, DatabaseTransaction, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use crate::{
    db::DbPool,
    entities::{
        order::{self, Entity as Order},
        order_item, OrderStatus,
    },
    errors::ServiceError,
    queries::order_queries::{load_order_details, OrderDetails},
    services::{status_history::StatusHistoryLog, stock_ledger::StockLedger},
};

const CREATED_NOTE: &str = "Order created";

/// Request to place a new order.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    #[validate(
        length(
            min = 1,
            max = 200,
            message = "Customer name must be between 1 and 200 characters."
        ),
        custom = "validate_not_blank"
    )]
    #[schema(example = "Riverside Pharmacy")]
    pub customer_name: String,

    /// Lines are reserved in the order given
    #[serde(default)]
    #[validate(
        length(min = 1, message = "An order must contain at least one item."),
        custom = "validate_lines"
    )]
    pub items: Vec<OrderLineRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineRequest {
    #[schema(example = 4)]
    pub product_id: i32,
    #[schema(example = 10)]
    pub quantity: i32,
}

/// Request to move an order to its next status.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdvanceStatusRequest {
    #[validate(length(max = 500, message = "Note cannot exceed 500 characters."))]
    #[schema(example = "Picked and packed")]
    pub note: Option<String>,
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Customer name is required.".into());
        return Err(err);
    }
    Ok(())
}

fn validate_lines(items: &[OrderLineRequest]) -> Result<(), ValidationError> {
    if items.iter().any(|line| line.quantity < 1) {
        let mut err = ValidationError::new("quantity");
        err.message = Some("Each item quantity must be at least 1.".into());
        return Err(err);
    }
    Ok(())
}

/// Creates orders against the stock ledger and walks them through the
/// fulfillment lifecycle.
#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
}

impl OrderService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Places an order.
    ///
    /// Every line is reserved, then the order, its lines and the initial
    /// history entry are written, all in one transaction. The first failing
    /// line aborts the whole order and rolls back every reservation made
    /// before it.
    #[instrument(skip(self, request), fields(customer_name = %request.customer_name, lines = request.items.len()))]
    pub async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<OrderDetails, ServiceError> {
        request.validate()?;

        let db = &*self.db_pool;
        let now = Utc::now();

        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for order creation");
            ServiceError::DatabaseError(e)
        })?;

        let details = match Self::place_order(&txn, &request, now).await {
            Ok(details) => details,
            Err(e) => {
                warn!(error = %e, "Order creation aborted; rolling back");
                counter!("inventory_orders.create_failed", 1, "code" => e.error_code());
                if let Err(rollback_err) = txn.rollback().await {
                    error!(error = %rollback_err, "Failed to roll back order creation");
                }
                return Err(e);
            }
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id = details.order.id, "Failed to commit order creation transaction");
            ServiceError::DatabaseError(e)
        })?;

        counter!("inventory_orders.created", 1);
        info!(order_id = details.order.id, "Order created successfully");

        Ok(details)
    }

    async fn place_order(
        txn: &DatabaseTransaction,
        request: &CreateOrderRequest,
        now: DateTime<Utc>,
    ) -> Result<OrderDetails, ServiceError> {
        for line in &request.items {
            StockLedger::reserve(txn, line.product_id, line.quantity, now).await?;
        }

        let order = order::ActiveModel {
            customer_name: Set(request.customer_name.trim().to_string()),
            status: Set(OrderStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        for line in &request.items {
            order_item::ActiveModel {
                order_id: Set(order.id),
                product_id: Set(line.product_id),
                quantity: Set(line.quantity),
                ..Default::default()
            }
            .insert(txn)
            .await?;
        }

        StatusHistoryLog::append(
            txn,
            order.id,
            OrderStatus::Pending,
            OrderStatus::Pending,
            now,
            Some(CREATED_NOTE.to_string()),
        )
        .await?;

        load_order_details(txn, order.id).await
    }

    /// Moves an order exactly one step along the lifecycle and records the
    /// transition.
    ///
    /// The current status is read before the transaction opens, and the
    /// transaction starts with a status write conditional on that read. Two
    /// concurrent advances of the same order cannot both apply the same step;
    /// the loser matches no row and gets `ConcurrentModification`.
    #[instrument(skip(self, request))]
    pub async fn advance_status(
        &self,
        order_id: i32,
        request: AdvanceStatusRequest,
    ) -> Result<OrderDetails, ServiceError> {
        request.validate()?;
        let note = request
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let db = &*self.db_pool;

        let current = Order::find_by_id(order_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::order_not_found(order_id))?
            .status;
        let next = current.next().ok_or_else(|| {
            warn!(order_id, "Attempt to advance a delivered order");
            ServiceError::AlreadyDelivered(order_id)
        })?;

        let now = Utc::now();
        let txn = db.begin().await.map_err(|e| {
            error!(error = %e, "Failed to start transaction for status advance");
            ServiceError::DatabaseError(e)
        })?;

        let details = match Self::apply_advance(&txn, order_id, current, next, note, now).await {
            Ok(details) => details,
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    error!(error = %rollback_err, "Failed to roll back status advance");
                }
                return Err(e);
            }
        };

        txn.commit().await.map_err(|e| {
            error!(error = %e, order_id, "Failed to commit status advance");
            ServiceError::DatabaseError(e)
        })?;

        counter!("inventory_orders.status_advanced", 1, "to" => next.to_string());
        info!(
            order_id,
            from = %current,
            to = %next,
            "Order status advanced"
        );

        Ok(details)
    }

    async fn apply_advance(
        txn: &DatabaseTransaction,
        order_id: i32,
        current: OrderStatus,
        next: OrderStatus,
        note: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<OrderDetails, ServiceError> {
        // First statement of the transaction: on SQLite it takes the write
        // lock directly instead of upgrading from a read lock.
        let result = Order::update_many()
            .col_expr(order::Column::Status, Expr::value(next))
            .col_expr(order::Column::UpdatedAt, Expr::value(now))
            .filter(order::Column::Id.eq(order_id))
            .filter(order::Column::Status.eq(current))
            .exec(txn)
            .await?;

        if result.rows_affected == 0 {
            warn!(order_id, status = %current, "Order status changed underneath advance");
            counter!("inventory_orders.advance_conflicts", 1);
            return Err(ServiceError::ConcurrentModification(order_id));
        }

        StatusHistoryLog::append(txn, order_id, current, next, now, note).await?;

        load_order_details(txn, order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{establish_connection_with_config, run_migrations, DbConfig};
    use assert_matches::assert_matches;
    use rstest::rstest;

    async fn service() -> OrderService {
        let pool = establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            ..Default::default()
        })
        .await
        .unwrap();
        run_migrations(&pool).await.unwrap();
        OrderService::new(Arc::new(pool))
    }

    fn line(product_id: i32, quantity: i32) -> OrderLineRequest {
        OrderLineRequest {
            product_id,
            quantity,
        }
    }

    #[test]
    fn valid_request_passes() {
        let request = CreateOrderRequest {
            customer_name: "Riverside Pharmacy".into(),
            items: vec![line(1, 2), line(4, 1)],
        };
        assert!(request.validate().is_ok());
    }

    #[rstest]
    #[case::empty_name("", vec![line(1, 1)], "customer_name")]
    #[case::blank_name("   ", vec![line(1, 1)], "customer_name")]
    #[case::no_items("Clinic", vec![], "items")]
    #[case::zero_quantity("Clinic", vec![line(1, 0)], "items")]
    #[case::negative_quantity("Clinic", vec![line(1, 2), line(2, -3)], "items")]
    fn invalid_requests_are_rejected(
        #[case] customer_name: &str,
        #[case] items: Vec<OrderLineRequest>,
        #[case] field: &str,
    ) {
        let request = CreateOrderRequest {
            customer_name: customer_name.to_string(),
            items,
        };
        let errors = request.validate().unwrap_err();
        assert!(
            errors.field_errors().contains_key(field),
            "expected error on {field}, got {errors:?}"
        );
    }

    #[test]
    fn overlong_customer_name_is_rejected() {
        let request = CreateOrderRequest {
            customer_name: "x".repeat(201),
            items: vec![line(1, 1)],
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn note_length_is_bounded() {
        let ok = AdvanceStatusRequest {
            note: Some("n".repeat(500)),
        };
        let too_long = AdvanceStatusRequest {
            note: Some("n".repeat(501)),
        };
        assert!(ok.validate().is_ok());
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn request_uses_camel_case_json() {
        let request: CreateOrderRequest = serde_json::from_str(
            r#"{"customerName":"Clinic","items":[{"productId":3,"quantity":2}]}"#,
        )
        .unwrap();
        assert_eq!(request.customer_name, "Clinic");
        assert_eq!(request.items, vec![line(3, 2)]);
    }

    #[tokio::test]
    async fn stale_advance_is_a_concurrent_modification() {
        let orders = service().await;
        let placed = orders
            .create_order(CreateOrderRequest {
                customer_name: "Clinic".into(),
                items: vec![line(1, 1)],
            })
            .await
            .unwrap();
        let order_id = placed.order.id;
        assert_eq!(placed.history[0].note.as_deref(), Some(CREATED_NOTE));

        orders
            .advance_status(order_id, AdvanceStatusRequest::default())
            .await
            .unwrap();

        // A writer that still believes the order is Pending loses.
        let txn = orders.db_pool.begin().await.unwrap();
        let err = OrderService::apply_advance(
            &txn,
            order_id,
            OrderStatus::Pending,
            OrderStatus::Processing,
            None,
            Utc::now(),
        )
        .await
        .unwrap_err();
        txn.rollback().await.unwrap();

        assert_matches!(err, ServiceError::ConcurrentModification(id) if id == order_id);
        assert_eq!(err.error_code(), "CONCURRENT_MODIFICATION");

        let details = orders
            .advance_status(order_id, AdvanceStatusRequest::default())
            .await
            .unwrap();
        assert_eq!(details.order.status, OrderStatus::Shipped);
        assert_eq!(details.history.len(), 3);
    }
}

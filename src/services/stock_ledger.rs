use crate::{
    entities::product::{self, Entity as Product},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{sea_query::Expr, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter};
use tracing::{debug, instrument, warn};

/// Authoritative on-hand quantities.
///
/// A reservation is a single conditional `UPDATE` that only matches while
/// enough stock remains, so two transactions racing for the last unit cannot
/// both succeed: the database serialises the row write and the loser matches
/// zero rows.
pub struct StockLedger;

impl StockLedger {
    /// Decrements `product_id` by `quantity` inside the caller's transaction.
    ///
    /// Never commits. On failure the caller is expected to roll back, which
    /// also undoes any earlier reservations made in the same transaction.
    #[instrument(skip(txn))]
    pub async fn reserve(
        txn: &DatabaseTransaction,
        product_id: i32,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        if quantity <= 0 {
            return Err(ServiceError::invalid_field(
                "quantity",
                "Quantity must be at least 1.",
            ));
        }

        // A product that looked sufficient on re-read gets one more attempt,
        // so the shortfall reported is one the conditional write agreed with.
        let mut retried = false;
        loop {
            if Self::try_decrement(txn, product_id, quantity, now).await? {
                debug!(retried, "Stock reserved");
                counter!("inventory_stock.reserved_units", quantity as u64);
                return Ok(());
            }

            // Nothing matched: either the product is unknown or it is short.
            let product = Product::find_by_id(product_id)
                .one(txn)
                .await?
                .ok_or(ServiceError::ProductNotFound(product_id))?;

            if product.quantity_on_hand >= quantity && !retried {
                debug!(
                    available = product.quantity_on_hand,
                    "Stock changed between write and re-read; retrying"
                );
                retried = true;
                continue;
            }

            warn!(
                product_name = %product.name,
                available = product.quantity_on_hand,
                "Reservation rejected for insufficient stock"
            );
            counter!("inventory_stock.reservation_rejected", 1);

            return Err(ServiceError::InsufficientStock {
                product_id,
                product_name: product.name,
                available: product.quantity_on_hand,
                requested: quantity,
            });
        }
    }

    /// Conditional decrement; `false` when no row had enough stock.
    async fn try_decrement(
        txn: &DatabaseTransaction,
        product_id: i32,
        quantity: i32,
        now: DateTime<Utc>,
    ) -> Result<bool, ServiceError> {
        let result = Product::update_many()
            .col_expr(
                product::Column::QuantityOnHand,
                Expr::col(product::Column::QuantityOnHand).sub(quantity),
            )
            .col_expr(product::Column::UpdatedAt, Expr::value(now))
            .filter(product::Column::Id.eq(product_id))
            .filter(product::Column::QuantityOnHand.gte(quantity))
            .exec(txn)
            .await?;

        Ok(result.rows_affected > 0)
    }
}

use crate::{
    entities::{
        order,
        status_history::{self, Entity as StatusHistory},
        OrderStatus,
    },
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, instrument};

/// Append-only audit trail of order status transitions.
///
/// Entries are written once, inside the same transaction as the transition
/// they record.
pub struct StatusHistoryLog;

impl StatusHistoryLog {
    #[instrument(skip(conn, note))]
    pub async fn append<C: ConnectionTrait>(
        conn: &C,
        order_id: i32,
        old_status: OrderStatus,
        new_status: OrderStatus,
        changed_at: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<status_history::Model, ServiceError> {
        let entry = status_history::ActiveModel {
            order_id: Set(order_id),
            old_status: Set(old_status),
            new_status: Set(new_status),
            changed_at: Set(changed_at),
            note: Set(note),
            ..Default::default()
        };

        let saved = entry.insert(conn).await?;
        debug!(history_id = saved.id, "Status history entry appended");
        Ok(saved)
    }

    /// Entries for one order, oldest first. Ties on `changed_at` fall back to
    /// insertion order.
    pub async fn list_for<C: ConnectionTrait>(
        conn: &C,
        order_id: i32,
    ) -> Result<Vec<status_history::Model>, ServiceError> {
        let entries = StatusHistory::find()
            .filter(status_history::Column::OrderId.eq(order_id))
            .order_by_asc(status_history::Column::ChangedAt)
            .order_by_asc(status_history::Column::Id)
            .all(conn)
            .await?;
        Ok(entries)
    }

    /// Like [`list_for`](Self::list_for), but an unknown order is reported as
    /// `NotFound` instead of an empty list.
    #[instrument(skip(conn))]
    pub async fn list_for_existing<C: ConnectionTrait>(
        conn: &C,
        order_id: i32,
    ) -> Result<Vec<status_history::Model>, ServiceError> {
        order::Entity::find_by_id(order_id)
            .one(conn)
            .await?
            .ok_or_else(|| ServiceError::order_not_found(order_id))?;

        Self::list_for(conn, order_id).await
    }
}

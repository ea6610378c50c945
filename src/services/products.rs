use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    db::DbPool,
    entities::{
        order_item,
        product::{self, Entity as Product},
    },
    errors::ServiceError,
};

/// Body for both creating and updating a product.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductRequest {
    #[serde(default)]
    #[validate(length(
        min = 1,
        max = 200,
        message = "Name must be between 1 and 200 characters."
    ))]
    #[schema(example = "Omeprazole 20mg")]
    pub name: String,

    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "SKU must be between 1 and 50 characters."))]
    #[schema(example = "OMP-020")]
    pub sku: String,

    #[serde(default)]
    #[validate(range(min = 0, message = "Quantity on hand cannot be negative."))]
    pub quantity_on_hand: i32,

    #[serde(default)]
    #[validate(range(min = 0, message = "Reorder threshold cannot be negative."))]
    pub reorder_threshold: i32,
}

/// Catalogue maintenance. Stock decrements go through the stock ledger,
/// never through here.
#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn create_product(
        &self,
        request: ProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;
        let sku = request.sku.trim().to_string();

        self.ensure_sku_free(&sku).await?;

        let now = Utc::now();
        let created = product::ActiveModel {
            name: Set(request.name.trim().to_string()),
            sku: Set(sku.clone()),
            quantity_on_hand: Set(request.quantity_on_hand),
            reorder_threshold: Set(request.reorder_threshold),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .map_err(|e| map_unique_violation(e, &sku))?;

        info!(product_id = created.id, "Product created");
        Ok(created)
    }

    /// Updates name, quantities and threshold. The SKU is the product's
    /// business key and must be sent unchanged.
    #[instrument(skip(self, request), fields(sku = %request.sku))]
    pub async fn update_product(
        &self,
        product_id: i32,
        request: ProductRequest,
    ) -> Result<product::Model, ServiceError> {
        request.validate()?;
        let db = &*self.db_pool;

        let existing = Product::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::product_not_found(product_id))?;

        if request.sku.trim() != existing.sku {
            warn!(product_id, current = %existing.sku, "Rejected attempt to change SKU");
            return Err(ServiceError::invalid_field(
                "sku",
                format!(
                    "SKU cannot be changed once a product is created (current: '{}').",
                    existing.sku
                ),
            ));
        }

        let mut active: product::ActiveModel = existing.into();
        active.name = Set(request.name.trim().to_string());
        active.quantity_on_hand = Set(request.quantity_on_hand);
        active.reorder_threshold = Set(request.reorder_threshold);
        active.updated_at = Set(Utc::now());

        let updated = active.update(db).await?;

        info!(product_id, "Product updated");
        Ok(updated)
    }

    /// Deletes a product that no order line references.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, product_id: i32) -> Result<(), ServiceError> {
        let db = &*self.db_pool;

        Product::find_by_id(product_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::product_not_found(product_id))?;

        let references = order_item::Entity::find()
            .filter(order_item::Column::ProductId.eq(product_id))
            .count(db)
            .await?;
        if references > 0 {
            warn!(product_id, references, "Refusing to delete referenced product");
            return Err(ServiceError::ProductInUse(product_id));
        }

        Product::delete_by_id(product_id).exec(db).await?;
        info!(product_id, "Product deleted");
        Ok(())
    }

    async fn ensure_sku_free(&self, sku: &str) -> Result<(), ServiceError> {
        let clash = Product::find()
            .filter(product::Column::Sku.eq(sku))
            .one(&*self.db_pool)
            .await?;

        match clash {
            Some(_) => Err(ServiceError::DuplicateSku(sku.to_string())),
            None => Ok(()),
        }
    }
}

/// A racing insert can still trip the unique index after the pre-check.
fn map_unique_violation(err: DbErr, sku: &str) -> ServiceError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => ServiceError::DuplicateSku(sku.to_string()),
        _ => ServiceError::DatabaseError(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str, sku: &str, on_hand: i32, threshold: i32) -> ProductRequest {
        ProductRequest {
            name: name.into(),
            sku: sku.into(),
            quantity_on_hand: on_hand,
            reorder_threshold: threshold,
        }
    }

    #[test]
    fn valid_product_passes() {
        assert!(request("Cetirizine 10mg", "CET-010", 40, 10)
            .validate()
            .is_ok());
    }

    #[test]
    fn invalid_products_report_each_field() {
        let errors = request("", &"S".repeat(51), -1, -5).validate().unwrap_err();
        let fields = errors.field_errors();
        for field in ["name", "sku", "quantity_on_hand", "reorder_threshold"] {
            assert!(fields.contains_key(field), "missing error for {field}");
        }
    }

    #[test]
    fn product_request_reads_camel_case() {
        let parsed: ProductRequest = serde_json::from_str(
            r#"{"name":"A","sku":"B","quantityOnHand":3,"reorderThreshold":1}"#,
        )
        .unwrap();
        assert_eq!(parsed.quantity_on_hand, 3);
        assert_eq!(parsed.reorder_threshold, 1);
    }
}

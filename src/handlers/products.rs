use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::common::{created_response, no_content_response, validated_json};
use crate::{
    entities::product,
    errors::ServiceError,
    queries::{
        product_queries::{GetProductQuery, ListProductsQuery, LowStockProductsQuery},
        Query,
    },
    services::products::ProductRequest,
    AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: i32,
    pub name: String,
    pub sku: String,
    pub quantity_on_hand: i32,
    pub reorder_threshold: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<product::Model> for ProductResponse {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            sku: model.sku,
            quantity_on_hand: model.quantity_on_hand,
            reorder_threshold: model.reorder_threshold,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

fn into_responses(models: Vec<product::Model>) -> Vec<ProductResponse> {
    models.into_iter().map(ProductResponse::from).collect()
}

#[utoipa::path(
    get,
    path = "/api/products",
    summary = "List products",
    responses(
        (status = 200, description = "All products, ordered by id", body = [ProductResponse]),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn list_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, ServiceError> {
    let products = ListProductsQuery.execute(&state.db_access()).await?;
    Ok(Json(into_responses(products)))
}

#[utoipa::path(
    get,
    path = "/api/products/low-stock",
    summary = "List low-stock products",
    description = "Products whose quantity on hand is at or below their reorder threshold",
    responses(
        (status = 200, description = "Low-stock products", body = [ProductResponse]),
        (status = 500, description = "Internal server error", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn list_low_stock(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductResponse>>, ServiceError> {
    let products = LowStockProductsQuery.execute(&state.db_access()).await?;
    Ok(Json(into_responses(products)))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    summary = "Get product",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<ProductResponse>, ServiceError> {
    let Path(product_id) = path?;
    let product = GetProductQuery { product_id }
        .execute(&state.db_access())
        .await?;
    Ok(Json(product.into()))
}

#[utoipa::path(
    post,
    path = "/api/products",
    summary = "Create product",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse,
            headers(("Location" = String, description = "URL of the new product"))
        ),
        (status = 400, description = "Validation failed", body = crate::errors::ErrorResponse),
        (status = 409, description = "SKU already in use", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let request = validated_json(body)?;
    let product = state.services.products.create_product(request).await?;
    let location = format!("/api/products/{}", product.id);
    Ok(created_response(location, ProductResponse::from(product)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    summary = "Update product",
    description = "Replaces name, quantity on hand and reorder threshold. The SKU must match the stored one.",
    params(("id" = i32, Path, description = "Product id")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Validation failed or SKU changed", body = crate::errors::ErrorResponse),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> Result<Json<ProductResponse>, ServiceError> {
    let Path(product_id) = path?;
    let request = validated_json(body)?;
    let product = state
        .services
        .products
        .update_product(product_id, request)
        .await?;
    Ok(Json(product.into()))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    summary = "Delete product",
    params(("id" = i32, Path, description = "Product id")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Product not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Product is referenced by orders", body = crate::errors::ErrorResponse),
    ),
    tag = "products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Response, ServiceError> {
    let Path(product_id) = path?;
    state.services.products.delete_product(product_id).await?;
    Ok(no_content_response())
}

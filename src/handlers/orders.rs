use std::str::FromStr;

use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query as QueryParams, State,
    },
    response::Response,
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use super::{
    common::{created_response, optional_json, validated_json},
    products::ProductResponse,
};
use crate::{
    entities::{order, order_item, status_history, OrderStatus},
    errors::ServiceError,
    queries::{
        order_queries::{
            GetOrderHistoryQuery, GetOrderQuery, ListOrdersQuery, OrderDetails, OrderLine,
            OrderSummary,
        },
        Query,
    },
    services::orders::{AdvanceStatusRequest, CreateOrderRequest},
    AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub id: i32,
    pub order_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<ProductResponse>,
}

impl From<order_item::Model> for OrderItemResponse {
    fn from(item: order_item::Model) -> Self {
        Self {
            id: item.id,
            order_id: item.order_id,
            product_id: item.product_id,
            quantity: item.quantity,
            product: None,
        }
    }
}

impl From<OrderLine> for OrderItemResponse {
    fn from(line: OrderLine) -> Self {
        Self {
            product: line.product.map(ProductResponse::from),
            ..Self::from(line.item)
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusHistoryResponse {
    pub id: i32,
    pub order_id: i32,
    pub old_status: OrderStatus,
    pub new_status: OrderStatus,
    pub changed_at: DateTime<Utc>,
    pub note: Option<String>,
}

impl From<status_history::Model> for StatusHistoryResponse {
    fn from(entry: status_history::Model) -> Self {
        Self {
            id: entry.id,
            order_id: entry.order_id,
            old_status: entry.old_status,
            new_status: entry.new_status,
            changed_at: entry.changed_at,
            note: entry.note,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: i32,
    pub customer_name: String,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderItemResponse>,
    /// Present on single-order responses, omitted from listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_history: Option<Vec<StatusHistoryResponse>>,
}

impl OrderResponse {
    fn from_parts(
        order: order::Model,
        items: Vec<OrderItemResponse>,
        status_history: Option<Vec<StatusHistoryResponse>>,
    ) -> Self {
        Self {
            id: order.id,
            customer_name: order.customer_name,
            status: order.status,
            created_at: order.created_at,
            updated_at: order.updated_at,
            items,
            status_history,
        }
    }
}

impl From<OrderDetails> for OrderResponse {
    fn from(details: OrderDetails) -> Self {
        let items = details.items.into_iter().map(Into::into).collect();
        let history = details.history.into_iter().map(Into::into).collect();
        Self::from_parts(details.order, items, Some(history))
    }
}

impl From<OrderSummary> for OrderResponse {
    fn from(summary: OrderSummary) -> Self {
        let items = summary.items.into_iter().map(Into::into).collect();
        Self::from_parts(summary.order, items, None)
    }
}

/// Query string for order listings.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListOrdersParams {
    /// One of Pending, Processing, Shipped, Delivered (case-insensitive)
    pub status: Option<String>,
}

impl ListOrdersParams {
    fn status_filter(&self) -> Result<Option<OrderStatus>, ServiceError> {
        match self.status.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(raw) => OrderStatus::from_str(raw).map(Some).map_err(|_| {
                ServiceError::invalid_field(
                    "status",
                    format!(
                        "'{}' is not a valid order status. Expected one of Pending, Processing, Shipped, Delivered.",
                        raw
                    ),
                )
            }),
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/orders",
    summary = "List orders",
    description = "Orders with their lines, newest first. Optionally filtered by status.",
    params(ListOrdersParams),
    responses(
        (status = 200, description = "Orders", body = [OrderResponse]),
        (status = 400, description = "Unknown status filter", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    params: Result<QueryParams<ListOrdersParams>, QueryRejection>,
) -> Result<Json<Vec<OrderResponse>>, ServiceError> {
    let QueryParams(params) = params?;
    let status = params.status_filter()?;
    let orders = ListOrdersQuery { status }
        .execute(&state.db_access())
        .await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    summary = "Get order",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with lines, products and status history", body = OrderResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<OrderResponse>, ServiceError> {
    let Path(order_id) = path?;
    let details = GetOrderQuery { order_id }
        .execute(&state.db_access())
        .await?;
    Ok(Json(details.into()))
}

#[utoipa::path(
    post,
    path = "/api/orders",
    summary = "Create order",
    description = "Reserves stock for every line and creates the order in one transaction. \
        Any failing line rejects the whole order and leaves stock untouched.",
    request_body = CreateOrderRequest,
    responses(
        (status = 201, description = "Order created", body = OrderResponse,
            headers(("Location" = String, description = "URL of the new order"))
        ),
        (status = 400, description = "Validation failed, unknown product or insufficient stock", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn create_order(
    State(state): State<AppState>,
    body: Result<Json<CreateOrderRequest>, JsonRejection>,
) -> Result<Response, ServiceError> {
    let request = validated_json(body)?;
    let details = state.services.orders.create_order(request).await?;
    let location = format!("/api/orders/{}", details.order.id);
    Ok(created_response(location, OrderResponse::from(details)))
}

#[utoipa::path(
    put,
    path = "/api/orders/{id}/status",
    summary = "Advance order status",
    description = "Moves the order one step along Pending, Processing, Shipped, Delivered. \
        The body is optional.",
    params(("id" = i32, Path, description = "Order id")),
    request_body(content = AdvanceStatusRequest, content_type = "application/json"),
    responses(
        (status = 200, description = "Order advanced", body = OrderResponse),
        (status = 400, description = "Order already delivered or invalid note", body = crate::errors::ErrorResponse),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
        (status = 409, description = "Order changed concurrently", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn advance_order_status(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
    body: Bytes,
) -> Result<Json<OrderResponse>, ServiceError> {
    let Path(order_id) = path?;
    let request: AdvanceStatusRequest = optional_json(&body)?;
    let details = state
        .services
        .orders
        .advance_status(order_id, request)
        .await?;
    Ok(Json(details.into()))
}

#[utoipa::path(
    get,
    path = "/api/orders/{id}/history",
    summary = "Get order status history",
    params(("id" = i32, Path, description = "Order id")),
    responses(
        (status = 200, description = "Transitions, oldest first", body = [StatusHistoryResponse]),
        (status = 404, description = "Order not found", body = crate::errors::ErrorResponse),
    ),
    tag = "orders"
)]
pub async fn get_order_history(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<Vec<StatusHistoryResponse>>, ServiceError> {
    let Path(order_id) = path?;
    let history = GetOrderHistoryQuery { order_id }
        .execute(&state.db_access())
        .await?;
    Ok(Json(
        history.into_iter().map(StatusHistoryResponse::from).collect(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;

    fn params(status: Option<&str>) -> ListOrdersParams {
        ListOrdersParams {
            status: status.map(str::to_string),
        }
    }

    #[rstest]
    #[case(None, None)]
    #[case(Some(""), None)]
    #[case(Some("Pending"), Some(OrderStatus::Pending))]
    #[case(Some("shipped"), Some(OrderStatus::Shipped))]
    #[case(Some("DELIVERED"), Some(OrderStatus::Delivered))]
    fn status_filter_parses(#[case] raw: Option<&str>, #[case] expected: Option<OrderStatus>) {
        assert_eq!(params(raw).status_filter().unwrap(), expected);
    }

    #[test]
    fn unknown_status_filter_is_rejected() {
        let err = params(Some("Cancelled")).status_filter().unwrap_err();
        assert_matches!(err, ServiceError::ValidationError { .. });
    }

    #[test]
    fn malformed_query_string_becomes_validation_error() {
        let uri: axum::http::Uri = "/api/orders?status=Pending&status=Shipped".parse().unwrap();
        let rejection = QueryParams::<ListOrdersParams>::try_from_uri(&uri).unwrap_err();
        let err = ServiceError::from(rejection);
        assert_matches!(err, ServiceError::ValidationError { .. });
        assert_eq!(err.error_code(), "VALIDATION_ERROR");
    }

    #[test]
    fn listing_omits_history() {
        let now = Utc::now();
        let summary = OrderSummary {
            order: order::Model {
                id: 1,
                customer_name: "Clinic".into(),
                status: OrderStatus::Pending,
                created_at: now,
                updated_at: now,
            },
            items: vec![order_item::Model {
                id: 10,
                order_id: 1,
                product_id: 3,
                quantity: 2,
            }],
        };
        let json = serde_json::to_value(OrderResponse::from(summary)).unwrap();
        assert!(json.get("statusHistory").is_none());
        assert_eq!(json["customerName"], "Clinic");
        assert_eq!(json["status"], "Pending");
        assert_eq!(json["items"][0]["productId"], 3);
        assert!(json["items"][0].get("product").is_none());
    }
}

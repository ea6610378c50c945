use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Inventory Order Tracker API",
        version = "1.0.0",
        description = r#"
# Inventory Order Tracker

Tracks product stock, places orders that reserve stock atomically and walks
each order through a fixed fulfillment lifecycle:

```
Pending -> Processing -> Shipped -> Delivered
```

Every transition is recorded in an append-only status history.

## Error Handling

Errors share one body shape:

```json
{
  "message": "Insufficient stock for 'Omeprazole 20mg'. Available: 15, Requested: 20.",
  "code": "INSUFFICIENT_STOCK",
  "requestId": "3f1c..."
}
```

Validation failures add an `errors` map of field name to messages.
        "#,
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development")
    ),
    tags(
        (name = "orders", description = "Order placement and fulfillment lifecycle"),
        (name = "products", description = "Product catalogue and stock levels")
    ),
    paths(
        // Orders
        crate::handlers::orders::list_orders,
        crate::handlers::orders::get_order,
        crate::handlers::orders::create_order,
        crate::handlers::orders::advance_order_status,
        crate::handlers::orders::get_order_history,

        // Products
        crate::handlers::products::list_products,
        crate::handlers::products::list_low_stock,
        crate::handlers::products::get_product,
        crate::handlers::products::create_product,
        crate::handlers::products::update_product,
        crate::handlers::products::delete_product,
    ),
    components(
        schemas(
            // Order types
            crate::handlers::orders::OrderResponse,
            crate::handlers::orders::OrderItemResponse,
            crate::handlers::orders::StatusHistoryResponse,
            crate::services::orders::CreateOrderRequest,
            crate::services::orders::OrderLineRequest,
            crate::services::orders::AdvanceStatusRequest,
            crate::entities::OrderStatus,

            // Product types
            crate::handlers::products::ProductResponse,
            crate::services::products::ProductRequest,

            // Error types
            crate::errors::ErrorResponse
        )
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", ApiDoc::openapi())
        .config(utoipa_swagger_ui::Config::from("/api-docs/openapi.json").try_it_out_enabled(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_document_lists_every_route() {
        let json = serde_json::to_string_pretty(&ApiDoc::openapi()).unwrap();
        assert!(json.contains("Inventory Order Tracker API"));
        for path in [
            "/api/orders",
            "/api/orders/{id}",
            "/api/orders/{id}/status",
            "/api/orders/{id}/history",
            "/api/products",
            "/api/products/{id}",
            "/api/products/low-stock",
        ] {
            assert!(json.contains(path), "missing {path}");
        }
    }
}

pub mod common;
pub mod orders;
pub mod products;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

use axum::{
    routing::{get, put},
    Router,
};

/// Order routes, mounted under `/api/orders`.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list_orders).post(orders::create_order))
        .route("/:id", get(orders::get_order))
        .route("/:id/status", put(orders::advance_order_status))
        .route("/:id/history", get(orders::get_order_history))
}

/// Product routes, mounted under `/api/products`.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(products::list_products).post(products::create_product),
        )
        // registered before /:id so the literal segment wins
        .route("/low-stock", get(products::list_low_stock))
        .route(
            "/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
}

mod common;

use std::sync::Arc;

use axum::http::{Method, StatusCode};
use common::{TestApp, AMOXICILLIN, AZITHROMYCIN, LISINOPRIL, OMEPRAZOLE};
use inventory_order_tracker::{
    errors::ServiceError,
    services::orders::{CreateOrderRequest, OrderLineRequest},
};
use proptest::prelude::*;
use serde_json::json;

fn order_for(customer: &str, lines: &[(i32, i32)]) -> CreateOrderRequest {
    CreateOrderRequest {
        customer_name: customer.to_string(),
        items: lines
            .iter()
            .map(|&(product_id, quantity)| OrderLineRequest {
                product_id,
                quantity,
            })
            .collect(),
    }
}

#[tokio::test]
async fn order_decrements_stock_for_every_line() {
    let app = TestApp::new().await;

    let created = app
        .place_order("Clinic", &[(AMOXICILLIN, 50), (LISINOPRIL, 30)])
        .await;
    assert_eq!(created.status, StatusCode::CREATED);

    assert_eq!(app.stock_of(AMOXICILLIN).await, 200);
    assert_eq!(app.stock_of(LISINOPRIL).await, 150);
}

#[tokio::test]
async fn insufficient_stock_is_reported_with_quantities() {
    let app = TestApp::new().await;

    let rejected = app.place_order("Clinic", &[(OMEPRAZOLE, 20)]).await;

    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert_eq!(rejected.body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(
        rejected.body["message"],
        "Insufficient stock for 'Omeprazole 20mg'. Available: 15, Requested: 20."
    );
    assert_eq!(app.stock_of(OMEPRAZOLE).await, 15);
}

#[tokio::test]
async fn failing_line_rolls_back_earlier_reservations() {
    let app = TestApp::new().await;

    let rejected = app
        .place_order("Clinic", &[(AMOXICILLIN, 10), (LISINOPRIL, 10), (OMEPRAZOLE, 16)])
        .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert_eq!(rejected.body["code"], "INSUFFICIENT_STOCK");

    assert_eq!(app.stock_of(AMOXICILLIN).await, 250);
    assert_eq!(app.stock_of(LISINOPRIL).await, 180);
    assert_eq!(app.stock_of(OMEPRAZOLE).await, 15);

    let orders = app.get("/api/orders").await;
    assert_eq!(orders.body.as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn unknown_product_rejects_the_whole_order() {
    let app = TestApp::new().await;

    let rejected = app
        .place_order("Clinic", &[(AMOXICILLIN, 10), (4242, 1)])
        .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert_eq!(rejected.body["code"], "PRODUCT_NOT_FOUND");
    assert_eq!(rejected.body["message"], "Product with ID 4242 not found.");
    assert_eq!(app.stock_of(AMOXICILLIN).await, 250);
}

#[tokio::test]
async fn repeated_product_lines_are_reserved_cumulatively() {
    let app = TestApp::new().await;

    let rejected = app
        .place_order("Clinic", &[(AZITHROMYCIN, 5), (AZITHROMYCIN, 5)])
        .await;
    assert_eq!(rejected.status, StatusCode::BAD_REQUEST);
    assert_eq!(rejected.body["code"], "INSUFFICIENT_STOCK");
    assert_eq!(app.stock_of(AZITHROMYCIN).await, 8);

    let created = app
        .place_order("Clinic", &[(AZITHROMYCIN, 4), (AZITHROMYCIN, 4)])
        .await;
    assert_eq!(created.status, StatusCode::CREATED);
    assert_eq!(app.stock_of(AZITHROMYCIN).await, 0);
}

#[tokio::test]
async fn invalid_order_requests_are_rejected_before_touching_stock() {
    let app = TestApp::new().await;

    let cases = [
        json!({ "customerName": "", "items": [{ "productId": 1, "quantity": 1 }] }),
        json!({ "customerName": "Clinic", "items": [] }),
        json!({ "customerName": "Clinic", "items": [{ "productId": 1, "quantity": 0 }] }),
        json!({ "customerName": "x".repeat(201), "items": [{ "productId": 1, "quantity": 1 }] }),
    ];
    for body in cases {
        let rejected = app.post("/api/orders", body.clone()).await;
        assert_eq!(rejected.status, StatusCode::BAD_REQUEST, "{body}");
        assert_eq!(rejected.body["code"], "VALIDATION_ERROR");
        assert!(rejected.body["errors"].is_object(), "{body}");
    }

    let malformed = app
        .request_raw(
            Method::POST,
            "/api/orders",
            "{\"customerName\":",
            &[("content-type", "application/json")],
        )
        .await;
    assert_eq!(malformed.status, StatusCode::BAD_REQUEST);

    assert_eq!(app.stock_of(AMOXICILLIN).await, 250);
}

#[tokio::test]
async fn concurrent_orders_for_the_last_units_never_oversell() {
    let app = TestApp::with_connection_pool().await;
    let orders = Arc::new(app.state.services.orders.clone());

    // Azithromycin starts with 8 units; 12 buyers each want one.
    let mut tasks = Vec::new();
    for n in 0..12 {
        let orders = orders.clone();
        tasks.push(tokio::spawn(async move {
            orders
                .create_order(order_for(&format!("Buyer {n}"), &[(AZITHROMYCIN, 1)]))
                .await
        }));
    }

    let mut succeeded = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(ServiceError::InsufficientStock { available, .. }) => assert_eq!(available, 0),
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(succeeded, 8);
    assert_eq!(app.stock_of(AZITHROMYCIN).await, 0);
}

#[tokio::test]
async fn two_buyers_race_for_the_last_unit() {
    let app = TestApp::with_connection_pool().await;
    let orders = app.state.services.orders.clone();

    let first = orders
        .create_order(order_for("Setup", &[(AZITHROMYCIN, 7)]))
        .await;
    assert!(first.is_ok());

    let (a, b) = tokio::join!(
        orders.create_order(order_for("Buyer A", &[(AZITHROMYCIN, 1)])),
        orders.create_order(order_for("Buyer B", &[(AZITHROMYCIN, 1)])),
    );
    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    assert_eq!(app.stock_of(AZITHROMYCIN).await, 0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    // Whatever mix of orders arrives, stock never goes negative and every
    // unit that left the shelf belongs to an accepted order.
    #[test]
    fn stock_is_conserved_across_order_sequences(
        quantities in proptest::collection::vec(1i32..8, 1..10)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        let (accepted, remaining) = runtime.block_on(async {
            let app = TestApp::new().await;
            let mut accepted = 0i64;
            for (n, quantity) in quantities.iter().enumerate() {
                let result = app
                    .state
                    .services
                    .orders
                    .create_order(order_for(&format!("Buyer {n}"), &[(OMEPRAZOLE, *quantity)]))
                    .await;
                if result.is_ok() {
                    accepted += i64::from(*quantity);
                }
            }
            (accepted, app.stock_of(OMEPRAZOLE).await)
        });

        prop_assert!(remaining >= 0);
        prop_assert_eq!(accepted + remaining, 15);
    }
}

//! Integration tests for the cart service API.

use std::sync::{Arc, OnceLock};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use broker::{InMemoryBroker, ORDERS_QUEUE};
use cart_store::InMemoryCartStore;
use checkout::StubPaymentAuthorizer;
use common::OrderMessage;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

const CARD: &str = "1234-5678-9012-3456";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    router: axum::Router,
    payments: StubPaymentAuthorizer,
    broker: InMemoryBroker,
}

impl TestApp {
    fn new() -> Self {
        let payments = StubPaymentAuthorizer::new();
        let broker = InMemoryBroker::new();
        let state = api::create_state(
            Arc::new(InMemoryCartStore::new()),
            Arc::new(payments.clone()),
            Arc::new(broker.clone()),
            ORDERS_QUEUE,
        );
        let router = api::create_app(state, get_metrics_handle());

        Self {
            router,
            payments,
            broker,
        }
    }

    async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send(self.router.clone(), method, uri, body).await
    }

    async fn create_cart(&self) -> u64 {
        let (status, body) = self
            .send("POST", "/shopping-cart", Some(json!({ "customer_id": 1 })))
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["shopping_cart_id"].as_u64().unwrap()
    }

    async fn add_item(&self, cart_id: u64, product_id: u64, quantity: u64) {
        let (status, _) = self
            .send(
                "POST",
                &format!("/shopping-carts/{cart_id}/addItem"),
                Some(json!({ "product_id": product_id, "quantity": quantity })),
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    async fn checkout(&self, cart_id: u64, card: &str) -> (StatusCode, Value) {
        self.send(
            "POST",
            &format!("/shopping-carts/{cart_id}/checkout"),
            Some(json!({ "credit_card_number": card })),
        )
        .await
    }
}

async fn send(
    router: axum::Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap())),
        None => request.body(Body::empty()),
    }
    .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_checkout_places_order_and_empties_cart() {
    let app = TestApp::new();
    let cart_id = app.create_cart().await;
    assert_eq!(cart_id, 1);
    app.add_item(cart_id, 1, 1).await;

    let (status, body) = app.checkout(cart_id, CARD).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "order_id": 1 }));

    let (status, cart) = app.send("GET", "/shopping-carts/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["items"], json!([]));

    let published = app.broker.drain(ORDERS_QUEUE);
    assert_eq!(published.len(), 1);
    let order = OrderMessage::from_json_slice(&published[0]).unwrap();
    assert_eq!(order.order_id.get(), 1);
    assert_eq!(order.cart_id.get(), 1);
    assert_eq!(order.total_quantity(), 1);
}

#[tokio::test]
async fn test_declined_payment_keeps_items() {
    let app = TestApp::new();
    let cart_id = app.create_cart().await;
    app.add_item(cart_id, 5, 3).await;
    app.payments.set_decline(true);

    let (status, body) = app.checkout(cart_id, CARD).await;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["error"], "PAYMENT_DECLINED");

    let (_, cart) = app
        .send("GET", &format!("/shopping-carts/{cart_id}"), None)
        .await;
    assert_eq!(cart["items"], json!([{ "product_id": 5, "quantity": 3 }]));
    assert_eq!(app.broker.ready_count(ORDERS_QUEUE), 0);
}

#[tokio::test]
async fn test_malformed_card_is_invalid_card() {
    let app = TestApp::new();
    let cart_id = app.create_cart().await;
    app.add_item(cart_id, 1, 1).await;

    let (status, body) = app.checkout(cart_id, "1234-5678-9012-345").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_CARD");
    assert_eq!(body["message"], "invalid credit card format");
}

#[tokio::test]
async fn test_unreachable_authorizer_is_invalid_card() {
    let app = TestApp::new();
    let cart_id = app.create_cart().await;
    app.add_item(cart_id, 1, 1).await;
    app.payments.set_unavailable(true);

    let (status, body) = app.checkout(cart_id, CARD).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_CARD");
    assert_eq!(body["message"], "failed to contact payment service");
}

#[tokio::test]
async fn test_empty_cart_checkout_is_rejected() {
    let app = TestApp::new();
    let cart_id = app.create_cart().await;

    let (status, body) = app.checkout(cart_id, CARD).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "EMPTY_CART");
    assert_eq!(app.payments.call_count(), 0);
}

#[tokio::test]
async fn test_unknown_cart_is_not_found() {
    let app = TestApp::new();

    let (status, body) = app.checkout(42, CARD).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "CART_NOT_FOUND");

    let (status, body) = app
        .send(
            "POST",
            "/shopping-carts/42/addItem",
            Some(json!({ "product_id": 1, "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "CART_NOT_FOUND");

    let (status, _) = app.send("GET", "/shopping-carts/42", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_publish_failure_is_internal_error() {
    let app = TestApp::new();
    let cart_id = app.create_cart().await;
    app.add_item(cart_id, 2, 2).await;
    app.broker.set_fail_on_publish(true);

    let (status, body) = app.checkout(cart_id, CARD).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "INTERNAL_ERROR");

    let (_, cart) = app
        .send("GET", &format!("/shopping-carts/{cart_id}"), None)
        .await;
    assert_eq!(cart["items"], json!([{ "product_id": 2, "quantity": 2 }]));
}

#[tokio::test]
async fn test_create_cart_validation() {
    let app = TestApp::new();

    for body in [json!({ "customer_id": 0 }), json!({ "customer_id": -4 }), json!({})] {
        let (status, response) = app.send("POST", "/shopping-cart", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["error"], "INVALID_INPUT");
        assert_eq!(response["message"], "customer_id must be a positive integer");
    }
}

#[tokio::test]
async fn test_add_item_validation() {
    let app = TestApp::new();
    let cart_id = app.create_cart().await;
    let uri = format!("/shopping-carts/{cart_id}/addItem");

    let (status, body) = app
        .send("POST", &uri, Some(json!({ "product_id": 0, "quantity": 1 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "product_id must be a positive integer");

    let (status, body) = app
        .send("POST", &uri, Some(json!({ "product_id": 1, "quantity": 0 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "quantity must be a positive integer");

    let (status, body) = app
        .send(
            "POST",
            "/shopping-carts/abc/addItem",
            Some(json!({ "product_id": 1, "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid shopping cart ID");
}

#[tokio::test]
async fn test_malformed_json_is_invalid_input() {
    let app = TestApp::new();

    let request = Request::builder()
        .method("POST")
        .uri("/shopping-cart")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "INVALID_INPUT");
    assert_eq!(body["message"], "Invalid JSON payload");
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let app = TestApp::new();
    let (status, body) = app.send("GET", "/shopping-carts/1/remove", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_add_item_loses_no_updates() {
    let app = TestApp::new();
    let cart_id = app.create_cart().await;
    let uri = format!("/shopping-carts/{cart_id}/addItem");

    let requests = (0..200).map(|_| {
        let router = app.router.clone();
        let uri = uri.clone();
        tokio::spawn(async move {
            send(
                router,
                "POST",
                &uri,
                Some(json!({ "product_id": 1, "quantity": 1 })),
            )
            .await
        })
    });
    for (status, _) in futures_util::future::join_all(requests)
        .await
        .into_iter()
        .map(Result::unwrap)
    {
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    let (_, cart) = app.send("GET", &uri.replace("/addItem", ""), None).await;
    assert_eq!(cart["items"], json!([{ "product_id": 1, "quantity": 200 }]));
}

#[tokio::test]
async fn test_metrics_endpoint_reports_checkouts() {
    let app = TestApp::new();
    let cart_id = app.create_cart().await;
    app.add_item(cart_id, 1, 1).await;
    app.checkout(cart_id, CARD).await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("checkout_attempts_total"));
}

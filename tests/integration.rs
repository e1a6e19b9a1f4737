use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tokio::sync::watch;
use tower::ServiceExt;

use courier_dispatch::api::rest::router;
use courier_dispatch::engine::state::{FileStateStore, StateStore};
use courier_dispatch::engine::worker::Worker;
use courier_dispatch::queue::{LocalQueue, OrderQueue};
use courier_dispatch::state::AppState;
use courier_dispatch::storage::{Directory, MemoryDirectory};

async fn setup() -> (axum::Router, Arc<AppState>, tempfile::TempDir) {
    let tmp = tempfile::tempdir().unwrap();
    let directory: Arc<dyn Directory> = Arc::new(MemoryDirectory::new());
    let queue = Arc::new(
        LocalQueue::open(
            &tmp.path().join("queue.json"),
            Duration::from_secs(30),
            directory.clone(),
        )
        .await
        .unwrap(),
    );
    let state = Arc::new(AppState::new(directory, queue));
    (router(state.clone()), state, tmp)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn empty_post(uri: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn register_courier(app: &axum::Router, name: &str) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/couriers",
            json!({ "name": name, "phone": "555-0100" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

async fn create_order(app: &axum::Router) -> Value {
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "restaurant": "Pizzeria Uno",
                "pickup_address": "1 Oven Ln",
                "customer_address": "2 Couch St"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn health_returns_ok() {
    let (app, _state, _tmp) = setup().await;
    let response = app.oneshot(get_request("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["couriers"], 0);
    assert_eq!(body["orders"], 0);
}

#[tokio::test]
async fn metrics_returns_prometheus_format() {
    let (app, _state, _tmp) = setup().await;
    let response = app.oneshot(get_request("/metrics")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response
        .headers()
        .get("content-type")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(content_type.contains("text/plain"));

    let body = body_string(response).await;
    assert!(body.contains("orders_enqueued_total"));
}

#[tokio::test]
async fn register_courier_returns_courier() {
    let (app, _state, _tmp) = setup().await;
    let courier = register_courier(&app, "Alice").await;

    assert_eq!(courier["name"], "Alice");
    assert_eq!(courier["phone"], "555-0100");
    assert_eq!(courier["id"], 1);
}

#[tokio::test]
async fn register_courier_empty_name_returns_400() {
    let (app, _state, _tmp) = setup().await;
    let response = app
        .oneshot(json_request("POST", "/couriers", json!({ "name": "  " })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn create_order_is_queued_and_unassigned() {
    let (app, _state, _tmp) = setup().await;
    let order = create_order(&app).await;

    assert_eq!(order["status"], "queued");
    assert!(order["courier_id"].is_null());
    assert_eq!(order["restaurant"], "Pizzeria Uno");
}

#[tokio::test]
async fn create_order_missing_address_returns_400() {
    let (app, _state, _tmp) = setup().await;
    let response = app
        .oneshot(json_request(
            "POST",
            "/orders",
            json!({
                "restaurant": "Pizzeria Uno",
                "pickup_address": "",
                "customer_address": "2 Couch St"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_nonexistent_order_returns_404() {
    let (app, _state, _tmp) = setup().await;
    let response = app.oneshot(get_request("/orders/42")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn claim_with_empty_queue_returns_no_content() {
    let (app, _state, _tmp) = setup().await;
    let courier = register_courier(&app, "Bob").await;
    let id = courier["id"].as_u64().unwrap();

    let response = app
        .oneshot(empty_post(&format!("/couriers/{id}/claim")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn claim_for_unknown_courier_returns_404() {
    let (app, _state, _tmp) = setup().await;
    let response = app.oneshot(empty_post("/couriers/9/claim")).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn claim_assigns_to_requesting_courier() {
    let (app, _state, _tmp) = setup().await;
    let courier = register_courier(&app, "Carol").await;
    let courier_id = courier["id"].as_u64().unwrap();
    let order = create_order(&app).await;

    let response = app
        .clone()
        .oneshot(empty_post(&format!("/couriers/{courier_id}/claim")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let claimed = body_json(response).await;
    assert_eq!(claimed["id"], order["id"]);
    assert_eq!(claimed["status"], "assigned");
    assert_eq!(claimed["courier_id"], courier_id);

    // Message was acknowledged: the next claim finds nothing.
    let response = app
        .oneshot(empty_post(&format!("/couriers/{courier_id}/claim")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn claim_of_duplicate_message_for_dispatched_order_returns_409() {
    let (app, state, _tmp) = setup().await;
    let courier = register_courier(&app, "Gina").await;
    let courier_id = courier["id"].as_u64().unwrap();
    let order = create_order(&app).await;
    let order_id = order["id"].as_u64().unwrap();

    let response = app
        .clone()
        .oneshot(empty_post(&format!("/couriers/{courier_id}/claim")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A duplicate message for the dispatched order, as a requeue or a
    // lapsed visibility window would leave behind.
    state.queue.send(order_id).await.unwrap();

    let rival = register_courier(&app, "Hugo").await;
    let rival_id = rival["id"].as_u64().unwrap();
    let response = app
        .clone()
        .oneshot(empty_post(&format!("/couriers/{rival_id}/claim")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    // The first assignment stands.
    let response = app
        .clone()
        .oneshot(get_request(&format!("/orders/{order_id}")))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["courier_id"], courier_id);
    assert_eq!(body["status"], "assigned");

    // The duplicate was acknowledged: the next claim finds nothing.
    let response = app
        .oneshot(empty_post(&format!("/couriers/{rival_id}/claim")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn claim_skips_messages_for_missing_orders() {
    let (app, state, _tmp) = setup().await;
    let courier = register_courier(&app, "Ines").await;
    let courier_id = courier["id"].as_u64().unwrap();

    // A dead message ahead of a real order in the queue.
    state.queue.send(999).await.unwrap();
    let order = create_order(&app).await;

    let response = app
        .clone()
        .oneshot(empty_post(&format!("/couriers/{courier_id}/claim")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let claimed = body_json(response).await;
    assert_eq!(claimed["id"], order["id"]);
    assert_eq!(claimed["courier_id"], courier_id);

    // The dead message was acknowledged along the way.
    let response = app
        .oneshot(empty_post(&format!("/couriers/{courier_id}/claim")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn pickup_and_delivery_confirmations() {
    let (app, _state, _tmp) = setup().await;
    let courier = register_courier(&app, "Dan").await;
    let courier_id = courier["id"].as_u64().unwrap();
    let order = create_order(&app).await;
    let order_id = order["id"].as_u64().unwrap();

    // Pickup before assignment is a conflict.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/pickup"),
            json!({ "courier_id": courier_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(empty_post(&format!("/couriers/{courier_id}/claim")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // A different courier cannot confirm this order.
    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/pickup"),
            json!({ "courier_id": courier_id + 1 }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/pickup"),
            json!({ "courier_id": courier_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "picked_up");

    let response = app
        .clone()
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/delivered"),
            json!({ "courier_id": courier_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "delivered");

    // Delivered is terminal.
    let response = app
        .oneshot(json_request(
            "POST",
            &format!("/orders/{order_id}/delivered"),
            json!({ "courier_id": courier_id }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn background_worker_assigns_round_robin() {
    let (app, state, tmp) = setup().await;
    let store = FileStateStore::new(tmp.path().join("worker_state.json"));
    store
        .save(courier_dispatch::engine::state::SelectionState::default())
        .unwrap();

    let first_courier = register_courier(&app, "Eve").await;
    let second_courier = register_courier(&app, "Frank").await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker = Worker::new(
        state.clone(),
        Arc::new(FileStateStore::new(tmp.path().join("worker_state.json"))),
        Duration::from_millis(20),
    );
    let handle = tokio::spawn(worker.run(shutdown_rx));

    let first_order = create_order(&app).await;
    let second_order = create_order(&app).await;

    tokio::time::sleep(Duration::from_millis(500)).await;
    shutdown_tx.send(true).unwrap();
    let _ = handle.await;

    let response = app
        .clone()
        .oneshot(get_request(&format!("/orders/{}", first_order["id"])))
        .await
        .unwrap();
    let first = body_json(response).await;
    assert_eq!(first["status"], "assigned");
    assert_eq!(first["courier_id"], first_courier["id"]);

    let response = app
        .oneshot(get_request(&format!("/orders/{}", second_order["id"])))
        .await
        .unwrap();
    let second = body_json(response).await;
    assert_eq!(second["status"], "assigned");
    assert_eq!(second["courier_id"], second_courier["id"]);

    // The cursor wrapped around the two-courier roster and was persisted.
    let state_after = FileStateStore::new(tmp.path().join("worker_state.json")).load();
    assert_eq!(state_after.last_index, 0);
}

//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use ledger::InMemoryRaffleStore;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

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

fn setup() -> Router {
    let store = InMemoryRaffleStore::new();
    let (state, _processor) = api::create_default_state(store);
    api::create_app(state, get_metrics_handle())
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let request = match body {
        Some(value) => Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(value.to_string()))
            .unwrap(),
        None => Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_active_raffle(app: &Router, body: Value) -> String {
    let (status, created) = send(app, "POST", "/raffles", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    let raffle_id = created["raffle_id"].as_str().unwrap().to_string();

    let (status, _) = send(
        app,
        "POST",
        &format!("/raffles/{raffle_id}/activate"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    raffle_id
}

#[tokio::test]
async fn test_health_check() {
    let app = setup();
    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_checkout_webhook_finalize_and_draw_flow() {
    let app = setup();
    let user_id = uuid::Uuid::new_v4().to_string();

    let raffle_id = create_active_raffle(
        &app,
        json!({
            "name": "Launch Raffle",
            "entry_mode": "hybrid",
            "total_winners": 2,
            "ticket_price_cents": 500
        }),
    )
    .await;

    // Open a checkout for three tickets.
    let (status, txn) = send(
        &app,
        "POST",
        "/transactions",
        Some(json!({
            "user_id": user_id,
            "raffle_id": raffle_id,
            "amount_cents": 1500,
            "tickets_requested": 3,
            "idempotency_key": "flow-abc"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(txn["status"], "pending");
    assert_eq!(txn["reused"], false);
    let transaction_id = txn["transaction_id"].as_str().unwrap().to_string();
    let reference = txn["external_reference"].as_str().unwrap().to_string();

    // The webhook lands first and issues the batch.
    let (status, webhook) = send(
        &app,
        "POST",
        "/transactions/webhook",
        Some(json!({
            "external_reference": reference,
            "resolved_status": "succeeded"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(webhook["applied"], true);
    assert_eq!(webhook["entries_issued"], 3);

    // The client finalize arrives second: a safe no-op.
    let (status, finalize) = send(
        &app,
        "POST",
        &format!("/transactions/{transaction_id}/finalize"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(finalize["applied"], false);
    assert_eq!(finalize["entries_issued"], 0);

    // Close and draw.
    let (status, _) = send(&app, "POST", &format!("/raffles/{raffle_id}/close"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, draw) = send(&app, "POST", &format!("/raffles/{raffle_id}/draw"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(draw["total_participants"], 3);
    assert_eq!(draw["total_winners"], 2);
    assert!(draw["draw_seed"].as_str().is_some());
    let winners = draw["winners"].as_array().unwrap();
    assert_eq!(winners.len(), 2);
    assert_eq!(winners[0]["prize_position"], 1);
    assert_eq!(winners[1]["prize_position"], 2);
    assert!(winners[0]["ticket_number"].as_str().unwrap().starts_with("TKT-"));

    // Winners are persisted and the recorded draw verifies.
    let (status, listed) = send(
        &app,
        "GET",
        &format!("/raffles/{raffle_id}/winners"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listed.as_array().unwrap().len(), 2);

    let (status, verification) = send(
        &app,
        "GET",
        &format!("/raffles/{raffle_id}/draw/verification"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(verification["valid"], true);
}

#[tokio::test]
async fn test_transaction_reuse_by_idempotency_key() {
    let app = setup();
    let user_id = uuid::Uuid::new_v4().to_string();
    let raffle_id = uuid::Uuid::new_v4().to_string();

    let body = json!({
        "user_id": user_id,
        "raffle_id": raffle_id,
        "amount_cents": 500,
        "idempotency_key": "retry-1"
    });

    let (status, first) = send(&app, "POST", "/transactions", Some(body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, second) = send(&app, "POST", "/transactions", Some(body)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["reused"], true);
    assert_eq!(second["transaction_id"], first["transaction_id"]);
    assert_eq!(second["external_reference"], first["external_reference"]);
}

#[tokio::test]
async fn test_entry_cap_surfaces_machine_readable_code() {
    let app = setup();
    let user_id = uuid::Uuid::new_v4().to_string();

    let raffle_id = create_active_raffle(
        &app,
        json!({
            "name": "Capped",
            "entry_mode": "hybrid",
            "total_winners": 1,
            "ticket_price_cents": 500,
            "max_entries_per_user": 1
        }),
    )
    .await;

    let entry_body = json!({
        "raffle_id": raffle_id,
        "user_id": user_id,
        "source": "manual_purchase"
    });

    let (status, entry) = send(&app, "POST", "/entries", Some(entry_body.clone())).await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(entry["ticket_number"].as_str().unwrap().starts_with("TKT-"));

    let (status, rejected) = send(&app, "POST", "/entries", Some(entry_body)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(rejected["code"], "max_entries_reached");
}

#[tokio::test]
async fn test_subscribers_only_entry_gating() {
    let app = setup();
    let user_id = uuid::Uuid::new_v4().to_string();

    let raffle_id = create_active_raffle(
        &app,
        json!({
            "name": "Members",
            "entry_mode": "subscribers_only",
            "total_winners": 1,
            "ticket_price_cents": 0
        }),
    )
    .await;

    let entry_body = json!({
        "raffle_id": raffle_id,
        "user_id": user_id,
        "source": "subscription"
    });

    let (status, rejected) = send(&app, "POST", "/entries", Some(entry_body.clone())).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(rejected["code"], "subscription_required");

    let (status, _) = send(
        &app,
        "POST",
        "/subscriptions",
        Some(json!({ "user_id": user_id })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(&app, "POST", "/entries", Some(entry_body)).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_draw_requires_closed_raffle() {
    let app = setup();
    let raffle_id = create_active_raffle(
        &app,
        json!({
            "name": "Too Early",
            "entry_mode": "hybrid",
            "total_winners": 1,
            "ticket_price_cents": 500
        }),
    )
    .await;

    let (status, body) = send(&app, "POST", &format!("/raffles/{raffle_id}/draw"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "raffle_not_closed");
}

#[tokio::test]
async fn test_unmatched_webhook_is_dropped() {
    let app = setup();

    let (status, body) = send(
        &app,
        "POST",
        "/transactions/webhook",
        Some(json!({
            "external_reference": "cs_no_such_session",
            "resolved_status": "succeeded"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["applied"], false);
    assert_eq!(body["entries_issued"], 0);
}

#[tokio::test]
async fn test_create_raffle_rejects_zero_winners() {
    let app = setup();

    let (status, body) = send(
        &app,
        "POST",
        "/raffles",
        Some(json!({
            "name": "No Winners",
            "entry_mode": "hybrid",
            "total_winners": 0,
            "ticket_price_cents": 500
        })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "bad_request");
}

//! HTTP API server with observability for the raffle platform core.
//!
//! Exposes entry issuance, transaction checkout, both completion-signal
//! paths (webhook push and client finalize), and admin draw execution,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use draw::DrawEngine;
use ledger::RaffleStore;
use metrics_exporter_prometheus::PrometheusHandle;
use reconcile::{InMemoryPaymentProcessor, ReconcileCoordinator};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: RaffleStore> {
    pub store: S,
    pub coordinator: ReconcileCoordinator<S, InMemoryPaymentProcessor>,
    pub draw_engine: DrawEngine<S>,
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: RaffleStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/raffles", post(routes::raffles::create::<S>))
        .route("/raffles/{id}", get(routes::raffles::get::<S>))
        .route("/raffles/{id}/activate", post(routes::raffles::activate::<S>))
        .route("/raffles/{id}/close", post(routes::raffles::close::<S>))
        .route("/raffles/{id}/draw", post(routes::raffles::draw::<S>))
        .route(
            "/raffles/{id}/draw/verification",
            get(routes::raffles::verify_draw::<S>),
        )
        .route("/raffles/{id}/winners", get(routes::raffles::winners::<S>))
        .route("/entries", post(routes::entries::issue::<S>))
        .route("/transactions", post(routes::transactions::create::<S>))
        .route(
            "/transactions/webhook",
            post(routes::transactions::webhook::<S>),
        )
        .route(
            "/transactions/{id}/finalize",
            post(routes::transactions::finalize::<S>),
        )
        .route(
            "/subscriptions",
            post(routes::subscriptions::create::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the default application state around a store, with the
/// in-memory payment processor.
pub fn create_default_state<S: RaffleStore + Clone + 'static>(
    store: S,
) -> (Arc<AppState<S>>, InMemoryPaymentProcessor) {
    let processor = InMemoryPaymentProcessor::new();
    let coordinator = ReconcileCoordinator::new(store.clone(), processor.clone());
    let draw_engine = DrawEngine::new(store.clone());

    let state = Arc::new(AppState {
        store,
        coordinator,
        draw_engine,
    });

    (state, processor)
}

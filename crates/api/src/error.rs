//! API error types with HTTP response mapping.
//!
//! Eligibility and validation failures carry a machine-readable `code`
//! alongside the message so UI layers can map them to specific guidance
//! instead of a generic failure.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use draw::DrawError;
use ledger::LedgerError;
use reconcile::ReconcileError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Ledger error.
    Ledger(LedgerError),
    /// Reconciliation error.
    Reconcile(ReconcileError),
    /// Draw execution error.
    Draw(DrawError),
    /// Internal server error.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Ledger(err) => ledger_error_to_response(err),
            ApiError::Reconcile(err) => reconcile_error_to_response(err),
            ApiError::Draw(err) => draw_error_to_response(err),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal server error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal", msg)
            }
        };

        let body = serde_json::json!({ "error": message, "code": code });
        (status, axum::Json(body)).into_response()
    }
}

fn ledger_error_to_response(err: LedgerError) -> (StatusCode, &'static str, String) {
    let message = err.to_string();
    match err {
        LedgerError::RaffleNotFound(_) => (StatusCode::NOT_FOUND, "raffle_not_found", message),
        LedgerError::RaffleNotActive { .. } => {
            (StatusCode::CONFLICT, "raffle_not_active", message)
        }
        LedgerError::SubscriptionRequired(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "subscription_required",
            message,
        ),
        LedgerError::SubscriptionEntriesNotAllowed(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "subscription_entries_not_allowed",
            message,
        ),
        LedgerError::MaxEntriesReached { .. } => {
            (StatusCode::CONFLICT, "max_entries_reached", message)
        }
        LedgerError::TransactionNotFound(_) => {
            (StatusCode::NOT_FOUND, "transaction_not_found", message)
        }
        LedgerError::InvalidStatusTransition { .. } => {
            (StatusCode::CONFLICT, "invalid_status_transition", message)
        }
        LedgerError::ConcurrencyConflict(_) => {
            (StatusCode::CONFLICT, "concurrency_conflict", message)
        }
        LedgerError::Validation(_) => (StatusCode::BAD_REQUEST, "validation", message),
        LedgerError::IntegrityViolation(_)
        | LedgerError::Database(_)
        | LedgerError::Serialization(_) => {
            tracing::error!(error = %message, "ledger failure");
            (StatusCode::INTERNAL_SERVER_ERROR, "internal", message)
        }
    }
}

fn reconcile_error_to_response(err: ReconcileError) -> (StatusCode, &'static str, String) {
    match err {
        ReconcileError::Validation(_) => {
            (StatusCode::BAD_REQUEST, "validation", err.to_string())
        }
        ReconcileError::ExternalService(_) => {
            (StatusCode::BAD_GATEWAY, "external_service", err.to_string())
        }
        ReconcileError::Ledger(inner) => ledger_error_to_response(inner),
    }
}

fn draw_error_to_response(err: DrawError) -> (StatusCode, &'static str, String) {
    match err {
        DrawError::RaffleNotFound(_) => {
            (StatusCode::NOT_FOUND, "raffle_not_found", err.to_string())
        }
        DrawError::RaffleNotClosed { .. } => {
            (StatusCode::CONFLICT, "raffle_not_closed", err.to_string())
        }
        DrawError::NoEligibleEntries(_) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "no_eligible_entries",
            err.to_string(),
        ),
        DrawError::Ledger(inner) => ledger_error_to_response(inner),
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        ApiError::Ledger(err)
    }
}

impl From<ReconcileError> for ApiError {
    fn from(err: ReconcileError) -> Self {
        ApiError::Reconcile(err)
    }
}

impl From<DrawError> for ApiError {
    fn from(err: DrawError) -> Self {
        ApiError::Draw(err)
    }
}

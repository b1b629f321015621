//! Transaction creation and completion-signal endpoints.
//!
//! Completion arrives on two independent paths: the processor webhook
//! (`POST /transactions/webhook`) and the client finalize call after a
//! checkout redirect (`POST /transactions/:id/finalize`). Both feed the
//! same reconciliation entry point; re-delivery and races are expected
//! and answered with `applied = false`, never an error status.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{SubscriptionId, TransactionId, UserId};
use ledger::{Currency, Money, RaffleStore, TransactionKind};
use reconcile::{CompletionSignal, CreateTransaction, ResolvedStatus};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::raffles::parse_raffle_id;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateTransactionRequest {
    pub user_id: String,
    pub raffle_id: Option<String>,
    pub subscription_id: Option<String>,
    pub amount_cents: i64,
    pub currency: Option<String>,
    pub tickets_requested: Option<u32>,
    pub idempotency_key: Option<String>,
}

#[derive(Deserialize)]
pub struct CompletionRequest {
    pub transaction_id: Option<String>,
    pub external_reference: Option<String>,
    pub idempotency_key: Option<String>,
    pub resolved_status: ResolvedStatus,
}

#[derive(Deserialize, Default)]
pub struct FinalizeRequest {
    pub resolved_status: Option<ResolvedStatus>,
}

// -- Response types --

#[derive(Serialize)]
pub struct TransactionResponse {
    pub transaction_id: String,
    pub external_reference: Option<String>,
    pub status: String,
    pub reused: bool,
}

#[derive(Serialize)]
pub struct CompletionResponse {
    pub applied: bool,
    pub entries_issued: u32,
}

// -- Handlers --

/// POST /transactions — create a payment transaction and open a processor
/// checkout. Retried safely with the same idempotency key.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: RaffleStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateTransactionRequest>,
) -> Result<(StatusCode, Json<TransactionResponse>), ApiError> {
    let user_id = parse_uuid::<UserId>(&req.user_id, "user_id")?;

    let kind = match (&req.raffle_id, &req.subscription_id) {
        (Some(raffle_id), None) => TransactionKind::RaffleTicket {
            raffle_id: parse_raffle_id(raffle_id)?,
            tickets_requested: req.tickets_requested.unwrap_or(1),
        },
        (None, Some(subscription_id)) => TransactionKind::Subscription {
            subscription_id: parse_uuid::<SubscriptionId>(subscription_id, "subscription_id")?,
        },
        _ => {
            return Err(ApiError::BadRequest(
                "exactly one of raffle_id or subscription_id is required".to_string(),
            ));
        }
    };

    let outcome = state
        .coordinator
        .create_or_reuse(CreateTransaction {
            user_id,
            kind,
            amount: Money::from_cents(req.amount_cents),
            currency: req.currency.as_deref().map(Currency::new).unwrap_or_default(),
            idempotency_key: req.idempotency_key,
        })
        .await?;

    let status = if outcome.reused {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((
        status,
        Json(TransactionResponse {
            transaction_id: outcome.transaction.id.to_string(),
            external_reference: outcome.transaction.external_reference,
            status: outcome.transaction.status.to_string(),
            reused: outcome.reused,
        }),
    ))
}

/// POST /transactions/webhook — processor push notification.
#[tracing::instrument(skip(state, req))]
pub async fn webhook<S: RaffleStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CompletionRequest>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let mut signal = CompletionSignal::new(req.resolved_status);
    if let Some(ref raw) = req.transaction_id {
        signal = signal.with_transaction_id(parse_uuid::<TransactionId>(raw, "transaction_id")?);
    }
    if let Some(reference) = req.external_reference {
        signal = signal.with_external_reference(reference);
    }
    if let Some(key) = req.idempotency_key {
        signal = signal.with_idempotency_key(key);
    }

    let outcome = state.coordinator.apply_completion(signal).await?;
    Ok(Json(CompletionResponse {
        applied: outcome.applied(),
        entries_issued: outcome.entries_issued(),
    }))
}

/// POST /transactions/:id/finalize — client-pull confirmation after the
/// checkout redirect. Defaults to a success resolution when the body is
/// omitted.
#[tracing::instrument(skip(state, req))]
pub async fn finalize<S: RaffleStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    req: Option<Json<FinalizeRequest>>,
) -> Result<Json<CompletionResponse>, ApiError> {
    let transaction_id = parse_uuid::<TransactionId>(&id, "transaction_id")?;
    let resolved = req
        .and_then(|Json(body)| body.resolved_status)
        .unwrap_or(ResolvedStatus::Succeeded);

    let outcome = state
        .coordinator
        .apply_completion(CompletionSignal::new(resolved).with_transaction_id(transaction_id))
        .await?;
    Ok(Json(CompletionResponse {
        applied: outcome.applied(),
        entries_issued: outcome.entries_issued(),
    }))
}

fn parse_uuid<T: From<uuid::Uuid>>(raw: &str, field: &str) -> Result<T, ApiError> {
    let uuid = uuid::Uuid::parse_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))?;
    Ok(T::from(uuid))
}

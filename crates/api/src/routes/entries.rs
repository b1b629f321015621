//! Entry issuance endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use common::{SubscriptionId, UserId};
use ledger::{EntrySource, IssueEntry, RaffleStore};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;
use crate::routes::raffles::parse_raffle_id;

#[derive(Deserialize)]
pub struct IssueEntryRequest {
    pub raffle_id: String,
    pub user_id: String,
    pub source: EntrySource,
    pub subscription_id: Option<String>,
}

#[derive(Serialize)]
pub struct EntryResponse {
    pub entry_id: String,
    pub ticket_number: String,
}

/// POST /entries — issue one entry, subject to the raffle's eligibility
/// rules. Eligibility rejections come back as 4xx with a machine-readable
/// `code`.
#[tracing::instrument(skip(state, req))]
pub async fn issue<S: RaffleStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<IssueEntryRequest>,
) -> Result<(StatusCode, Json<EntryResponse>), ApiError> {
    let raffle_id = parse_raffle_id(&req.raffle_id)?;
    let user_id = parse_uuid::<UserId>(&req.user_id, "user_id")?;
    let subscription_id = req
        .subscription_id
        .as_deref()
        .map(|raw| parse_uuid::<SubscriptionId>(raw, "subscription_id"))
        .transpose()?;

    let entry = state
        .store
        .issue_entry(IssueEntry {
            raffle_id,
            user_id,
            source: req.source,
            subscription_id,
        })
        .await?;

    metrics::counter!("api_entries_issued_total").increment(1);
    Ok((
        StatusCode::CREATED,
        Json(EntryResponse {
            entry_id: entry.id.to_string(),
            ticket_number: entry.ticket_number,
        }),
    ))
}

fn parse_uuid<T: From<uuid::Uuid>>(raw: &str, field: &str) -> Result<T, ApiError> {
    let uuid = uuid::Uuid::parse_str(raw)
        .map_err(|e| ApiError::BadRequest(format!("Invalid {field}: {e}")))?;
    Ok(T::from(uuid))
}

//! Subscription grant endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::UserId;
use ledger::{RaffleStore, Subscription};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct CreateSubscriptionRequest {
    pub user_id: String,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Serialize)]
pub struct SubscriptionResponse {
    pub subscription_id: String,
    pub status: String,
}

/// POST /subscriptions — grant a subscription to a user.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: RaffleStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateSubscriptionRequest>,
) -> Result<(StatusCode, Json<SubscriptionResponse>), ApiError> {
    let uuid = uuid::Uuid::parse_str(&req.user_id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid user_id: {e}")))?;
    let subscription = Subscription::new(UserId::from(uuid), req.expires_at);
    let response = SubscriptionResponse {
        subscription_id: subscription.id.to_string(),
        status: subscription.status.to_string(),
    };

    state.store.upsert_subscription(subscription).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

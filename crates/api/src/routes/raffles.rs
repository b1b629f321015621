//! Raffle lifecycle and draw endpoints.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::RaffleId;
use ledger::{EntryMode, Money, Raffle, RaffleStatus, RaffleStore};
use serde::{Deserialize, Serialize};

use crate::AppState;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
pub struct CreateRaffleRequest {
    pub name: String,
    pub entry_mode: EntryMode,
    pub total_winners: u32,
    pub ticket_price_cents: i64,
    pub max_entries_per_user: Option<u32>,
}

// -- Response types --

#[derive(Serialize)]
pub struct RaffleResponse {
    pub raffle_id: String,
    pub name: String,
    pub status: String,
    pub entry_mode: String,
    pub max_entries_per_user: Option<u32>,
    pub total_winners: u32,
    pub ticket_price_cents: i64,
    pub draw_seed: Option<String>,
}

impl From<Raffle> for RaffleResponse {
    fn from(raffle: Raffle) -> Self {
        Self {
            raffle_id: raffle.id.to_string(),
            name: raffle.name,
            status: raffle.status.to_string(),
            entry_mode: raffle.entry_mode.to_string(),
            max_entries_per_user: raffle.max_entries_per_user,
            total_winners: raffle.total_winners,
            ticket_price_cents: raffle.ticket_price.cents(),
            draw_seed: raffle.draw_seed,
        }
    }
}

#[derive(Serialize)]
pub struct WinnerResponse {
    pub entry_id: String,
    pub user_id: String,
    pub ticket_number: String,
    pub prize_position: u32,
}

#[derive(Serialize)]
pub struct DrawResponse {
    pub winners: Vec<WinnerResponse>,
    pub draw_seed: String,
    pub total_participants: u32,
    pub total_winners: u32,
}

#[derive(Serialize)]
pub struct DrawVerificationResponse {
    pub valid: bool,
}

// -- Handlers --

/// POST /raffles — create a raffle in draft status.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: RaffleStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateRaffleRequest>,
) -> Result<(StatusCode, Json<RaffleResponse>), ApiError> {
    if req.total_winners == 0 {
        return Err(ApiError::BadRequest(
            "total_winners must be at least 1".to_string(),
        ));
    }

    let mut raffle = Raffle::new(
        req.name,
        req.entry_mode,
        req.total_winners,
        Money::from_cents(req.ticket_price_cents),
    );
    raffle.max_entries_per_user = req.max_entries_per_user;

    state.store.insert_raffle(raffle.clone()).await?;
    Ok((StatusCode::CREATED, Json(raffle.into())))
}

/// GET /raffles/:id — load a raffle by id.
#[tracing::instrument(skip(state))]
pub async fn get<S: RaffleStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<RaffleResponse>, ApiError> {
    let raffle_id = parse_raffle_id(&id)?;
    let raffle = state
        .store
        .get_raffle(raffle_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Raffle {id} not found")))?;
    Ok(Json(raffle.into()))
}

/// POST /raffles/:id/activate — open the raffle for entries.
#[tracing::instrument(skip(state))]
pub async fn activate<S: RaffleStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<RaffleResponse>, ApiError> {
    let raffle_id = parse_raffle_id(&id)?;
    let raffle = state
        .store
        .advance_raffle_status(raffle_id, RaffleStatus::Active)
        .await?;
    Ok(Json(raffle.into()))
}

/// POST /raffles/:id/close — end the entry window.
#[tracing::instrument(skip(state))]
pub async fn close<S: RaffleStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<RaffleResponse>, ApiError> {
    let raffle_id = parse_raffle_id(&id)?;
    let raffle = state
        .store
        .advance_raffle_status(raffle_id, RaffleStatus::Closed)
        .await?;
    Ok(Json(raffle.into()))
}

/// POST /raffles/:id/draw — execute the draw for a closed raffle.
#[tracing::instrument(skip(state))]
pub async fn draw<S: RaffleStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<DrawResponse>, ApiError> {
    let raffle_id = parse_raffle_id(&id)?;
    let outcome = state.draw_engine.execute(raffle_id).await?;

    let tickets = ticket_numbers(&state.store, raffle_id).await?;
    let winners = outcome
        .winners
        .into_iter()
        .map(|w| WinnerResponse {
            entry_id: w.entry_id.to_string(),
            user_id: w.user_id.to_string(),
            ticket_number: tickets.get(&w.entry_id.to_string()).cloned().unwrap_or_default(),
            prize_position: w.prize_position,
        })
        .collect();

    Ok(Json(DrawResponse {
        winners,
        draw_seed: outcome.draw_seed,
        total_participants: outcome.total_participants,
        total_winners: outcome.total_winners,
    }))
}

/// GET /raffles/:id/draw/verification — replay the recorded draw.
#[tracing::instrument(skip(state))]
pub async fn verify_draw<S: RaffleStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<DrawVerificationResponse>, ApiError> {
    let raffle_id = parse_raffle_id(&id)?;
    let valid = state.draw_engine.verify_draw(raffle_id).await?;
    Ok(Json(DrawVerificationResponse { valid }))
}

/// GET /raffles/:id/winners — recorded winners ordered by prize position.
#[tracing::instrument(skip(state))]
pub async fn winners<S: RaffleStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<Vec<WinnerResponse>>, ApiError> {
    let raffle_id = parse_raffle_id(&id)?;
    if state.store.get_raffle(raffle_id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Raffle {id} not found")));
    }

    let tickets = ticket_numbers(&state.store, raffle_id).await?;
    let winners = state
        .store
        .winners_for_raffle(raffle_id)
        .await?
        .into_iter()
        .map(|w| WinnerResponse {
            entry_id: w.entry_id.to_string(),
            user_id: w.user_id.to_string(),
            ticket_number: tickets.get(&w.entry_id.to_string()).cloned().unwrap_or_default(),
            prize_position: w.prize_position,
        })
        .collect();

    Ok(Json(winners))
}

async fn ticket_numbers<S: RaffleStore>(
    store: &S,
    raffle_id: RaffleId,
) -> Result<HashMap<String, String>, ApiError> {
    Ok(store
        .entries_for_raffle(raffle_id)
        .await?
        .into_iter()
        .map(|e| (e.id.to_string(), e.ticket_number))
        .collect())
}

pub(crate) fn parse_raffle_id(id: &str) -> Result<RaffleId, ApiError> {
    let uuid = uuid::Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("Invalid raffle id: {e}")))?;
    Ok(RaffleId::from(uuid))
}

//! Winner records produced by the draw commit.

use chrono::{DateTime, Utc};
use common::{EntryId, RaffleId, UserId, WinnerId};
use serde::{Deserialize, Serialize};

/// Post-draw contact workflow state. The workflow itself is out of scope
/// here; the field exists so downstream tooling has somewhere to progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WinnerStatus {
    #[default]
    PendingContact,
    Notified,
    Claimed,
    Forfeited,
}

impl WinnerStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            WinnerStatus::PendingContact => "pending_contact",
            WinnerStatus::Notified => "notified",
            WinnerStatus::Claimed => "claimed",
            WinnerStatus::Forfeited => "forfeited",
        }
    }

    /// Parses a status from its string name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending_contact" => Some(WinnerStatus::PendingContact),
            "notified" => Some(WinnerStatus::Notified),
            "claimed" => Some(WinnerStatus::Claimed),
            "forfeited" => Some(WinnerStatus::Forfeited),
            _ => None,
        }
    }
}

impl std::fmt::Display for WinnerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One winning entry with its 1-based prize position.
///
/// Created only by [`RaffleStore::commit_draw`](crate::store::RaffleStore),
/// once per raffle, in a single batch. `prize_position` values per raffle
/// are unique and contiguous starting at 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Winner {
    pub id: WinnerId,
    pub raffle_id: RaffleId,
    pub entry_id: EntryId,
    pub user_id: UserId,
    pub prize_position: u32,
    pub status: WinnerStatus,
    pub drawn_at: DateTime<Utc>,
}

/// A selected entry handed to the draw commit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawPick {
    pub entry_id: EntryId,
    pub user_id: UserId,
    pub prize_position: u32,
}

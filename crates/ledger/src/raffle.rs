//! Raffle model and lifecycle.

use chrono::{DateTime, Utc};
use common::RaffleId;
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// The state of a raffle in its lifecycle.
///
/// State transitions only move forward:
/// ```text
/// Draft ──► Active ──► Closed ──► Drawn ──► Completed
/// ```
/// `Drawn` is only ever reached through the draw commit, which stores the
/// seed in the same write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RaffleStatus {
    /// Raffle is being configured, not yet visible to users.
    #[default]
    Draft,

    /// Raffle is accepting entries.
    Active,

    /// Entry window has ended, awaiting the draw.
    Closed,

    /// Winners have been selected and recorded.
    Drawn,

    /// Post-draw workflow finished (terminal state).
    Completed,
}

impl RaffleStatus {
    fn rank(&self) -> u8 {
        match self {
            RaffleStatus::Draft => 0,
            RaffleStatus::Active => 1,
            RaffleStatus::Closed => 2,
            RaffleStatus::Drawn => 3,
            RaffleStatus::Completed => 4,
        }
    }

    /// Returns true if the lifecycle may move from this status to `to`.
    /// Regressions are never allowed.
    pub fn can_advance_to(&self, to: RaffleStatus) -> bool {
        to.rank() > self.rank()
    }

    /// Returns true if entries may be issued in this status.
    pub fn accepts_entries(&self) -> bool {
        matches!(self, RaffleStatus::Active)
    }

    /// Returns true if a draw may be executed in this status.
    pub fn can_draw(&self) -> bool {
        matches!(self, RaffleStatus::Closed)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RaffleStatus::Draft => "draft",
            RaffleStatus::Active => "active",
            RaffleStatus::Closed => "closed",
            RaffleStatus::Drawn => "drawn",
            RaffleStatus::Completed => "completed",
        }
    }

    /// Parses a status from its string name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(RaffleStatus::Draft),
            "active" => Some(RaffleStatus::Active),
            "closed" => Some(RaffleStatus::Closed),
            "drawn" => Some(RaffleStatus::Drawn),
            "completed" => Some(RaffleStatus::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for RaffleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Eligibility policy for a raffle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EntryMode {
    /// Only users with an active subscription may enter.
    SubscribersOnly,

    /// Only purchased entries count; subscription grants are rejected.
    TicketsOnly,

    /// Both purchased and subscription-granted entries.
    #[default]
    Hybrid,
}

impl EntryMode {
    /// Returns the mode name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMode::SubscribersOnly => "subscribers_only",
            EntryMode::TicketsOnly => "tickets_only",
            EntryMode::Hybrid => "hybrid",
        }
    }

    /// Parses a mode from its string name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "subscribers_only" => Some(EntryMode::SubscribersOnly),
            "tickets_only" => Some(EntryMode::TicketsOnly),
            "hybrid" => Some(EntryMode::Hybrid),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntryMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A prize drawing with an entry window, eligibility mode, and winner count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Raffle {
    pub id: RaffleId,
    pub name: String,
    pub status: RaffleStatus,
    pub entry_mode: EntryMode,
    /// Per-user entry cap; None means unlimited.
    pub max_entries_per_user: Option<u32>,
    pub total_winners: u32,
    pub ticket_price: Money,
    /// Set exactly once, by the draw commit. Immutable afterwards.
    pub draw_seed: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Raffle {
    /// Creates a new raffle in `Draft` status.
    pub fn new(
        name: impl Into<String>,
        entry_mode: EntryMode,
        total_winners: u32,
        ticket_price: Money,
    ) -> Self {
        Self {
            id: RaffleId::new(),
            name: name.into(),
            status: RaffleStatus::default(),
            entry_mode,
            max_entries_per_user: None,
            total_winners,
            ticket_price,
            draw_seed: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the per-user entry cap.
    pub fn with_max_entries_per_user(mut self, limit: u32) -> Self {
        self.max_entries_per_user = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_moves_forward_only() {
        assert!(RaffleStatus::Draft.can_advance_to(RaffleStatus::Active));
        assert!(RaffleStatus::Active.can_advance_to(RaffleStatus::Closed));
        assert!(RaffleStatus::Closed.can_advance_to(RaffleStatus::Drawn));
        assert!(RaffleStatus::Drawn.can_advance_to(RaffleStatus::Completed));

        assert!(!RaffleStatus::Drawn.can_advance_to(RaffleStatus::Closed));
        assert!(!RaffleStatus::Active.can_advance_to(RaffleStatus::Draft));
        assert!(!RaffleStatus::Closed.can_advance_to(RaffleStatus::Closed));
    }

    #[test]
    fn test_only_active_accepts_entries() {
        assert!(RaffleStatus::Active.accepts_entries());
        assert!(!RaffleStatus::Draft.accepts_entries());
        assert!(!RaffleStatus::Closed.accepts_entries());
        assert!(!RaffleStatus::Drawn.accepts_entries());
        assert!(!RaffleStatus::Completed.accepts_entries());
    }

    #[test]
    fn test_only_closed_can_draw() {
        assert!(RaffleStatus::Closed.can_draw());
        assert!(!RaffleStatus::Active.can_draw());
        assert!(!RaffleStatus::Drawn.can_draw());
    }

    #[test]
    fn test_status_string_roundtrip() {
        for status in [
            RaffleStatus::Draft,
            RaffleStatus::Active,
            RaffleStatus::Closed,
            RaffleStatus::Drawn,
            RaffleStatus::Completed,
        ] {
            assert_eq!(RaffleStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(RaffleStatus::parse("unknown"), None);
    }

    #[test]
    fn test_entry_mode_string_roundtrip() {
        for mode in [
            EntryMode::SubscribersOnly,
            EntryMode::TicketsOnly,
            EntryMode::Hybrid,
        ] {
            assert_eq!(EntryMode::parse(mode.as_str()), Some(mode));
        }
        assert_eq!(EntryMode::parse("invite_only"), None);
    }

    #[test]
    fn test_new_raffle_defaults() {
        let raffle = Raffle::new("Spring Giveaway", EntryMode::Hybrid, 3, Money::from_cents(500));
        assert_eq!(raffle.status, RaffleStatus::Draft);
        assert!(raffle.draw_seed.is_none());
        assert!(raffle.max_entries_per_user.is_none());

        let capped = raffle.with_max_entries_per_user(2);
        assert_eq!(capped.max_entries_per_user, Some(2));
    }
}

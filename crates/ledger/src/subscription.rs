//! Subscription records used for eligibility checks and renewals.
//!
//! Plan catalogs, billing cycles, and subscription management live outside
//! this core; the ledger only needs to answer "does this user hold an
//! active, unexpired subscription right now".

use chrono::{DateTime, Utc};
use common::{SubscriptionId, UserId};
use serde::{Deserialize, Serialize};

/// The state of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    #[default]
    Active,
    Canceled,
    Expired,
}

impl SubscriptionStatus {
    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Active => "active",
            SubscriptionStatus::Canceled => "canceled",
            SubscriptionStatus::Expired => "expired",
        }
    }

    /// Parses a status from its string name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SubscriptionStatus::Active),
            "canceled" => Some(SubscriptionStatus::Canceled),
            "expired" => Some(SubscriptionStatus::Expired),
            _ => None,
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user's subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub user_id: UserId,
    pub status: SubscriptionStatus,
    /// None means no fixed expiry (renewed externally).
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Subscription {
    /// Creates an active subscription expiring at the given time.
    pub fn new(user_id: UserId, expires_at: Option<DateTime<Utc>>) -> Self {
        Self {
            id: SubscriptionId::new(),
            user_id,
            status: SubscriptionStatus::Active,
            expires_at,
            created_at: Utc::now(),
        }
    }

    /// Returns true if the subscription grants eligibility at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active
            && self.expires_at.is_none_or(|expires| expires > now)
    }
}

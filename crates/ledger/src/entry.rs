//! Raffle entry model.

use chrono::{DateTime, Utc};
use common::{EntryId, RaffleId, SubscriptionId, UserId};
use serde::{Deserialize, Serialize};

/// How an entry was acquired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntrySource {
    /// Direct one-off purchase inside the platform.
    ManualPurchase,

    /// Issued after an external processor checkout completed.
    ProcessorCheckout,

    /// Granted through an active subscription.
    Subscription,
}

impl EntrySource {
    /// Returns the source name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntrySource::ManualPurchase => "manual_purchase",
            EntrySource::ProcessorCheckout => "processor_checkout",
            EntrySource::Subscription => "subscription",
        }
    }

    /// Parses a source from its string name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual_purchase" => Some(EntrySource::ManualPurchase),
            "processor_checkout" => Some(EntrySource::ProcessorCheckout),
            "subscription" => Some(EntrySource::Subscription),
            _ => None,
        }
    }
}

impl std::fmt::Display for EntrySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One participation slot in a raffle.
///
/// Entries are immutable after creation except for the single
/// `is_winner` flip applied by the draw commit. They are created
/// exclusively by [`RaffleStore::issue_entry`](crate::store::RaffleStore).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub raffle_id: RaffleId,
    pub user_id: UserId,
    /// Unique within the raffle.
    pub ticket_number: String,
    pub source: EntrySource,
    pub is_winner: bool,
    pub created_at: DateTime<Utc>,
}

/// Request to issue one entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssueEntry {
    pub raffle_id: RaffleId,
    pub user_id: UserId,
    pub source: EntrySource,
    /// When present, the specific subscription granting the entry; the
    /// subscribers-only check validates this one instead of searching the
    /// user's subscriptions.
    pub subscription_id: Option<SubscriptionId>,
}

impl IssueEntry {
    /// Creates an issuance request with no subscription attribution.
    pub fn new(raffle_id: RaffleId, user_id: UserId, source: EntrySource) -> Self {
        Self {
            raffle_id,
            user_id,
            source,
            subscription_id: None,
        }
    }

    /// Attributes the entry to a specific subscription.
    pub fn from_subscription(
        raffle_id: RaffleId,
        user_id: UserId,
        subscription_id: SubscriptionId,
    ) -> Self {
        Self {
            raffle_id,
            user_id,
            source: EntrySource::Subscription,
            subscription_id: Some(subscription_id),
        }
    }
}

/// Formats the nth ticket of a raffle as its printed ticket number.
pub(crate) fn format_ticket_number(sequence: u64) -> String {
    format!("TKT-{:06}", sequence)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_string_roundtrip() {
        for source in [
            EntrySource::ManualPurchase,
            EntrySource::ProcessorCheckout,
            EntrySource::Subscription,
        ] {
            assert_eq!(EntrySource::parse(source.as_str()), Some(source));
        }
        assert_eq!(EntrySource::parse("gift"), None);
    }

    #[test]
    fn test_ticket_number_format() {
        assert_eq!(format_ticket_number(1), "TKT-000001");
        assert_eq!(format_ticket_number(233280), "TKT-233280");
    }

    #[test]
    fn test_from_subscription_sets_source() {
        let req = IssueEntry::from_subscription(
            RaffleId::new(),
            UserId::new(),
            SubscriptionId::new(),
        );
        assert_eq!(req.source, EntrySource::Subscription);
        assert!(req.subscription_id.is_some());
    }
}

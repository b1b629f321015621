//! Payment transaction model and lifecycle.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::{RaffleId, SubscriptionId, TransactionId, UserId};
use serde::{Deserialize, Serialize};

use crate::money::{Currency, Money};

/// The state of a payment transaction.
///
/// `Processing` is a reservation placeholder that exists only to win the
/// idempotency race before the external processor is called. `Pending` means
/// the processor resource exists and the outcome is awaited. The three
/// remaining states are terminal; `Completed` is reached exactly once, via
/// the compare-and-swap in
/// [`RaffleStore::complete_if_pending`](crate::store::RaffleStore::complete_if_pending).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    #[default]
    Processing,
    Pending,
    Completed,
    Failed,
    Canceled,
}

impl TransactionStatus {
    /// Returns true if no further transitions are possible.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Completed | TransactionStatus::Failed | TransactionStatus::Canceled
        )
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Processing => "processing",
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Canceled => "canceled",
        }
    }

    /// Parses a status from its string name.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "processing" => Some(TransactionStatus::Processing),
            "pending" => Some(TransactionStatus::Pending),
            "completed" => Some(TransactionStatus::Completed),
            "failed" => Some(TransactionStatus::Failed),
            "canceled" => Some(TransactionStatus::Canceled),
            _ => None,
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the transaction pays for.
///
/// The required correlation fields are carried here with full types; any
/// processor-specific extras go in the transaction's open `metadata` map,
/// never in new hard fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "transaction_type", rename_all = "snake_case")]
pub enum TransactionKind {
    /// Purchase of one or more tickets for a raffle.
    RaffleTicket {
        raffle_id: RaffleId,
        tickets_requested: u32,
    },

    /// A subscription payment (initial or renewal).
    Subscription { subscription_id: SubscriptionId },
}

impl TransactionKind {
    /// The raffle this transaction buys tickets for, if any.
    pub fn raffle_id(&self) -> Option<RaffleId> {
        match self {
            TransactionKind::RaffleTicket { raffle_id, .. } => Some(*raffle_id),
            TransactionKind::Subscription { .. } => None,
        }
    }

    /// The subscription this transaction pays for, if any.
    pub fn subscription_id(&self) -> Option<SubscriptionId> {
        match self {
            TransactionKind::RaffleTicket { .. } => None,
            TransactionKind::Subscription { subscription_id } => Some(*subscription_id),
        }
    }

    /// Number of entries a completed transaction of this kind issues.
    pub fn tickets_requested(&self) -> u32 {
        match self {
            TransactionKind::RaffleTicket {
                tickets_requested, ..
            } => *tickets_requested,
            TransactionKind::Subscription { .. } => 0,
        }
    }
}

/// The record tracking a monetary intent from creation to terminal outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentTransaction {
    pub id: TransactionId,
    pub user_id: UserId,
    pub kind: TransactionKind,
    pub amount: Money,
    pub currency: Currency,
    pub status: TransactionStatus,
    /// Caller-supplied deduplication token, unique when present.
    pub idempotency_key: Option<String>,
    /// Processor-assigned id: checkout session, payment intent, or
    /// subscription id.
    pub external_reference: Option<String>,
    /// Residual processor correlation data the core does not interpret.
    pub metadata: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentTransaction {
    /// Creates a transaction in `Processing` state, before the external
    /// processor has been called.
    pub fn new(
        user_id: UserId,
        kind: TransactionKind,
        amount: Money,
        currency: Currency,
        idempotency_key: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: TransactionId::new(),
            user_id,
            kind,
            amount,
            currency,
            status: TransactionStatus::default(),
            idempotency_key,
            external_reference: None,
            metadata: HashMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Ways a completion signal can identify its transaction, in the
/// coordinator's lookup priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionLocator {
    Id(TransactionId),
    ExternalReference(String),
    IdempotencyKey(String),
}

impl std::fmt::Display for TransactionLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionLocator::Id(id) => write!(f, "id={id}"),
            TransactionLocator::ExternalReference(r) => write!(f, "external_reference={r}"),
            TransactionLocator::IdempotencyKey(k) => write!(f, "idempotency_key={k}"),
        }
    }
}

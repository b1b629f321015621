use common::{RaffleId, TransactionId, UserId};
use thiserror::Error;

use crate::raffle::RaffleStatus;

/// Errors that can occur when interacting with the raffle ledgers.
///
/// Eligibility rejections (`RaffleNotActive`, `SubscriptionRequired`,
/// `MaxEntriesReached`, ...) are ordinary business outcomes and carry enough
/// detail for the caller to present a specific reason.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The raffle does not exist.
    #[error("Raffle not found: {0}")]
    RaffleNotFound(RaffleId),

    /// The raffle is not accepting entries.
    #[error("Raffle {raffle_id} is not active (status: {status})")]
    RaffleNotActive {
        raffle_id: RaffleId,
        status: RaffleStatus,
    },

    /// The raffle requires an active subscription to enter.
    #[error("User {0} has no active subscription")]
    SubscriptionRequired(UserId),

    /// The raffle only accepts purchased entries.
    #[error("Raffle {0} does not accept subscription entries")]
    SubscriptionEntriesNotAllowed(RaffleId),

    /// The user has reached the per-user entry cap for this raffle.
    #[error("Entry limit reached: {count} of {limit} entries used")]
    MaxEntriesReached { count: u32, limit: u32 },

    /// The payment transaction does not exist.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// A raffle status change would move the lifecycle backwards.
    #[error("Invalid raffle status transition: {from} -> {to}")]
    InvalidStatusTransition {
        from: RaffleStatus,
        to: RaffleStatus,
    },

    /// A concurrent writer invalidated this operation; the caller may retry.
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    /// A store-side consistency check failed; nothing was written.
    #[error("Integrity violation: {0}")]
    IntegrityViolation(String),

    /// Malformed input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for ledger operations.
pub type Result<T> = std::result::Result<T, LedgerError>;

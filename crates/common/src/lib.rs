//! Shared identifier types used across the raffle platform crates.

pub mod types;

pub use types::{EntryId, RaffleId, SubscriptionId, TransactionId, UserId, WinnerId};

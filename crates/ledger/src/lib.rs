//! Data layer for the raffle platform: the entry ledger and the payment
//! transaction ledger.
//!
//! Every check-then-write sequence the platform relies on (entry caps,
//! idempotency claims, the completion compare-and-swap, the draw commit)
//! is a single atomic operation behind the [`RaffleStore`] trait, because
//! the service runs as multiple stateless instances and cannot lean on
//! in-process locking.

pub mod entry;
pub mod error;
pub mod memory;
pub mod money;
pub mod postgres;
pub mod raffle;
pub mod store;
pub mod subscription;
pub mod transaction;
pub mod winner;

pub use entry::{Entry, EntrySource, IssueEntry};
pub use error::{LedgerError, Result};
pub use memory::InMemoryRaffleStore;
pub use money::{Currency, Money};
pub use postgres::PostgresRaffleStore;
pub use raffle::{EntryMode, Raffle, RaffleStatus};
pub use store::{RaffleStore, RaffleStoreExt};
pub use subscription::{Subscription, SubscriptionStatus};
pub use transaction::{
    PaymentTransaction, TransactionKind, TransactionLocator, TransactionStatus,
};
pub use winner::{DrawPick, Winner, WinnerStatus};

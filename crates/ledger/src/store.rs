use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{RaffleId, SubscriptionId, TransactionId, UserId};

use crate::{
    Entry, IssueEntry, PaymentTransaction, Raffle, RaffleStatus, Result, Subscription,
    TransactionLocator, Winner, winner::DrawPick,
};

/// Core trait for the raffle data store.
///
/// Every correctness guarantee of the platform lives behind this seam: the
/// service runs as multiple stateless instances, so check-then-write
/// sequences are atomic store-side operations (row locks, conditional
/// updates, unique constraints), never application-level locks. All
/// implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait RaffleStore: Send + Sync {
    // -- Raffles --

    /// Inserts a new raffle.
    async fn insert_raffle(&self, raffle: Raffle) -> Result<()>;

    /// Fetches a raffle by id.
    async fn get_raffle(&self, id: RaffleId) -> Result<Option<Raffle>>;

    /// Advances the raffle lifecycle.
    ///
    /// Fails with `InvalidStatusTransition` if the change would move the
    /// lifecycle backwards (or sideways), and rejects `Drawn` as a target:
    /// only [`commit_draw`](Self::commit_draw) produces a drawn raffle,
    /// because the seed must be stored in the same write.
    async fn advance_raffle_status(&self, id: RaffleId, to: RaffleStatus) -> Result<Raffle>;

    // -- Entry ledger --

    /// Issues one entry, atomically.
    ///
    /// The whole eligibility-check-then-insert sequence executes as a single
    /// atomic unit: raffle must exist and be active, subscribers-only
    /// raffles require an active subscription, tickets-only raffles reject
    /// subscription-sourced entries, and the per-user cap is enforced such
    /// that two concurrent calls at `count = limit - 1` cannot both
    /// succeed. The ticket number is allocated from a per-raffle sequence
    /// under the same protection.
    async fn issue_entry(&self, req: IssueEntry) -> Result<Entry>;

    /// Returns all entries for a raffle in creation order.
    async fn entries_for_raffle(&self, raffle_id: RaffleId) -> Result<Vec<Entry>>;

    /// Counts the entries a user holds in a raffle.
    async fn count_user_entries(&self, raffle_id: RaffleId, user_id: UserId) -> Result<u32>;

    // -- Payment transaction ledger --

    /// Claims the transaction's idempotency key, or returns the existing
    /// claim.
    ///
    /// If `txn.idempotency_key` is present and a transaction with that key
    /// already exists, the existing row is returned unchanged with
    /// `reused = true` (the caller then skips the external processor call).
    /// Otherwise `txn` is inserted as given and returned with
    /// `reused = false`.
    async fn claim_transaction(&self, txn: PaymentTransaction)
    -> Result<(PaymentTransaction, bool)>;

    /// Moves a `Processing` reservation to `Pending` once the external
    /// processor resource exists, recording its reference and correlation
    /// metadata.
    async fn activate_transaction(
        &self,
        id: TransactionId,
        external_reference: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()>;

    /// The completion compare-and-swap: sets status to `Completed` only if
    /// the current status is `Pending`, and reports whether the row was
    /// actually changed.
    ///
    /// Exactly one caller among any number of concurrent callers observes
    /// `true`. A `false` result is final for that call; retrying it cannot
    /// yield a different outcome.
    async fn complete_if_pending(&self, id: TransactionId) -> Result<bool>;

    /// Terminal failure transition. A no-op returning `false` when the
    /// transaction is already terminal; a failure signal arriving after a
    /// success signal never regresses a completed transaction.
    async fn mark_failed(&self, id: TransactionId) -> Result<bool>;

    /// Terminal cancellation transition, with the same no-op semantics as
    /// [`mark_failed`](Self::mark_failed).
    async fn mark_canceled(&self, id: TransactionId) -> Result<bool>;

    /// Merges descriptive metadata into a transaction. Allowed in any
    /// state, including `Completed`.
    async fn merge_metadata(
        &self,
        id: TransactionId,
        metadata: HashMap<String, String>,
    ) -> Result<()>;

    /// Looks a transaction up by one locator. The external-reference lookup
    /// also matches values in the metadata map.
    async fn find_transaction(
        &self,
        locator: &TransactionLocator,
    ) -> Result<Option<PaymentTransaction>>;

    // -- Subscriptions --

    /// Inserts or replaces a subscription.
    async fn upsert_subscription(&self, subscription: Subscription) -> Result<()>;

    /// Fetches a subscription by id.
    async fn get_subscription(&self, id: SubscriptionId) -> Result<Option<Subscription>>;

    /// Extends a subscription to the given expiry and reactivates it.
    /// Returns false if the subscription does not exist.
    async fn renew_subscription(&self, id: SubscriptionId, until: DateTime<Utc>) -> Result<bool>;

    // -- Draw --

    /// Applies a finished draw as one atomic transaction: flips
    /// `is_winner` on every picked entry, inserts one winner row per pick,
    /// sets the raffle status to `Drawn` and stores the seed.
    ///
    /// All-or-nothing; a partially applied draw is an integrity violation,
    /// not a retryable error. Fails without writing if the raffle is not
    /// `Closed`, already has a seed, or any pick no longer matches an
    /// un-won entry of the raffle.
    async fn commit_draw(
        &self,
        raffle_id: RaffleId,
        seed: &str,
        picks: &[DrawPick],
    ) -> Result<Vec<Winner>>;

    /// Returns a raffle's winners ordered by prize position.
    async fn winners_for_raffle(&self, raffle_id: RaffleId) -> Result<Vec<Winner>>;
}

/// Extension trait providing convenience methods for raffle stores.
#[async_trait]
pub trait RaffleStoreExt: RaffleStore {
    /// Fetches a raffle, failing with `RaffleNotFound` when absent.
    async fn require_raffle(&self, id: RaffleId) -> Result<Raffle> {
        self.get_raffle(id)
            .await?
            .ok_or(crate::LedgerError::RaffleNotFound(id))
    }

    /// Fetches a transaction by id, failing with `TransactionNotFound`
    /// when absent.
    async fn require_transaction(&self, id: TransactionId) -> Result<PaymentTransaction> {
        self.find_transaction(&TransactionLocator::Id(id))
            .await?
            .ok_or(crate::LedgerError::TransactionNotFound(id))
    }
}

// Blanket implementation for all RaffleStore implementations
impl<T: RaffleStore + ?Sized> RaffleStoreExt for T {}

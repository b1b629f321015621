use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{RaffleId, SubscriptionId, TransactionId, UserId, WinnerId};
use tokio::sync::RwLock;

use crate::{
    Entry, IssueEntry, LedgerError, PaymentTransaction, Raffle, RaffleStatus, Result,
    Subscription, TransactionLocator, TransactionStatus, Winner,
    entry::format_ticket_number,
    raffle::EntryMode,
    store::RaffleStore,
    winner::{DrawPick, WinnerStatus},
};

#[derive(Default)]
struct Tables {
    raffles: HashMap<RaffleId, Raffle>,
    ticket_counters: HashMap<RaffleId, u64>,
    entries: Vec<Entry>,
    transactions: HashMap<TransactionId, PaymentTransaction>,
    idempotency_index: HashMap<String, TransactionId>,
    subscriptions: HashMap<SubscriptionId, Subscription>,
    winners: Vec<Winner>,
}

impl Tables {
    fn user_has_active_subscription(
        &self,
        user_id: UserId,
        subscription_id: Option<SubscriptionId>,
        now: DateTime<Utc>,
    ) -> bool {
        match subscription_id {
            Some(id) => self
                .subscriptions
                .get(&id)
                .is_some_and(|s| s.user_id == user_id && s.is_active_at(now)),
            None => self
                .subscriptions
                .values()
                .any(|s| s.user_id == user_id && s.is_active_at(now)),
        }
    }
}

/// In-memory raffle store implementation for testing and development.
///
/// A single `RwLock` over the whole table set stands in for the database's
/// transactional guarantees: every check-then-write operation holds the
/// write guard for its full duration, so concurrent callers observe the
/// same atomicity the PostgreSQL implementation gets from row locks and
/// conditional updates.
#[derive(Clone, Default)]
pub struct InMemoryRaffleStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryRaffleStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of entries stored, across all raffles.
    pub async fn entry_count(&self) -> usize {
        self.tables.read().await.entries.len()
    }

    /// Clears all tables.
    pub async fn clear(&self) {
        let mut tables = self.tables.write().await;
        *tables = Tables::default();
    }
}

#[async_trait]
impl RaffleStore for InMemoryRaffleStore {
    async fn insert_raffle(&self, raffle: Raffle) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.raffles.insert(raffle.id, raffle);
        Ok(())
    }

    async fn get_raffle(&self, id: RaffleId) -> Result<Option<Raffle>> {
        Ok(self.tables.read().await.raffles.get(&id).cloned())
    }

    async fn advance_raffle_status(&self, id: RaffleId, to: RaffleStatus) -> Result<Raffle> {
        let mut tables = self.tables.write().await;
        let raffle = tables
            .raffles
            .get_mut(&id)
            .ok_or(LedgerError::RaffleNotFound(id))?;

        if to == RaffleStatus::Drawn || !raffle.status.can_advance_to(to) {
            return Err(LedgerError::InvalidStatusTransition {
                from: raffle.status,
                to,
            });
        }

        raffle.status = to;
        Ok(raffle.clone())
    }

    async fn issue_entry(&self, req: IssueEntry) -> Result<Entry> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;

        let raffle = tables
            .raffles
            .get(&req.raffle_id)
            .ok_or(LedgerError::RaffleNotFound(req.raffle_id))?;

        if !raffle.status.accepts_entries() {
            return Err(LedgerError::RaffleNotActive {
                raffle_id: raffle.id,
                status: raffle.status,
            });
        }

        match raffle.entry_mode {
            EntryMode::SubscribersOnly => {
                if !tables.user_has_active_subscription(req.user_id, req.subscription_id, now) {
                    return Err(LedgerError::SubscriptionRequired(req.user_id));
                }
            }
            EntryMode::TicketsOnly => {
                if req.source == crate::EntrySource::Subscription {
                    return Err(LedgerError::SubscriptionEntriesNotAllowed(req.raffle_id));
                }
            }
            EntryMode::Hybrid => {}
        }

        let max_entries = tables.raffles[&req.raffle_id].max_entries_per_user;
        if let Some(limit) = max_entries {
            let count = tables
                .entries
                .iter()
                .filter(|e| e.raffle_id == req.raffle_id && e.user_id == req.user_id)
                .count() as u32;
            if count >= limit {
                return Err(LedgerError::MaxEntriesReached { count, limit });
            }
        }

        let counter = tables.ticket_counters.entry(req.raffle_id).or_insert(0);
        *counter += 1;
        let ticket_number = format_ticket_number(*counter);

        let entry = Entry {
            id: common::EntryId::new(),
            raffle_id: req.raffle_id,
            user_id: req.user_id,
            ticket_number,
            source: req.source,
            is_winner: false,
            created_at: now,
        };
        tables.entries.push(entry.clone());

        tracing::debug!(raffle_id = %req.raffle_id, user_id = %req.user_id,
            ticket = %entry.ticket_number, "entry issued");
        Ok(entry)
    }

    async fn entries_for_raffle(&self, raffle_id: RaffleId) -> Result<Vec<Entry>> {
        let tables = self.tables.read().await;
        Ok(tables
            .entries
            .iter()
            .filter(|e| e.raffle_id == raffle_id)
            .cloned()
            .collect())
    }

    async fn count_user_entries(&self, raffle_id: RaffleId, user_id: UserId) -> Result<u32> {
        let tables = self.tables.read().await;
        Ok(tables
            .entries
            .iter()
            .filter(|e| e.raffle_id == raffle_id && e.user_id == user_id)
            .count() as u32)
    }

    async fn claim_transaction(
        &self,
        txn: PaymentTransaction,
    ) -> Result<(PaymentTransaction, bool)> {
        let mut tables = self.tables.write().await;

        if let Some(ref key) = txn.idempotency_key
            && let Some(existing_id) = tables.idempotency_index.get(key)
        {
            let existing = tables.transactions[existing_id].clone();
            return Ok((existing, true));
        }

        if let Some(ref key) = txn.idempotency_key {
            tables.idempotency_index.insert(key.clone(), txn.id);
        }
        tables.transactions.insert(txn.id, txn.clone());
        Ok((txn, false))
    }

    async fn activate_transaction(
        &self,
        id: TransactionId,
        external_reference: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let txn = tables
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;

        if txn.status != TransactionStatus::Processing {
            return Err(LedgerError::IntegrityViolation(format!(
                "cannot activate transaction {id} in status {}",
                txn.status
            )));
        }

        txn.status = TransactionStatus::Pending;
        txn.external_reference = Some(external_reference.to_string());
        txn.metadata.extend(metadata);
        txn.updated_at = Utc::now();
        Ok(())
    }

    async fn complete_if_pending(&self, id: TransactionId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let txn = tables
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;

        if txn.status != TransactionStatus::Pending {
            return Ok(false);
        }

        txn.status = TransactionStatus::Completed;
        txn.updated_at = Utc::now();
        Ok(true)
    }

    async fn mark_failed(&self, id: TransactionId) -> Result<bool> {
        self.mark_terminal(id, TransactionStatus::Failed).await
    }

    async fn mark_canceled(&self, id: TransactionId) -> Result<bool> {
        self.mark_terminal(id, TransactionStatus::Canceled).await
    }

    async fn merge_metadata(
        &self,
        id: TransactionId,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let mut tables = self.tables.write().await;
        let txn = tables
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;
        txn.metadata.extend(metadata);
        txn.updated_at = Utc::now();
        Ok(())
    }

    async fn find_transaction(
        &self,
        locator: &TransactionLocator,
    ) -> Result<Option<PaymentTransaction>> {
        let tables = self.tables.read().await;
        let found = match locator {
            TransactionLocator::Id(id) => tables.transactions.get(id).cloned(),
            TransactionLocator::ExternalReference(reference) => tables
                .transactions
                .values()
                .find(|t| {
                    t.external_reference.as_deref() == Some(reference.as_str())
                        || t.metadata.values().any(|v| v == reference)
                })
                .cloned(),
            TransactionLocator::IdempotencyKey(key) => tables
                .idempotency_index
                .get(key)
                .and_then(|id| tables.transactions.get(id))
                .cloned(),
        };
        Ok(found)
    }

    async fn upsert_subscription(&self, subscription: Subscription) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.subscriptions.insert(subscription.id, subscription);
        Ok(())
    }

    async fn get_subscription(&self, id: SubscriptionId) -> Result<Option<Subscription>> {
        Ok(self.tables.read().await.subscriptions.get(&id).cloned())
    }

    async fn renew_subscription(&self, id: SubscriptionId, until: DateTime<Utc>) -> Result<bool> {
        let mut tables = self.tables.write().await;
        match tables.subscriptions.get_mut(&id) {
            Some(subscription) => {
                subscription.status = crate::SubscriptionStatus::Active;
                subscription.expires_at = Some(until);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn commit_draw(
        &self,
        raffle_id: RaffleId,
        seed: &str,
        picks: &[DrawPick],
    ) -> Result<Vec<Winner>> {
        let now = Utc::now();
        let mut tables = self.tables.write().await;

        let raffle = tables
            .raffles
            .get(&raffle_id)
            .ok_or(LedgerError::RaffleNotFound(raffle_id))?;

        if !raffle.status.can_draw() {
            return Err(LedgerError::IntegrityViolation(format!(
                "raffle {raffle_id} is {}, expected closed",
                raffle.status
            )));
        }
        if raffle.draw_seed.is_some() {
            return Err(LedgerError::IntegrityViolation(format!(
                "raffle {raffle_id} already has a draw seed"
            )));
        }

        let mut positions: Vec<u32> = picks.iter().map(|p| p.prize_position).collect();
        positions.sort_unstable();
        if positions.is_empty() || positions != (1..=picks.len() as u32).collect::<Vec<_>>() {
            return Err(LedgerError::IntegrityViolation(
                "prize positions must be contiguous starting at 1".to_string(),
            ));
        }

        // Validate every pick before mutating anything; the draw is
        // all-or-nothing.
        let mut indices = Vec::with_capacity(picks.len());
        for pick in picks {
            let index = tables
                .entries
                .iter()
                .position(|e| e.id == pick.entry_id && e.raffle_id == raffle_id && !e.is_winner)
                .ok_or_else(|| {
                    LedgerError::IntegrityViolation(format!(
                        "entry {} is not an un-won entry of raffle {raffle_id}",
                        pick.entry_id
                    ))
                })?;
            indices.push(index);
        }

        let mut winners = Vec::with_capacity(picks.len());
        for (pick, index) in picks.iter().zip(indices) {
            tables.entries[index].is_winner = true;
            winners.push(Winner {
                id: WinnerId::new(),
                raffle_id,
                entry_id: pick.entry_id,
                user_id: pick.user_id,
                prize_position: pick.prize_position,
                status: WinnerStatus::default(),
                drawn_at: now,
            });
        }
        tables.winners.extend(winners.iter().cloned());

        if let Some(raffle) = tables.raffles.get_mut(&raffle_id) {
            raffle.status = RaffleStatus::Drawn;
            raffle.draw_seed = Some(seed.to_string());
        }

        Ok(winners)
    }

    async fn winners_for_raffle(&self, raffle_id: RaffleId) -> Result<Vec<Winner>> {
        let tables = self.tables.read().await;
        let mut winners: Vec<_> = tables
            .winners
            .iter()
            .filter(|w| w.raffle_id == raffle_id)
            .cloned()
            .collect();
        winners.sort_by_key(|w| w.prize_position);
        Ok(winners)
    }
}

impl InMemoryRaffleStore {
    async fn mark_terminal(&self, id: TransactionId, to: TransactionStatus) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let txn = tables
            .transactions
            .get_mut(&id)
            .ok_or(LedgerError::TransactionNotFound(id))?;

        if txn.status.is_terminal() {
            return Ok(false);
        }

        txn.status = to;
        txn.updated_at = Utc::now();
        Ok(true)
    }
}

//! Reconciliation coordinator driving exactly-once payment settlement.

use chrono::{Duration, Utc};
use ledger::{
    Currency, EntrySource, IssueEntry, Money, PaymentTransaction, RaffleStore, RaffleStoreExt,
    TransactionKind,
};

use crate::error::ReconcileError;
use crate::processor::{CheckoutRequest, PaymentProcessor};
use crate::signal::{CheckoutOutcome, CompletionOutcome, CompletionSignal, ResolvedStatus};

/// How far a completed subscription payment extends the subscription.
const SUBSCRIPTION_RENEWAL_DAYS: i64 = 30;

/// Request to create (or idempotently reuse) a payment transaction.
#[derive(Debug, Clone)]
pub struct CreateTransaction {
    pub user_id: common::UserId,
    pub kind: TransactionKind,
    pub amount: Money,
    pub currency: Currency,
    pub idempotency_key: Option<String>,
}

/// Consumes completion signals and drives exactly-once settlement.
///
/// Two independent triggers may report the same payment outcome: the
/// processor's asynchronous webhook and the client's synchronous finalize
/// call after a redirect. Both funnel into [`apply_completion`], which
/// reconciles them in any order, including duplicate delivery, through the
/// store's completion compare-and-swap. The coordinator holds no state of
/// its own; it is a pure function of the injected store and processor.
///
/// [`apply_completion`]: ReconcileCoordinator::apply_completion
pub struct ReconcileCoordinator<S, P>
where
    S: RaffleStore,
    P: PaymentProcessor,
{
    store: S,
    processor: P,
}

impl<S, P> ReconcileCoordinator<S, P>
where
    S: RaffleStore,
    P: PaymentProcessor,
{
    /// Creates a new reconciliation coordinator.
    pub fn new(store: S, processor: P) -> Self {
        Self { store, processor }
    }

    /// Creates a transaction and opens a processor checkout, or returns the
    /// existing transaction for a reused idempotency key.
    ///
    /// The transaction row is claimed in `Processing` state before the
    /// processor is called, so a retry with the same key finds the claim
    /// and never opens a second checkout. A processor failure marks the
    /// transaction `Failed`; no entries are ever issued for that attempt.
    #[tracing::instrument(skip(self, req), fields(user_id = %req.user_id))]
    pub async fn create_or_reuse(
        &self,
        req: CreateTransaction,
    ) -> Result<CheckoutOutcome, ReconcileError> {
        if let TransactionKind::RaffleTicket {
            tickets_requested, ..
        } = req.kind
            && tickets_requested == 0
        {
            return Err(ReconcileError::Validation(
                "tickets_requested must be at least 1".to_string(),
            ));
        }
        if !req.amount.is_positive() {
            return Err(ReconcileError::Validation(
                "amount must be positive".to_string(),
            ));
        }

        let txn = PaymentTransaction::new(
            req.user_id,
            req.kind,
            req.amount,
            req.currency.clone(),
            req.idempotency_key,
        );
        let (txn, reused) = self.store.claim_transaction(txn).await?;

        if reused {
            tracing::info!(transaction_id = %txn.id,
                "idempotency key already claimed, returning existing transaction");
            metrics::counter!("transactions_reused_total").increment(1);
            return Ok(CheckoutOutcome {
                transaction: txn,
                reused: true,
            });
        }
        metrics::counter!("transactions_created_total").increment(1);

        let description = match &txn.kind {
            TransactionKind::RaffleTicket {
                tickets_requested, ..
            } => format!("{tickets_requested} raffle ticket(s)"),
            TransactionKind::Subscription { .. } => "subscription payment".to_string(),
        };
        let checkout = CheckoutRequest {
            transaction_id: txn.id,
            user_id: txn.user_id,
            amount: txn.amount,
            currency: req.currency,
            description,
        };

        match self.processor.create_checkout(checkout).await {
            Ok(resource) => {
                let mut metadata = resource.metadata;
                metadata.insert("transaction_id".to_string(), txn.id.to_string());
                self.store
                    .activate_transaction(txn.id, &resource.reference, metadata)
                    .await?;

                let transaction = self.store.require_transaction(txn.id).await?;
                Ok(CheckoutOutcome {
                    transaction,
                    reused: false,
                })
            }
            Err(e) => {
                tracing::warn!(transaction_id = %txn.id, error = %e, "processor checkout failed");
                metrics::counter!("transactions_failed_total").increment(1);
                self.store.mark_failed(txn.id).await?;
                Err(e)
            }
        }
    }

    /// Applies a completion signal exactly once.
    ///
    /// Locates the transaction in priority order (embedded transaction id,
    /// then external reference, then idempotency key), attempts the
    /// completion compare-and-swap, and settles the transaction's effect
    /// only if this caller won. Losing the race, or re-delivering a signal
    /// for an already-terminal transaction, is the expected outcome of
    /// duplicate delivery and returns a non-applied outcome, not an error.
    #[tracing::instrument(skip(self, signal), fields(resolved = ?signal.resolved))]
    pub async fn apply_completion(
        &self,
        signal: CompletionSignal,
    ) -> Result<CompletionOutcome, ReconcileError> {
        let Some(txn) = self.locate(&signal).await? else {
            // A signal never fabricates a transaction; only the request
            // path that originated the payment creates them.
            tracing::warn!("completion signal matched no transaction, dropping");
            metrics::counter!("completions_unmatched_total").increment(1);
            return Ok(CompletionOutcome::Unmatched);
        };

        match signal.resolved {
            ResolvedStatus::Failed => {
                let changed = self.store.mark_failed(txn.id).await?;
                Ok(CompletionOutcome::MarkedTerminal {
                    transaction_id: txn.id,
                    status: ledger::TransactionStatus::Failed,
                    changed,
                })
            }
            ResolvedStatus::Canceled => {
                let changed = self.store.mark_canceled(txn.id).await?;
                Ok(CompletionOutcome::MarkedTerminal {
                    transaction_id: txn.id,
                    status: ledger::TransactionStatus::Canceled,
                    changed,
                })
            }
            ResolvedStatus::Succeeded => {
                if !self.store.complete_if_pending(txn.id).await? {
                    tracing::info!(transaction_id = %txn.id,
                        "transaction already settled by another path");
                    metrics::counter!("completions_duplicate_total").increment(1);
                    return Ok(CompletionOutcome::AlreadySettled {
                        transaction_id: txn.id,
                    });
                }

                let entries_issued = self.settle(&txn).await?;
                metrics::counter!("completions_applied_total").increment(1);
                tracing::info!(transaction_id = %txn.id, entries_issued, "completion applied");
                Ok(CompletionOutcome::Applied {
                    transaction_id: txn.id,
                    entries_requested: txn.kind.tickets_requested(),
                    entries_issued,
                })
            }
        }
    }

    /// Applies the effect of a freshly completed transaction: the entry
    /// batch for a ticket purchase, or the renewal for a subscription
    /// payment. Called exactly once per transaction, by the CAS winner.
    async fn settle(&self, txn: &PaymentTransaction) -> Result<u32, ReconcileError> {
        match &txn.kind {
            TransactionKind::RaffleTicket {
                raffle_id,
                tickets_requested,
            } => {
                let mut issued = 0;
                for _ in 0..*tickets_requested {
                    let request =
                        IssueEntry::new(*raffle_id, txn.user_id, EntrySource::ProcessorCheckout);
                    match self.store.issue_entry(request).await {
                        Ok(_) => issued += 1,
                        Err(e) => {
                            // Entries already issued in this batch stay:
                            // each is independently valid, and revoking a
                            // paid-for entry is worse than a short count.
                            tracing::warn!(transaction_id = %txn.id, issued,
                                requested = tickets_requested, error = %e,
                                "entry batch stopped early");
                            metrics::counter!("entry_batches_partial_total").increment(1);
                            break;
                        }
                    }
                }
                metrics::counter!("entries_issued_total").increment(u64::from(issued));
                Ok(issued)
            }
            TransactionKind::Subscription { subscription_id } => {
                let until = Utc::now() + Duration::days(SUBSCRIPTION_RENEWAL_DAYS);
                if !self.store.renew_subscription(*subscription_id, until).await? {
                    tracing::warn!(transaction_id = %txn.id, %subscription_id,
                        "subscription payment completed for unknown subscription");
                }
                Ok(0)
            }
        }
    }

    async fn locate(
        &self,
        signal: &CompletionSignal,
    ) -> Result<Option<PaymentTransaction>, ReconcileError> {
        for locator in signal.locators() {
            if let Some(txn) = self.store.find_transaction(&locator).await? {
                return Ok(Some(txn));
            }
        }
        Ok(None)
    }
}

//! Completion signals and reconciliation outcomes.

use common::TransactionId;
use ledger::{PaymentTransaction, TransactionLocator, TransactionStatus};
use serde::{Deserialize, Serialize};

/// The outcome the payment processor reported for a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedStatus {
    Succeeded,
    Failed,
    Canceled,
}

/// A "payment resolved" notification, delivered by the processor webhook
/// or by the client-initiated finalize call after a redirect.
///
/// Both paths produce the same signal and both may arrive, in any order,
/// any number of times; the coordinator applies the effect exactly once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionSignal {
    pub transaction_id: Option<TransactionId>,
    pub external_reference: Option<String>,
    pub idempotency_key: Option<String>,
    pub resolved: ResolvedStatus,
}

impl CompletionSignal {
    /// Creates a signal with no identifying fields; attach at least one
    /// with the `with_*` builders.
    pub fn new(resolved: ResolvedStatus) -> Self {
        Self {
            transaction_id: None,
            external_reference: None,
            idempotency_key: None,
            resolved,
        }
    }

    /// Identifies the transaction by its platform id (highest priority,
    /// embedded in processor metadata at creation time).
    pub fn with_transaction_id(mut self, id: TransactionId) -> Self {
        self.transaction_id = Some(id);
        self
    }

    /// Identifies the transaction by the processor's session or
    /// payment-intent id.
    pub fn with_external_reference(mut self, reference: impl Into<String>) -> Self {
        self.external_reference = Some(reference.into());
        self
    }

    /// Identifies the transaction by the caller's idempotency key
    /// (lowest priority).
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Locators for this signal in lookup priority order.
    pub fn locators(&self) -> Vec<TransactionLocator> {
        let mut locators = Vec::new();
        if let Some(id) = self.transaction_id {
            locators.push(TransactionLocator::Id(id));
        }
        if let Some(ref reference) = self.external_reference {
            locators.push(TransactionLocator::ExternalReference(reference.clone()));
        }
        if let Some(ref key) = self.idempotency_key {
            locators.push(TransactionLocator::IdempotencyKey(key.clone()));
        }
        locators
    }
}

/// Result of a checkout creation request.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    /// The claimed or newly activated transaction, including its
    /// `external_reference` so a reusing caller can resume the existing
    /// checkout instead of opening another one.
    pub transaction: PaymentTransaction,
    /// True when an existing transaction with the same idempotency key
    /// was returned unchanged.
    pub reused: bool,
}

/// Result of applying a completion signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompletionOutcome {
    /// This caller won the completion race; the transaction moved to
    /// `Completed` and its effect (entry batch or subscription renewal)
    /// was applied.
    Applied {
        transaction_id: TransactionId,
        entries_requested: u32,
        entries_issued: u32,
    },

    /// Another caller already settled the transaction (duplicate webhook
    /// delivery, or the other trigger got there first). Expected, not an
    /// error.
    AlreadySettled { transaction_id: TransactionId },

    /// A failure or cancellation signal moved (or tried to move) the
    /// transaction to a terminal status. `changed` is false when the
    /// transaction was already terminal.
    MarkedTerminal {
        transaction_id: TransactionId,
        status: TransactionStatus,
        changed: bool,
    },

    /// No transaction matched the signal. The signal is dropped; a
    /// notification never fabricates a transaction.
    Unmatched,
}

impl CompletionOutcome {
    /// True if this invocation changed persisted state.
    pub fn applied(&self) -> bool {
        matches!(
            self,
            CompletionOutcome::Applied { .. }
                | CompletionOutcome::MarkedTerminal { changed: true, .. }
        )
    }

    /// Number of entries issued by this invocation.
    pub fn entries_issued(&self) -> u32 {
        match self {
            CompletionOutcome::Applied { entries_issued, .. } => *entries_issued,
            _ => 0,
        }
    }
}

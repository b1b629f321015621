//! Reconciliation error types.

use ledger::LedgerError;
use thiserror::Error;

/// Errors that can occur while creating or reconciling payment
/// transactions.
///
/// Duplicate signals and lost completion races are not errors; they come
/// back as [`CompletionOutcome`](crate::CompletionOutcome) variants.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Malformed request input.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The external payment processor call failed or timed out.
    #[error("Payment processor error: {0}")]
    ExternalService(String),

    /// Ledger error.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Convenience type alias for reconciliation results.
pub type Result<T> = std::result::Result<T, ReconcileError>;

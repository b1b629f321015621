//! Reconciliation of payment completion signals.
//!
//! A payment's success can be reported twice: once by the processor's
//! webhook and once by the client's finalize call after a redirect. This
//! crate turns either report into exactly one entry-issuance batch (or
//! subscription renewal), regardless of delivery order or duplication,
//! by funnelling every signal through the ledger's completion
//! compare-and-swap.

pub mod coordinator;
pub mod error;
pub mod processor;
pub mod signal;

pub use coordinator::{CreateTransaction, ReconcileCoordinator};
pub use error::{ReconcileError, Result};
pub use processor::{
    CheckoutRequest, CheckoutResource, InMemoryPaymentProcessor, PaymentProcessor,
};
pub use signal::{CheckoutOutcome, CompletionOutcome, CompletionSignal, ResolvedStatus};

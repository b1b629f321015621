//! Payment processor trait and in-memory implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{TransactionId, UserId};
use ledger::{Currency, Money};

use crate::error::ReconcileError;

/// Request to open a checkout with the external processor.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub transaction_id: TransactionId,
    pub user_id: UserId,
    pub amount: Money,
    pub currency: Currency,
    pub description: String,
}

/// A checkout resource created on the processor side.
#[derive(Debug, Clone)]
pub struct CheckoutResource {
    /// Processor-assigned id (checkout session / payment intent).
    pub reference: String,
    /// URL the user is redirected to for payment.
    pub checkout_url: String,
    /// Correlation data the processor echoes back in notifications.
    pub metadata: HashMap<String, String>,
}

/// Trait for external payment processor operations.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Creates a checkout resource for a claimed transaction.
    async fn create_checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutResource, ReconcileError>;
}

#[derive(Debug, Default)]
struct InMemoryProcessorState {
    sessions: HashMap<String, CheckoutRequest>,
    next_id: u32,
    fail_on_checkout: bool,
}

/// In-memory payment processor for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentProcessor {
    state: Arc<RwLock<InMemoryProcessorState>>,
}

impl InMemoryPaymentProcessor {
    /// Creates a new in-memory payment processor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the processor to fail on the next checkout call.
    pub fn set_fail_on_checkout(&self, fail: bool) {
        self.state.write().unwrap().fail_on_checkout = fail;
    }

    /// Returns the number of checkout sessions created.
    pub fn checkout_count(&self) -> usize {
        self.state.read().unwrap().sessions.len()
    }

    /// Returns true if a session exists with the given reference.
    pub fn has_session(&self, reference: &str) -> bool {
        self.state.read().unwrap().sessions.contains_key(reference)
    }
}

#[async_trait]
impl PaymentProcessor for InMemoryPaymentProcessor {
    async fn create_checkout(
        &self,
        request: CheckoutRequest,
    ) -> Result<CheckoutResource, ReconcileError> {
        let mut state = self.state.write().unwrap();

        if state.fail_on_checkout {
            return Err(ReconcileError::ExternalService(
                "Checkout declined".to_string(),
            ));
        }

        state.next_id += 1;
        let reference = format!("cs_{:04}", state.next_id);
        let metadata = HashMap::from([(
            "payment_intent".to_string(),
            format!("pi_{:04}", state.next_id),
        )]);
        state.sessions.insert(reference.clone(), request);

        Ok(CheckoutResource {
            checkout_url: format!("https://checkout.example/{reference}"),
            reference,
            metadata,
        })
    }
}

//! HTTP route handlers.

pub mod entries;
pub mod health;
pub mod metrics;
pub mod raffles;
pub mod subscriptions;
pub mod transactions;

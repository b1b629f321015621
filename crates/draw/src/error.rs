//! Draw error types.

use common::RaffleId;
use ledger::{LedgerError, RaffleStatus};
use thiserror::Error;

/// Errors that can occur when executing a draw.
///
/// Every variant aborts before any persisted state is touched; the raffle
/// is left exactly as it was.
#[derive(Debug, Error)]
pub enum DrawError {
    /// The raffle does not exist.
    #[error("Raffle not found: {0}")]
    RaffleNotFound(RaffleId),

    /// Draws only run against a closed raffle.
    #[error("Raffle {raffle_id} is {status}, expected closed")]
    RaffleNotClosed {
        raffle_id: RaffleId,
        status: RaffleStatus,
    },

    /// No entry passes the raffle's eligibility filter.
    #[error("Raffle {0} has no eligible entries")]
    NoEligibleEntries(RaffleId),

    /// Ledger error.
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Convenience type alias for draw results.
pub type Result<T> = std::result::Result<T, DrawError>;

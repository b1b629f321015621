//! Draw engine for the raffle platform.
//!
//! Reads finalized entries for a closed raffle, deterministically selects
//! winners from a recorded seed, commits the result atomically, and can
//! replay a prior selection for audit.

pub mod engine;
pub mod error;
pub mod selection;

pub use engine::{DrawEngine, DrawOutcome, source_eligible};
pub use error::{DrawError, Result};
pub use selection::{generate_seed, select_winners, verify};

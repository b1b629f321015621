//! Deterministic winner selection.
//!
//! Selection is parameterized entirely by the eligible entry list (in its
//! original order) and a recorded seed string, so a stored draw can be
//! replayed and audited after the fact. The generator is a small
//! linear-congruential sequence seeded from the sum of the seed string's
//! character codes; it is not cryptographic, matching the platform's
//! recorded draws.

use chrono::Utc;
use ledger::{Entry, Winner};

const LCG_MULTIPLIER: u64 = 9301;
const LCG_INCREMENT: u64 = 49297;
const LCG_MODULUS: u64 = 233280;

fn seed_state(seed: &str) -> u64 {
    seed.chars().map(|c| c as u64).sum()
}

fn next_state(state: u64) -> u64 {
    (state * LCG_MULTIPLIER + LCG_INCREMENT) % LCG_MODULUS
}

/// Generates a fresh draw seed: a high-resolution timestamp plus a random
/// component.
pub fn generate_seed() -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    let random: u32 = rand::random();
    format!("{nanos}-{random:08x}")
}

/// Selects up to `total_winners` entries from `entries`, deterministically
/// for a given seed.
///
/// Returns the winners in draw order (the first pick takes prize position
/// 1). When `total_winners` exceeds the entry count, every entry is
/// selected. Pure: repeated calls with identical inputs return identical
/// ordered results.
pub fn select_winners<'a>(entries: &'a [Entry], total_winners: u32, seed: &str) -> Vec<&'a Entry> {
    let mut pool: Vec<&Entry> = entries.iter().collect();
    let count = (total_winners as usize).min(pool.len());
    let mut state = seed_state(seed);
    let mut picked = Vec::with_capacity(count);

    for _ in 0..count {
        state = next_state(state);
        let index = (state as usize) % pool.len();
        picked.push(pool.remove(index));
    }
    picked
}

/// Replays a recorded draw and checks it against the stored winner list.
///
/// `entries` must be the eligible set the draw ran against, in its
/// original order; `winners` the recorded list. Returns true iff a re-run
/// with `seed` reproduces exactly the recorded entries with contiguous
/// prize positions starting at 1. Side-effect free.
pub fn verify(entries: &[Entry], winners: &[Winner], seed: &str) -> bool {
    if winners.is_empty() {
        return false;
    }

    let replay = select_winners(entries, winners.len() as u32, seed);
    if replay.len() != winners.len() {
        return false;
    }

    winners
        .iter()
        .zip(replay.iter())
        .enumerate()
        .all(|(position, (winner, entry))| {
            winner.entry_id == entry.id && winner.prize_position == position as u32 + 1
        })
}

//! Draw engine: precondition checks, eligibility filtering, and the
//! atomic draw commit.

use common::RaffleId;
use ledger::{DrawPick, Entry, EntryMode, EntrySource, RaffleStore, Winner};

use crate::error::{DrawError, Result};
use crate::selection;

/// Result of an executed draw.
#[derive(Debug, Clone)]
pub struct DrawOutcome {
    pub raffle_id: RaffleId,
    /// Winners ordered by prize position.
    pub winners: Vec<Winner>,
    pub draw_seed: String,
    /// Size of the eligible entry pool the draw ran against.
    pub total_participants: u32,
    /// Number of winners actually selected (the pool size caps it).
    pub total_winners: u32,
}

/// Returns true if an entry of the given source participates in a draw
/// under the given entry mode.
pub fn source_eligible(mode: EntryMode, source: EntrySource) -> bool {
    match mode {
        EntryMode::SubscribersOnly => source == EntrySource::Subscription,
        EntryMode::TicketsOnly => source != EntrySource::Subscription,
        EntryMode::Hybrid => true,
    }
}

/// Executes draws against closed raffles.
///
/// A pure function of the injected store: it reads the eligible entries,
/// runs the deterministic selection, and hands the picks to the store's
/// atomic draw commit. Any precondition failure aborts before a single
/// write.
pub struct DrawEngine<S: RaffleStore> {
    store: S,
}

impl<S: RaffleStore> DrawEngine<S> {
    /// Creates a new draw engine with the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Executes the draw for a raffle.
    ///
    /// Preconditions: the raffle exists, is `Closed`, and has at least one
    /// eligible entry. On success the raffle is `Drawn` with its seed
    /// stored, the chosen entries carry `is_winner = true`, and one winner
    /// row exists per pick, all applied as one atomic transaction.
    #[tracing::instrument(skip(self))]
    pub async fn execute(&self, raffle_id: RaffleId) -> Result<DrawOutcome> {
        let start = std::time::Instant::now();
        metrics::counter!("draws_total").increment(1);

        let raffle = self
            .store
            .get_raffle(raffle_id)
            .await?
            .ok_or(DrawError::RaffleNotFound(raffle_id))?;

        if !raffle.status.can_draw() {
            return Err(DrawError::RaffleNotClosed {
                raffle_id,
                status: raffle.status,
            });
        }

        let entries = self.store.entries_for_raffle(raffle_id).await?;
        let eligible: Vec<Entry> = entries
            .into_iter()
            .filter(|e| !e.is_winner && source_eligible(raffle.entry_mode, e.source))
            .collect();

        if eligible.is_empty() {
            return Err(DrawError::NoEligibleEntries(raffle_id));
        }

        let seed = selection::generate_seed();
        let picked = selection::select_winners(&eligible, raffle.total_winners, &seed);
        let picks: Vec<DrawPick> = picked
            .iter()
            .enumerate()
            .map(|(i, entry)| DrawPick {
                entry_id: entry.id,
                user_id: entry.user_id,
                prize_position: i as u32 + 1,
            })
            .collect();

        let winners = self.store.commit_draw(raffle_id, &seed, &picks).await?;

        let duration = start.elapsed().as_secs_f64();
        metrics::histogram!("draw_duration_seconds").record(duration);
        metrics::counter!("winners_selected_total").increment(winners.len() as u64);
        tracing::info!(%raffle_id, participants = eligible.len(),
            winners = winners.len(), "draw completed");

        Ok(DrawOutcome {
            raffle_id,
            total_participants: eligible.len() as u32,
            total_winners: winners.len() as u32,
            draw_seed: seed,
            winners,
        })
    }

    /// Replays a raffle's recorded draw and reports whether the stored
    /// winner list matches. Side-effect free.
    #[tracing::instrument(skip(self))]
    pub async fn verify_draw(&self, raffle_id: RaffleId) -> Result<bool> {
        let raffle = self
            .store
            .get_raffle(raffle_id)
            .await?
            .ok_or(DrawError::RaffleNotFound(raffle_id))?;

        let Some(ref seed) = raffle.draw_seed else {
            return Ok(false);
        };

        let winners = self.store.winners_for_raffle(raffle_id).await?;
        let winner_ids: std::collections::HashSet<_> =
            winners.iter().map(|w| w.entry_id).collect();

        // Reconstruct the eligible pool the draw ran against: the winner
        // flags were set by the draw itself, so membership is decided by
        // mode eligibility alone.
        let eligible: Vec<Entry> = self
            .store
            .entries_for_raffle(raffle_id)
            .await?
            .into_iter()
            .filter(|e| {
                source_eligible(raffle.entry_mode, e.source)
                    && (!e.is_winner || winner_ids.contains(&e.id))
            })
            .collect();

        Ok(selection::verify(&eligible, &winners, seed))
    }
}

//! Benchmarks for the deterministic selection algorithm.

use chrono::Utc;
use common::{EntryId, RaffleId, UserId};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use draw::{select_winners, verify};
use ledger::{Entry, EntrySource, Winner, WinnerStatus};

fn make_entries(count: usize) -> Vec<Entry> {
    let raffle_id = RaffleId::new();
    (0..count)
        .map(|i| Entry {
            id: EntryId::new(),
            raffle_id,
            user_id: UserId::new(),
            ticket_number: format!("TKT-{:06}", i + 1),
            source: EntrySource::ManualPurchase,
            is_winner: false,
            created_at: Utc::now(),
        })
        .collect()
}

fn bench_select_winners(c: &mut Criterion) {
    let mut group = c.benchmark_group("select_winners");

    for size in [100, 1_000, 10_000] {
        let entries = make_entries(size);
        group.bench_function(format!("{size}_entries_10_winners"), |b| {
            b.iter(|| select_winners(black_box(&entries), black_box(10), black_box("bench-seed")));
        });
    }

    group.finish();
}

fn bench_verify(c: &mut Criterion) {
    let entries = make_entries(1_000);
    let picked = select_winners(&entries, 10, "bench-seed");
    let winners: Vec<Winner> = picked
        .iter()
        .enumerate()
        .map(|(i, entry)| Winner {
            id: common::WinnerId::new(),
            raffle_id: entry.raffle_id,
            entry_id: entry.id,
            user_id: entry.user_id,
            prize_position: i as u32 + 1,
            status: WinnerStatus::default(),
            drawn_at: Utc::now(),
        })
        .collect();

    c.bench_function("verify_1000_entries_10_winners", |b| {
        b.iter(|| verify(black_box(&entries), black_box(&winners), black_box("bench-seed")));
    });
}

criterion_group!(benches, bench_select_winners, bench_verify);
criterion_main!(benches);

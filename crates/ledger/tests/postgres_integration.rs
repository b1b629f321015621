//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p ledger --test postgres_integration -- --test-threads=1
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use common::{RaffleId, UserId};
use ledger::{
    Currency, DrawPick, EntryMode, EntrySource, IssueEntry, LedgerError, Money,
    PaymentTransaction, PostgresRaffleStore, Raffle, RaffleStatus, RaffleStore, Subscription,
    TransactionKind, TransactionLocator, TransactionStatus,
};
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            // Create a temporary pool just for migrations
            let temp_pool = PgPool::connect(&connection_string).await.unwrap();

            // Run migrations using raw_sql to execute multiple statements
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_raffle_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();

            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresRaffleStore {
    let info = get_container_info().await;

    // Create a fresh pool for each test to avoid connection issues
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&info.connection_string)
        .await
        .unwrap();

    // Clear tables for test isolation
    sqlx::query("TRUNCATE TABLE winners, entries, payment_transactions, subscriptions, raffles")
        .execute(&pool)
        .await
        .unwrap();

    PostgresRaffleStore::new(pool)
}

fn active_raffle(mode: EntryMode) -> Raffle {
    let mut raffle = Raffle::new("Integration Raffle", mode, 2, Money::from_cents(500));
    raffle.status = RaffleStatus::Active;
    raffle
}

fn ticket_txn(user_id: UserId, raffle_id: RaffleId, tickets: u32) -> PaymentTransaction {
    PaymentTransaction::new(
        user_id,
        TransactionKind::RaffleTicket {
            raffle_id,
            tickets_requested: tickets,
        },
        Money::from_cents(500 * tickets as i64),
        Currency::usd(),
        None,
    )
}

#[tokio::test]
async fn insert_and_get_raffle() {
    let store = get_test_store().await;
    let raffle = active_raffle(EntryMode::Hybrid).with_max_entries_per_user(5);
    let raffle_id = raffle.id;
    store.insert_raffle(raffle.clone()).await.unwrap();

    let loaded = store.get_raffle(raffle_id).await.unwrap().unwrap();
    assert_eq!(loaded.name, raffle.name);
    assert_eq!(loaded.status, RaffleStatus::Active);
    assert_eq!(loaded.entry_mode, EntryMode::Hybrid);
    assert_eq!(loaded.max_entries_per_user, Some(5));
    assert!(loaded.draw_seed.is_none());
}

#[tokio::test]
async fn issue_entry_allocates_unique_tickets() {
    let store = get_test_store().await;
    let raffle = active_raffle(EntryMode::Hybrid);
    let raffle_id = raffle.id;
    store.insert_raffle(raffle).await.unwrap();

    let e1 = store
        .issue_entry(IssueEntry::new(
            raffle_id,
            UserId::new(),
            EntrySource::ManualPurchase,
        ))
        .await
        .unwrap();
    let e2 = store
        .issue_entry(IssueEntry::new(
            raffle_id,
            UserId::new(),
            EntrySource::ProcessorCheckout,
        ))
        .await
        .unwrap();

    assert_eq!(e1.ticket_number, "TKT-000001");
    assert_eq!(e2.ticket_number, "TKT-000002");

    let entries = store.entries_for_raffle(raffle_id).await.unwrap();
    assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn entry_cap_enforced_under_concurrency() {
    let store = get_test_store().await;
    let raffle = active_raffle(EntryMode::Hybrid).with_max_entries_per_user(2);
    let raffle_id = raffle.id;
    store.insert_raffle(raffle).await.unwrap();

    let user = UserId::new();
    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            store
                .issue_entry(IssueEntry::new(raffle_id, user, EntrySource::ManualPurchase))
                .await
        }));
    }

    let mut successes = 0;
    let mut capped = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(LedgerError::MaxEntriesReached { .. }) => capped += 1,
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    assert_eq!(successes, 2);
    assert_eq!(capped, 18);
    assert_eq!(store.count_user_entries(raffle_id, user).await.unwrap(), 2);
}

#[tokio::test]
async fn subscribers_only_gating() {
    let store = get_test_store().await;
    let raffle = active_raffle(EntryMode::SubscribersOnly);
    let raffle_id = raffle.id;
    store.insert_raffle(raffle).await.unwrap();

    let user = UserId::new();
    let result = store
        .issue_entry(IssueEntry::new(raffle_id, user, EntrySource::Subscription))
        .await;
    assert!(matches!(result, Err(LedgerError::SubscriptionRequired(_))));

    store
        .upsert_subscription(Subscription::new(user, Some(Utc::now() + Duration::days(30))))
        .await
        .unwrap();

    let entry = store
        .issue_entry(IssueEntry::new(raffle_id, user, EntrySource::Subscription))
        .await
        .unwrap();
    assert_eq!(entry.source, EntrySource::Subscription);
}

#[tokio::test]
async fn claim_transaction_idempotency() {
    let store = get_test_store().await;
    let user = UserId::new();
    let raffle_id = RaffleId::new();

    let mut first = ticket_txn(user, raffle_id, 3);
    first.idempotency_key = Some("it-abc".to_string());
    let (claimed, reused) = store.claim_transaction(first.clone()).await.unwrap();
    assert!(!reused);
    assert_eq!(claimed.id, first.id);

    let mut second = ticket_txn(user, raffle_id, 3);
    second.idempotency_key = Some("it-abc".to_string());
    let (existing, reused) = store.claim_transaction(second).await.unwrap();
    assert!(reused);
    assert_eq!(existing.id, first.id);
    assert_eq!(existing.kind.tickets_requested(), 3);
}

#[tokio::test]
async fn completion_cas_has_single_winner() {
    let store = get_test_store().await;
    let txn = ticket_txn(UserId::new(), RaffleId::new(), 1);
    let id = txn.id;
    store.claim_transaction(txn).await.unwrap();
    store
        .activate_transaction(id, "cs_123", HashMap::new())
        .await
        .unwrap();

    let mut handles = Vec::new();
    for _ in 0..10 {
        let store = store.clone();
        handles.push(tokio::spawn(
            async move { store.complete_if_pending(id).await },
        ));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1);

    let stored = store
        .find_transaction(&TransactionLocator::Id(id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TransactionStatus::Completed);
}

#[tokio::test]
async fn mark_failed_is_noop_after_completion() {
    let store = get_test_store().await;
    let txn = ticket_txn(UserId::new(), RaffleId::new(), 1);
    let id = txn.id;
    store.claim_transaction(txn).await.unwrap();
    store
        .activate_transaction(id, "cs_123", HashMap::new())
        .await
        .unwrap();
    assert!(store.complete_if_pending(id).await.unwrap());

    assert!(!store.mark_failed(id).await.unwrap());
    let stored = store
        .find_transaction(&TransactionLocator::Id(id))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, TransactionStatus::Completed);
}

#[tokio::test]
async fn find_by_external_reference_scans_metadata() {
    let store = get_test_store().await;
    let txn = ticket_txn(UserId::new(), RaffleId::new(), 1);
    let id = txn.id;
    store.claim_transaction(txn).await.unwrap();
    store
        .activate_transaction(
            id,
            "cs_123",
            HashMap::from([("payment_intent".to_string(), "pi_456".to_string())]),
        )
        .await
        .unwrap();

    let by_reference = store
        .find_transaction(&TransactionLocator::ExternalReference("cs_123".into()))
        .await
        .unwrap();
    assert_eq!(by_reference.map(|t| t.id), Some(id));

    let by_metadata = store
        .find_transaction(&TransactionLocator::ExternalReference("pi_456".into()))
        .await
        .unwrap();
    assert_eq!(by_metadata.map(|t| t.id), Some(id));
}

#[tokio::test]
async fn commit_draw_is_atomic() {
    let store = get_test_store().await;
    let raffle = active_raffle(EntryMode::Hybrid);
    let raffle_id = raffle.id;
    store.insert_raffle(raffle).await.unwrap();

    let mut entries = Vec::new();
    for _ in 0..3 {
        entries.push(
            store
                .issue_entry(IssueEntry::new(
                    raffle_id,
                    UserId::new(),
                    EntrySource::ManualPurchase,
                ))
                .await
                .unwrap(),
        );
    }
    store
        .advance_raffle_status(raffle_id, RaffleStatus::Closed)
        .await
        .unwrap();

    // A pick referencing a foreign entry rolls the whole draw back.
    let bad_picks = vec![
        DrawPick {
            entry_id: entries[0].id,
            user_id: entries[0].user_id,
            prize_position: 1,
        },
        DrawPick {
            entry_id: common::EntryId::new(),
            user_id: UserId::new(),
            prize_position: 2,
        },
    ];
    let result = store.commit_draw(raffle_id, "seed-x", &bad_picks).await;
    assert!(matches!(result, Err(LedgerError::IntegrityViolation(_))));

    let raffle = store.get_raffle(raffle_id).await.unwrap().unwrap();
    assert_eq!(raffle.status, RaffleStatus::Closed);
    assert!(raffle.draw_seed.is_none());
    let stored = store.entries_for_raffle(raffle_id).await.unwrap();
    assert!(stored.iter().all(|e| !e.is_winner));

    // A valid pick set applies all four writes together.
    let picks = vec![
        DrawPick {
            entry_id: entries[2].id,
            user_id: entries[2].user_id,
            prize_position: 1,
        },
        DrawPick {
            entry_id: entries[0].id,
            user_id: entries[0].user_id,
            prize_position: 2,
        },
    ];
    let winners = store.commit_draw(raffle_id, "seed-x", &picks).await.unwrap();
    assert_eq!(winners.len(), 2);

    let raffle = store.get_raffle(raffle_id).await.unwrap().unwrap();
    assert_eq!(raffle.status, RaffleStatus::Drawn);
    assert_eq!(raffle.draw_seed.as_deref(), Some("seed-x"));

    let stored_winners = store.winners_for_raffle(raffle_id).await.unwrap();
    assert_eq!(stored_winners.len(), 2);
    assert_eq!(stored_winners[0].prize_position, 1);
    assert_eq!(stored_winners[0].entry_id, entries[2].id);

    // A second draw attempt is rejected outright.
    let again = store.commit_draw(raffle_id, "seed-y", &picks).await;
    assert!(matches!(again, Err(LedgerError::IntegrityViolation(_))));
}

#[tokio::test]
async fn advance_status_rejects_regression() {
    let store = get_test_store().await;
    let raffle = active_raffle(EntryMode::Hybrid);
    let raffle_id = raffle.id;
    store.insert_raffle(raffle).await.unwrap();

    let result = store
        .advance_raffle_status(raffle_id, RaffleStatus::Draft)
        .await;
    assert!(matches!(
        result,
        Err(LedgerError::InvalidStatusTransition { .. })
    ));

    let closed = store
        .advance_raffle_status(raffle_id, RaffleStatus::Closed)
        .await
        .unwrap();
    assert_eq!(closed.status, RaffleStatus::Closed);
}

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{EntryId, RaffleId, SubscriptionId, TransactionId, UserId, WinnerId};
use sqlx::{PgPool, Row, postgres::PgRow};
use uuid::Uuid;

use crate::{
    Entry, EntrySource, IssueEntry, LedgerError, Money, PaymentTransaction, Raffle, RaffleStatus,
    Result, Subscription, SubscriptionStatus, TransactionKind, TransactionLocator,
    TransactionStatus, Winner,
    entry::format_ticket_number,
    money::Currency,
    raffle::EntryMode,
    store::RaffleStore,
    winner::{DrawPick, WinnerStatus},
};

const TRANSACTION_COLUMNS: &str = "id, user_id, transaction_type, raffle_id, subscription_id, \
     tickets_requested, amount_cents, currency, status, idempotency_key, external_reference, \
     metadata, created_at, updated_at";

/// PostgreSQL-backed raffle store implementation.
///
/// Atomicity comes from the database: `issue_entry` serializes per raffle
/// with `SELECT ... FOR UPDATE` on the raffle row, completion is a
/// conditional update, idempotency claims ride the unique constraint, and
/// the draw commit is a single transaction.
#[derive(Clone)]
pub struct PostgresRaffleStore {
    pool: PgPool,
}

impl PostgresRaffleStore {
    /// Creates a new PostgreSQL raffle store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> std::result::Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }

    fn parse_tag<T>(kind: &str, raw: &str, parse: impl Fn(&str) -> Option<T>) -> Result<T> {
        parse(raw).ok_or_else(|| {
            LedgerError::IntegrityViolation(format!("unknown {kind} value in store: {raw}"))
        })
    }

    fn row_to_raffle(row: &PgRow) -> Result<Raffle> {
        Ok(Raffle {
            id: RaffleId::from_uuid(row.try_get::<Uuid, _>("id")?),
            name: row.try_get("name")?,
            status: Self::parse_tag("status", row.try_get("status")?, RaffleStatus::parse)?,
            entry_mode: Self::parse_tag("entry_mode", row.try_get("entry_mode")?, EntryMode::parse)?,
            max_entries_per_user: row
                .try_get::<Option<i32>, _>("max_entries_per_user")?
                .map(|limit| limit as u32),
            total_winners: row.try_get::<i32, _>("total_winners")? as u32,
            ticket_price: Money::from_cents(row.try_get("ticket_price_cents")?),
            draw_seed: row.try_get("draw_seed")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_entry(row: &PgRow) -> Result<Entry> {
        Ok(Entry {
            id: EntryId::from_uuid(row.try_get::<Uuid, _>("id")?),
            raffle_id: RaffleId::from_uuid(row.try_get::<Uuid, _>("raffle_id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            ticket_number: row.try_get("ticket_number")?,
            source: Self::parse_tag("source", row.try_get("source")?, EntrySource::parse)?,
            is_winner: row.try_get("is_winner")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_transaction(row: &PgRow) -> Result<PaymentTransaction> {
        let kind = match row.try_get::<&str, _>("transaction_type")? {
            "raffle_ticket" => TransactionKind::RaffleTicket {
                raffle_id: RaffleId::from_uuid(
                    row.try_get::<Option<Uuid>, _>("raffle_id")?.ok_or_else(|| {
                        LedgerError::IntegrityViolation(
                            "raffle_ticket transaction without raffle_id".to_string(),
                        )
                    })?,
                ),
                tickets_requested: row.try_get::<i32, _>("tickets_requested")? as u32,
            },
            "subscription" => TransactionKind::Subscription {
                subscription_id: SubscriptionId::from_uuid(
                    row.try_get::<Option<Uuid>, _>("subscription_id")?
                        .ok_or_else(|| {
                            LedgerError::IntegrityViolation(
                                "subscription transaction without subscription_id".to_string(),
                            )
                        })?,
                ),
            },
            other => {
                return Err(LedgerError::IntegrityViolation(format!(
                    "unknown transaction_type value in store: {other}"
                )));
            }
        };

        let metadata_json: serde_json::Value = row.try_get("metadata")?;
        let metadata: HashMap<String, String> = serde_json::from_value(metadata_json)?;

        Ok(PaymentTransaction {
            id: TransactionId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            kind,
            amount: Money::from_cents(row.try_get("amount_cents")?),
            currency: Currency::new(row.try_get::<String, _>("currency")?),
            status: Self::parse_tag("status", row.try_get("status")?, TransactionStatus::parse)?,
            idempotency_key: row.try_get("idempotency_key")?,
            external_reference: row.try_get("external_reference")?,
            metadata,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_subscription(row: &PgRow) -> Result<Subscription> {
        Ok(Subscription {
            id: SubscriptionId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            status: Self::parse_tag("status", row.try_get("status")?, SubscriptionStatus::parse)?,
            expires_at: row.try_get("expires_at")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn row_to_winner(row: &PgRow) -> Result<Winner> {
        Ok(Winner {
            id: WinnerId::from_uuid(row.try_get::<Uuid, _>("id")?),
            raffle_id: RaffleId::from_uuid(row.try_get::<Uuid, _>("raffle_id")?),
            entry_id: EntryId::from_uuid(row.try_get::<Uuid, _>("entry_id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            prize_position: row.try_get::<i32, _>("prize_position")? as u32,
            status: Self::parse_tag("status", row.try_get("status")?, WinnerStatus::parse)?,
            drawn_at: row.try_get("drawn_at")?,
        })
    }

    async fn fetch_transaction_where(
        &self,
        predicate: &str,
        bind: &str,
    ) -> Result<Option<PaymentTransaction>> {
        let sql =
            format!("SELECT {TRANSACTION_COLUMNS} FROM payment_transactions WHERE {predicate}");
        let row = sqlx::query(&sql)
            .bind(bind)
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| Self::row_to_transaction(&r)).transpose()
    }

    /// Conditional transaction update; distinguishes "row missing" from
    /// "condition not met" so the latter can surface as a plain `false`.
    async fn conditional_update(&self, sql: &str, id: TransactionId) -> Result<bool> {
        let result = sqlx::query(sql).bind(id.as_uuid()).execute(&self.pool).await?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM payment_transactions WHERE id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
        if exists {
            Ok(false)
        } else {
            Err(LedgerError::TransactionNotFound(id))
        }
    }
}

#[async_trait]
impl RaffleStore for PostgresRaffleStore {
    async fn insert_raffle(&self, raffle: Raffle) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO raffles
                (id, name, status, entry_mode, max_entries_per_user, total_winners,
                 ticket_price_cents, draw_seed, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(raffle.id.as_uuid())
        .bind(&raffle.name)
        .bind(raffle.status.as_str())
        .bind(raffle.entry_mode.as_str())
        .bind(raffle.max_entries_per_user.map(|limit| limit as i32))
        .bind(raffle.total_winners as i32)
        .bind(raffle.ticket_price.cents())
        .bind(&raffle.draw_seed)
        .bind(raffle.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_raffle(&self, id: RaffleId) -> Result<Option<Raffle>> {
        let row = sqlx::query(
            "SELECT id, name, status, entry_mode, max_entries_per_user, total_winners, \
             ticket_price_cents, draw_seed, created_at FROM raffles WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| Self::row_to_raffle(&r)).transpose()
    }

    async fn advance_raffle_status(&self, id: RaffleId, to: RaffleStatus) -> Result<Raffle> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT status FROM raffles WHERE id = $1 FOR UPDATE")
            .bind(id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LedgerError::RaffleNotFound(id))?;
        let from = Self::parse_tag("status", row.try_get("status")?, RaffleStatus::parse)?;

        if to == RaffleStatus::Drawn || !from.can_advance_to(to) {
            return Err(LedgerError::InvalidStatusTransition { from, to });
        }

        let row = sqlx::query(
            "UPDATE raffles SET status = $2 WHERE id = $1 \
             RETURNING id, name, status, entry_mode, max_entries_per_user, total_winners, \
             ticket_price_cents, draw_seed, created_at",
        )
        .bind(id.as_uuid())
        .bind(to.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Self::row_to_raffle(&row)
    }

    async fn issue_entry(&self, req: IssueEntry) -> Result<Entry> {
        let mut tx = self.pool.begin().await?;

        // The raffle row lock serializes issuance per raffle: the cap check,
        // counter bump, and insert below all happen under it.
        let row = sqlx::query(
            "SELECT status, entry_mode, max_entries_per_user FROM raffles \
             WHERE id = $1 FOR UPDATE",
        )
        .bind(req.raffle_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(LedgerError::RaffleNotFound(req.raffle_id))?;

        let status = Self::parse_tag("status", row.try_get("status")?, RaffleStatus::parse)?;
        let entry_mode =
            Self::parse_tag("entry_mode", row.try_get("entry_mode")?, EntryMode::parse)?;
        let max_entries = row
            .try_get::<Option<i32>, _>("max_entries_per_user")?
            .map(|limit| limit as u32);

        if !status.accepts_entries() {
            return Err(LedgerError::RaffleNotActive {
                raffle_id: req.raffle_id,
                status,
            });
        }

        match entry_mode {
            EntryMode::SubscribersOnly => {
                let active: bool = match req.subscription_id {
                    Some(subscription_id) => sqlx::query_scalar(
                        "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE id = $1 \
                         AND user_id = $2 AND status = 'active' \
                         AND (expires_at IS NULL OR expires_at > now()))",
                    )
                    .bind(subscription_id.as_uuid())
                    .bind(req.user_id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await?,
                    None => sqlx::query_scalar(
                        "SELECT EXISTS (SELECT 1 FROM subscriptions WHERE user_id = $1 \
                         AND status = 'active' \
                         AND (expires_at IS NULL OR expires_at > now()))",
                    )
                    .bind(req.user_id.as_uuid())
                    .fetch_one(&mut *tx)
                    .await?,
                };
                if !active {
                    return Err(LedgerError::SubscriptionRequired(req.user_id));
                }
            }
            EntryMode::TicketsOnly => {
                if req.source == EntrySource::Subscription {
                    return Err(LedgerError::SubscriptionEntriesNotAllowed(req.raffle_id));
                }
            }
            EntryMode::Hybrid => {}
        }

        if let Some(limit) = max_entries {
            let count: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM entries WHERE raffle_id = $1 AND user_id = $2",
            )
            .bind(req.raffle_id.as_uuid())
            .bind(req.user_id.as_uuid())
            .fetch_one(&mut *tx)
            .await?;
            if count as u32 >= limit {
                return Err(LedgerError::MaxEntriesReached {
                    count: count as u32,
                    limit,
                });
            }
        }

        let sequence: i64 = sqlx::query_scalar(
            "UPDATE raffles SET ticket_counter = ticket_counter + 1 WHERE id = $1 \
             RETURNING ticket_counter",
        )
        .bind(req.raffle_id.as_uuid())
        .fetch_one(&mut *tx)
        .await?;

        let entry = Entry {
            id: EntryId::new(),
            raffle_id: req.raffle_id,
            user_id: req.user_id,
            ticket_number: format_ticket_number(sequence as u64),
            source: req.source,
            is_winner: false,
            created_at: Utc::now(),
        };

        sqlx::query(
            r#"
            INSERT INTO entries (id, raffle_id, user_id, ticket_number, source, is_winner, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(entry.id.as_uuid())
        .bind(entry.raffle_id.as_uuid())
        .bind(entry.user_id.as_uuid())
        .bind(&entry.ticket_number)
        .bind(entry.source.as_str())
        .bind(entry.is_winner)
        .bind(entry.created_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_raffle_ticket")
            {
                return LedgerError::ConcurrencyConflict(format!(
                    "ticket number {} already allocated in raffle {}",
                    entry.ticket_number, req.raffle_id
                ));
            }
            LedgerError::Database(e)
        })?;

        tx.commit().await?;

        tracing::debug!(raffle_id = %req.raffle_id, user_id = %req.user_id,
            ticket = %entry.ticket_number, "entry issued");
        Ok(entry)
    }

    async fn entries_for_raffle(&self, raffle_id: RaffleId) -> Result<Vec<Entry>> {
        let rows = sqlx::query(
            "SELECT id, raffle_id, user_id, ticket_number, source, is_winner, created_at \
             FROM entries WHERE raffle_id = $1 ORDER BY ticket_number ASC",
        )
        .bind(raffle_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_entry).collect()
    }

    async fn count_user_entries(&self, raffle_id: RaffleId, user_id: UserId) -> Result<u32> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM entries WHERE raffle_id = $1 AND user_id = $2",
        )
        .bind(raffle_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_one(&self.pool)
        .await?;
        Ok(count as u32)
    }

    async fn claim_transaction(
        &self,
        txn: PaymentTransaction,
    ) -> Result<(PaymentTransaction, bool)> {
        let metadata_json = serde_json::to_value(&txn.metadata)?;
        let insert = sqlx::query(
            r#"
            INSERT INTO payment_transactions
                (id, user_id, transaction_type, raffle_id, subscription_id, tickets_requested,
                 amount_cents, currency, status, idempotency_key, external_reference, metadata,
                 created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (idempotency_key) DO NOTHING
            "#,
        )
        .bind(txn.id.as_uuid())
        .bind(txn.user_id.as_uuid())
        .bind(match &txn.kind {
            TransactionKind::RaffleTicket { .. } => "raffle_ticket",
            TransactionKind::Subscription { .. } => "subscription",
        })
        .bind(txn.kind.raffle_id().map(|id| id.as_uuid()))
        .bind(txn.kind.subscription_id().map(|id| id.as_uuid()))
        .bind(txn.kind.tickets_requested().max(1) as i32)
        .bind(txn.amount.cents())
        .bind(txn.currency.as_str())
        .bind(txn.status.as_str())
        .bind(&txn.idempotency_key)
        .bind(&txn.external_reference)
        .bind(metadata_json)
        .bind(txn.created_at)
        .bind(txn.updated_at)
        .execute(&self.pool)
        .await?;

        if insert.rows_affected() > 0 {
            return Ok((txn, false));
        }

        // Lost the idempotency race (or the key was claimed earlier);
        // return the existing transaction unchanged.
        let key = txn.idempotency_key.as_deref().ok_or_else(|| {
            LedgerError::ConcurrencyConflict(format!(
                "transaction {} collided without an idempotency key",
                txn.id
            ))
        })?;
        let existing = self
            .fetch_transaction_where("idempotency_key = $1", key)
            .await?
            .ok_or_else(|| {
                LedgerError::ConcurrencyConflict(format!(
                    "idempotency key {key} claimed but not readable"
                ))
            })?;
        Ok((existing, true))
    }

    async fn activate_transaction(
        &self,
        id: TransactionId,
        external_reference: &str,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let metadata_json = serde_json::to_value(&metadata)?;
        let result = sqlx::query(
            "UPDATE payment_transactions \
             SET status = 'pending', external_reference = $2, metadata = metadata || $3, \
                 updated_at = now() \
             WHERE id = $1 AND status = 'processing'",
        )
        .bind(id.as_uuid())
        .bind(external_reference)
        .bind(metadata_json)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM payment_transactions WHERE id = $1)")
                .bind(id.as_uuid())
                .fetch_one(&self.pool)
                .await?;
        if exists {
            Err(LedgerError::IntegrityViolation(format!(
                "cannot activate transaction {id}: not in processing state"
            )))
        } else {
            Err(LedgerError::TransactionNotFound(id))
        }
    }

    async fn complete_if_pending(&self, id: TransactionId) -> Result<bool> {
        self.conditional_update(
            "UPDATE payment_transactions SET status = 'completed', updated_at = now() \
             WHERE id = $1 AND status = 'pending'",
            id,
        )
        .await
    }

    async fn mark_failed(&self, id: TransactionId) -> Result<bool> {
        self.conditional_update(
            "UPDATE payment_transactions SET status = 'failed', updated_at = now() \
             WHERE id = $1 AND status NOT IN ('completed', 'failed', 'canceled')",
            id,
        )
        .await
    }

    async fn mark_canceled(&self, id: TransactionId) -> Result<bool> {
        self.conditional_update(
            "UPDATE payment_transactions SET status = 'canceled', updated_at = now() \
             WHERE id = $1 AND status NOT IN ('completed', 'failed', 'canceled')",
            id,
        )
        .await
    }

    async fn merge_metadata(
        &self,
        id: TransactionId,
        metadata: HashMap<String, String>,
    ) -> Result<()> {
        let metadata_json = serde_json::to_value(&metadata)?;
        let result = sqlx::query(
            "UPDATE payment_transactions SET metadata = metadata || $2, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(metadata_json)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(LedgerError::TransactionNotFound(id));
        }
        Ok(())
    }

    async fn find_transaction(
        &self,
        locator: &TransactionLocator,
    ) -> Result<Option<PaymentTransaction>> {
        match locator {
            TransactionLocator::Id(id) => {
                let sql = format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM payment_transactions WHERE id = $1"
                );
                let row = sqlx::query(&sql)
                    .bind(id.as_uuid())
                    .fetch_optional(&self.pool)
                    .await?;
                row.map(|r| Self::row_to_transaction(&r)).transpose()
            }
            TransactionLocator::ExternalReference(reference) => {
                let sql = format!(
                    "SELECT {TRANSACTION_COLUMNS} FROM payment_transactions \
                     WHERE external_reference = $1 \
                        OR EXISTS (SELECT 1 FROM jsonb_each_text(metadata) AS kv \
                                   WHERE kv.value = $1) \
                     LIMIT 1"
                );
                let row = sqlx::query(&sql)
                    .bind(reference)
                    .fetch_optional(&self.pool)
                    .await?;
                row.map(|r| Self::row_to_transaction(&r)).transpose()
            }
            TransactionLocator::IdempotencyKey(key) => {
                self.fetch_transaction_where("idempotency_key = $1", key)
                    .await
            }
        }
    }

    async fn upsert_subscription(&self, subscription: Subscription) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO subscriptions (id, user_id, status, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(subscription.id.as_uuid())
        .bind(subscription.user_id.as_uuid())
        .bind(subscription.status.as_str())
        .bind(subscription.expires_at)
        .bind(subscription.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_subscription(&self, id: SubscriptionId) -> Result<Option<Subscription>> {
        let row = sqlx::query(
            "SELECT id, user_id, status, expires_at, created_at FROM subscriptions WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;
        row.map(|r| Self::row_to_subscription(&r)).transpose()
    }

    async fn renew_subscription(&self, id: SubscriptionId, until: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE subscriptions SET status = 'active', expires_at = $2 WHERE id = $1",
        )
        .bind(id.as_uuid())
        .bind(until)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn commit_draw(
        &self,
        raffle_id: RaffleId,
        seed: &str,
        picks: &[DrawPick],
    ) -> Result<Vec<Winner>> {
        let mut positions: Vec<u32> = picks.iter().map(|p| p.prize_position).collect();
        positions.sort_unstable();
        if positions.is_empty() || positions != (1..=picks.len() as u32).collect::<Vec<_>>() {
            return Err(LedgerError::IntegrityViolation(
                "prize positions must be contiguous starting at 1".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;

        let row = sqlx::query("SELECT status, draw_seed FROM raffles WHERE id = $1 FOR UPDATE")
            .bind(raffle_id.as_uuid())
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(LedgerError::RaffleNotFound(raffle_id))?;
        let status = Self::parse_tag("status", row.try_get("status")?, RaffleStatus::parse)?;
        let existing_seed: Option<String> = row.try_get("draw_seed")?;

        if !status.can_draw() {
            return Err(LedgerError::IntegrityViolation(format!(
                "raffle {raffle_id} is {status}, expected closed"
            )));
        }
        if existing_seed.is_some() {
            return Err(LedgerError::IntegrityViolation(format!(
                "raffle {raffle_id} already has a draw seed"
            )));
        }

        let drawn_at = Utc::now();
        let mut winners = Vec::with_capacity(picks.len());
        for pick in picks {
            let flipped = sqlx::query(
                "UPDATE entries SET is_winner = TRUE \
                 WHERE id = $1 AND raffle_id = $2 AND is_winner = FALSE",
            )
            .bind(pick.entry_id.as_uuid())
            .bind(raffle_id.as_uuid())
            .execute(&mut *tx)
            .await?;
            if flipped.rows_affected() != 1 {
                // Dropping the transaction rolls every prior write back.
                return Err(LedgerError::IntegrityViolation(format!(
                    "entry {} is not an un-won entry of raffle {raffle_id}",
                    pick.entry_id
                )));
            }

            let winner = Winner {
                id: WinnerId::new(),
                raffle_id,
                entry_id: pick.entry_id,
                user_id: pick.user_id,
                prize_position: pick.prize_position,
                status: WinnerStatus::default(),
                drawn_at,
            };
            sqlx::query(
                r#"
                INSERT INTO winners (id, raffle_id, entry_id, user_id, prize_position, status, drawn_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(winner.id.as_uuid())
            .bind(winner.raffle_id.as_uuid())
            .bind(winner.entry_id.as_uuid())
            .bind(winner.user_id.as_uuid())
            .bind(winner.prize_position as i32)
            .bind(winner.status.as_str())
            .bind(winner.drawn_at)
            .execute(&mut *tx)
            .await?;
            winners.push(winner);
        }

        sqlx::query("UPDATE raffles SET status = 'drawn', draw_seed = $2 WHERE id = $1")
            .bind(raffle_id.as_uuid())
            .bind(seed)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(winners)
    }

    async fn winners_for_raffle(&self, raffle_id: RaffleId) -> Result<Vec<Winner>> {
        let rows = sqlx::query(
            "SELECT id, raffle_id, entry_id, user_id, prize_position, status, drawn_at \
             FROM winners WHERE raffle_id = $1 ORDER BY prize_position ASC",
        )
        .bind(raffle_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(Self::row_to_winner).collect()
    }
}

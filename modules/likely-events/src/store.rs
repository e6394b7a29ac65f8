//! PgLedger: append-only toggle ledger backed by Postgres.
//!
//! Ids come from a BIGSERIAL, so they are unique and increase with insert order.
//! Conditional appends serialize per ordered pair through a transaction-scoped
//! advisory lock, which holds across processes and engine instances.

use anyhow::Result;
use async_trait::async_trait;
use likely_common::ActorId;
use sqlx::PgPool;
use tracing::debug;

use crate::ledger::EventLedger;
use crate::types::{AppendOutcome, Direction, NewToggleEvent, ToggleEvent};

// ---------------------------------------------------------------------------
// PgLedger
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EventLedger for PgLedger {
    async fn append(&self, event: NewToggleEvent) -> Result<ToggleEvent> {
        let stored = sqlx::query_as::<_, ToggleEvent>(
            r#"
            INSERT INTO toggle_events (actor_id, target_id, direction)
            VALUES ($1, $2, $3)
            RETURNING id, actor_id, target_id, direction, ts
            "#,
        )
        .bind(event.actor.as_uuid())
        .bind(event.target.as_uuid())
        .bind(i16::from(event.direction))
        .fetch_one(&self.pool)
        .await?;

        Ok(stored)
    }

    async fn append_transition(&self, event: NewToggleEvent) -> Result<AppendOutcome> {
        let mut tx = self.pool.begin().await?;

        // Released at commit/rollback. Keyed on the ordered pair only, so
        // unrelated pairs never wait on each other.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::text || ':' || $2::text, 0))")
            .bind(event.actor.as_uuid())
            .bind(event.target.as_uuid())
            .execute(&mut *tx)
            .await?;

        let latest = sqlx::query_as::<_, (i16,)>(
            r#"
            SELECT direction
            FROM toggle_events
            WHERE actor_id = $1 AND target_id = $2
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(event.actor.as_uuid())
        .bind(event.target.as_uuid())
        .fetch_optional(&mut *tx)
        .await?
        .map(|(d,)| Direction::try_from(d))
        .transpose()
        .map_err(anyhow::Error::msg)?;

        if !event.direction.permits(latest) {
            tx.rollback().await?;
            debug!(
                actor = %event.actor,
                target = %event.target,
                direction = %event.direction,
                "Conditional append rejected"
            );
            return Ok(AppendOutcome::Rejected { latest });
        }

        let stored = sqlx::query_as::<_, ToggleEvent>(
            r#"
            INSERT INTO toggle_events (actor_id, target_id, direction)
            VALUES ($1, $2, $3)
            RETURNING id, actor_id, target_id, direction, ts
            "#,
        )
        .bind(event.actor.as_uuid())
        .bind(event.target.as_uuid())
        .bind(i16::from(event.direction))
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(AppendOutcome::Appended(stored))
    }

    async fn latest_for(&self, actor: ActorId, target: ActorId) -> Result<Option<ToggleEvent>> {
        let row = sqlx::query_as::<_, ToggleEvent>(
            r#"
            SELECT id, actor_id, target_id, direction, ts
            FROM toggle_events
            WHERE actor_id = $1 AND target_id = $2
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .bind(actor.as_uuid())
        .bind(target.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn all_targeting(&self, target: ActorId) -> Result<Vec<ToggleEvent>> {
        let rows = sqlx::query_as::<_, ToggleEvent>(
            r#"
            SELECT id, actor_id, target_id, direction, ts
            FROM toggle_events
            WHERE target_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(target.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn events_for_pair(&self, actor: ActorId, target: ActorId) -> Result<Vec<ToggleEvent>> {
        let rows = sqlx::query_as::<_, ToggleEvent>(
            r#"
            SELECT id, actor_id, target_id, direction, ts
            FROM toggle_events
            WHERE actor_id = $1 AND target_id = $2
            ORDER BY id ASC
            "#,
        )
        .bind(actor.as_uuid())
        .bind(target.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

// ---------------------------------------------------------------------------
// sqlx::FromRow for ToggleEvent
// ---------------------------------------------------------------------------

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for ToggleEvent {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> std::result::Result<Self, sqlx::Error> {
        use sqlx::Row;
        let direction: i16 = row.try_get("direction")?;
        Ok(ToggleEvent {
            id: row.try_get("id")?,
            actor: ActorId(row.try_get("actor_id")?),
            target: ActorId(row.try_get("target_id")?),
            direction: Direction::try_from(direction).map_err(|e| sqlx::Error::Decode(e.into()))?,
            ts: row.try_get("ts")?,
        })
    }
}

use anyhow::Result;
use async_trait::async_trait;
use likely_common::{Actor, ActorId};
use sqlx::PgPool;

use super::ActorDirectory;

/// Directory backed by the `actors` table.
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ActorDirectory for PgDirectory {
    async fn find(&self, id: ActorId) -> Result<Option<Actor>> {
        let row = sqlx::query_as::<_, ActorRow>(
            "SELECT id, username, reputation_count, created_at FROM actors WHERE id = $1",
        )
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn exists(&self, id: ActorId) -> Result<bool> {
        let row = sqlx::query_as::<_, (bool,)>("SELECT EXISTS(SELECT 1 FROM actors WHERE id = $1)")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }

    async fn read_count(&self, id: ActorId) -> Result<Option<i64>> {
        let row = sqlx::query_as::<_, (i64,)>("SELECT reputation_count FROM actors WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.0))
    }

    async fn compare_and_set(&self, id: ActorId, expected: i64, new_value: i64) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE actors
            SET reputation_count = $3
            WHERE id = $1 AND reputation_count = $2
            "#,
        )
        .bind(id.as_uuid())
        .bind(expected)
        .bind(new_value)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list(&self) -> Result<Vec<Actor>> {
        let rows = sqlx::query_as::<_, ActorRow>(
            r#"
            SELECT id, username, reputation_count, created_at
            FROM actors
            ORDER BY reputation_count DESC, id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(&self, username: &str) -> Result<Actor> {
        let actor = Actor::new(username);
        let row = sqlx::query_as::<_, ActorRow>(
            r#"
            INSERT INTO actors (id, username, reputation_count, created_at)
            VALUES ($1, $2, 0, $3)
            RETURNING id, username, reputation_count, created_at
            "#,
        )
        .bind(actor.id.as_uuid())
        .bind(&actor.username)
        .bind(actor.created_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }
}

#[derive(sqlx::FromRow)]
struct ActorRow {
    id: uuid::Uuid,
    username: String,
    reputation_count: i64,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<ActorRow> for Actor {
    fn from(row: ActorRow) -> Self {
        Actor {
            id: ActorId(row.id),
            username: row.username,
            reputation_count: row.reputation_count,
            created_at: row.created_at,
        }
    }
}

//! Actor directory: lookup plus the counter's compare-and-set primitive.

mod memory;
mod postgres;

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use likely_common::{Actor, ActorId};

pub use memory::MemoryDirectory;
pub use postgres::PgDirectory;

/// Actor records and their cached reputation counters.
///
/// `compare_and_set` is the only way to change `reputation_count`. It must be
/// atomic against every other caller, in this process or not.
#[async_trait]
pub trait ActorDirectory: Send + Sync {
    async fn find(&self, id: ActorId) -> Result<Option<Actor>>;

    async fn exists(&self, id: ActorId) -> Result<bool>;

    /// Current counter value, or `None` if the actor does not exist.
    async fn read_count(&self, id: ActorId) -> Result<Option<i64>>;

    /// Set the counter to `new_value` only if it still equals `expected`.
    /// Returns `false` when the counter moved (or the actor is gone).
    async fn compare_and_set(&self, id: ActorId, expected: i64, new_value: i64) -> Result<bool>;

    async fn list(&self) -> Result<Vec<Actor>>;

    /// Directory-level account creation. New actors start at zero.
    async fn create(&self, username: &str) -> Result<Actor>;
}

#[async_trait]
impl<D: ActorDirectory + ?Sized> ActorDirectory for Arc<D> {
    async fn find(&self, id: ActorId) -> Result<Option<Actor>> {
        (**self).find(id).await
    }

    async fn exists(&self, id: ActorId) -> Result<bool> {
        (**self).exists(id).await
    }

    async fn read_count(&self, id: ActorId) -> Result<Option<i64>> {
        (**self).read_count(id).await
    }

    async fn compare_and_set(&self, id: ActorId, expected: i64, new_value: i64) -> Result<bool> {
        (**self).compare_and_set(id, expected, new_value).await
    }

    async fn list(&self) -> Result<Vec<Actor>> {
        (**self).list().await
    }

    async fn create(&self, username: &str) -> Result<Actor> {
        (**self).create(username).await
    }
}

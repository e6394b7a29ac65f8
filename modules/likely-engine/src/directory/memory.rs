use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use likely_common::{Actor, ActorId};

use super::ActorDirectory;

/// In-memory directory for tests and local development. Thread-safe.
pub struct MemoryDirectory {
    actors: Mutex<HashMap<ActorId, Actor>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            actors: Mutex::new(HashMap::new()),
        }
    }

    /// Seed the directory with existing records (for tests).
    pub fn with_actors(actors: impl IntoIterator<Item = Actor>) -> Self {
        Self {
            actors: Mutex::new(actors.into_iter().map(|a| (a.id, a)).collect()),
        }
    }

    /// Insert or replace a record, bypassing the counter protocol (for tests).
    pub fn insert(&self, actor: Actor) -> Result<()> {
        self.lock()?.insert(actor.id, actor);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<ActorId, Actor>>> {
        self.actors
            .lock()
            .map_err(|_| anyhow!("memory directory lock poisoned"))
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActorDirectory for MemoryDirectory {
    async fn find(&self, id: ActorId) -> Result<Option<Actor>> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn exists(&self, id: ActorId) -> Result<bool> {
        Ok(self.lock()?.contains_key(&id))
    }

    async fn read_count(&self, id: ActorId) -> Result<Option<i64>> {
        Ok(self.lock()?.get(&id).map(|a| a.reputation_count))
    }

    async fn compare_and_set(&self, id: ActorId, expected: i64, new_value: i64) -> Result<bool> {
        let mut actors = self.lock()?;
        match actors.get_mut(&id) {
            Some(actor) if actor.reputation_count == expected => {
                actor.reputation_count = new_value;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn list(&self) -> Result<Vec<Actor>> {
        Ok(self.lock()?.values().cloned().collect())
    }

    async fn create(&self, username: &str) -> Result<Actor> {
        let mut actors = self.lock()?;
        if actors.values().any(|a| a.username == username) {
            bail!("username {username:?} is already taken");
        }
        let actor = Actor::new(username);
        actors.insert(actor.id, actor.clone());
        Ok(actor)
    }
}

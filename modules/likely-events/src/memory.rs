//! In-memory ledger for tests and local development. No database required.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use likely_common::ActorId;

use crate::ledger::EventLedger;
use crate::types::{AppendOutcome, NewToggleEvent, ToggleEvent};

/// In-memory toggle ledger. Thread-safe.
///
/// A single lock guards both id assignment and the event list, so ids follow
/// append order and conditional appends are atomic.
pub struct MemoryLedger {
    inner: Mutex<Inner>,
}

struct Inner {
    next_id: i64,
    events: Vec<ToggleEvent>,
}

impl Inner {
    fn push(&mut self, event: NewToggleEvent) -> ToggleEvent {
        let stored = ToggleEvent {
            id: self.next_id,
            actor: event.actor,
            target: event.target,
            direction: event.direction,
            ts: Utc::now(),
        };
        self.next_id += 1;
        self.events.push(stored.clone());
        stored
    }

    fn latest_for(&self, actor: ActorId, target: ActorId) -> Option<&ToggleEvent> {
        self.events
            .iter()
            .rev()
            .find(|e| e.actor == actor && e.target == target)
    }
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                next_id: 1,
                events: Vec::new(),
            }),
        }
    }

    /// Read all appended events (for test assertions).
    pub fn events(&self) -> Result<Vec<ToggleEvent>> {
        Ok(self.lock()?.events.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("memory ledger lock poisoned"))
    }
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventLedger for MemoryLedger {
    async fn append(&self, event: NewToggleEvent) -> Result<ToggleEvent> {
        Ok(self.lock()?.push(event))
    }

    async fn append_transition(&self, event: NewToggleEvent) -> Result<AppendOutcome> {
        let mut inner = self.lock()?;
        let latest = inner
            .latest_for(event.actor, event.target)
            .map(|e| e.direction);
        if !event.direction.permits(latest) {
            return Ok(AppendOutcome::Rejected { latest });
        }
        Ok(AppendOutcome::Appended(inner.push(event)))
    }

    async fn latest_for(&self, actor: ActorId, target: ActorId) -> Result<Option<ToggleEvent>> {
        Ok(self.lock()?.latest_for(actor, target).cloned())
    }

    async fn all_targeting(&self, target: ActorId) -> Result<Vec<ToggleEvent>> {
        Ok(self
            .lock()?
            .events
            .iter()
            .filter(|e| e.target == target)
            .cloned()
            .collect())
    }

    async fn events_for_pair(&self, actor: ActorId, target: ActorId) -> Result<Vec<ToggleEvent>> {
        Ok(self
            .lock()?
            .events
            .iter()
            .filter(|e| e.actor == actor && e.target == target)
            .cloned()
            .collect())
    }
}

//! The `EventLedger` trait.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use likely_common::ActorId;

use crate::types::{AppendOutcome, NewToggleEvent, ToggleEvent};

/// Append-only storage of toggle events.
///
/// Implemented by `PgLedger` (postgres) and `MemoryLedger` (tests).
/// Also implemented for `Arc<L>` so a ledger can be shared with assertions.
#[async_trait]
pub trait EventLedger: Send + Sync {
    /// Append unconditionally. Ids are unique and increase with append order.
    async fn append(&self, event: NewToggleEvent) -> Result<ToggleEvent>;

    /// Append only if `event.direction` is permitted by the pair's latest event.
    ///
    /// The check and the insert are one atomic step with respect to every other
    /// `append_transition` for the same ordered pair.
    async fn append_transition(&self, event: NewToggleEvent) -> Result<AppendOutcome>;

    /// The event with the largest id for the ordered pair, if any.
    async fn latest_for(&self, actor: ActorId, target: ActorId) -> Result<Option<ToggleEvent>>;

    /// Every event targeting `target`, in id order.
    async fn all_targeting(&self, target: ActorId) -> Result<Vec<ToggleEvent>>;

    /// Every event for the ordered pair, in id order.
    async fn events_for_pair(&self, actor: ActorId, target: ActorId) -> Result<Vec<ToggleEvent>>;
}

#[async_trait]
impl<L: EventLedger + ?Sized> EventLedger for Arc<L> {
    async fn append(&self, event: NewToggleEvent) -> Result<ToggleEvent> {
        (**self).append(event).await
    }

    async fn append_transition(&self, event: NewToggleEvent) -> Result<AppendOutcome> {
        (**self).append_transition(event).await
    }

    async fn latest_for(&self, actor: ActorId, target: ActorId) -> Result<Option<ToggleEvent>> {
        (**self).latest_for(actor, target).await
    }

    async fn all_targeting(&self, target: ActorId) -> Result<Vec<ToggleEvent>> {
        (**self).all_targeting(target).await
    }

    async fn events_for_pair(&self, actor: ActorId, target: ActorId) -> Result<Vec<ToggleEvent>> {
        (**self).events_for_pair(actor, target).await
    }
}

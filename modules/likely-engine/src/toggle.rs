//! The toggle engine: validate, append, advance.

use std::sync::Arc;

use anyhow::anyhow;
use likely_common::error::LikelyResult;
use likely_common::{ActorId, LikelyError};
use likely_events::{AppendOutcome, Direction, EventLedger, NewToggleEvent};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::directory::ActorDirectory;
use crate::retry::CasPolicy;
use crate::stats::ToggleStats;

/// The counter advance ran out of compare-and-set attempts. The ledger event is
/// durable; the cached count lags it until reconciled.
#[derive(Debug, Error)]
#[error("counter advance for {target} gave up after {attempts} compare-and-set attempts")]
pub struct CasExhausted {
    pub target: ActorId,
    pub attempts: usize,
}

/// Accepts or rejects like/unlike toggles and keeps the target's cached count
/// in step with the ledger.
#[derive(Clone)]
pub struct ToggleEngine {
    ledger: Arc<dyn EventLedger>,
    directory: Arc<dyn ActorDirectory>,
    policy: CasPolicy,
    stats: Arc<ToggleStats>,
}

impl ToggleEngine {
    pub fn new(ledger: Arc<dyn EventLedger>, directory: Arc<dyn ActorDirectory>) -> Self {
        Self {
            ledger,
            directory,
            policy: CasPolicy::default(),
            stats: Arc::new(ToggleStats::new()),
        }
    }

    pub fn with_policy(mut self, policy: CasPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn stats(&self) -> &ToggleStats {
        &self.stats
    }

    pub fn directory(&self) -> &Arc<dyn ActorDirectory> {
        &self.directory
    }

    pub async fn like(&self, actor: ActorId, target: ActorId) -> LikelyResult<()> {
        self.toggle(actor, target, Direction::Like).await
    }

    pub async fn unlike(&self, actor: ActorId, target: ActorId) -> LikelyResult<()> {
        self.toggle(actor, target, Direction::Unlike).await
    }

    /// Apply one toggle from `actor` to `target`.
    ///
    /// `actor` is trusted as already authenticated. Validation failures never
    /// touch the ledger or the counter.
    pub async fn toggle(
        &self,
        actor: ActorId,
        target: ActorId,
        direction: Direction,
    ) -> LikelyResult<()> {
        let result = self.try_toggle(actor, target, direction).await;
        match &result {
            Ok(()) => self.stats.record_accepted(),
            Err(LikelyError::SelfAction(_)) => self.stats.record_self_action(),
            Err(LikelyError::TargetNotFound(_)) => self.stats.record_not_found(),
            Err(LikelyError::Conflict { .. }) => self.stats.record_conflict(),
            Err(LikelyError::Storage(e)) => {
                self.stats.record_storage_error();
                warn!(%actor, %target, %direction, error = %e, "Toggle failed on storage");
            }
        }
        result
    }

    async fn try_toggle(
        &self,
        actor: ActorId,
        target: ActorId,
        direction: Direction,
    ) -> LikelyResult<()> {
        if actor == target {
            return Err(LikelyError::SelfAction(actor));
        }

        if !self.directory.exists(target).await? {
            return Err(LikelyError::TargetNotFound(target));
        }

        // Fast-path rejection. The conditional append below re-checks atomically.
        let latest = self
            .ledger
            .latest_for(actor, target)
            .await?
            .map(|e| e.direction);
        if !direction.permits(latest) {
            return Err(LikelyError::Conflict { actor, target });
        }

        let event = match self
            .ledger
            .append_transition(NewToggleEvent::new(actor, target, direction))
            .await?
        {
            AppendOutcome::Appended(event) => event,
            AppendOutcome::Rejected { .. } => {
                debug!(%actor, %target, %direction, "Lost the append race for this pair");
                return Err(LikelyError::Conflict { actor, target });
            }
        };

        // The event is durable from here on. Run the advance as its own task so
        // a caller that gives up waiting does not abandon it halfway.
        let advance = tokio::spawn(advance_counter(
            self.directory.clone(),
            self.policy.clone(),
            self.stats.clone(),
            target,
            direction.delta(),
        ));

        match advance.await {
            Ok(Ok(count)) => {
                info!(
                    %actor,
                    %target,
                    %direction,
                    event_id = event.id,
                    reputation_count = count,
                    "Toggle accepted"
                );
                Ok(())
            }
            Ok(Err(e)) => {
                error!(
                    event_id = event.id,
                    %target,
                    error = %e,
                    "Ledger event appended but counter not advanced; target needs reconciliation"
                );
                Err(e)
            }
            Err(join) => Err(LikelyError::Storage(anyhow!(
                "counter advance task failed for event {}: {join}",
                event.id
            ))),
        }
    }
}

/// Optimistic compare-and-set loop: read, yield, conditionally write, retry on
/// a lost race. Returns the count it installed.
async fn advance_counter(
    directory: Arc<dyn ActorDirectory>,
    policy: CasPolicy,
    stats: Arc<ToggleStats>,
    target: ActorId,
    delta: i64,
) -> LikelyResult<i64> {
    for attempt in 0..policy.max_attempts {
        if attempt > 0 {
            policy.pause(attempt).await;
        }
        stats.record_cas_attempt(attempt);

        let current = directory
            .read_count(target)
            .await?
            .ok_or_else(|| anyhow!("actor {target} disappeared during counter advance"))?;

        tokio::task::yield_now().await;

        let next = current + delta;
        if directory.compare_and_set(target, current, next).await? {
            if attempt > 0 {
                debug!(%target, attempts = attempt + 1, "Counter advanced after contention");
            }
            return Ok(next);
        }
        debug!(%target, attempt, expected = current, "Counter moved underneath us, retrying");
    }

    stats.record_cas_exhausted();
    Err(LikelyError::Storage(
        CasExhausted {
            target,
            attempts: policy.max_attempts,
        }
        .into(),
    ))
}

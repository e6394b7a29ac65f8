//! Counter auditing and repair against the ledger.

use std::sync::Arc;

use anyhow::anyhow;
use likely_common::error::LikelyResult;
use likely_common::{ActorId, LikelyError};
use likely_events::{EventLedger, ToggleEvent};
use serde::Serialize;
use tracing::{info, warn};

use crate::directory::ActorDirectory;
use crate::retry::CasPolicy;
use crate::toggle::CasExhausted;

/// Cached count vs. the sum of ledger directions for one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Audit {
    pub target: ActorId,
    pub cached: i64,
    pub ledger_sum: i64,
}

impl Audit {
    pub fn drift(&self) -> i64 {
        self.cached - self.ledger_sum
    }

    pub fn is_consistent(&self) -> bool {
        self.drift() == 0
    }
}

pub fn ledger_sum(events: &[ToggleEvent]) -> i64 {
    events.iter().map(|e| e.direction.delta()).sum()
}

/// Compares cached counters with the ledger and repairs drift.
///
/// Only meaningful for targets with no toggles in flight: an accepted event
/// whose counter advance is still running shows up as transient drift.
pub struct Reconciler {
    ledger: Arc<dyn EventLedger>,
    directory: Arc<dyn ActorDirectory>,
    policy: CasPolicy,
}

impl Reconciler {
    pub fn new(ledger: Arc<dyn EventLedger>, directory: Arc<dyn ActorDirectory>) -> Self {
        Self {
            ledger,
            directory,
            policy: CasPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: CasPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub async fn audit(&self, target: ActorId) -> LikelyResult<Audit> {
        let cached = self
            .directory
            .read_count(target)
            .await?
            .ok_or(LikelyError::TargetNotFound(target))?;
        let events = self.ledger.all_targeting(target).await?;
        Ok(Audit {
            target,
            cached,
            ledger_sum: ledger_sum(&events),
        })
    }

    /// Audit every actor; returns only the drifted ones.
    pub async fn audit_all(&self) -> LikelyResult<Vec<Audit>> {
        let mut drifted = Vec::new();
        for actor in self.directory.list().await? {
            let audit = self.audit(actor.id).await?;
            if !audit.is_consistent() {
                warn!(target = %audit.target, drift = audit.drift(), "Counter drift detected");
                drifted.push(audit);
            }
        }
        Ok(drifted)
    }

    /// Move the cached count to the ledger sum through compare-and-set.
    /// Returns the audit taken just before the repair landed.
    pub async fn reconcile(&self, target: ActorId) -> LikelyResult<Audit> {
        for attempt in 0..self.policy.max_attempts {
            if attempt > 0 {
                self.policy.pause(attempt).await;
            }
            let audit = self.audit(target).await?;
            if audit.is_consistent() {
                return Ok(audit);
            }
            if self
                .directory
                .compare_and_set(target, audit.cached, audit.ledger_sum)
                .await?
            {
                info!(
                    %target,
                    from = audit.cached,
                    to = audit.ledger_sum,
                    "Counter reconciled"
                );
                return Ok(audit);
            }
        }
        Err(LikelyError::Storage(anyhow!(CasExhausted {
            target,
            attempts: self.policy.max_attempts,
        })))
    }
}

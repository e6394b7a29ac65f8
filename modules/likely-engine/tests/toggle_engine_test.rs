//! Toggle engine behaviour against the in-memory ledger and directory.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use likely_common::{Actor, ActorId, LikelyError};
use likely_engine::{
    ActorDirectory, CasExhausted, CasPolicy, MemoryDirectory, Reconciler, ToggleEngine,
};
use likely_events::{
    AppendOutcome, Direction, EventLedger, MemoryLedger, NewToggleEvent, ToggleEvent,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

struct Harness {
    ledger: Arc<MemoryLedger>,
    directory: Arc<MemoryDirectory>,
    engine: ToggleEngine,
}

fn harness() -> Harness {
    let ledger = Arc::new(MemoryLedger::new());
    let directory = Arc::new(MemoryDirectory::new());
    let engine = ToggleEngine::new(ledger.clone(), directory.clone());
    Harness {
        ledger,
        directory,
        engine,
    }
}

async fn create(h: &Harness, name: &str) -> ActorId {
    h.directory.create(name).await.unwrap().id
}

async fn count(h: &Harness, id: ActorId) -> i64 {
    h.directory.read_count(id).await.unwrap().unwrap()
}

async fn assert_counts_match_ledger(h: &Harness) {
    for actor in h.directory.list().await.unwrap() {
        let sum: i64 = h
            .ledger
            .all_targeting(actor.id)
            .await
            .unwrap()
            .iter()
            .map(|e| e.direction.delta())
            .sum();
        assert_eq!(actor.reputation_count, sum, "drift on {}", actor.username);
    }
}

fn assert_alternating(directions: &[Direction]) {
    for pair in directions.windows(2) {
        assert_ne!(pair[0], pair[1], "two consecutive {} events", pair[0]);
    }
}

/// Directory whose compare-and-set loses the race a fixed number of times
/// before delegating.
struct ContendedDirectory {
    inner: MemoryDirectory,
    losses_left: AtomicUsize,
}

impl ContendedDirectory {
    fn new(inner: MemoryDirectory, losses: usize) -> Self {
        Self {
            inner,
            losses_left: AtomicUsize::new(losses),
        }
    }
}

#[async_trait]
impl ActorDirectory for ContendedDirectory {
    async fn find(&self, id: ActorId) -> Result<Option<Actor>> {
        self.inner.find(id).await
    }

    async fn exists(&self, id: ActorId) -> Result<bool> {
        self.inner.exists(id).await
    }

    async fn read_count(&self, id: ActorId) -> Result<Option<i64>> {
        self.inner.read_count(id).await
    }

    async fn compare_and_set(&self, id: ActorId, expected: i64, new_value: i64) -> Result<bool> {
        let lose = self
            .losses_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if lose {
            return Ok(false);
        }
        self.inner.compare_and_set(id, expected, new_value).await
    }

    async fn list(&self) -> Result<Vec<Actor>> {
        self.inner.list().await
    }

    async fn create(&self, username: &str) -> Result<Actor> {
        self.inner.create(username).await
    }
}

/// Ledger that serves reads but fails every append, as when the database
/// drops mid-request.
struct FailingLedger {
    inner: MemoryLedger,
}

#[async_trait]
impl EventLedger for FailingLedger {
    async fn append(&self, _event: NewToggleEvent) -> Result<ToggleEvent> {
        anyhow::bail!("ledger unavailable")
    }

    async fn append_transition(&self, _event: NewToggleEvent) -> Result<AppendOutcome> {
        anyhow::bail!("ledger unavailable")
    }

    async fn latest_for(&self, actor: ActorId, target: ActorId) -> Result<Option<ToggleEvent>> {
        self.inner.latest_for(actor, target).await
    }

    async fn all_targeting(&self, target: ActorId) -> Result<Vec<ToggleEvent>> {
        self.inner.all_targeting(target).await
    }

    async fn events_for_pair(&self, actor: ActorId, target: ActorId) -> Result<Vec<ToggleEvent>> {
        self.inner.events_for_pair(actor, target).await
    }
}

// =========================================================================
// Validation
// =========================================================================

#[tokio::test]
async fn self_action_is_rejected_without_side_effects() {
    let h = harness();
    let a = create(&h, "a").await;

    let err = h.engine.like(a, a).await.unwrap_err();
    assert!(matches!(err, LikelyError::SelfAction(id) if id == a));
    assert!(h.ledger.events().unwrap().is_empty());
    assert_eq!(count(&h, a).await, 0);
}

#[tokio::test]
async fn missing_target_is_rejected_without_side_effects() {
    let h = harness();
    let a = create(&h, "a").await;
    let ghost = ActorId::new();

    let err = h.engine.like(a, ghost).await.unwrap_err();
    assert!(matches!(err, LikelyError::TargetNotFound(id) if id == ghost));
    assert!(h.ledger.events().unwrap().is_empty());
}

#[tokio::test]
async fn self_action_is_checked_before_existence() {
    let h = harness();
    let ghost = ActorId::new();
    let err = h.engine.like(ghost, ghost).await.unwrap_err();
    assert!(matches!(err, LikelyError::SelfAction(_)));
}

#[tokio::test]
async fn double_like_conflicts() {
    let h = harness();
    let a = create(&h, "a").await;
    let b = create(&h, "b").await;

    h.engine.like(a, b).await.unwrap();
    let err = h.engine.like(a, b).await.unwrap_err();

    assert!(matches!(err, LikelyError::Conflict { .. }));
    assert_eq!(count(&h, b).await, 1);
    assert_eq!(h.ledger.events().unwrap().len(), 1);
}

#[tokio::test]
async fn unlike_without_like_conflicts() {
    let h = harness();
    let a = create(&h, "a").await;
    let b = create(&h, "b").await;

    let err = h.engine.unlike(a, b).await.unwrap_err();
    assert!(matches!(err, LikelyError::Conflict { .. }));

    h.engine.like(a, b).await.unwrap();
    h.engine.unlike(a, b).await.unwrap();
    let err = h.engine.unlike(a, b).await.unwrap_err();
    assert!(matches!(err, LikelyError::Conflict { .. }));
}

#[tokio::test]
async fn repeated_rejection_is_stable() {
    let h = harness();
    let a = create(&h, "a").await;
    let b = create(&h, "b").await;
    h.engine.like(a, b).await.unwrap();

    for _ in 0..3 {
        assert!(matches!(
            h.engine.like(a, b).await,
            Err(LikelyError::Conflict { .. })
        ));
    }
    assert_eq!(count(&h, b).await, 1);
}

#[tokio::test]
async fn existing_like_in_ledger_blocks_new_like() {
    let h = harness();
    let a = create(&h, "a").await;
    let b = create(&h, "b").await;
    h.ledger.append(NewToggleEvent::like(a, b)).await.unwrap();

    let err = h.engine.like(a, b).await.unwrap_err();
    assert!(matches!(err, LikelyError::Conflict { .. }));
}

// =========================================================================
// Accept path
// =========================================================================

#[tokio::test]
async fn like_then_unlike_round_trips() {
    let h = harness();
    let a = create(&h, "a").await;
    let b = create(&h, "b").await;

    h.engine.like(a, b).await.unwrap();
    assert_eq!(count(&h, b).await, 1);

    h.engine.unlike(a, b).await.unwrap();
    assert_eq!(count(&h, b).await, 0);

    let latest = h.ledger.latest_for(a, b).await.unwrap().unwrap();
    assert_eq!(latest.direction, Direction::Unlike);
    // actor's own count is untouched
    assert_eq!(count(&h, a).await, 0);
}

#[tokio::test]
async fn interleaved_toggles_keep_counts_consistent() {
    let h = harness();
    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(create(&h, &format!("user{i}")).await);
    }

    // Deterministic walk over pairs with both directions, accepted or not.
    for step in 0..200usize {
        let actor = ids[step % 5];
        let target = ids[(step * 7 + 3) % 5];
        let direction = if (step / 3) % 2 == 0 {
            Direction::Like
        } else {
            Direction::Unlike
        };
        let _ = h.engine.toggle(actor, target, direction).await;
    }

    assert_counts_match_ledger(&h).await;
    for &x in &ids {
        for &y in &ids {
            let directions: Vec<_> = h
                .ledger
                .events_for_pair(x, y)
                .await
                .unwrap()
                .iter()
                .map(|e| e.direction)
                .collect();
            assert_alternating(&directions);
            if let Some(first) = directions.first() {
                assert_eq!(*first, Direction::Like);
            }
        }
    }
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_likes_from_distinct_actors_all_land() {
    const N: usize = 32;
    let h = harness();
    let target = create(&h, "target").await;
    let mut actors = Vec::new();
    for i in 0..N {
        actors.push(create(&h, &format!("fan{i}")).await);
    }

    let tasks: Vec<_> = actors
        .into_iter()
        .map(|actor| {
            let engine = h.engine.clone();
            tokio::spawn(async move { engine.like(actor, target).await })
        })
        .collect();

    for result in futures::future::join_all(tasks).await {
        result.unwrap().unwrap();
    }

    assert_eq!(count(&h, target).await, N as i64);
    assert_eq!(h.engine.stats().snapshot().accepted, N as u64);
    assert_counts_match_ledger(&h).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_likes_from_same_actor_accept_exactly_one() {
    const N: usize = 16;
    let h = harness();
    let actor = create(&h, "actor").await;
    let target = create(&h, "target").await;

    let tasks: Vec<_> = (0..N)
        .map(|_| {
            let engine = h.engine.clone();
            tokio::spawn(async move { engine.like(actor, target).await })
        })
        .collect();

    let mut ok = 0;
    let mut conflicts = 0;
    for result in futures::future::join_all(tasks).await {
        match result.unwrap() {
            Ok(()) => ok += 1,
            Err(LikelyError::Conflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(ok, 1);
    assert_eq!(conflicts, N - 1);
    assert_eq!(count(&h, target).await, 1);
    assert_eq!(h.ledger.events_for_pair(actor, target).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_mixed_toggles_settle_consistently() {
    let h = harness();
    let target = create(&h, "target").await;
    let mut actors = Vec::new();
    for i in 0..8 {
        actors.push(create(&h, &format!("fan{i}")).await);
    }

    let tasks: Vec<_> = (0..64usize)
        .map(|i| {
            let engine = h.engine.clone();
            let actor = actors[i % actors.len()];
            let direction = if i % 3 == 0 {
                Direction::Unlike
            } else {
                Direction::Like
            };
            tokio::spawn(async move { engine.toggle(actor, target, direction).await })
        })
        .collect();
    futures::future::join_all(tasks).await;

    assert_counts_match_ledger(&h).await;
    for actor in actors {
        let directions: Vec<_> = h
            .ledger
            .events_for_pair(actor, target)
            .await
            .unwrap()
            .iter()
            .map(|e| e.direction)
            .collect();
        assert_alternating(&directions);
    }
}

#[tokio::test]
async fn failed_append_is_a_storage_error_and_leaves_counter_alone() {
    let ledger = Arc::new(FailingLedger {
        inner: MemoryLedger::new(),
    });
    let directory = Arc::new(MemoryDirectory::new());
    let engine = ToggleEngine::new(ledger.clone(), directory.clone());
    let a = directory.create("a").await.unwrap().id;
    let b = directory.create("b").await.unwrap().id;

    let err = engine.like(a, b).await.unwrap_err();

    assert!(matches!(err, LikelyError::Storage(_)));
    assert!(!err.is_client_error());
    assert!(ledger.inner.events().unwrap().is_empty());
    assert_eq!(directory.read_count(b).await.unwrap(), Some(0));

    let stats = engine.stats().snapshot();
    assert_eq!(stats.storage_errors, 1);
    assert_eq!(stats.accepted, 0);
    assert_eq!(stats.cas_attempts, 0);
}

// =========================================================================
// Counter advance under contention
// =========================================================================

#[tokio::test]
async fn lost_compare_and_set_races_are_retried() {
    let ledger = Arc::new(MemoryLedger::new());
    let directory = Arc::new(ContendedDirectory::new(MemoryDirectory::new(), 3));
    let engine = ToggleEngine::new(ledger.clone(), directory.clone())
        .with_policy(CasPolicy::new(10, 1, 2, 0.0));
    let a = directory.create("a").await.unwrap().id;
    let b = directory.create("b").await.unwrap().id;

    engine.like(a, b).await.unwrap();

    assert_eq!(directory.read_count(b).await.unwrap(), Some(1));
    let stats = engine.stats().snapshot();
    assert_eq!(stats.cas_attempts, 4);
    assert_eq!(stats.cas_retries, 3);
    assert_eq!(stats.cas_exhausted, 0);
}

#[tokio::test]
async fn exhausted_advance_is_a_storage_error_and_reconciles() {
    let ledger = Arc::new(MemoryLedger::new());
    let directory = Arc::new(ContendedDirectory::new(MemoryDirectory::new(), 3));
    let engine = ToggleEngine::new(ledger.clone(), directory.clone())
        .with_policy(CasPolicy::new(3, 1, 2, 0.0));
    let a = directory.create("a").await.unwrap().id;
    let b = directory.create("b").await.unwrap().id;

    let err = engine.like(a, b).await.unwrap_err();
    match &err {
        LikelyError::Storage(inner) => {
            let exhausted = inner.downcast_ref::<CasExhausted>().unwrap();
            assert_eq!(exhausted.target, b);
            assert_eq!(exhausted.attempts, 3);
        }
        other => panic!("expected storage error, got {other}"),
    }
    assert!(!err.is_client_error());

    // The event is durable even though the counter lags.
    assert_eq!(ledger.events().unwrap().len(), 1);
    assert_eq!(directory.read_count(b).await.unwrap(), Some(0));
    assert_eq!(engine.stats().snapshot().cas_exhausted, 1);

    let reconciler = Reconciler::new(ledger.clone(), directory.clone());
    let drifted = reconciler.audit_all().await.unwrap();
    assert_eq!(drifted.len(), 1);
    assert_eq!(drifted[0].drift(), -1);

    reconciler.reconcile(b).await.unwrap();
    assert_eq!(directory.read_count(b).await.unwrap(), Some(1));
    assert!(reconciler.audit(b).await.unwrap().is_consistent());

    // The pair still reads as liked.
    assert!(matches!(
        engine.like(a, b).await,
        Err(LikelyError::Conflict { .. })
    ));
}

#[tokio::test]
async fn reconcile_on_consistent_target_is_a_no_op() {
    let h = harness();
    let a = create(&h, "a").await;
    let b = create(&h, "b").await;
    h.engine.like(a, b).await.unwrap();

    let reconciler = Reconciler::new(h.ledger.clone(), h.directory.clone());
    let audit = reconciler.reconcile(b).await.unwrap();
    assert_eq!(audit.cached, 1);
    assert_eq!(audit.ledger_sum, 1);
    assert!(reconciler.audit_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn audit_of_unknown_actor_is_not_found() {
    let h = harness();
    let reconciler = Reconciler::new(h.ledger.clone(), h.directory.clone());
    assert!(matches!(
        reconciler.audit(ActorId::new()).await,
        Err(LikelyError::TargetNotFound(_))
    ));
}

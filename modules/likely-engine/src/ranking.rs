//! "Most liked" listing.

use std::sync::Arc;

use anyhow::Result;
use likely_common::Actor;

use crate::directory::ActorDirectory;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Sort by `reputation_count` descending, ties by ascending id. The result is a
/// total order, so repeated calls over the same data page identically.
pub fn rank(mut actors: Vec<Actor>) -> Vec<Actor> {
    actors.sort_by(|a, b| {
        b.reputation_count
            .cmp(&a.reputation_count)
            .then_with(|| a.id.cmp(&b.id))
    });
    actors
}

/// Read-only ranking over the directory.
#[derive(Clone)]
pub struct RankingView {
    directory: Arc<dyn ActorDirectory>,
}

impl RankingView {
    pub fn new(directory: Arc<dyn ActorDirectory>) -> Self {
        Self { directory }
    }

    pub async fn ranked_actors(&self) -> Result<Vec<Actor>> {
        Ok(rank(self.directory.list().await?))
    }

    /// One page of the ranking. `limit` is clamped to `1..=MAX_PAGE_SIZE`.
    pub async fn page(&self, offset: usize, limit: usize) -> Result<Vec<Actor>> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        Ok(self
            .ranked_actors()
            .await?
            .into_iter()
            .skip(offset)
            .take(limit)
            .collect())
    }
}

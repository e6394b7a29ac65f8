//! Toggle engine and its collaborators.
//!
//! `ToggleEngine` validates like/unlike requests against the ledger, appends the
//! accepted event, and advances the target's cached `reputation_count` through
//! the directory's compare-and-set primitive. `RankingView` orders actors by that
//! count; `Reconciler` compares it with the ledger.

pub mod directory;
pub mod ranking;
pub mod reconcile;
pub mod retry;
pub mod stats;
pub mod toggle;

pub use directory::{ActorDirectory, MemoryDirectory, PgDirectory};
pub use ranking::{rank, RankingView};
pub use reconcile::{Audit, Reconciler};
pub use retry::CasPolicy;
pub use stats::{StatsSnapshot, ToggleStats};
pub use toggle::{CasExhausted, ToggleEngine};

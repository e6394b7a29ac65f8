//! Append-only toggle ledger.
//!
//! Stores directional like/unlike facts between actors. The ledger is the source
//! of truth for relationship state; cached counters elsewhere are derived from it.
//!
//! Two backends share the `EventLedger` trait: `PgLedger` (Postgres) and
//! `MemoryLedger` (tests and local development).

pub mod ledger;
pub mod memory;
pub mod store;
pub mod types;

pub use ledger::EventLedger;
pub use memory::MemoryLedger;
pub use store::PgLedger;
pub use types::{AppendOutcome, Direction, NewToggleEvent, ToggleEvent};

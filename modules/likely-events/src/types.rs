//! Core types for the toggle ledger.

use std::fmt;

use chrono::{DateTime, Utc};
use likely_common::ActorId;
use serde::{Deserialize, Serialize};

/// Direction of a toggle. Stored and serialized as `1` / `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i16", try_from = "i16")]
pub enum Direction {
    Like,
    Unlike,
}

impl Direction {
    /// The counter delta this direction applies to its target.
    pub fn delta(self) -> i64 {
        match self {
            Direction::Like => 1,
            Direction::Unlike => -1,
        }
    }

    /// Whether a toggle in this direction may follow `latest` for the same pair.
    ///
    /// Pairs alternate strictly, starting from "no relationship": a like needs the
    /// latest event to be absent or an unlike; an unlike needs an active like.
    pub fn permits(self, latest: Option<Direction>) -> bool {
        match self {
            Direction::Like => latest != Some(Direction::Like),
            Direction::Unlike => latest == Some(Direction::Like),
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Direction::Like => "like",
            Direction::Unlike => "unlike",
        }
    }
}

impl From<Direction> for i16 {
    fn from(d: Direction) -> i16 {
        d.delta() as i16
    }
}

impl TryFrom<i16> for Direction {
    type Error = String;

    fn try_from(v: i16) -> Result<Self, Self::Error> {
        match v {
            1 => Ok(Direction::Like),
            -1 => Ok(Direction::Unlike),
            other => Err(format!("invalid toggle direction {other}, expected 1 or -1")),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.verb())
    }
}

/// A toggle as stored in the ledger. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleEvent {
    pub id: i64,
    pub actor: ActorId,
    pub target: ActorId,
    pub direction: Direction,
    pub ts: DateTime<Utc>,
}

/// A toggle to be appended. The ledger assigns id and timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewToggleEvent {
    pub actor: ActorId,
    pub target: ActorId,
    pub direction: Direction,
}

impl NewToggleEvent {
    pub fn new(actor: ActorId, target: ActorId, direction: Direction) -> Self {
        Self {
            actor,
            target,
            direction,
        }
    }

    pub fn like(actor: ActorId, target: ActorId) -> Self {
        Self::new(actor, target, Direction::Like)
    }

    pub fn unlike(actor: ActorId, target: ActorId) -> Self {
        Self::new(actor, target, Direction::Unlike)
    }
}

/// Result of a conditional append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The transition was valid and the event is now durable.
    Appended(ToggleEvent),
    /// The pair's latest direction did not permit the transition. Nothing was written.
    Rejected { latest: Option<Direction> },
}

impl AppendOutcome {
    pub fn appended(&self) -> Option<&ToggleEvent> {
        match self {
            AppendOutcome::Appended(event) => Some(event),
            AppendOutcome::Rejected { .. } => None,
        }
    }
}

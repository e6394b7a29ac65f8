use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- ActorId ---

/// Stable, opaque actor identity. Ordered by the underlying UUID bytes, which
/// is the tie-break order used by rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActorId(pub Uuid);

impl ActorId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ActorId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ActorId {
    fn from(id: Uuid) -> Self {
        Self(id)
    }
}

impl FromStr for ActorId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// --- Actor ---

/// An actor record as held by the directory.
///
/// `reputation_count` is a cached value derived from the toggle ledger. Only the
/// directory's compare-and-set primitive may change it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: ActorId,
    pub username: String,
    pub reputation_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Actor {
    /// A freshly created actor with no reputation.
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            id: ActorId::new(),
            username: username.into(),
            reputation_count: 0,
            created_at: Utc::now(),
        }
    }
}

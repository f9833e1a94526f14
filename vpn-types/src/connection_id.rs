use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier assigned to a single connection session.
///
/// The value itself carries no meaning beyond uniqueness; it exists so that
/// persisted parameters and log lines can refer to "the same session" across
/// process restarts without the core needing to know anything about what a
/// backend considers a session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Generates a new, random connection id.
    pub fn generate() -> Self {
        ConnectionId(Uuid::new_v4().to_string())
    }

    /// Wraps an existing opaque id, e.g. one read back from persistence.
    pub fn from_raw(id: impl Into<String>) -> Self {
        ConnectionId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

use serde::{Deserialize, Serialize};

use crate::ConnectionId;

/// Minimal set of parameters persisted to disk so the engine can reconstruct
/// a live connection after a crash or restart.
///
/// `killswitch` defaults to `0` (off) if absent from the on-disk record, to
/// stay readable across older persisted files that predate the field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PersistedParameters {
    pub connection_id: ConnectionId,
    pub backend: String,
    pub protocol: String,
    pub server_id: String,
    pub server_name: String,
    #[serde(default)]
    pub killswitch: u8,
}

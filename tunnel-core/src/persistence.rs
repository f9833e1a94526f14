use std::path::PathBuf;

use vpn_types::PersistedParameters;

use crate::error::PersistenceError;
use crate::paths;

/// Crash-recovery persistence store (§4.6): a single JSON file under a
/// per-user cache directory. Writes go through a temp file plus atomic
/// rename so a crash mid-write can never leave a torn file behind.
pub struct PersistenceStore {
    path: PathBuf,
}

impl PersistenceStore {
    pub async fn open() -> Result<Self, PersistenceError> {
        Ok(PersistenceStore { path: paths::persistence_file_path().await? })
    }

    #[cfg(test)]
    pub(crate) fn at_path(path: PathBuf) -> Self {
        PersistenceStore { path }
    }

    /// Absent if the file is missing. Also absent, with an ERROR log, if the
    /// file exists but is malformed: callers treat both the same, as "no
    /// prior connection" (§7 "Persistence corruption").
    pub async fn load(&self) -> Option<PersistedParameters> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                log::error!(
                    "category=CONN, subcategory=PERSISTENCE, event=LOAD: failed to read persistence file: {}",
                    err
                );
                return None;
            }
        };

        match serde_json::from_str::<PersistedParameters>(&contents) {
            Ok(params) => Some(params),
            Err(err) => {
                log::error!(
                    "category=CONN, subcategory=PERSISTENCE, event=LOAD: malformed persistence file: {}",
                    err
                );
                None
            }
        }
    }

    /// Serializes `params` and atomically replaces the persistence file.
    pub async fn save(&self, params: &PersistedParameters) -> Result<(), PersistenceError> {
        let serialized = serde_json::to_vec_pretty(params)?;
        let parent = self.path.parent().expect("persistence path always has a parent directory");
        let mut tmp_path = self.path.clone();
        tmp_path.set_extension("json.tmp");

        tokio::fs::write(&tmp_path, &serialized).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        log::debug!("persisted connection parameters under {}", parent.display());
        Ok(())
    }

    /// Deletes the file if present; logs a WARN if it was already absent,
    /// since reaching `Disconnected.run_tasks` without a persisted record
    /// indicates the engine's own bookkeeping drifted (§4.6).
    pub async fn remove(&self) -> Result<(), PersistenceError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("persistence file already absent on remove()");
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }
}

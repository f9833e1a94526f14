use std::path::PathBuf;

use crate::error::PersistenceError;

const APP_CACHE_SUBDIR: &str = "vpn-supervisor";
const CONNECTION_SUBDIR: &str = "connection";
const PERSISTENCE_FILE_NAME: &str = "connection_persistence.json";

/// Resolves (and creates, if absent) the directory housing the persistence
/// file, and returns the full path to the file itself (§4.11, §6.3).
///
/// Grounded on the cache-directory-resolution convention of path-resolution
/// crates in this stack: a per-user cache directory, a fixed application
/// subdirectory, mode `0700` enforced on Unix.
pub async fn persistence_file_path() -> Result<PathBuf, PersistenceError> {
    let dir = connection_cache_dir()?;
    tokio::fs::create_dir_all(&dir).await?;
    enforce_private_permissions(&dir).await?;
    Ok(dir.join(PERSISTENCE_FILE_NAME))
}

fn connection_cache_dir() -> Result<PathBuf, PersistenceError> {
    let base = dirs_next::cache_dir().ok_or_else(|| {
        PersistenceError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "no cache directory available on this platform",
        ))
    })?;
    Ok(base.join(APP_CACHE_SUBDIR).join(CONNECTION_SUBDIR))
}

#[cfg(unix)]
async fn enforce_private_permissions(dir: &std::path::Path) -> Result<(), PersistenceError> {
    use std::os::unix::fs::PermissionsExt;
    let permissions = std::fs::Permissions::from_mode(0o700);
    tokio::fs::set_permissions(dir, permissions).await?;
    Ok(())
}

#[cfg(not(unix))]
async fn enforce_private_permissions(_dir: &std::path::Path) -> Result<(), PersistenceError> {
    Ok(())
}

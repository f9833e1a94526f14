/// Fatal, non-recoverable errors surfaced by the dispatcher. These indicate a
/// programming error (a mis-wired backend, an unregistered tag passed
/// explicitly, a cascade that never settled) rather than a normal connection
/// failure: normal failures flow through the `Error` state and are visible
/// to subscribers instead.
#[derive(Debug, err_derive::Error)]
pub enum ConnectorError {
    /// A non-`Up` event arrived whose connection didn't match the current state's.
    #[error(display = "event connection does not match the current connection")]
    ConcurrentConnections,

    /// An explicitly requested backend tag isn't registered, or failed validation.
    #[error(display = "backend '{}' is not registered or is not usable on this host", _0)]
    UnknownBackend(String),

    /// No registered backend validated successfully and none was requested explicitly.
    #[error(display = "no registered backend is usable on this host")]
    NoValidatedBackend,

    /// More than 99 events were cascaded within a single dispatch call.
    #[error(display = "cascading state transitions exceeded the safety bound")]
    CascadeLimitExceeded,

    /// The task spawned to run a state's side effects panicked.
    #[error(display = "state task runner panicked")]
    TaskPanicked,

    /// Wraps an I/O or serialization failure from the persistence store, for
    /// callers that need to inspect it directly. Ordinary load failures are
    /// absorbed and logged rather than surfaced this way.
    #[error(display = "persistence error: {}", _0)]
    Persistence(#[error(source)] PersistenceError),
}

/// Failure modes of the on-disk persistence store.
#[derive(Debug, err_derive::Error)]
pub enum PersistenceError {
    #[error(display = "I/O error: {}", _0)]
    Io(#[error(source, from)] std::io::Error),

    #[error(display = "malformed persisted parameters: {}", _0)]
    Serde(#[error(source, from)] serde_json::Error),
}

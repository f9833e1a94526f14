//! Data structures shared between the connection supervisor core and the
//! backends it drives. Nothing in this crate performs I/O or holds a lock;
//! it exists purely to give the rest of the workspace a common vocabulary.

mod connection_id;
mod credentials;
mod persisted;
mod server;
mod settings;

pub use connection_id::ConnectionId;
pub use credentials::{CertificateCredentials, Credentials, EmptyCredentialsError, UserPassCredentials};
pub use persisted::PersistedParameters;
pub use server::ServerDescriptor;
pub use settings::{Features, InvalidKillSwitchLevel, KillSwitchSetting, Settings};

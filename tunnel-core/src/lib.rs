//! Backend-agnostic VPN connection lifecycle engine.
//!
//! This crate owns the hard part of driving a single VPN tunnel through its
//! lifecycle: a pure state-transition table, an event dispatcher that
//! serializes everything under one lock, per-state side-effect routines,
//! crash-recovery persistence, and a subscriber-fanout publisher. It knows
//! nothing about how any particular transport actually opens a tunnel; that's
//! the [`Connection`] trait's job, implemented by backend crates this one
//! never sees.

mod config;
mod connection;
mod connector;
mod error;
mod event;
mod paths;
mod persistence;
mod publisher;
mod registry;
mod state;
mod states;

pub use config::prefers_certificate_auth;
pub use connection::{Connection, ConnectionFactory, Dispatch, EventSink};
pub use connector::Connector;
pub use error::{ConnectorError, PersistenceError};
pub use event::Event;
pub use persistence::PersistenceStore;
pub use publisher::{Publisher, Subscriber};
pub use registry::{global as backend_registry, BackendRegistry};
pub use state::{State, StateContext, Transition};

pub use vpn_types::{
    CertificateCredentials, ConnectionId, Credentials, EmptyCredentialsError, Features,
    InvalidKillSwitchLevel, KillSwitchSetting, PersistedParameters, ServerDescriptor,
    Settings, UserPassCredentials,
};

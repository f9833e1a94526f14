use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Everything the core needs to know about the server a tunnel is being
/// established to. Owned by the caller; the core only ever borrows or
/// clones it, it never mutates or looks up servers on its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServerDescriptor {
    pub server_ip: IpAddr,
    /// Domain used for x509 verification.
    pub domain: String,
    /// WireGuard peer public key, absent if the server doesn't speak WireGuard.
    pub wg_public_key: Option<String>,
    pub tcp_ports: Vec<u16>,
    pub udp_ports: Vec<u16>,
    pub server_id: String,
    pub server_name: String,
    pub label: Option<String>,
}

impl ServerDescriptor {
    pub fn new(server_ip: IpAddr, domain: impl Into<String>, server_id: impl Into<String>, server_name: impl Into<String>) -> Self {
        ServerDescriptor {
            server_ip,
            domain: domain.into(),
            wg_public_key: None,
            tcp_ports: Vec::new(),
            udp_ports: Vec::new(),
            server_id: server_id.into(),
            server_name: server_name.into(),
            label: None,
        }
    }
}

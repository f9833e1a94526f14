use std::convert::TryFrom;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

/// Kill-switch policy requested by the caller.
///
/// `Permanent` differs from `On` only in the `Disconnected` state's task
/// contract: a permanent kill switch is never disabled by the engine, only
/// by an explicit out-of-band settings change (outside this crate's scope).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum KillSwitchSetting {
    Off,
    On,
    Permanent,
}

impl Default for KillSwitchSetting {
    fn default() -> Self {
        KillSwitchSetting::Off
    }
}

/// Raised when a persisted `killswitch` level isn't one of the three
/// recognized integer codes.
#[derive(Debug, err_derive::Error)]
#[error(display = "invalid killswitch level: {}", _0)]
pub struct InvalidKillSwitchLevel(pub u8);

impl From<KillSwitchSetting> for u8 {
    fn from(value: KillSwitchSetting) -> Self {
        match value {
            KillSwitchSetting::Off => 0,
            KillSwitchSetting::On => 1,
            KillSwitchSetting::Permanent => 2,
        }
    }
}

impl TryFrom<u8> for KillSwitchSetting {
    type Error = InvalidKillSwitchLevel;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(KillSwitchSetting::Off),
            1 => Ok(KillSwitchSetting::On),
            2 => Ok(KillSwitchSetting::Permanent),
            other => Err(InvalidKillSwitchLevel(other)),
        }
    }
}

/// Feature flags that get suffixed onto protocol-specific connect requests
/// by backends. The core only carries these values through; it never
/// interprets them itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Features {
    /// Netshield level, `0` meaning disabled.
    pub netshield: i32,
    /// `vpn_accelerator` defaults to enabled; backends suffix `nst` when it's off.
    pub vpn_accelerator: bool,
    pub port_forwarding: bool,
    pub moderate_nat: bool,
}

impl Features {
    pub fn new() -> Self {
        Features {
            netshield: 0,
            vpn_accelerator: true,
            port_forwarding: false,
            moderate_nat: false,
        }
    }
}

// `vpn_accelerator` defaults to enabled, so `Default` is implemented by hand
// to match `new()` rather than derived (which would default it to `false`).
impl Default for Features {
    fn default() -> Self {
        Features::new()
    }
}

/// Optional overrides for a connection, passed through to backends as-is.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Settings {
    pub dns_custom_ips: Vec<Ipv4Addr>,
    pub split_tunneling_ips: Vec<Ipv4Addr>,
    pub ipv6: bool,
    pub features: Features,
    pub killswitch: KillSwitchSetting,
}

impl Settings {
    pub fn new() -> Self {
        Settings::default()
    }
}

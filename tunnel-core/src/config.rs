const USE_CERTIFICATE_ENV_VAR: &str = "VPN_SUPERVISOR_USE_CERTIFICATE";

/// Reads `VPN_SUPERVISOR_USE_CERTIFICATE` (§6.5) to decide whether the
/// caller should build certificate-based or username/password credentials.
/// Case-insensitive substring match on `"true"`, matching the source
/// environment variable this one replaces.
pub fn prefers_certificate_auth() -> bool {
    prefers_certificate_auth_from(std::env::var(USE_CERTIFICATE_ENV_VAR).ok().as_deref())
}

fn prefers_certificate_auth_from(raw: Option<&str>) -> bool {
    raw.map(|value| value.to_lowercase().contains("true")).unwrap_or(false)
}

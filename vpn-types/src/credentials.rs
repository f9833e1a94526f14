use serde::{Deserialize, Serialize};

/// Plain username/password pair, as used by OpenVPN and IKEv2.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserPassCredentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for UserPassCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UserPassCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Certificate/key bundle used for certificate-based authentication.
#[derive(Clone, Serialize, Deserialize)]
pub struct CertificateCredentials {
    pub certificate_pem: String,
    pub wg_private_key: Option<String>,
    pub openvpn_private_key: Option<String>,
}

impl std::fmt::Debug for CertificateCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CertificateCredentials")
            .field("certificate_pem", &"<redacted>")
            .field("wg_private_key", &self.wg_private_key.as_ref().map(|_| "<redacted>"))
            .field("openvpn_private_key", &self.openvpn_private_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// At least one of `user_pass` or `certificate` must be present for the
/// protocol being requested; which one(s) are actually required depends on
/// the backend, which is out of scope for this crate.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Credentials {
    pub user_pass: Option<UserPassCredentials>,
    pub certificate: Option<CertificateCredentials>,
}

/// Raised by [`Credentials::new`] when neither variant was supplied.
#[derive(Debug, err_derive::Error)]
#[error(display = "credentials must supply at least one of user/pass or a certificate bundle")]
pub struct EmptyCredentialsError;

impl Credentials {
    pub fn new(
        user_pass: Option<UserPassCredentials>,
        certificate: Option<CertificateCredentials>,
    ) -> Result<Self, EmptyCredentialsError> {
        if user_pass.is_none() && certificate.is_none() {
            return Err(EmptyCredentialsError);
        }
        Ok(Credentials { user_pass, certificate })
    }
}

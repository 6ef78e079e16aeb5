use secrecy::SecretString;
use serde::Deserialize;

/// Verification-side JWT settings. Tokens are minted by the external
/// identity provider, so only the shared secret lives here.
#[derive(Debug, Deserialize)]
pub struct JwtSettings {
    pub secret: SecretString,
}

impl JwtSettings {
    pub fn new(secret: String) -> Self {
        Self {
            secret: SecretString::new(secret.into_boxed_str()),
        }
    }
}

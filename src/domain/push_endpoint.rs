use sha2::{Digest, Sha256};

/// The opaque https address a push service hands out for one installed
/// device or browser profile.
#[derive(Debug, Clone)]
pub struct PushEndpoint(String);

impl PushEndpoint {
    /// Returns an instance if the input is an https URL, an error otherwise.
    pub fn parse(s: String) -> Result<PushEndpoint, String> {
        if !validator::validate_url(&s) {
            return Err(format!("{} is not a valid push endpoint URL.", s));
        }
        if !s.starts_with("https://") {
            return Err(format!("{} is not an https push endpoint.", s));
        }
        Ok(Self(s))
    }

    /// The deterministic storage key for this endpoint: the SHA-256 digest
    /// of the URL, lowercase hex. The same endpoint always maps to the same
    /// key, which is what makes registration replace-on-register.
    pub fn key(&self) -> String {
        hex::encode(Sha256::digest(self.0.as_bytes()))
    }
}

impl AsRef<str> for PushEndpoint {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PushEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

//! Credentials a resource authenticates inbound requests against.

use std::env;
use std::fmt;

/// Hash algorithm assumed when a credential does not name one.
pub const DEFAULT_HMAC_ALGORITHM: &str = "sha1";

/// Username/password pair plus an optional HMAC secret.
///
/// Built once at startup and shared read-only afterwards.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    username: String,
    password: String,
    hmac_key: Option<Vec<u8>>,
    hmac_algorithm: String,
}

impl Credential {
    /// Create a credential without an HMAC secret.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            hmac_key: None,
            hmac_algorithm: DEFAULT_HMAC_ALGORITHM.to_string(),
        }
    }

    /// Attach an HMAC secret and the name of the hash it is used with.
    pub fn with_hmac(mut self, key: impl Into<Vec<u8>>, algorithm: impl Into<String>) -> Self {
        self.hmac_key = Some(key.into());
        self.hmac_algorithm = algorithm.into();
        self
    }

    /// Load a credential from `<PREFIX>_USERNAME`, `<PREFIX>_PASSWORD`,
    /// `<PREFIX>_HMAC_KEY` and `<PREFIX>_HMAC_ALGORITHM`.
    ///
    /// A blank HMAC key counts as no key.
    pub fn from_env(prefix: &str) -> Self {
        let var = |name: &str| env::var(format!("{}_{}", prefix, name)).ok();

        let hmac_key = var("HMAC_KEY")
            .filter(|k| !k.trim().is_empty())
            .map(String::into_bytes);

        Self {
            username: var("USERNAME").unwrap_or_default(),
            password: var("PASSWORD").unwrap_or_default(),
            hmac_key,
            hmac_algorithm: var("HMAC_ALGORITHM")
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty())
                .unwrap_or_else(|| DEFAULT_HMAC_ALGORITHM.to_string()),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// The HMAC secret, if verification is enabled for this credential.
    pub fn hmac_key(&self) -> Option<&[u8]> {
        self.hmac_key.as_deref()
    }

    /// Configured hash algorithm name, lowercased.
    pub fn hmac_algorithm(&self) -> String {
        self.hmac_algorithm.to_ascii_lowercase()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("hmac_key", &self.hmac_key.as_ref().map(|_| "<redacted>"))
            .field("hmac_algorithm", &self.hmac_algorithm)
            .finish()
    }
}

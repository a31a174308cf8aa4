//! Secret types for protecting sensitive values from accidental logging.
//!
//! This module re-exports types from the [`secrecy`] crate. Broker shared
//! secrets and admission tokens are always carried as [`SecretString`] so
//! that `{:?}` and tracing fields print a redacted placeholder.
//!
//! # Example
//!
//! ```rust
//! use common::secret::{BasicCredentials, ExposeSecret, SecretString};
//!
//! let creds = BasicCredentials::new("OPENVIDUAPP", SecretString::from("MY_SECRET"));
//!
//! // Debug output never contains the secret
//! assert!(!format!("{creds:?}").contains("MY_SECRET"));
//!
//! let header = creds.authorization_header();
//! assert!(header.expose_secret().starts_with("Basic "));
//! ```

use base64::Engine;

// Re-export the main types from secrecy
pub use secrecy::{ExposeSecret, SecretBox, SecretString};

/// Static HTTP basic-auth credentials (application name + shared secret).
#[derive(Clone)]
pub struct BasicCredentials {
    username: String,
    password: SecretString,
}

impl BasicCredentials {
    /// Create credentials from a username and a secret password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: SecretString) -> Self {
        Self {
            username: username.into(),
            password,
        }
    }

    /// The non-secret username half of the credentials.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Build the `Authorization` header value: `Basic base64(user:password)`.
    ///
    /// The encoded value is itself a secret (it is reversible).
    #[must_use]
    pub fn authorization_header(&self) -> SecretString {
        let raw = format!("{}:{}", self.username, self.password.expose_secret());
        let encoded = base64::engine::general_purpose::STANDARD.encode(raw.as_bytes());
        SecretString::from(format!("Basic {encoded}"))
    }
}

impl std::fmt::Debug for BasicCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

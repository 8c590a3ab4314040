#![forbid(unsafe_code)]

use crate::error::{Error, Result};

/// Scheme prefixes that are passed through untouched.
const KNOWN_SCHEMES: [&str; 2] = ["Token ", "Bearer "];
const DEFAULT_SCHEME: &str = "Token ";

/// Holds the user-supplied access token and turns it into an
/// `Authorization` header value.
#[derive(Clone, Default)]
pub struct AuthContext {
    raw: String,
}

impl AuthContext {
    pub fn new(raw: impl Into<String>) -> Self {
        Self { raw: raw.into() }
    }

    pub fn set(&mut self, raw: impl Into<String>) {
        self.raw = raw.into();
    }

    /// Trimmed credential, `None` when empty or whitespace-only.
    pub fn credential(&self) -> Option<&str> {
        let t = self.raw.trim();
        if t.is_empty() { None } else { Some(t) }
    }

    pub fn has_credential(&self) -> bool {
        self.credential().is_some()
    }

    /// `Token <credential>` unless the credential already names a scheme.
    pub fn authorization_header(&self) -> Result<String> {
        let token = self.credential().ok_or(Error::NoCredential)?;
        if KNOWN_SCHEMES.iter().any(|scheme| token.starts_with(scheme)) {
            Ok(token.to_string())
        } else {
            Ok(format!("{DEFAULT_SCHEME}{token}"))
        }
    }
}

// Keeps the token out of logs.
impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext").field("credential_present", &self.has_credential()).finish()
    }
}

//! API Credential Management
//!
//! Secure handling of the analytics API token. Tokens are never logged at
//! INFO/WARN levels and are masked when displayed.

use std::fmt;

/// Authorization schemes the backend accepts verbatim.
const KNOWN_SCHEMES: [&str; 2] = ["Token ", "Bearer "];

/// Secure string wrapper that masks sensitive data in logs
///
/// Debug output shows only `SecretString(***)` and Display shows the
/// truncated form `first4...last4`.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    /// Creates a new SecretString from a String
    pub fn new(value: String) -> Self {
        SecretString(value)
    }

    /// Returns a reference to the inner string
    ///
    /// **Security Warning**: Only use this when building request headers.
    /// Never log or display the returned value.
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    /// Returns a masked version of the secret for safe logging
    pub fn masked(&self) -> String {
        let s = &self.0;
        if s.len() <= 8 || !s.is_char_boundary(4) || !s.is_char_boundary(s.len() - 4) {
            return "***".to_string();
        }
        format!("{}...{}", &s[..4], &s[s.len() - 4..])
    }

    /// Authorization header value for this token, see [`with_auth_scheme`].
    pub fn authorization(&self) -> String {
        with_auth_scheme(&self.0)
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretString(***)")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.masked())
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        SecretString::new(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        SecretString::new(s.to_string())
    }
}

/// Returns true if the value already carries a `Token ` or `Bearer ` prefix.
pub fn has_auth_scheme(value: &str) -> bool {
    KNOWN_SCHEMES.iter().any(|scheme| value.starts_with(scheme))
}

/// Prefixes a bare token with `Token `; values with a known scheme pass through.
pub fn with_auth_scheme(value: &str) -> String {
    if has_auth_scheme(value) {
        value.to_string()
    } else {
        format!("Token {}", value)
    }
}

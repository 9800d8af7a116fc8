//! Stored credentials and user preferences

use serde_json::Value;
use std::sync::{PoisonError, RwLock};

use crate::config::credentials::has_auth_scheme;
use crate::config::SecretString;

/// Languages the report endpoints localize into
pub const SUPPORTED_LANGUAGES: [&str; 4] = ["zh-CN", "en-US", "ja-JP", "ko-KR"];

pub const DEFAULT_LANGUAGE: &str = "en-US";

/// Shortest bare value accepted after a `Token ` prefix
const MIN_TOKEN_LEN: usize = 5;

/// Endpoints reachable without a token
const AUTH_PATHS: [&str; 5] = [
    "/auth/login",
    "/auth/register",
    "/auth/send-code",
    "/auth/request-password-reset",
    "/auth/reset-password-with-code",
];

/// Returns true for login, registration and password-reset endpoints.
pub fn is_auth_request(path: &str) -> bool {
    AUTH_PATHS.iter().any(|p| path.contains(p))
}

#[derive(Debug, Default)]
struct Stored {
    token: Option<SecretString>,
    user: Option<Value>,
    language: Option<String>,
}

/// In-memory stand-in for the extension's persisted login state
#[derive(Debug, Default)]
pub struct TokenStore {
    inner: RwLock<Stored>,
}

impl TokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let store = Self::new();
        store.set_token(token);
        store
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Stored> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Stored> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.write().token = Some(SecretString::new(token.into()));
    }

    pub fn token(&self) -> Option<SecretString> {
        self.read().token.clone()
    }

    pub fn set_user(&self, user: Value) {
        self.write().user = Some(user);
    }

    pub fn user(&self) -> Option<Value> {
        self.read().user.clone()
    }

    pub fn set_language(&self, language: impl Into<String>) {
        self.write().language = Some(language.into());
    }

    /// Report language: explicit preference, then the user profile's, then English.
    pub fn language(&self) -> String {
        let stored = self.read();
        let supported = |lang: &&str| SUPPORTED_LANGUAGES.contains(lang);

        stored
            .language
            .as_deref()
            .filter(supported)
            .or_else(|| {
                stored
                    .user
                    .as_ref()
                    .and_then(|u| u.get("language"))
                    .and_then(Value::as_str)
                    .filter(supported)
            })
            .unwrap_or(DEFAULT_LANGUAGE)
            .to_string()
    }

    /// Checks the stored token before an authenticated call.
    ///
    /// A bare token is rewritten to `Token <value>` and accepted. A `Token `
    /// value shorter than five characters is rejected; `Bearer ` tokens are
    /// accepted as-is.
    pub fn validate(&self) -> bool {
        let mut stored = self.write();
        let Some(token) = stored.token.as_ref().map(|t| t.expose_secret().to_string()) else {
            return false;
        };

        if !has_auth_scheme(&token) {
            stored.token = Some(SecretString::new(format!("Token {}", token)));
            return true;
        }

        match token.strip_prefix("Token ") {
            Some(value) => value.len() >= MIN_TOKEN_LEN,
            None => true,
        }
    }

    /// Authorization header value for the stored token.
    pub fn authorization(&self) -> Option<String> {
        self.read().token.as_ref().map(SecretString::authorization)
    }

    /// Forgets the token and user profile after an authentication failure.
    pub fn clear(&self) {
        let mut stored = self.write();
        stored.token = None;
        stored.user = None;
        tracing::info!("Cleared stored credentials");
    }

    pub fn is_authenticated(&self) -> bool {
        self.read().token.is_some()
    }
}

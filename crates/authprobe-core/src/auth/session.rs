use std::fmt;

use reqwest::header::HeaderValue;

use crate::models::Envelope;

/// Authorization scheme prefix. The server only strips the lowercase form.
const BEARER_PREFIX: &str = "bearer ";

/// Identity and token installed on a session by a successful login.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionData {
    pub token: String,
    pub username: String,
    pub scopes: Vec<String>,
}

impl SessionData {
    /// Build session data from an "ok" login envelope. Returns `None` when
    /// the envelope failed or carries no string token.
    pub fn from_login(
        username: &str,
        requested_scopes: &[String],
        envelope: &Envelope,
    ) -> Option<Self> {
        if !envelope.is_ok() {
            return None;
        }
        let token = envelope.token().filter(|t| !t.is_empty())?.to_string();

        // Prefer the scopes the server says it granted
        let granted = envelope.scopes();
        let scopes = if granted.is_empty() {
            requested_scopes.to_vec()
        } else {
            granted
        };

        Some(Self {
            token,
            username: username.to_string(),
            scopes,
        })
    }

    /// Value for the `Authorization` header
    pub fn authorization(&self) -> String {
        format!("{}{}", BEARER_PREFIX, self.token)
    }

    pub fn header_value(&self) -> Result<HeaderValue, reqwest::header::InvalidHeaderValue> {
        let mut value = HeaderValue::from_str(&self.authorization())?;
        value.set_sensitive(true);
        Ok(value)
    }

    pub fn has_scope(&self, scope: &str) -> bool {
        self.scopes.iter().any(|s| s == scope)
    }
}

// Keep tokens out of logs
impl fmt::Debug for SessionData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionData")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .field("scopes", &self.scopes)
            .finish()
    }
}

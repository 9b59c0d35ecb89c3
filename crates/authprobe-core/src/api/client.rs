//! Session client for the authentication service.
//!
//! `ApiClient` plays the role of a browser-style session: it owns an HTTP
//! client with default headers and a cookie store, and after a successful
//! login it attaches the bearer token to every request it sends.

use std::time::Duration;

use anyhow::{ensure, Context, Result};
use reqwest::{header, Client, RequestBuilder, Url};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::auth::SessionData;
use crate::config::Config;
use crate::models::{Credentials, Envelope, NewUser};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Login (POST) and session check (GET)
const AUTH_PATH: &str = "/auth";

const ADMIN_USER_PATH: &str = "/admin/user";

const ADMIN_SCOPE_PATH: &str = "/admin/scope";

const ADMIN_CLEAN_PATH: &str = "/admin/clean";

/// Liveness route, only mounted when the server runs with test routes enabled
const HEALTH_PATH: &str = "/test/";

const JSON_CONTENT_TYPE: &str = "application/json";

/// A single actor's session against the authentication service.
///
/// Every session owns its own connection pool and cookie jar, so two
/// sessions never share authorization state.
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Option<SessionData>,
}

impl ApiClient {
    /// Create a session against `base_url` with no request timeout
    pub fn new(base_url: &str) -> Result<Self> {
        Self::build(base_url, None)
    }

    /// Create a session using the configured base URL and timeout
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::build(config.base_url(), config.timeout())
    }

    fn build(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = normalize_base_url(base_url)?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static(JSON_CONTENT_TYPE),
        );

        let mut builder = Client::builder().default_headers(headers).cookie_store(true);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().context("Failed to build HTTP client")?;

        debug!(base_url = %base_url, ?timeout, "Created session");
        Ok(Self {
            client,
            base_url,
            session: None,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Login state, present once a login succeeded or a token was installed
    pub fn session(&self) -> Option<&SessionData> {
        self.session.as_ref()
    }

    /// The `Authorization` header value this session currently sends
    pub fn authorization(&self) -> Option<String> {
        self.session.as_ref().map(SessionData::authorization)
    }

    /// Install a bearer token obtained elsewhere, e.g. from an earlier run.
    /// The identity is unknown, so username and scopes are left empty.
    pub fn set_token(&mut self, token: String) -> Result<()> {
        ensure!(!token.is_empty(), "bearer token must not be empty");
        let data = SessionData {
            token,
            username: String::new(),
            scopes: Vec::new(),
        };
        data.header_value().context("Bearer token is not a valid header value")?;
        self.session = Some(data);
        Ok(())
    }

    /// Log in and, when the server answers "ok", install the returned token
    /// on this session. A refused login is returned as data and leaves the
    /// session untouched.
    pub async fn login(&mut self, user: &str, secret: &str, scopes: &[String]) -> Result<Envelope> {
        ensure!(!user.is_empty(), "login user name must not be empty");
        ensure!(!secret.is_empty(), "login secret must not be empty");

        let credentials = Credentials {
            name: user,
            secret,
            scopes,
        };
        let envelope = self
            .send("POST", AUTH_PATH, self.client.post(self.url(AUTH_PATH)).json(&credentials))
            .await?;

        if !envelope.is_ok() {
            info!(user = user, status = %envelope.status, "Login refused");
            return Ok(envelope);
        }

        let data = SessionData::from_login(user, scopes, &envelope).ok_or_else(|| {
            ApiError::InvalidResponse("login succeeded without a token".to_string())
        })?;
        data.header_value().map_err(|_| {
            ApiError::InvalidResponse("login token is not a valid header value".to_string())
        })?;

        info!(user = user, scopes = ?data.scopes, "Logged in");
        self.session = Some(data);
        Ok(envelope)
    }

    /// Ask the server who this session is authenticated as
    pub async fn check(&self) -> Result<Envelope> {
        self.send("GET", AUTH_PATH, self.client.get(self.url(AUTH_PATH))).await
    }

    /// Create a user account. Needs an `authadmin` token; the server decides.
    pub async fn create_user(
        &self,
        user: &str,
        secret: &str,
        life: u64,
        scopes: &[String],
    ) -> Result<Envelope> {
        let body = NewUser {
            name: user,
            secret,
            life,
            scopes,
        };
        self.send(
            "POST",
            ADMIN_USER_PATH,
            self.client.post(self.url(ADMIN_USER_PATH)).json(&body),
        )
        .await
    }

    /// Define a scope. The payload is forwarded as-is; the server expects a
    /// JSON string naming the scope.
    pub async fn create_scope<T: Serialize + ?Sized>(&self, scope: &T) -> Result<Envelope> {
        self.send(
            "POST",
            ADMIN_SCOPE_PATH,
            self.client.post(self.url(ADMIN_SCOPE_PATH)).json(scope),
        )
        .await
    }

    /// Reset server-side caches and tokens
    pub async fn clean(&self) -> Result<Envelope> {
        self.send(
            "POST",
            ADMIN_CLEAN_PATH,
            self.client.post(self.url(ADMIN_CLEAN_PATH)),
        )
        .await
    }

    /// Fetch the plain-text liveness report from the test routes
    pub async fn health(&self) -> Result<String> {
        let url = self.url(HEALTH_PATH);
        debug!(method = "GET", url = %url, "Sending request");

        let response = self
            .client
            .get(&url)
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(ApiError::NetworkError)
            .with_context(|| format!("Failed to send GET request to {}", url))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(ApiError::NetworkError)
            .context("Failed to read health response")?;

        if !status.is_success() {
            return Err(ApiError::from_status(status, &body).into());
        }
        Ok(body)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn auth_headers(&self) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        if let Some(ref data) = self.session {
            headers.insert(header::AUTHORIZATION, data.header_value()?);
        }
        Ok(headers)
    }

    async fn send(&self, method: &str, path: &str, request: RequestBuilder) -> Result<Envelope> {
        debug!(
            method = method,
            url = %self.url(path),
            authenticated = self.session.is_some(),
            "Sending request"
        );

        let response = request
            .headers(self.auth_headers()?)
            .send()
            .await
            .map_err(ApiError::NetworkError)
            .with_context(|| format!("Failed to send {} request to {}", method, path))?;

        Self::read_envelope(response)
            .await
            .with_context(|| format!("{} {} returned an unusable response", method, path))
    }

    /// Parse the response body as an envelope.
    ///
    /// The server reports authorization failures as a non-2xx status with a
    /// regular envelope body, so the body wins whenever it parses. Only
    /// bodies that are not envelopes turn into errors.
    async fn read_envelope(response: reqwest::Response) -> Result<Envelope> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(ApiError::NetworkError)
            .context("Failed to read response body")?;

        match serde_json::from_str::<Envelope>(&body) {
            Ok(envelope) => {
                if !status.is_success() {
                    warn!(status = %status, envelope_status = %envelope.status, "Request failed");
                }
                Ok(envelope)
            }
            Err(e) if status.is_success() => Err(ApiError::InvalidResponse(format!(
                "{}: {}",
                e,
                ApiError::truncate_body(&body)
            ))
            .into()),
            Err(_) => Err(ApiError::from_status(status, &body).into()),
        }
    }
}

/// Validate the base URL and strip trailing slashes so paths can be appended
fn normalize_base_url(raw: &str) -> Result<String, ApiError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let invalid = |reason: String| ApiError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let parsed = Url::parse(trimmed).map_err(|e| invalid(e.to_string()))?;
    match parsed.scheme() {
        "http" | "https" => {}
        other => return Err(invalid(format!("unsupported scheme {:?}", other))),
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(invalid("query and fragment are not allowed".to_string()));
    }
    Ok(trimmed.to_string())
}

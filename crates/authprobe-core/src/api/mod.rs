//! HTTP session client for the authentication service.
//!
//! This module provides the `ApiClient`, a session that keeps default
//! headers, a cookie store and an optional bearer token across requests,
//! plus the `ApiError` type used to classify fatal response failures.
//!
//! A successful login installs `Authorization: bearer <token>` on the
//! session for every later request.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;

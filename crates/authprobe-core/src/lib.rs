//! Core library for authprobe.
//!
//! Provides the session client for a token-based authentication service,
//! its wire models, configuration loading and a scripted scenario runner
//! that replays the usual admin workflow step by step.

pub mod api;
pub mod auth;
pub mod config;
pub mod models;
pub mod scenario;

pub use api::{ApiClient, ApiError};
pub use auth::SessionData;
pub use config::Config;
pub use models::{Envelope, DEFAULT_USER_LIFE_SECS};
pub use scenario::{Account, Scenario, Step, StepOutcome};

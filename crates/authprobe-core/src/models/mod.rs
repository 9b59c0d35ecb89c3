//! Wire models for the authentication service.
//!
//! Request payloads are transient and only live for the call that sends
//! them. Every endpoint answers with an `Envelope`.

pub mod envelope;
pub mod payload;

pub use envelope::{Envelope, STATUS_OK};
pub use payload::{Credentials, NewUser, DEFAULT_USER_LIFE_SECS};

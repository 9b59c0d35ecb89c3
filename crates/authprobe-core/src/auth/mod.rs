//! Authentication state held by a session.
//!
//! `SessionData` records what a successful login produced. It lives only
//! in memory and is dropped with the session that owns it.

pub mod session;

pub use session::SessionData;

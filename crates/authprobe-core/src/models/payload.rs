use serde::Serialize;

/// Five years, the lifetime used for throwaway test accounts.
pub const DEFAULT_USER_LIFE_SECS: u64 = 60 * 60 * 24 * 365 * 5;

/// Login request body for `POST /auth`.
#[derive(Debug, Clone, Serialize)]
pub struct Credentials<'a> {
    pub name: &'a str,
    pub secret: &'a str,
    pub scopes: &'a [String],
}

/// User creation body for `POST /admin/user`.
#[derive(Debug, Clone, Serialize)]
pub struct NewUser<'a> {
    pub name: &'a str,
    pub secret: &'a str,
    /// Account lifetime in seconds
    pub life: u64,
    pub scopes: &'a [String],
}

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Status string the server uses for a successful call.
pub const STATUS_OK: &str = "ok";

/// The `{status, result}` object returned by every JSON endpoint.
///
/// A status other than `"ok"` is an application-level answer, not an error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub status: String,
    #[serde(default)]
    pub result: Value,
}

impl Envelope {
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    /// Bearer token carried by a login result, if any
    pub fn token(&self) -> Option<&str> {
        self.result.get("token").and_then(Value::as_str)
    }

    /// Scopes echoed back in the result, in server order
    pub fn scopes(&self) -> Vec<String> {
        self.result
            .get("scopes")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Error message for failed calls (the server puts a bare string in `result`)
    pub fn message(&self) -> Option<&str> {
        self.result.as_str()
    }
}

/// Canonical error type used across all modules.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("Server Error: {status} {body}")]
    Server { status: u16, body: String },
    #[error("{}", upstream_message(.payload))]
    Upstream { payload: serde_json::Value },
}

impl ChatError {
    /// True for errors that terminate an in-flight stream (everything except
    /// config/request construction failures).
    #[must_use]
    pub fn is_stream_fatal(&self) -> bool {
        matches!(
            self,
            ChatError::Transport(_) | ChatError::Server { .. } | ChatError::Upstream { .. }
        )
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}

/// Render a mid-stream error payload for display.
///
/// Upstream providers usually ship `{"message": "...", "code": ...}` inside
/// the `error` field; fall back to the raw JSON when `message` is absent.
fn upstream_message(payload: &serde_json::Value) -> String {
    payload
        .get("message")
        .and_then(serde_json::Value::as_str)
        .map_or_else(|| payload.to_string(), str::to_string)
}

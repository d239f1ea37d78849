pub mod dispatcher;
pub mod line_reader;

pub use dispatcher::{Dispatcher, StreamHandler, StreamPhase};
pub use line_reader::LineReader;

use crate::protocol::ChatCompletionChunk;

/// SSE data-frame prefix.
pub const DATA_PREFIX: &str = "data: ";
/// Sentinel payload marking end-of-stream on the wire. Inert for the parser;
/// the stream ends when the transport closes.
pub const DONE_PAYLOAD: &str = "[DONE]";

/// Classified interpretation of one SSE frame payload.
///
/// Classification happens exactly once per frame; downstream dispatch matches
/// on the variant instead of re-inspecting the payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// `[DONE]` (or empty) payload; ignored, not forwarded.
    Terminator,
    /// JSON payload carrying an `error` field; fatal.
    Error(serde_json::Value),
    /// OpenAI delta framing: `choices[0].delta.content`.
    Delta(String),
    /// Bare-text framing: payload passed through verbatim.
    Text(String),
}

/// Classify a single line into at most one [`StreamEvent`].
///
/// Lines without the `data: ` prefix (comments, blank keep-alives, named
/// event fields) are ignored. `{`-prefixed payloads that fail JSON parsing
/// are swallowed rather than forwarded as text: forwarding malformed
/// fragments renders visible corruption for binary-looking payloads.
/// Valid JSON matching neither the error nor the delta shape is discarded.
#[must_use]
pub fn classify_line(line: &str) -> Option<StreamEvent> {
    let payload = line.strip_prefix(DATA_PREFIX)?.trim();
    if payload.is_empty() || payload == DONE_PAYLOAD {
        return Some(StreamEvent::Terminator);
    }

    if !payload.starts_with('{') {
        return Some(StreamEvent::Text(payload.to_string()));
    }

    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(value) => value,
        Err(err) => {
            tracing::debug!(error = %err, len = payload.len(), "swallowing unparsable JSON frame");
            return None;
        }
    };

    if let Some(error) = value.get("error") {
        return Some(StreamEvent::Error(error.clone()));
    }

    match serde_json::from_value::<ChatCompletionChunk>(value) {
        Ok(chunk) => chunk.into_delta_content().map(StreamEvent::Delta),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn classify_delta_chunk() {
        let event = classify_line(r#"data: {"choices":[{"delta":{"content":"Hello"}}]}"#);
        assert_eq!(event, Some(StreamEvent::Delta("Hello".to_string())));
    }

    #[test]
    fn classify_bare_text() {
        let event = classify_line("data: plain text token");
        assert_eq!(event, Some(StreamEvent::Text("plain text token".to_string())));
    }

    #[test]
    fn classify_done_and_empty_payloads_as_terminator() {
        assert_eq!(classify_line("data: [DONE]"), Some(StreamEvent::Terminator));
        assert_eq!(classify_line("data:  [DONE] "), Some(StreamEvent::Terminator));
        assert_eq!(classify_line("data: "), Some(StreamEvent::Terminator));
    }

    #[test]
    fn classify_error_payload() {
        let event = classify_line(r#"data: {"error":{"message":"rate limited","code":429}}"#);
        assert_eq!(
            event,
            Some(StreamEvent::Error(json!({"message":"rate limited","code":429})))
        );
    }

    #[test]
    fn non_data_lines_are_ignored() {
        assert_eq!(classify_line(""), None);
        assert_eq!(classify_line(": keep-alive"), None);
        assert_eq!(classify_line("event: message_start"), None);
        assert_eq!(classify_line("id: 42"), None);
    }

    #[test]
    fn malformed_json_is_swallowed_not_forwarded() {
        assert_eq!(classify_line(r#"data: {"choices":[{"delta"#), None);
        assert_eq!(classify_line("data: {not json at all"), None);
    }

    #[test]
    fn unrecognized_json_shapes_are_discarded() {
        assert_eq!(classify_line(r#"data: {"usage":{"total_tokens":12}}"#), None);
        assert_eq!(classify_line(r#"data: {"choices":[]}"#), None);
        assert_eq!(
            classify_line(r#"data: {"choices":[{"delta":{"role":"assistant"}}]}"#),
            None
        );
    }

    #[test]
    fn payload_is_trimmed_before_classification() {
        let event = classify_line("data:   spaced out  ");
        assert_eq!(event, Some(StreamEvent::Text("spaced out".to_string())));
    }
}

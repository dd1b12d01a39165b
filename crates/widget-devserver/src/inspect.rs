//! Human-readable rendering of request and response bodies for debug logs.
//!
//! Works on a borrowed slice and returns a new string. Nothing here feeds
//! back into what is sent on the wire, so a malformed body only affects how
//! the log line looks.

/// Non-JSON bodies longer than this are cut in the log output.
pub const MAX_TEXT_PREVIEW: usize = 1000;

pub fn render_body(body: &[u8]) -> String {
    if body.is_empty() {
        return "<empty>".to_string();
    }

    if let Ok(value) = serde_json::from_slice::<serde_json::Value>(body) {
        if let Ok(pretty) = serde_json::to_string_pretty(&value) {
            return pretty;
        }
    }

    if body.len() > MAX_TEXT_PREVIEW {
        format!(
            "{}... (truncated)",
            String::from_utf8_lossy(&body[..MAX_TEXT_PREVIEW])
        )
    } else {
        String::from_utf8_lossy(body).into_owned()
    }
}

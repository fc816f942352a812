use std::sync::OnceLock;

use chatrelay_common::{Error, Result};
use regex::Regex;

const DANGEROUS_TAGS: &[&str] = &[
    "<script>", "</script>", "<iframe>", "</iframe>", "<object>", "</object>",
];

fn js_event_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)on\w+\s*=").expect("static pattern compiles"))
}

/// Validate and sanitize a raw user message. Empty and oversized messages are
/// rejected outright; surviving text has script-ish HTML tags and inline JS
/// event attributes stripped.
pub fn sanitize_message(raw: &str, max_len: usize) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation("message is required".to_string()));
    }
    if trimmed.chars().count() > max_len {
        return Err(Error::Validation(format!(
            "message too long (max {max_len} characters)"
        )));
    }

    let mut sanitized = trimmed.to_string();
    for tag in DANGEROUS_TAGS {
        sanitized = sanitized.replace(tag, "");
    }
    let sanitized = js_event_re().replace_all(&sanitized, "").trim().to_string();

    if sanitized.is_empty() {
        return Err(Error::Validation("message is required".to_string()));
    }

    Ok(sanitized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(sanitize_message("  hello there  ", 100).unwrap(), "hello there");
    }

    #[test]
    fn empty_and_oversized_rejected() {
        assert!(matches!(sanitize_message("   ", 100), Err(Error::Validation(_))));
        assert!(matches!(
            sanitize_message(&"x".repeat(101), 100),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn strips_script_tags_and_event_handlers() {
        let out = sanitize_message("<script>alert(1)</script>hi onclick= there", 100).unwrap();
        assert!(!out.contains("<script>"));
        assert!(!out.contains("onclick"));
        assert!(out.contains("alert(1)"));
        assert!(out.contains("there"));
    }

    #[test]
    fn fully_stripped_message_is_rejected() {
        assert!(sanitize_message("<script></script>", 100).is_err());
    }
}

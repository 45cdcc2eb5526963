//! Locate the JSON payload inside a raw generation response.
//!
//! Precedence, first match wins:
//! 1. a fenced block labeled `json`
//! 2. any fenced block
//! 3. the span from the first `{` to the last `}`
//!
//! If nothing matches the trimmed input is returned unchanged and parsing
//! fails downstream.

use std::sync::OnceLock;

use regex::Regex;

fn labeled_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)```[ \t]*json\s*(\{.*?\})\s*```").expect("valid labeled fence pattern")
    })
}

fn any_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_-]*\s*(\{.*?\})\s*```").expect("valid fence pattern")
    })
}

/// Return the substring most likely to hold a single JSON object.
pub fn extract_json(text: &str) -> &str {
    for re in [labeled_fence(), any_fence()] {
        if let Some(m) = re.captures(text).and_then(|caps| caps.get(1)) {
            return m.as_str();
        }
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => text.trim(),
    }
}

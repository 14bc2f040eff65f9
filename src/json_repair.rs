//! Salvage JSON from free-text model output.
//!
//! Model responses nominally contain a JSON object but arrive wrapped in
//! markdown, with typographic quotes, stray control bytes, trailing commas, or
//! cut off at the token limit. Each pass below fixes exactly one of those and
//! is tested on its own. Callers only ever see a value or `None`.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

lazy_static! {
    static ref CODE_FENCE: Regex = Regex::new(r"(?i)```[a-z0-9_+\-]*\s*").unwrap();
    static ref SMART_DOUBLE: Regex = Regex::new("[\u{201C}\u{201D}\u{201E}\u{201F}]").unwrap();
    static ref SMART_SINGLE: Regex = Regex::new("[\u{2018}\u{2019}\u{201A}\u{201B}]").unwrap();
    static ref LINE_BREAKS: Regex = Regex::new(r"[\r\n\t]+").unwrap();
    static ref SPACE_RUNS: Regex = Regex::new(r" {2,}").unwrap();
    static ref TRAILING_COMMA: Regex = Regex::new(r",(\s*[}\]])").unwrap();
}

/// How a value was recovered, or why it wasn't.
#[derive(Debug, Clone, PartialEq)]
pub enum Salvage {
    /// The raw text was already valid JSON.
    Direct(Value),
    /// Parsed after the cleanup passes.
    Repaired(Value),
    /// Parsed only after closing a truncated structure.
    Balanced(Value),
    /// Nothing between a `{` and a later `}`.
    NoObject,
    /// Still invalid after every pass.
    Unparseable,
}

impl Salvage {
    pub fn into_value(self) -> Option<Value> {
        match self {
            Salvage::Direct(v) | Salvage::Repaired(v) | Salvage::Balanced(v) => Some(v),
            Salvage::NoObject | Salvage::Unparseable => None,
        }
    }

    /// Short label used for metrics.
    pub fn outcome(&self) -> &'static str {
        match self {
            Salvage::Direct(_) => "direct",
            Salvage::Repaired(_) => "repaired",
            Salvage::Balanced(_) => "balanced",
            Salvage::NoObject => "no_object",
            Salvage::Unparseable => "unparseable",
        }
    }
}

/// Parse model output into JSON, repairing what can be repaired.
pub fn repair_and_parse_json(text: &str) -> Option<Value> {
    salvage(text).into_value()
}

/// Run the full repair cascade and report which stage succeeded.
pub fn salvage(text: &str) -> Salvage {
    // Only an object counts; bare scalars like `null` fall through to the cascade
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(text) {
        return Salvage::Direct(value);
    }

    let unfenced = strip_code_fences(text);
    let Some(body) = isolate_object(&unfenced) else {
        warn!(len = text.len(), "no JSON object found in model output");
        return Salvage::NoObject;
    };

    let cleaned = strip_control_chars(body);
    let cleaned = normalize_quotes(&cleaned);
    let cleaned = normalize_whitespace(&cleaned);
    let cleaned = strip_trailing_commas(&cleaned);

    match serde_json::from_str(&cleaned) {
        Ok(value) => return Salvage::Repaired(value),
        Err(e) => debug!(error = %e, "cleaned output still invalid, trying truncation repair"),
    }

    let balanced = strip_trailing_commas(&close_truncated(&cleaned));
    match serde_json::from_str(&balanced) {
        Ok(value) => Salvage::Balanced(value),
        Err(e) => {
            warn!(error = %e, cleaned_len = cleaned.len(), "JSON repair failed after all attempts");
            Salvage::Unparseable
        }
    }
}

/// Remove ```` ``` ```` fences (with or without a language tag) and any stray backticks.
pub fn strip_code_fences(text: &str) -> String {
    CODE_FENCE.replace_all(text, "").replace('`', "")
}

/// Slice from the first `{` to the last `}` inclusive.
pub fn isolate_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// Drop control characters other than tab, line feed and carriage return.
pub fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|&c| !matches!(c, '\u{00}'..='\u{08}' | '\u{0B}' | '\u{0C}' | '\u{0E}'..='\u{1F}' | '\u{7F}'))
        .collect()
}

/// Map typographic quotes to ASCII. Plain apostrophes are left alone.
pub fn normalize_quotes(text: &str) -> String {
    let doubled = SMART_DOUBLE.replace_all(text, "\"");
    SMART_SINGLE.replace_all(&doubled, "'").into_owned()
}

/// Collapse line breaks and tabs to spaces, then runs of spaces to one.
pub fn normalize_whitespace(text: &str) -> String {
    let flat = LINE_BREAKS.replace_all(text, " ");
    SPACE_RUNS.replace_all(&flat, " ").into_owned()
}

/// Remove commas that directly precede a closing `}` or `]`.
pub fn strip_trailing_commas(text: &str) -> String {
    TRAILING_COMMA.replace_all(text, "$1").into_owned()
}

/// Append the missing `]` then `}` for a structure that was cut off.
pub fn close_truncated(text: &str) -> String {
    let count = |c: char| text.chars().filter(|&x| x == c).count();
    let missing_brackets = count('[').saturating_sub(count(']'));
    let missing_braces = count('{').saturating_sub(count('}'));

    let mut fixed = String::with_capacity(text.len() + missing_brackets + missing_braces);
    fixed.push_str(text);
    fixed.extend(std::iter::repeat_n(']', missing_brackets));
    fixed.extend(std::iter::repeat_n('}', missing_braces));
    fixed
}

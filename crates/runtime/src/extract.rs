//! Recognizes a tool invocation embedded in free-form model output.
//!
//! Two shapes are tried, in this order:
//!
//! 1. A JSON object `{"tool_name": ..., "parameters": {...}}`, delimited by
//!    balanced braces starting at the first `{`.
//! 2. Call syntax `name(args)`, at the first identifier immediately followed
//!    by `(`. Arguments are `key=value` pairs or a single positional value,
//!    which is bound to `location`.
//!
//! Only the first candidate of each shape is considered. A candidate that
//! fails to parse is discarded and the text after it is not searched again.

use std::collections::BTreeMap;
use std::ops::Range;

use serde_json::Value;

use crate::tools::{Invocation, LOCATION_ARGUMENT};

/// Key a lone positional argument is bound to.
pub const POSITIONAL_ARGUMENT: &str = LOCATION_ARGUMENT;

/// An invocation and the byte range of `text` it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub invocation: Invocation,
    pub span: Range<usize>,
}

/// Split `text` into the invocation it carries, if any, and the remaining
/// narrative.
///
/// Without an invocation the text comes back unchanged. Otherwise the
/// narrative is the text around the invocation with whitespace runs
/// collapsed and ends trimmed.
pub fn extract(text: &str) -> (Option<Invocation>, String) {
    match locate(text) {
        Some(detection) => {
            let remaining = strip(text, detection.span);
            (Some(detection.invocation), remaining)
        }
        None => (None, text.to_string()),
    }
}

/// Find the invocation in `text` without touching the narrative.
pub fn locate(text: &str) -> Option<Detection> {
    locate_object(text).or_else(|| locate_call(text))
}

/// Remove `span` from `text`, joining what is left with single spaces.
pub fn strip(text: &str, span: Range<usize>) -> String {
    text[..span.start]
        .split_whitespace()
        .chain(text[span.end..].split_whitespace())
        .collect::<Vec<_>>()
        .join(" ")
}

fn locate_object(text: &str) -> Option<Detection> {
    let start = text.find('{')?;
    let end = closing(text, start, b'{', b'}', b"\"")?;
    let invocation = parse_object(&text[start..end])?;
    Some(Detection {
        invocation,
        span: start..end,
    })
}

fn parse_object(candidate: &str) -> Option<Invocation> {
    let value: Value = serde_json::from_str(candidate).ok()?;
    let object = value.as_object()?;

    let name = object.get("tool_name")?.as_str()?.trim();
    if name.is_empty() {
        return None;
    }

    let arguments = match object.get("parameters") {
        None => BTreeMap::new(),
        Some(Value::Object(params)) => params
            .iter()
            .filter_map(|(key, value)| argument_text(value).map(|text| (key.clone(), text)))
            .collect(),
        Some(_) => return None,
    };

    Some(Invocation {
        name: name.to_string(),
        arguments,
    })
}

fn argument_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn locate_call(text: &str) -> Option<Detection> {
    let bytes = text.as_bytes();

    for (open_at, _) in text.match_indices('(') {
        let name_start = bytes[..open_at]
            .iter()
            .rposition(|&b| !is_identifier_byte(b))
            .map_or(0, |i| i + 1);
        let name = &text[name_start..open_at];
        if !is_identifier(name) {
            continue;
        }

        let end = closing(text, open_at, b'(', b')', b"\"'")?;
        let arguments = parse_arguments(&text[open_at + 1..end - 1])?;
        return Some(Detection {
            invocation: Invocation {
                name: name.to_string(),
                arguments,
            },
            span: name_start..end,
        });
    }
    None
}

fn parse_arguments(inner: &str) -> Option<BTreeMap<String, String>> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Some(BTreeMap::new());
    }

    let parts = split_unquoted(inner, b',');
    if parts.iter().all(|part| unquoted(part, b'=').is_empty()) {
        let value = parts
            .iter()
            .map(|part| unquote(part.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        return Some(BTreeMap::from([(POSITIONAL_ARGUMENT.to_string(), value)]));
    }

    let mut arguments = BTreeMap::new();
    for part in parts {
        let at = *unquoted(part, b'=').first()?;
        let key = part[..at].trim();
        if !is_identifier(key) {
            return None;
        }
        let value = unquote(part[at + 1..].trim());
        arguments.insert(key.to_string(), value.to_string());
    }
    Some(arguments)
}

/// Byte offset just past the delimiter closing the one at `open_at`.
///
/// Delimiters inside quoted runs (see [`opens_quote`], backslash escapes
/// honored) do not count. `None` if the text ends first.
fn closing(text: &str, open_at: usize, open: u8, close: u8, quotes: &[u8]) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut quote = None;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open_at) {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == q {
                quote = None;
            }
            continue;
        }

        if opens_quote(bytes, i, quotes) {
            quote = Some(b);
        } else if b == open {
            depth += 1;
        } else if b == close {
            depth -= 1;
            if depth == 0 {
                return Some(i + 1);
            }
        }
    }
    None
}

/// Offsets of `sep` outside single- or double-quoted runs.
fn unquoted(text: &str, sep: u8) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut quote = None;
    for (i, &b) in bytes.iter().enumerate() {
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None if opens_quote(bytes, i, b"\"'") => quote = Some(b),
            None if b == sep => found.push(i),
            None => {}
        }
    }
    found
}

/// Whether the byte at `i` starts a quoted run. An apostrophe only counts
/// at the start of a value, so `St. John's` stays bare text.
fn opens_quote(bytes: &[u8], i: usize, quotes: &[u8]) -> bool {
    match bytes[i] {
        b'\'' if quotes.contains(&b'\'') => matches!(
            bytes[..i].iter().rev().find(|c| !c.is_ascii_whitespace()),
            None | Some(b'(' | b',' | b'=')
        ),
        b => quotes.contains(&b),
    }
}

fn split_unquoted(text: &str, sep: u8) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    for at in unquoted(text, sep) {
        parts.push(&text[start..at]);
        start = at + 1;
    }
    parts.push(&text[start..]);
    parts
}

fn unquote(text: &str) -> &str {
    let bytes = text.as_bytes();
    match (bytes.first(), bytes.last()) {
        (Some(&first), Some(&last))
            if bytes.len() >= 2 && first == last && (first == b'"' || first == b'\'') =>
        {
            &text[1..text.len() - 1]
        }
        _ => text,
    }
}

fn is_identifier_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}

fn is_identifier(name: &str) -> bool {
    let mut bytes = name.bytes();
    match bytes.next() {
        Some(first) if first.is_ascii_alphabetic() || first == b'_' => bytes.all(is_identifier_byte),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PARIS: &str = r#"{"tool_name":"weather","parameters":{"location":"Paris, FR"}}"#;

    fn weather(location: &str) -> Invocation {
        Invocation::new("weather").with_argument("location", location)
    }

    #[test]
    fn json_object_after_narrative() {
        let (invocation, remaining) = extract(&format!("I'll check. {PARIS}"));
        assert_eq!(invocation, Some(weather("Paris, FR")));
        assert_eq!(remaining, "I'll check.");
    }

    #[test]
    fn text_without_invocation_is_unchanged() {
        for text in [
            "",
            "It is sunny  in\tParis.\n",
            "Let me look that up (one moment).",
            "Braces { without } json",
            r#"{"tool_name": "weather", "parameters": {"location": "Paris, FR"}"#,
        ] {
            assert_eq!(extract(text), (None, text.to_string()), "{text:?}");
        }
    }

    #[test]
    fn nested_braces_stay_inside_the_object() {
        let text = r#"Checking {"tool_name":"weather","parameters":{"location":"Oslo, NO","opts":{"a":{"b":1}},"units":2}} done."#;
        let (invocation, remaining) = extract(text);
        let invocation = invocation.unwrap();

        assert_eq!(invocation.arguments["location"], "Oslo, NO");
        assert_eq!(invocation.arguments["opts"], r#"{"a":{"b":1}}"#);
        assert_eq!(invocation.arguments["units"], "2");
        assert_eq!(remaining, "Checking done.");
    }

    #[test]
    fn braces_inside_strings_do_not_count() {
        let text = r#"{"tool_name":"weather","parameters":{"location":"Odd}City, US"}} ok"#;
        let (invocation, remaining) = extract(text);
        assert_eq!(invocation, Some(weather("Odd}City, US")));
        assert_eq!(remaining, "ok");
    }

    #[test]
    fn only_the_first_object_is_considered() {
        let text = format!("{{not json}} then {PARIS}");
        assert_eq!(locate(&text), None);
    }

    #[test]
    fn object_without_tool_name_is_discarded() {
        assert_eq!(locate(r#"{"parameters":{"location":"Paris, FR"}}"#), None);
        assert_eq!(locate(r#"{"tool_name":"weather","parameters":"Paris"}"#), None);
    }

    #[test]
    fn object_shape_wins_over_call_shape() {
        let text = format!("weather(Rome, IT) or {PARIS}");
        let detection = locate(&text).unwrap();
        assert_eq!(detection.invocation, weather("Paris, FR"));
    }

    #[test]
    fn call_with_named_arguments() {
        let (invocation, remaining) =
            extract(r#"Sure. weather(location="San Juan, PR", units='metric') now"#);
        let invocation = invocation.unwrap();
        assert_eq!(invocation.name, "weather");
        assert_eq!(invocation.arguments["location"], "San Juan, PR");
        assert_eq!(invocation.arguments["units"], "metric");
        assert_eq!(remaining, "Sure. now");
    }

    #[test]
    fn positional_argument_binds_to_location() {
        assert_eq!(extract("weather('Paris, FR')").0, Some(weather("Paris, FR")));
        assert_eq!(extract("weather(San Juan, PR)").0, Some(weather("San Juan, PR")));
        assert_eq!(extract(r#"weather("Lima", "PE")"#).0, Some(weather("Lima, PE")));
    }

    #[test]
    fn apostrophes_inside_bare_arguments_are_text() {
        let (invocation, remaining) = extract("Checking. weather(St. John's, CA)");
        assert_eq!(invocation, Some(weather("St. John's, CA")));
        assert_eq!(remaining, "Checking.");

        assert_eq!(extract("weather(Xi'an, CN)").0, Some(weather("Xi'an, CN")));
        assert_eq!(
            extract(r#"weather(location="Xi'an, CN", units='metric')"#).0,
            Some(weather("Xi'an, CN").with_argument("units", "metric"))
        );
    }

    #[test]
    fn empty_call_is_detected_without_arguments() {
        let (invocation, remaining) = extract("Checking weather() now");
        assert_eq!(invocation, Some(Invocation::new("weather")));
        assert_eq!(remaining, "Checking now");
    }

    #[test]
    fn malformed_call_is_discarded() {
        assert_eq!(locate("weather(location=Paris, FR"), None);
        assert_eq!(locate("weather(location=\"Paris, FR\", 2)"), None);
        assert_eq!(locate("run(1x=2)"), None);
    }

    #[test]
    fn narrative_round_trips_around_the_invocation() {
        let narratives = [
            ("I'll check.", "One moment."),
            ("", "Fetching now."),
            ("Let me  see\n", ""),
            ("  Sure!", "\tThe data follows."),
        ];
        for (before, after) in narratives {
            let text = format!("{before} {PARIS} {after}");
            let (invocation, remaining) = extract(&text);
            let expected = format!("{before} {after}")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");

            assert_eq!(invocation, Some(weather("Paris, FR")), "{text:?}");
            assert_eq!(remaining, expected, "{text:?}");
        }
    }

    #[test]
    fn extraction_is_idempotent() {
        for text in [
            format!("I'll check. {PARIS} Back soon."),
            "Checking. weather(St. John's, CA)".to_string(),
            "It's  sunny\tin Lima today.".to_string(),
            String::new(),
        ] {
            assert_eq!(extract(&text), extract(&text), "{text:?}");
        }
    }

    #[test]
    fn remaining_text_holds_no_second_invocation() {
        for text in [
            format!("I'll check. {PARIS} Back soon."),
            "Sure. weather(location=\"Lima, PE\") now".to_string(),
        ] {
            let (first, remaining) = extract(&text);
            assert!(first.is_some());
            assert_eq!(extract(&remaining), (None, remaining.clone()));
        }
    }

    #[test]
    fn span_covers_exactly_the_invocation() {
        let text = format!("ab {PARIS} cd");
        let detection = locate(&text).unwrap();
        assert_eq!(&text[detection.span.clone()], PARIS);
        assert_eq!(strip(&text, detection.span), "ab cd");
    }
}

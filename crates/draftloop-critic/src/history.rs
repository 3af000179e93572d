//! Critique history codec.
//!
//! History items are either typed critiques or raw text. Raw text is decoded
//! through an ordered chain (strict JSON, then a lenient literal form) and
//! falls back to a `{"raw": text}` wrapper, so decoding never fails.

use std::iter::Peekable;
use std::str::Chars;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::trace;

use crate::CritiqueEntry;

/// A decoded critique as a JSON object
pub type CritiqueMap = Map<String, Value>;

/// Key used by the fallback wrapper for undecodable text
pub const RAW_KEY: &str = "raw";

/// One element of the append-only critique history
#[derive(Debug, Clone, PartialEq)]
pub enum CritiqueHistoryItem {
    Structured(CritiqueEntry),
    Raw(String),
}

impl CritiqueHistoryItem {
    pub fn is_structured(&self) -> bool {
        matches!(self, CritiqueHistoryItem::Structured(_))
    }

    pub fn as_entry(&self) -> Option<&CritiqueEntry> {
        match self {
            CritiqueHistoryItem::Structured(entry) => Some(entry),
            CritiqueHistoryItem::Raw(_) => None,
        }
    }

    /// Build an item from transported text, upgrading it to a typed entry
    /// when it decodes to one
    pub fn from_text(text: &str) -> Self {
        decode_chain(text)
            .and_then(|map| CritiqueEntry::from_map(&map))
            .map(CritiqueHistoryItem::Structured)
            .unwrap_or_else(|| CritiqueHistoryItem::Raw(text.to_string()))
    }
}

impl From<CritiqueEntry> for CritiqueHistoryItem {
    fn from(entry: CritiqueEntry) -> Self {
        CritiqueHistoryItem::Structured(entry)
    }
}

impl Serialize for CritiqueHistoryItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            CritiqueHistoryItem::Structured(entry) => entry.serialize(serializer),
            CritiqueHistoryItem::Raw(text) => serializer.serialize_str(text),
        }
    }
}

impl<'de> Deserialize<'de> for CritiqueHistoryItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(match value {
            Value::String(text) => CritiqueHistoryItem::from_text(&text),
            Value::Object(map) => match CritiqueEntry::from_map(&map) {
                Some(entry) => CritiqueHistoryItem::Structured(entry),
                None => CritiqueHistoryItem::Raw(Value::Object(map).to_string()),
            },
            other => CritiqueHistoryItem::Raw(other.to_string()),
        })
    }
}

/// Decode one history item into a mapping. Never fails.
pub fn parse_entry(item: &CritiqueHistoryItem) -> CritiqueMap {
    match item {
        CritiqueHistoryItem::Structured(entry) => entry.to_map(),
        CritiqueHistoryItem::Raw(text) => parse_text(text),
    }
}

/// Decode arbitrary text into a mapping. Never fails.
pub fn parse_text(text: &str) -> CritiqueMap {
    decode_chain(text).unwrap_or_else(|| raw_wrapper(text))
}

/// Decode an arbitrary JSON value into a mapping. Objects pass through
/// untouched, strings are decoded, anything else is decoded from its
/// textual form. Never fails.
pub fn parse_value(value: &Value) -> CritiqueMap {
    match value {
        Value::Object(map) => map.clone(),
        Value::String(text) => parse_text(text),
        other => parse_text(&other.to_string()),
    }
}

/// Most recent history item that decodes to a mapping, or an empty map.
///
/// Raw items that only survive as the `{"raw": ...}` wrapper are skipped.
pub fn latest_structured(history: &[CritiqueHistoryItem]) -> CritiqueMap {
    history
        .iter()
        .rev()
        .find_map(|item| match item {
            CritiqueHistoryItem::Structured(entry) => Some(entry.to_map()),
            CritiqueHistoryItem::Raw(text) => decode_chain(text),
        })
        .unwrap_or_default()
}

/// Feedback points of the most recent decodable critique (empty if none)
pub fn latest_feedback(history: &[CritiqueHistoryItem]) -> Vec<String> {
    latest_structured(history)
        .get("specific_feedback")
        .and_then(Value::as_array)
        .map(|points| {
            points
                .iter()
                .filter_map(|p| p.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

fn raw_wrapper(text: &str) -> CritiqueMap {
    let mut map = Map::new();
    map.insert(RAW_KEY.to_string(), Value::String(text.to_string()));
    map
}

type Decoder = fn(&str) -> Option<CritiqueMap>;

const DECODERS: [(&str, Decoder); 2] = [("strict", decode_strict), ("lenient", decode_lenient)];

fn decode_chain(text: &str) -> Option<CritiqueMap> {
    DECODERS.iter().find_map(|(name, decode)| {
        let decoded = decode(text);
        trace!(decoder = name, ok = decoded.is_some(), "Decoding history entry");
        decoded
    })
}

fn decode_strict(text: &str) -> Option<CritiqueMap> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn decode_lenient(text: &str) -> Option<CritiqueMap> {
    let normalized = normalize_literal(text.trim())?;
    match serde_json::from_str::<Value>(&normalized) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Rewrite a dict-style literal (single quotes, `True`/`False`/`None`,
/// trailing commas) into JSON text. Returns `None` on unterminated strings.
fn normalize_literal(text: &str) -> Option<String> {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\'' | '"' => {
                out.push('"');
                let mut closed = false;
                while let Some(inner) = chars.next() {
                    match inner {
                        '\\' => {
                            let escaped = chars.next()?;
                            push_escape(&mut out, escaped, &mut chars)?;
                        }
                        q if q == c => {
                            closed = true;
                            break;
                        }
                        other => push_json_char(&mut out, other),
                    }
                }
                if !closed {
                    return None;
                }
                out.push('"');
            }
            ',' => {
                let mut lookahead = chars.clone();
                while lookahead.peek().is_some_and(|n| n.is_whitespace()) {
                    lookahead.next();
                }
                if !matches!(lookahead.peek(), Some('}') | Some(']')) {
                    out.push(',');
                }
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(&n) = chars.peek() {
                    if n.is_alphanumeric() || n == '_' {
                        word.push(n);
                        chars.next();
                    } else {
                        break;
                    }
                }
                out.push_str(match word.as_str() {
                    "True" => "true",
                    "False" => "false",
                    "None" => "null",
                    other => other,
                });
            }
            other => out.push(other),
        }
    }

    Some(out)
}

/// Push one decoded character into a JSON string body
fn push_json_char(out: &mut String, ch: char) {
    match ch {
        '"' => out.push_str("\\\""),
        '\\' => out.push_str("\\\\"),
        c if (c as u32) < 0x20 => out.push_str(&format!("\\u{:04x}", c as u32)),
        c => out.push(c),
    }
}

/// Translate one literal backslash escape. `None` on a truncated or invalid
/// escape; unknown escapes keep their backslash.
fn push_escape(out: &mut String, escaped: char, chars: &mut Peekable<Chars<'_>>) -> Option<()> {
    let decoded = match escaped {
        // line continuation
        '\n' => return Some(()),
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        'b' => '\u{8}',
        'f' => '\u{c}',
        'a' => '\u{7}',
        'v' => '\u{b}',
        '\\' | '\'' | '"' => escaped,
        'x' => char::from_u32(take_hex(chars, 2)?)?,
        'U' => char::from_u32(take_hex(chars, 8)?)?,
        'u' => {
            let code = take_hex(chars, 4)?;
            match char::from_u32(code) {
                Some(ch) => ch,
                None => {
                    // lone surrogate half, JSON pairs it with its neighbour
                    out.push_str(&format!("\\u{:04x}", code));
                    return Some(());
                }
            }
        }
        '0'..='7' => {
            let mut code = escaped.to_digit(8)?;
            for _ in 0..2 {
                match chars.peek().and_then(|d| d.to_digit(8)) {
                    Some(d) => {
                        code = code * 8 + d;
                        chars.next();
                    }
                    None => break,
                }
            }
            char::from_u32(code)?
        }
        other => {
            out.push_str("\\\\");
            push_json_char(out, other);
            return Some(());
        }
    };
    push_json_char(out, decoded);
    Some(())
}

fn take_hex(chars: &mut Peekable<Chars<'_>>, len: usize) -> Option<u32> {
    let digits = (0..len).map(|_| chars.next()).collect::<Option<String>>()?;
    if !digits.chars().all(|d| d.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(&digits, 16).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Decision;
    use serde_json::json;

    fn entry(decision: Decision, score: f64, feedback: &[&str], round: u32) -> CritiqueEntry {
        CritiqueEntry {
            decision,
            quality_score: score,
            critique_summary: format!("round {}", round),
            specific_feedback: feedback.iter().map(|s| s.to_string()).collect(),
            revision_count: round,
        }
    }

    #[test]
    fn test_parse_entry_structured_passthrough() {
        let item = CritiqueHistoryItem::Structured(entry(Decision::Pass, 91.0, &["a"], 2));
        let map = parse_entry(&item);
        assert_eq!(map["decision"], "PASS");
        assert_eq!(map["quality_score"], 91.0);
        assert_eq!(map["revision_count"], 2);
    }

    #[test]
    fn test_parse_entry_strict_json() {
        let item = CritiqueHistoryItem::Raw(
            r#"{"decision": "REVISE", "quality_score": 55.0, "specific_feedback": ["x"]}"#.into(),
        );
        let map = parse_entry(&item);
        assert_eq!(map["decision"], "REVISE");
        assert_eq!(map["specific_feedback"], json!(["x"]));
    }

    #[test]
    fn test_parse_entry_lenient_literal() {
        let item = CritiqueHistoryItem::Raw(
            "{'decision': 'PASS', 'quality_score': 88.0, 'specific_feedback': ['it\\'s fine', \"say \\\"hi\\\"\",], 'done': True, 'extra': None}".into(),
        );
        let map = parse_entry(&item);
        assert_eq!(map["decision"], "PASS");
        assert_eq!(map["specific_feedback"], json!(["it's fine", "say \"hi\""]));
        assert_eq!(map["done"], true);
        assert_eq!(map["extra"], Value::Null);
    }

    #[test]
    fn test_parse_entry_malformed_falls_back_to_raw() {
        let text = "{'decision': 'PASS', 'quality_score': ";
        let map = parse_entry(&CritiqueHistoryItem::Raw(text.into()));
        assert_eq!(map.len(), 1);
        assert_eq!(map[RAW_KEY], text);
    }

    #[test]
    fn test_parse_entry_empty_string() {
        let map = parse_entry(&CritiqueHistoryItem::Raw(String::new()));
        assert_eq!(map[RAW_KEY], "");
    }

    #[test]
    fn test_parse_entry_unterminated_string() {
        let map = parse_text("{'decision: PASS}");
        assert_eq!(map[RAW_KEY], "{'decision: PASS}");
    }

    #[test]
    fn test_parse_text_literal_with_raw_control_chars() {
        let map = parse_text("{'decision': 'REVISE', 'critique_summary': 'a\tb\rc\nd'}");
        assert!(!map.contains_key(RAW_KEY));
        assert_eq!(map["critique_summary"], "a\tb\rc\nd");
    }

    #[test]
    fn test_parse_text_literal_python_escapes() {
        let map = parse_text(
            r"{'decision': 'REVISE', 'critique_summary': 'bell\x07', 'specific_feedback': ['caf\xe9', '\u00e9t\u00e9', '\101\0', 'C:\docs', 'a\
b']}",
        );
        assert!(!map.contains_key(RAW_KEY));
        assert_eq!(map["critique_summary"], "bell\u{7}");
        assert_eq!(
            map["specific_feedback"],
            json!(["café", "été", "A\u{0}", "C:\\docs", "ab"])
        );
    }

    #[test]
    fn test_parse_text_literal_bad_hex_escape_falls_back_to_raw() {
        let text = r"{'decision': 'REVISE', 'critique_summary': 'oops\xZZ'}";
        let map = parse_text(text);
        assert_eq!(map.len(), 1);
        assert_eq!(map[RAW_KEY], text);
    }

    #[test]
    fn test_parse_text_non_object_json() {
        let map = parse_text("[1, 2, 3]");
        assert_eq!(map[RAW_KEY], "[1, 2, 3]");
    }

    #[test]
    fn test_parse_value_handles_any_json() {
        let object = json!({"decision": "PASS"});
        assert_eq!(parse_value(&object), object.as_object().unwrap().clone());

        let string = json!(r#"{"quality_score": 12.5}"#);
        assert_eq!(parse_value(&string)["quality_score"], 12.5);

        assert_eq!(parse_value(&json!(42))[RAW_KEY], "42");
        assert_eq!(parse_value(&Value::Null)[RAW_KEY], "null");
        assert_eq!(parse_value(&json!(true))[RAW_KEY], "true");
    }

    #[test]
    fn test_latest_structured_empty_history() {
        assert!(latest_structured(&[]).is_empty());
    }

    #[test]
    fn test_latest_structured_skips_unparsable_raw() {
        let a = entry(Decision::Revise, 61.0, &["add examples"], 1);
        let history = vec![
            CritiqueHistoryItem::Raw("Initial draft generated.".into()),
            CritiqueHistoryItem::Structured(a.clone()),
        ];
        assert_eq!(latest_structured(&history), a.to_map());

        let history = vec![
            CritiqueHistoryItem::Structured(a.clone()),
            CritiqueHistoryItem::Raw("not a critique".into()),
        ];
        assert_eq!(latest_structured(&history), a.to_map());
    }

    #[test]
    fn test_latest_structured_prefers_most_recent() {
        let history = vec![
            CritiqueHistoryItem::Structured(entry(Decision::Revise, 40.0, &["old"], 1)),
            CritiqueHistoryItem::Raw(r#"{"specific_feedback": ["newer"]}"#.into()),
        ];
        assert_eq!(latest_feedback(&history), vec!["newer".to_string()]);
    }

    #[test]
    fn test_latest_feedback_empty_when_no_critiques() {
        let history = vec![CritiqueHistoryItem::Raw("nothing here".into())];
        assert!(latest_feedback(&history).is_empty());
        assert!(latest_feedback(&[]).is_empty());
    }

    #[test]
    fn test_history_item_serde() {
        let structured = CritiqueHistoryItem::Structured(entry(Decision::Pass, 90.0, &[], 3));
        let raw = CritiqueHistoryItem::Raw("garbled".into());
        let json = serde_json::to_string(&vec![structured.clone(), raw.clone()]).unwrap();

        let decoded: Vec<CritiqueHistoryItem> = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, vec![structured, raw]);
    }

    #[test]
    fn test_history_item_string_upgraded_to_structured() {
        let text = r#"{"decision": "REVISE", "quality_score": 40.0, "critique_summary": "meh", "specific_feedback": [], "revision_count": 1}"#;
        let item: CritiqueHistoryItem = serde_json::from_value(json!(text)).unwrap();
        assert!(item.is_structured());
        assert_eq!(item.as_entry().unwrap().quality_score, 40.0);
    }
}

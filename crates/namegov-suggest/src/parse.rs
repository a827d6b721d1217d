use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use namegov_core::{FixSuggestion, NameCandidate, ValidationVerdict};

use crate::{Result, SuggestError};

#[derive(Deserialize)]
struct LlmCandidate {
    name: String,
    #[serde(default)]
    reasoning: Option<String>,
}

impl From<LlmCandidate> for NameCandidate {
    fn from(c: LlmCandidate) -> Self {
        NameCandidate {
            name: c.name,
            reasoning: c.reasoning,
        }
    }
}

#[derive(Deserialize)]
struct LlmFix {
    original: String,
    #[serde(alias = "suggestedName")]
    suggested_name: String,
    #[serde(default)]
    explanation: String,
}

/// Extract the JSON object substring (first `{` to last `}`) from raw model output.
pub fn extract_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    Some(&raw[start..=end])
}

/// Parse a suggestion list stored under `list_key`.
///
/// Output with no JSON object at all is a hard failure. A JSON object that
/// does not parse falls back to salvaging individual `{"name": ...}`
/// objects; if none can be salvaged the parse error is returned.
pub fn parse_suggestions(raw: &str, list_key: &str) -> Result<Vec<NameCandidate>> {
    let json = extract_json_object(raw).ok_or(SuggestError::NoJson)?;

    let doc: Value = match serde_json::from_str(json) {
        Ok(doc) => doc,
        Err(e) => {
            let salvaged: Vec<LlmCandidate> = salvage_objects(json);
            if salvaged.is_empty() {
                return Err(SuggestError::MalformedJson(e));
            }
            tracing::warn!(count = salvaged.len(), "salvaged suggestions from malformed JSON");
            return Ok(salvaged.into_iter().map(NameCandidate::from).collect());
        }
    };

    let mut candidates: Vec<NameCandidate> = items(&doc, list_key)
        .into_iter()
        .filter_map(|item| serde_json::from_value::<LlmCandidate>(item).ok())
        .map(NameCandidate::from)
        .collect();

    // Single-name replies.
    if candidates.is_empty() {
        if let Some(name) = doc.get("generated_name").and_then(Value::as_str) {
            candidates.push(NameCandidate {
                name: name.to_string(),
                reasoning: Some(
                    doc.get("reasoning")
                        .and_then(Value::as_str)
                        .unwrap_or("Single name generated.")
                        .to_string(),
                ),
            });
        }
    }
    Ok(candidates)
}

/// Parse `{"creative_names": {"<placement>": [{"name", "reasoning"}]}}`.
///
/// A malformed document falls back to salvaging each `"<placement>": [...]`
/// group separately.
pub fn parse_creative_suggestions(raw: &str) -> Result<BTreeMap<String, Vec<NameCandidate>>> {
    let json = extract_json_object(raw).ok_or(SuggestError::NoJson)?;

    let doc: Value = match serde_json::from_str(json) {
        Ok(doc) => doc,
        Err(e) => {
            let salvaged = salvage_groups(json);
            if salvaged.is_empty() {
                return Err(SuggestError::MalformedJson(e));
            }
            tracing::warn!(groups = salvaged.len(), "salvaged creative names from malformed JSON");
            return Ok(salvaged);
        }
    };

    let mut by_placement = BTreeMap::new();
    if let Some(map) = doc.get("creative_names").and_then(Value::as_object) {
        for (placement, list) in map {
            let names: Vec<NameCandidate> = list
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(|item| serde_json::from_value::<LlmCandidate>(item.clone()).ok())
                .map(NameCandidate::from)
                .collect();
            by_placement.insert(placement.clone(), names);
        }
    }
    Ok(by_placement)
}

/// Salvage `"key": [ {...}, ... ]` groups, keeping groups with at least one
/// well-formed candidate.
fn salvage_groups(json: &str) -> BTreeMap<String, Vec<NameCandidate>> {
    let mut groups = BTreeMap::new();
    let mut rest = json;
    while let Some(open) = rest.find('[') {
        let key = rest[..open]
            .trim_end()
            .strip_suffix(':')
            .map(str::trim_end)
            .and_then(|b| b.strip_suffix('"'))
            .and_then(|b| b.rfind('"').map(|q| &b[q + 1..]));
        let Some(array) = balanced_spans(&rest[open..], '[', ']').first().copied() else {
            break;
        };
        if let Some(key) = key {
            let names: Vec<LlmCandidate> = salvage_objects(array);
            if !names.is_empty() {
                groups.insert(
                    key.to_string(),
                    names.into_iter().map(NameCandidate::from).collect(),
                );
            }
        }
        rest = &rest[open + array.len()..];
    }
    groups
}

/// Parse fix recommendations. A lone `suggested_name` reply is attributed to
/// the first invalid name.
pub fn parse_fixes(raw: &str, invalid: &[&ValidationVerdict]) -> Result<Vec<FixSuggestion>> {
    let json = extract_json_object(raw).ok_or(SuggestError::NoJson)?;

    let doc: Value = match serde_json::from_str(json) {
        Ok(doc) => doc,
        Err(e) => {
            let salvaged: Vec<LlmFix> = salvage_objects(json);
            if salvaged.is_empty() {
                return Err(SuggestError::MalformedJson(e));
            }
            tracing::warn!(count = salvaged.len(), "salvaged fixes from malformed JSON");
            return Ok(salvaged.into_iter().map(to_fix).collect());
        }
    };

    let mut fixes: Vec<FixSuggestion> = items(&doc, "fixes")
        .into_iter()
        .filter_map(|item| serde_json::from_value::<LlmFix>(item).ok())
        .map(to_fix)
        .collect();

    if fixes.is_empty() {
        let lone = doc.get("suggested_name").and_then(Value::as_str);
        if let (Some(suggested), Some(first)) = (lone, invalid.first()) {
            fixes.push(FixSuggestion {
                original: first.name.clone(),
                suggested_name: suggested.to_string(),
                explanation: doc
                    .get("explanation")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
            });
        }
    }
    Ok(fixes)
}

fn to_fix(f: LlmFix) -> FixSuggestion {
    FixSuggestion {
        original: f.original,
        suggested_name: f.suggested_name,
        explanation: f.explanation,
    }
}

fn items(doc: &Value, key: &str) -> Vec<Value> {
    doc.get(key)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

/// Try to recover well-formed objects of type `T` from a malformed JSON object.
///
/// Objects that do not deserialize as `T` are searched for nested ones.
fn salvage_objects<T: DeserializeOwned>(json: &str) -> Vec<T> {
    let inner = json
        .trim()
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .unwrap_or(json);

    let mut found = Vec::new();
    for span in balanced_spans(inner, '{', '}') {
        match serde_json::from_str::<T>(span) {
            Ok(item) => found.push(item),
            Err(_) => found.extend(salvage_objects::<T>(span)),
        }
    }
    found
}

/// Top-level `open`…`close` spans of `s`, ignoring delimiters inside string
/// literals.
fn balanced_spans(s: &str, open: char, close: char) -> Vec<&str> {
    let mut spans = Vec::new();
    let mut depth = 0usize;
    let mut start = None;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in s.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            c if c == open => {
                if depth == 0 {
                    start = Some(i);
                }
                depth += 1;
            }
            c if c == close && depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    if let Some(st) = start.take() {
                        spans.push(&s[st..=i]);
                    }
                }
            }
            _ => {}
        }
    }
    spans
}

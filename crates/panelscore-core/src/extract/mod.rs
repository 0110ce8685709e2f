//! Lenient extraction of per-dimension scores from completion responses.
//!
//! A response body may be a chat-completion envelope (`choices[0].message`),
//! an Anthropic-style envelope (`content[].text`), an error envelope, or the
//! scoring payload itself surrounded by commentary and markdown fences.
//! Extraction never fails loudly: unusable input produces an
//! [`ExtractionResult`] with `ok == false` so callers can carry on with
//! human-only data.

pub mod scanner;

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::catalog::Dimension;
use crate::error::ExtractionFailure;
use scanner::{RawValue, ScanError, Span};

/// Top-level keys that identify a scoring payload object.
const PAYLOAD_KEYS: &[&str] = &[
    "scores",
    "dimension_scores",
    "overall_comment",
    "analysis",
    "strengths",
    "weaknesses",
    "suggestions",
];

/// Scores and narrative recovered from one completion response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Scores for the dimensions the response mentioned. Missing ones stay unset.
    #[serde(default)]
    pub dimension_scores: BTreeMap<Dimension, u8>,
    #[serde(default)]
    pub dimension_comments: BTreeMap<Dimension, String>,
    #[serde(default)]
    pub overall_comment: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub weaknesses: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    /// `true` when a scoring payload was found.
    pub ok: bool,
    /// Why extraction produced nothing, when `ok` is false.
    #[serde(skip)]
    pub failure: Option<ExtractionFailure>,
}

impl ExtractionResult {
    pub fn failed(failure: ExtractionFailure) -> Self {
        Self {
            failure: Some(failure),
            ..Default::default()
        }
    }

    pub fn has_scores(&self) -> bool {
        self.ok && !self.dimension_scores.is_empty()
    }
}

/// What the outer layer of a response body turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Envelope {
    /// A completion envelope. Either field may be empty.
    Completion { content: String, reasoning: String },
    /// The service answered with an error object.
    Error(String),
    /// Not an envelope; the body is scanned as-is.
    Bare,
}

fn is_payload_key(key: &str) -> bool {
    PAYLOAD_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

fn member<'m, 'a>(members: &'m [(String, RawValue<'a>)], key: &str) -> Option<&'m RawValue<'a>> {
    members
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

fn text_member(members: &[(String, RawValue<'_>)], key: &str) -> String {
    member(members, key)
        .and_then(|v| v.as_text())
        .map(str::to_string)
        .unwrap_or_default()
}

/// Classify the outermost object of `raw`.
pub fn unwrap_envelope(raw: &str) -> Envelope {
    let Some(start) = raw.find('{') else {
        return Envelope::Bare;
    };
    let Ok(span) = scanner::match_delimiter(raw, start) else {
        return Envelope::Bare;
    };
    let Ok(members) = scanner::object_members(span.slice(raw)) else {
        return Envelope::Bare;
    };
    if members.iter().any(|(k, _)| is_payload_key(k)) {
        return Envelope::Bare;
    }

    if let Some(RawValue::Array(choices)) = member(&members, "choices") {
        return completion_from_choices(choices);
    }
    if let Some(RawValue::Array(blocks)) = member(&members, "content") {
        if let Some(envelope) = completion_from_blocks(blocks) {
            return envelope;
        }
    }
    if let Some(error) = member(&members, "error") {
        return Envelope::Error(error_message(error));
    }
    Envelope::Bare
}

fn completion_from_choices(choices: &str) -> Envelope {
    let first = scanner::array_elements(choices)
        .ok()
        .and_then(|elements| elements.into_iter().next());
    let Some(RawValue::Object(choice)) = first else {
        return Envelope::Completion {
            content: String::new(),
            reasoning: String::new(),
        };
    };

    let members = scanner::object_members(choice).unwrap_or_default();
    let mut content = String::new();
    let mut reasoning = String::new();
    // Streaming chunks carry `delta` in place of `message`.
    for holder in ["message", "delta"] {
        if let Some(RawValue::Object(message)) = member(&members, holder) {
            let fields = scanner::object_members(message).unwrap_or_default();
            content = text_member(&fields, "content");
            reasoning = text_member(&fields, "reasoning_content");
            break;
        }
    }
    if content.is_empty() {
        content = text_member(&members, "text");
    }
    Envelope::Completion { content, reasoning }
}

fn completion_from_blocks(blocks: &str) -> Option<Envelope> {
    let mut content = Vec::new();
    let mut reasoning = Vec::new();
    for block in scanner::array_elements(blocks).ok()? {
        let RawValue::Object(block) = block else {
            continue;
        };
        let fields = scanner::object_members(block).unwrap_or_default();
        let text = text_member(&fields, "text");
        if !text.is_empty() {
            content.push(text);
        }
        let thinking = text_member(&fields, "thinking");
        if !thinking.is_empty() {
            reasoning.push(thinking);
        }
    }
    if content.is_empty() && reasoning.is_empty() {
        return None;
    }
    Some(Envelope::Completion {
        content: content.join("\n"),
        reasoning: reasoning.join("\n"),
    })
}

fn error_message(value: &RawValue<'_>) -> String {
    match value {
        RawValue::Object(obj) => {
            let fields = scanner::object_members(obj).unwrap_or_default();
            let message = text_member(&fields, "message");
            if message.is_empty() {
                obj.to_string()
            } else {
                message
            }
        }
        RawValue::Array(arr) => arr.to_string(),
        RawValue::String(s) => s.clone(),
        RawValue::Scalar(s) => s.to_string(),
    }
}

/// Extract scores from a raw response body. Never panics and never errors;
/// check [`ExtractionResult::ok`].
pub fn extract(raw: &str) -> ExtractionResult {
    match try_extract(raw) {
        Ok(result) => result,
        Err(failure) => {
            tracing::warn!("no usable scores in response: {failure}");
            ExtractionResult::failed(failure)
        }
    }
}

/// Like [`extract`] but reports why nothing was found.
pub fn try_extract(raw: &str) -> Result<ExtractionResult, ExtractionFailure> {
    let mut candidates: Vec<String> = Vec::new();
    match unwrap_envelope(raw) {
        Envelope::Error(message) => return Err(ExtractionFailure::ErrorEnvelope(message)),
        Envelope::Completion { content, reasoning } => {
            if content.trim().is_empty() && !reasoning.trim().is_empty() {
                tracing::debug!("empty content, falling back to reasoning_content");
            }
            candidates.extend(
                [content, reasoning]
                    .into_iter()
                    .filter(|text| !text.trim().is_empty()),
            );
            // Gateways may inline the payload as an object instead of text.
            candidates.push(raw.to_string());
        }
        Envelope::Bare => candidates.push(raw.to_string()),
    }

    let mut first_failure = None;
    for text in &candidates {
        match find_payload(text) {
            Ok(members) => {
                let result = read_payload(&members);
                // Some gateways answer failures with an empty payload plus `error`.
                if let Some(error) = member(&members, "error").filter(|v| v.as_text().is_some()) {
                    if result.dimension_scores.is_empty() {
                        return Err(ExtractionFailure::ErrorEnvelope(error_message(error)));
                    }
                }
                return Ok(result);
            }
            Err(failure) => {
                first_failure.get_or_insert(failure);
            }
        }
    }
    Err(first_failure.unwrap_or(ExtractionFailure::NoBalancedObject))
}

/// First balanced object in `text` that carries a payload key.
///
/// Outcomes for nested openers are cached from the scan that visited them,
/// which keeps unbalanced or deeply nested input linear.
fn find_payload(text: &str) -> Result<Vec<(String, RawValue<'_>)>, ExtractionFailure> {
    let mut saw_balanced = false;
    let mut unbalanced_at = None;
    let mut known: HashMap<usize, Result<Span, ScanError>> = HashMap::new();

    for (open, _) in text.match_indices('{') {
        let outcome = match known.remove(&open) {
            Some(outcome) => outcome,
            None => {
                let (outcome, nested) = scanner::match_delimiter_resolving(text, open);
                known.extend(nested);
                outcome
            }
        };
        match outcome {
            Ok(span) => {
                saw_balanced = true;
                let Ok(members) = scanner::object_members(span.slice(text)) else {
                    continue;
                };
                if members.iter().any(|(k, _)| is_payload_key(k)) {
                    return Ok(members);
                }
            }
            Err(_) => {
                unbalanced_at.get_or_insert(open);
            }
        }
    }

    match (saw_balanced, unbalanced_at) {
        (true, _) => Err(ExtractionFailure::NoPayload),
        (false, Some(at)) => Err(ExtractionFailure::Unbalanced(at)),
        (false, None) => Err(ExtractionFailure::NoBalancedObject),
    }
}

fn read_payload(members: &[(String, RawValue<'_>)]) -> ExtractionResult {
    let mut result = ExtractionResult {
        ok: true,
        ..Default::default()
    };

    for (key, value) in members {
        match key.to_ascii_lowercase().as_str() {
            "scores" | "dimension_scores" => {
                if let RawValue::Object(obj) = value {
                    read_scores(obj, &mut result);
                }
            }
            "overall_comment" | "analysis" => {
                if result.overall_comment.is_empty() {
                    if let Some(text) = value.as_text() {
                        result.overall_comment = text.to_string();
                    }
                }
            }
            "strengths" => result.strengths = string_list(value),
            "weaknesses" => result.weaknesses = string_list(value),
            "suggestions" => result.suggestions = string_list(value),
            _ => {}
        }
    }

    result
}

fn read_scores(obj: &str, result: &mut ExtractionResult) {
    let Ok(entries) = scanner::object_members(obj) else {
        return;
    };
    for (key, value) in &entries {
        let Ok(dimension) = key.parse::<Dimension>() else {
            tracing::debug!("ignoring unknown dimension key '{key}'");
            continue;
        };
        match value {
            RawValue::Object(detail) => {
                let fields = scanner::object_members(detail).unwrap_or_default();
                if let Some(score) = member(&fields, "score").and_then(|v| parse_score(dimension, v)) {
                    result.dimension_scores.insert(dimension, score);
                }
                let comment = text_member(&fields, "comment");
                if !comment.is_empty() {
                    result.dimension_comments.insert(dimension, comment);
                }
            }
            other => {
                if let Some(score) = parse_score(dimension, other) {
                    result.dimension_scores.insert(dimension, score);
                }
            }
        }
    }
}

fn parse_score(dimension: Dimension, value: &RawValue<'_>) -> Option<u8> {
    let number = value.as_f64()?;
    let rounded = number.round();
    if !(0.0..=100.0).contains(&rounded) {
        tracing::warn!("discarding out-of-range score {number} for {dimension}");
        return None;
    }
    Some(rounded as u8)
}

fn string_list(value: &RawValue<'_>) -> Vec<String> {
    match value {
        RawValue::Array(arr) => scanner::array_elements(arr)
            .unwrap_or_default()
            .iter()
            .filter_map(|v| v.as_text())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        other => other
            .as_text()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| vec![s.to_string()])
            .unwrap_or_default(),
    }
}

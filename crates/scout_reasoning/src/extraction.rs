//! Structured extraction: recover a JSON object from free-form model text.
//!
//! Strategies run in a fixed order and each one falls through on failure:
//! the whole text, a fenced block tagged `json`, any fenced block, then the
//! balanced `{...}` literals found by a string-aware scan. Candidates are
//! tried against the target record in that order; the first one that
//! deserializes and validates wins.

use regex::Regex;
use scout_core::error::ExtractionError;
use scout_core::records::{
    AssetDimensions, CompetitiveSet, PositionAnalysis, StructuredRecord, Validate,
};
use scout_core::state::StepKind;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::LazyLock;

static RE_JSON_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)```[ \t]*json\s*(.*?)```").unwrap());
static RE_ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n?(.*?)```").unwrap());

type Object = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    JsonFence,
    AnyFence,
    BalancedObject,
}

impl Strategy {
    pub const CHAIN: [Strategy; 4] = [
        Strategy::Direct,
        Strategy::JsonFence,
        Strategy::AnyFence,
        Strategy::BalancedObject,
    ];

    /// Every object this strategy recovers from `text`, in textual order.
    pub fn candidates(&self, text: &str) -> Vec<Object> {
        match self {
            Strategy::Direct => parse_object(text).into_iter().collect(),
            Strategy::JsonFence => fenced(&RE_JSON_FENCE, text),
            Strategy::AnyFence => fenced(&RE_ANY_FENCE, text),
            Strategy::BalancedObject => balanced_objects(text),
        }
    }
}

fn parse_object(text: &str) -> Option<Object> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn fenced(re: &Regex, text: &str) -> Vec<Object> {
    re.captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .filter_map(|body| parse_object(body.as_str()))
        .collect()
}

/// Top-level `{...}` spans that parse as objects. Braces inside string
/// literals are ignored. A span that closes but fails to parse is skipped and
/// scanning resumes just after its opening brace.
fn balanced_objects(text: &str) -> Vec<Object> {
    let bytes = text.as_bytes();
    let mut found = Vec::new();
    let mut start = 0;
    let mut closes = HashMap::new();

    while let Some(offset) = text[start..].find('{') {
        let open = start + offset;
        if !closes.contains_key(&open) {
            scan_braces(bytes, open, &mut closes);
        }
        match closes.get(&open).copied().flatten() {
            Some(close) => match parse_object(&text[open..=close]) {
                Some(obj) => {
                    found.push(obj);
                    start = close + 1;
                }
                None => start = open + 1,
            },
            None => start = open + 1,
        }
    }
    found
}

/// Record the closing index (or `None` if it never closes) of the brace at
/// `open` and of every brace the scan passes outside a string. A brace met
/// outside a string starts from the same lexical state a fresh scan would,
/// so its entry is final and the text after it is never rescanned.
fn scan_braces(bytes: &[u8], open: usize, closes: &mut HashMap<usize, Option<usize>>) {
    let mut pending = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => pending.push(i),
            b'}' => {
                if let Some(o) = pending.pop() {
                    closes.insert(o, Some(i));
                }
                if pending.is_empty() {
                    return;
                }
            }
            _ => {}
        }
    }
    for o in pending {
        closes.insert(o, None);
    }
}

/// First object any strategy recovers.
pub fn extract_object(text: &str) -> Result<Value, ExtractionError> {
    Strategy::CHAIN
        .iter()
        .find_map(|s| s.candidates(text).into_iter().next())
        .map(Value::Object)
        .ok_or(ExtractionError::NoObject)
}

/// First candidate that deserializes into `T` and passes validation.
///
/// When objects are found but none fits, the error describes the first one.
pub fn extract_record<T>(text: &str) -> Result<T, ExtractionError>
where
    T: DeserializeOwned + Validate,
{
    let mut first_error: Option<String> = None;

    for strategy in Strategy::CHAIN {
        for candidate in strategy.candidates(text) {
            let attempt = serde_json::from_value::<T>(Value::Object(candidate))
                .map_err(|e| e.to_string())
                .and_then(|record| record.validate().map(|_| record));
            match attempt {
                Ok(record) => {
                    tracing::debug!(?strategy, "extracted record");
                    return Ok(record);
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
    }

    Err(first_error
        .map(ExtractionError::Schema)
        .unwrap_or(ExtractionError::NoObject))
}

/// Extract the record type produced by `kind`.
pub fn extract_for(kind: StepKind, text: &str) -> Result<StructuredRecord, ExtractionError> {
    match kind {
        StepKind::PositionAnalysis => {
            extract_record::<PositionAnalysis>(text).map(StructuredRecord::Position)
        }
        StepKind::AssetDimensions => {
            extract_record::<AssetDimensions>(text).map(StructuredRecord::Dimensions)
        }
        StepKind::CompetitiveSet => {
            extract_record::<CompetitiveSet>(text).map(StructuredRecord::CompetitiveSet)
        }
    }
}

//! Tolerant parser for the recommendation JSON the LLM returns.
//!
//! The model's output format is not contractually stable: keys drift between
//! runs, optional sections disappear, and the JSON is occasionally wrapped in
//! prose or code fences. Everything here maps whatever arrived onto the fixed
//! `RecommendationResponse` shape, or reports that nothing usable came back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::llm_client::strip_json_fences;

pub const DEFAULT_SOURCE: &str = "openai";
/// `source` of a response replayed from storage rather than generated.
pub const CACHE_SOURCE: &str = "cache";
const DEFAULT_SUMMARY: &str = "Recommendation draft";
const DEFAULT_VISA_TYPE: &str = "Visa option";
const DEFAULT_REASONING: &str = "See details";
const FALLBACK_SUMMARY: &str = "Unable to parse structured response. Showing raw model output.";
const FALLBACK_NOTE: &str = "Model returned unstructured text; please retry.";

// Lookup chains, most specific key first.
const VISA_TYPE_KEYS: &[&str] = &["visa_name", "visa_type_code"];
const REASONING_KEYS: &[&str] = &["match_summary", "eligibility_summary", "overview"];
const RISK_FLAG_KEYS: &[&str] = &["quick_facts", "requirements"];
const NEXT_STEP_KEYS: &[&str] = &["success_boost", "improvement_actions"];
const SUMMARY_KEYS: &[&str] = &["insight_summary", "summary"];

/// One recommended visa pathway in canonical form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationOption {
    pub visa_type: String,
    pub reasoning: String,
    pub likelihood: Option<String>,
    pub estimated_timeline: Option<String>,
    pub estimated_costs: Option<String>,
    pub risk_flags: Option<Vec<String>>,
    pub next_steps: Option<Vec<String>>,
    /// The untouched source object when the model used the rich format.
    /// The checklist page reads timeline/checklist/country from here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Canonical recommendation payload returned to clients and stored per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResponse {
    pub summary: String,
    pub options: Vec<RecommendationOption>,
    pub notes: Option<Vec<String>>,
    #[serde(default = "default_source")]
    pub source: String,
    pub raw_message: Option<String>,
}

fn default_source() -> String {
    DEFAULT_SOURCE.to_string()
}

/// Parses raw LLM output into a `RecommendationResponse`.
///
/// Returns `None` when no JSON object can be recovered from `raw`.
pub fn parse_recommendation(raw: &str) -> Option<RecommendationResponse> {
    let data = parse_object(raw)?;

    let response = if is_rich_format(&data) {
        parse_rich(&data)
    } else {
        parse_legacy(&data)
    };

    Some(RecommendationResponse {
        raw_message: Some(raw.to_string()),
        ..response
    })
}

/// Response used when the model's output could not be parsed at all.
pub fn fallback_response(raw: &str) -> RecommendationResponse {
    RecommendationResponse {
        summary: FALLBACK_SUMMARY.to_string(),
        options: Vec::new(),
        notes: Some(vec![FALLBACK_NOTE.to_string()]),
        source: default_source(),
        raw_message: Some(raw.to_string()),
    }
}

/// Recovers a JSON object from model output. Tries the fence-stripped text
/// first, then the outermost `{ ... }` span, then the first complete object
/// starting at any `{` (prose before the JSON may contain braces too).
pub(crate) fn parse_object(raw: &str) -> Option<Map<String, Value>> {
    let text = strip_json_fences(raw);
    if let Ok(value) = serde_json::from_str::<Value>(text) {
        return as_object(value);
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&text[start..=end]) {
                return Some(map);
            }
        }
    }

    text.match_indices('{').find_map(|(start, _)| {
        let mut stream = serde_json::Deserializer::from_str(&text[start..]).into_iter::<Value>();
        match stream.next() {
            Some(Ok(Value::Object(map))) => Some(map),
            _ => None,
        }
    })
}

fn as_object(value: Value) -> Option<Map<String, Value>> {
    match value {
        Value::Object(map) => Some(map),
        _ => None,
    }
}

/// The strategist schema carries scores and a `recommendations` array. A bare
/// `recommendations` array with no legacy `options` is treated the same way.
fn is_rich_format(data: &Map<String, Value>) -> bool {
    data.contains_key("recommendations")
        && (data.contains_key("current_score") || !data.contains_key("options"))
}

fn parse_rich(data: &Map<String, Value>) -> RecommendationResponse {
    let options = objects(data.get("recommendations"))
        .map(|opt| RecommendationOption {
            visa_type: first_text(opt, VISA_TYPE_KEYS)
                .unwrap_or_else(|| DEFAULT_VISA_TYPE.to_string()),
            reasoning: first_text(opt, REASONING_KEYS)
                .unwrap_or_else(|| DEFAULT_REASONING.to_string()),
            likelihood: first_text(opt, &["status"]),
            estimated_timeline: first_text(opt, &["processing_time"]),
            estimated_costs: first_text(opt, &["estimated_cost"]),
            risk_flags: first_list(opt, RISK_FLAG_KEYS),
            next_steps: first_list(opt, NEXT_STEP_KEYS),
            details: Some(Value::Object(opt.clone())),
        })
        .collect();

    RecommendationResponse {
        summary: first_text(data, SUMMARY_KEYS).unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        options,
        notes: first_list(data, &["notes"]),
        source: default_source(),
        raw_message: None,
    }
}

/// Older prompt schema: `{summary, options: [{visa_type, reasoning, ...}], notes}`.
/// Options without a `visa_type` carry nothing a client can show and are skipped.
fn parse_legacy(data: &Map<String, Value>) -> RecommendationResponse {
    let options = objects(data.get("options"))
        .filter_map(|opt| {
            Some(RecommendationOption {
                visa_type: first_text(opt, &["visa_type"])?,
                reasoning: first_text(opt, &["reasoning"])
                    .unwrap_or_else(|| DEFAULT_REASONING.to_string()),
                likelihood: first_text(opt, &["likelihood"]),
                estimated_timeline: first_text(opt, &["estimated_timeline"]),
                estimated_costs: first_text(opt, &["estimated_costs"]),
                risk_flags: first_list(opt, &["risk_flags"]),
                next_steps: first_list(opt, &["next_steps"]),
                details: None,
            })
        })
        .collect();

    RecommendationResponse {
        summary: first_text(data, &["summary"]).unwrap_or_else(|| DEFAULT_SUMMARY.to_string()),
        options,
        notes: first_list(data, &["notes"]),
        source: default_source(),
        raw_message: None,
    }
}

/// Iterates the object elements of an optional array, skipping anything else.
pub(crate) fn objects(value: Option<&Value>) -> impl Iterator<Item = &Map<String, Value>> {
    value
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_object)
}

/// First key whose value reads as non-empty text. Numbers and booleans are
/// rendered; null, empty strings, arrays and objects count as missing.
pub(crate) fn first_text(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    })
}

/// First key whose value reads as a non-empty list of strings. Non-string
/// elements are dropped; a lone string becomes a one-element list.
pub(crate) fn first_list(obj: &Map<String, Value>, keys: &[&str]) -> Option<Vec<String>> {
    keys.iter().find_map(|key| {
        let items: Vec<String> = match obj.get(*key)? {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_str)
                .filter(|s| !s.trim().is_empty())
                .map(str::to_string)
                .collect(),
            Value::String(s) if !s.trim().is_empty() => vec![s.clone()],
            _ => Vec::new(),
        };
        (!items.is_empty()).then_some(items)
    })
}

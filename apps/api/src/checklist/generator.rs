//! Checklist generation and tolerant parsing of the model's step list.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::checklist::prompts::build_checklist_prompt;
use crate::errors::AppError;
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{strip_json_fences, LlmClient};
use crate::recommendation::parser::{first_list, first_text, parse_object};

const DEFAULT_OWNER: &str = "applicant";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChecklistStep {
    pub title: String,
    pub description: String,
    pub documents: Vec<String>,
    pub owner: String,
    pub due_in: String,
    pub guidance: String,
}

pub async fn generate_checklist(
    llm: &LlmClient,
    option: &Map<String, Value>,
) -> Result<Vec<ChecklistStep>, AppError> {
    let prompt = build_checklist_prompt(&Value::Object(option.clone()));
    let raw = llm
        .complete(JSON_ONLY_SYSTEM, &prompt)
        .await
        .map_err(|e| AppError::Llm(e.to_string()))?;

    match parse_checklist(&raw) {
        Some(steps) => {
            info!("Generated checklist with {} steps", steps.len());
            Ok(steps)
        }
        None => {
            warn!("Unparseable checklist from LLM: {}", preview(&raw));
            Err(AppError::Llm(
                "Model returned an unparseable checklist".to_string(),
            ))
        }
    }
}

/// Accepts a bare array of steps or an object wrapping one under
/// `checklist` or `steps`. Steps without a title are dropped; plain strings
/// become title-only steps. `None` when no step survives.
pub fn parse_checklist(raw: &str) -> Option<Vec<ChecklistStep>> {
    let text = strip_json_fences(raw);
    let items = match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items,
        Ok(Value::Object(map)) => step_array(map)?,
        _ => step_array(parse_object(raw)?)?,
    };

    let steps: Vec<ChecklistStep> = items.iter().filter_map(parse_step).collect();
    (!steps.is_empty()).then_some(steps)
}

fn step_array(mut map: Map<String, Value>) -> Option<Vec<Value>> {
    ["checklist", "steps"].iter().find_map(|key| match map.remove(*key) {
        Some(Value::Array(items)) => Some(items),
        _ => None,
    })
}

fn parse_step(item: &Value) -> Option<ChecklistStep> {
    match item {
        Value::String(title) if !title.trim().is_empty() => Some(ChecklistStep {
            title: title.trim().to_string(),
            description: String::new(),
            documents: Vec::new(),
            owner: DEFAULT_OWNER.to_string(),
            due_in: String::new(),
            guidance: String::new(),
        }),
        Value::Object(obj) => Some(ChecklistStep {
            title: first_text(obj, &["title", "step", "name"])?,
            description: first_text(obj, &["description", "details"]).unwrap_or_default(),
            documents: first_list(obj, &["documents", "required_documents"]).unwrap_or_default(),
            owner: first_text(obj, &["owner"]).unwrap_or_else(|| DEFAULT_OWNER.to_string()),
            due_in: first_text(obj, &["due_in", "timeline", "duration"]).unwrap_or_default(),
            guidance: first_text(obj, &["guidance", "tips"]).unwrap_or_default(),
        }),
        _ => None,
    }
}

fn preview(raw: &str) -> String {
    raw.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_bare_array() {
        let raw = json!([
            {
                "title": "Book IELTS",
                "description": "Schedule the academic test.",
                "documents": ["Passport"],
                "owner": "applicant",
                "due_in": "Week 1",
                "guidance": "Aim for 7.0 in each band."
            },
            {"title": "Pay fees", "documents": "Bank card", "due_in": 2}
        ])
        .to_string();

        let steps = parse_checklist(&raw).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].documents, vec!["Passport"]);
        assert_eq!(steps[1].owner, "applicant");
        assert_eq!(steps[1].documents, vec!["Bank card"]);
        assert_eq!(steps[1].due_in, "2");
        assert_eq!(steps[1].description, "");
    }

    #[test]
    fn test_parse_wrapped_in_object_and_fences() {
        let raw = "```json\n{\"steps\": [{\"title\": \"Gather documents\", \"owner\": \"JAPA\"}]}\n```";
        let steps = parse_checklist(raw).unwrap();
        assert_eq!(steps[0].title, "Gather documents");
        assert_eq!(steps[0].owner, "JAPA");

        let raw = r#"{"checklist": ["Submit application", ""]}"#;
        let steps = parse_checklist(raw).unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].title, "Submit application");
    }

    #[test]
    fn test_parse_object_inside_prose() {
        let raw = r#"Here you go: {"checklist": [{"title": "Apply online"}]} Good luck!"#;
        assert_eq!(parse_checklist(raw).unwrap()[0].title, "Apply online");
    }

    #[test]
    fn test_untitled_steps_and_garbage_yield_none() {
        assert!(parse_checklist(r#"[{"description": "no title"}, 3, null]"#).is_none());
        assert!(parse_checklist(r#"{"items": []}"#).is_none());
        assert!(parse_checklist("no json here").is_none());
        assert!(parse_checklist("[]").is_none());
    }
}

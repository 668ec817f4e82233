// Checklist prompt templates.

use serde_json::Value;

pub const CHECKLIST_PROMPT_TEMPLATE: &str = r#"You are an immigration case manager. Create a detailed, ordered application checklist for the visa option below.

Rules:
1. Return ONLY a JSON array. No prose, no markdown.
2. Produce between 6 and 12 steps, in the order the applicant should do them.
3. {no_hallucination}
4. "owner" is either "applicant" or "JAPA".
5. "documents" lists the concrete documents the step needs (may be empty).

Each step:
{
  "title": "string",
  "description": "string",
  "documents": ["string"],
  "owner": "applicant | JAPA",
  "due_in": "string, e.g. 'Week 1' or 'Before biometrics'",
  "guidance": "string"
}

Visa option JSON: {option_json}"#;

pub fn build_checklist_prompt(option: &Value) -> String {
    CHECKLIST_PROMPT_TEMPLATE
        .replace(
            "{no_hallucination}",
            crate::llm_client::prompts::NO_HALLUCINATION_INSTRUCTION,
        )
        .replace("{option_json}", &option.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_checklist_prompt_embeds_option() {
        let prompt = build_checklist_prompt(&json!({"visa_type": "Student visa"}));
        assert!(prompt.ends_with(r#"Visa option JSON: {"visa_type":"Student visa"}"#));
        assert!(!prompt.contains("{no_hallucination}"));
    }
}

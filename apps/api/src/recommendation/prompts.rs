// Recommendation prompt templates.

use serde_json::Value;

pub const RECOMMENDATION_SYSTEM: &str = "You are a concise visa recommendation engine.";

pub const RECOMMENDATION_PROMPT_TEMPLATE: &str = r#"You are JAPA Visa Strategist, an expert immigration recommender system.

Your task:
Given structured or unstructured applicant data, analyze eligibility and recommend the top immigration or visa pathways.

Rules:
1. You MUST return ONLY valid JSON matching the schema below.
2. All fields are required and must never be omitted.
3. {no_hallucination}
4. Scores must be integers between 0 and 100.
5. Status must be one of: "eligible", "possible", "unlikely", "not_eligible".
6. Recommendations must be no more than 3 total, ordered from strongest match to weakest.
7. The "top_recommendation" field must exactly repeat the strongest recommendation object.

JSON Schema (fill every field):

{
  "current_score": 0-100,
  "boosted_score": 0-100,
  "insight_summary": "Short paragraph analysis of applicant readiness.",
  "recommendations": [
    {
      "visa_name": "string",
      "visa_type_code": "string",
      "country": "string",
      "category": "immigration | work | study | investment | family",
      "score": 0-100,
      "boosted_score": 0-100,
      "status": "eligible | possible | unlikely | not_eligible",
      "estimated_cost": "string",
      "processing_time": "string",
      "eligibility_summary": "1-2 sentences explaining match level.",
      "improvement_actions": ["string", "..."],
      "overview": "Contextual summary of the visa/program.",
      "who_is_it_for": ["bullet", "..."],
      "quick_facts": ["bullet", "..."],
      "requirements": ["bullet", "..."],
      "benefits": ["bullet", "..."],
      "success_boost": ["bullet actions to increase eligibility"],
      "match_summary": "Sentence explaining why applicant fits or doesn't.",
      "timeline": [
        {"stage": "string", "description": "string", "duration": "string"}
      ],
      "checklist": [
        {
          "title": "string",
          "description": "string",
          "documents": ["string"],
          "owner": "applicant | JAPA",
          "due_in": "string",
          "guidance": "string"
        }
      ],
      "tips": ["string"],
      "resources": ["string"],
      "call_to_actions": [
        {"label": "string", "action_type": "string", "href": "string or null"}
      ]
    }
  ],
  "top_recommendation": { ...same object as first recommendation... }
}

Return only JSON. Do not add explanations outside the JSON.

Applicant intake JSON: {intake_json}"#;

/// Fills the strategist template with the applicant's answered intake fields.
pub fn build_prompt(intake_answers: &Value) -> String {
    RECOMMENDATION_PROMPT_TEMPLATE
        .replace(
            "{no_hallucination}",
            crate::llm_client::prompts::NO_HALLUCINATION_INSTRUCTION,
        )
        .replace("{intake_json}", &intake_answers.to_string())
}

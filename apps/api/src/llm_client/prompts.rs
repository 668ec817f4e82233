// Shared prompt fragments.
// Each feature that needs LLM calls defines its own prompts.rs alongside it.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction appended to prompts that could tempt the model to invent facts.
pub const NO_HALLUCINATION_INSTRUCTION: &str = "\
    If information is unknown or uncertain, respond with null, \"\", or \"unknown\" \
    instead of hallucinating. Never invent visa programs, fees, or legal requirements.";

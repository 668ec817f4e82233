// Visa recommendations: prompt construction, the LLM round trip, tolerant
// parsing of the reply, and per-user history.

pub mod handlers;
pub mod parser;
pub mod prompts;
pub mod service;

// Step-by-step application checklists generated per visa option, cached by
// content hash, plus per-user completion progress.

pub mod cache_key;
pub mod generator;
pub mod handlers;
pub mod prompts;
pub mod store;

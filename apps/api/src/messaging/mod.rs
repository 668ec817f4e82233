// Direct messaging between applicants and travel agents.

pub mod handlers;
pub mod store;

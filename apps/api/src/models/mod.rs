// Database row types. One file per table family; all rows derive `FromRow`.

pub mod agent;
pub mod checklist;
pub mod document;
pub mod messaging;
pub mod profile;
pub mod recommendation;
pub mod user;

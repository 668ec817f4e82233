// Applicant intake forms: request/record types and the in-memory store.

pub mod handlers;
pub mod models;
pub mod store;

// Accounts and authentication: password hashing, JWT issuance, Google
// sign-in, and the `CurrentUser` extractor used by protected routes.

pub mod extractor;
pub mod google;
pub mod handlers;
pub mod password;
pub mod token;
pub mod users;

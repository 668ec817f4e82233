//! Google sign-in: verifies an ID token issued to our OAuth client.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use tracing::warn;

use crate::errors::AppError;

const TOKENINFO_URL: &str = "https://oauth2.googleapis.com/tokeninfo";
const ALLOWED_ISSUERS: &[&str] = &["accounts.google.com", "https://accounts.google.com"];

/// Identity extracted from a verified Google ID token.
#[derive(Debug, Clone, PartialEq)]
pub struct GoogleIdentity {
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenInfo {
    iss: Option<String>,
    aud: Option<String>,
    email: Option<String>,
    name: Option<String>,
    picture: Option<String>,
}

#[derive(Clone)]
pub struct GoogleVerifier {
    client: Client,
    client_id: String,
    tokeninfo_url: String,
}

impl GoogleVerifier {
    pub fn new(client_id: String) -> anyhow::Result<Self> {
        Self::with_endpoint(client_id, TOKENINFO_URL.to_string())
    }

    pub fn with_endpoint(client_id: String, tokeninfo_url: String) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(Duration::from_secs(10)).build()?,
            client_id,
            tokeninfo_url,
        })
    }

    /// Verifies `id_token` with Google and checks audience and issuer.
    pub async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, AppError> {
        if self.client_id.is_empty() {
            return Err(AppError::Misconfigured(
                "Google OAuth not configured. Please set GOOGLE_CLIENT_ID in environment variables."
                    .to_string(),
            ));
        }

        let response = self
            .client
            .get(&self.tokeninfo_url)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| {
                AppError::Internal(anyhow::anyhow!("Google token verification failed: {e}"))
            })?;

        if !response.status().is_success() {
            warn!("Google tokeninfo rejected token: {}", response.status());
            return Err(invalid("token rejected by Google"));
        }

        let info: TokenInfo = response.json().await.map_err(|e| {
            AppError::Internal(anyhow::anyhow!("Google token verification failed: {e}"))
        })?;

        self.check(info)
    }

    fn check(&self, info: TokenInfo) -> Result<GoogleIdentity, AppError> {
        if info.aud.as_deref() != Some(self.client_id.as_str()) {
            return Err(invalid("wrong audience"));
        }
        match info.iss.as_deref() {
            Some(iss) if ALLOWED_ISSUERS.contains(&iss) => {}
            _ => return Err(invalid("Wrong issuer.")),
        }
        let email = info
            .email
            .filter(|e| !e.trim().is_empty())
            .ok_or_else(|| invalid("Email not provided in token"))?;
        let name = info
            .name
            .filter(|n| !n.trim().is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        Ok(GoogleIdentity {
            email,
            name,
            picture: info.picture.filter(|p| !p.is_empty()),
        })
    }
}

fn invalid(reason: &str) -> AppError {
    AppError::Unauthorized(format!("Invalid Google token: {reason}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier(url: String) -> GoogleVerifier {
        GoogleVerifier::with_endpoint("client-123".into(), url).unwrap()
    }

    #[tokio::test]
    async fn test_valid_token() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tokeninfo")
            .match_query(mockito::Matcher::UrlEncoded(
                "id_token".into(),
                "good-token".into(),
            ))
            .with_status(200)
            .with_body(
                r#"{"iss": "https://accounts.google.com", "aud": "client-123",
                    "email": "ada@example.com", "picture": ""}"#,
            )
            .create_async()
            .await;

        let identity = verifier(format!("{}/tokeninfo", server.url()))
            .verify("good-token")
            .await
            .unwrap();

        assert_eq!(identity.email, "ada@example.com");
        assert_eq!(identity.name, "ada");
        assert!(identity.picture.is_none());
    }

    #[tokio::test]
    async fn test_rejected_token_is_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/tokeninfo")
            .match_query(mockito::Matcher::Any)
            .with_status(400)
            .with_body(r#"{"error": "invalid_token"}"#)
            .create_async()
            .await;

        let err = verifier(format!("{}/tokeninfo", server.url()))
            .verify("bad")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_missing_client_id_is_misconfigured() {
        let verifier =
            GoogleVerifier::with_endpoint(String::new(), "http://unused.test".into()).unwrap();
        let err = verifier.verify("any").await.unwrap_err();
        assert!(matches!(err, AppError::Misconfigured(_)));
    }

    #[test]
    fn test_check_rejects_foreign_audience_and_issuer() {
        let v = verifier("http://unused.test".into());
        let wrong_aud = TokenInfo {
            iss: Some("accounts.google.com".into()),
            aud: Some("someone-else".into()),
            email: Some("a@b.com".into()),
            name: None,
            picture: None,
        };
        assert!(v.check(wrong_aud).is_err());

        let wrong_iss = TokenInfo {
            iss: Some("evil.example.com".into()),
            aud: Some("client-123".into()),
            email: Some("a@b.com".into()),
            name: Some("A".into()),
            picture: None,
        };
        assert!(v.check(wrong_iss).is_err());
    }
}

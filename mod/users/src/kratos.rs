//! ORY Kratos session verifier.
//!
//! Implements [`SessionVerifier`] against the Kratos public API's
//! `GET /sessions/whoami` endpoint, forwarding the caller's cookie.

use async_trait::async_trait;
use serde::Deserialize;

use corecrm_core::{ExternalIdentity, ServiceError, SessionVerifier};

/// Kratos session-introspection client.
pub struct KratosVerifier {
    base_url: String,
    client: reqwest::Client,
}

impl KratosVerifier {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }
}

// Wire shapes of the whoami response. Only the fields the resolver
// needs — Kratos sends much more.

#[derive(Debug, Deserialize)]
struct WhoamiResponse {
    #[serde(default)]
    active: Option<bool>,
    identity: Option<Identity>,
}

#[derive(Debug, Deserialize)]
struct Identity {
    id: String,
    #[serde(default)]
    traits: Traits,
}

#[derive(Debug, Default, Deserialize)]
struct Traits {
    email: Option<String>,
    name: Option<NameTraits>,
}

#[derive(Debug, Deserialize)]
struct NameTraits {
    first: Option<String>,
    last: Option<String>,
}

impl NameTraits {
    fn full_name(&self) -> Option<String> {
        let full = [self.first.as_deref(), self.last.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ")
            .trim()
            .to_string();
        if full.is_empty() { None } else { Some(full) }
    }
}

#[async_trait]
impl SessionVerifier for KratosVerifier {
    async fn verify_session(&self, credential: &str) -> Result<ExternalIdentity, ServiceError> {
        let url = format!("{}/sessions/whoami", self.base_url);

        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::COOKIE, credential)
            .send()
            .await
            .map_err(|e| ServiceError::Internal(format!("identity provider unreachable: {e}")))?;

        let status = resp.status();
        if status.is_server_error() {
            return Err(ServiceError::Internal(format!(
                "identity provider returned {status}"
            )));
        }
        if !status.is_success() {
            // 401/403/4xx — indistinguishable from "no session".
            return Err(ServiceError::Unauthenticated(
                "session rejected by identity provider".into(),
            ));
        }

        let body: WhoamiResponse = resp.json().await.map_err(|e| {
            ServiceError::Unauthenticated(format!("malformed session response: {e}"))
        })?;

        if body.active == Some(false) {
            return Err(ServiceError::Unauthenticated("session is not active".into()));
        }

        let identity = body
            .identity
            .ok_or_else(|| ServiceError::Unauthenticated("session has no identity".into()))?;

        // Never proceed with a partial identity.
        let email = identity
            .traits
            .email
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ServiceError::Unauthenticated("identity has no email trait".into()))?;

        let name = identity.traits.name.as_ref().and_then(NameTraits::full_name);

        Ok(ExternalIdentity {
            id: identity.id,
            email,
            name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn verifies_active_session() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/sessions/whoami")
            .match_header("cookie", "ory_session=abc")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "active": true,
                    "identity": {
                        "id": "ory-123",
                        "traits": {
                            "email": "alice@example.com",
                            "name": {"first": "Alice", "last": "Ng"}
                        }
                    }
                }"#,
            )
            .create_async()
            .await;

        let verifier = KratosVerifier::new(&server.url());
        let identity = verifier.verify_session("ory_session=abc").await.unwrap();
        assert_eq!(identity.id, "ory-123");
        assert_eq!(identity.email, "alice@example.com");
        assert_eq!(identity.name.as_deref(), Some("Alice Ng"));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rejected_session_is_unauthenticated() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/sessions/whoami")
            .with_status(401)
            .with_body(r#"{"error":{"code":401}}"#)
            .create_async()
            .await;

        let verifier = KratosVerifier::new(&server.url());
        let err = verifier.verify_session("ory_session=bad").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(_)));
    }

    #[tokio::test]
    async fn provider_5xx_is_internal_not_unauthenticated() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/sessions/whoami")
            .with_status(502)
            .create_async()
            .await;

        let verifier = KratosVerifier::new(&server.url());
        let err = verifier.verify_session("ory_session=abc").await.unwrap_err();
        assert!(matches!(err, ServiceError::Internal(_)));
    }

    #[tokio::test]
    async fn identity_without_email_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/sessions/whoami")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"active": true, "identity": {"id": "ory-9", "traits": {}}}"#)
            .create_async()
            .await;

        let verifier = KratosVerifier::new(&server.url());
        let err = verifier.verify_session("ory_session=abc").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(ref m) if m.contains("email")));
    }

    #[tokio::test]
    async fn inactive_session_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/sessions/whoami")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"active": false, "identity": {"id": "ory-9", "traits": {"email": "x@y.z"}}}"#,
            )
            .create_async()
            .await;

        let verifier = KratosVerifier::new(&server.url());
        let err = verifier.verify_session("ory_session=abc").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthenticated(_)));
    }
}

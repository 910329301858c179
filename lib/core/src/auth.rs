//! Session verification trait for the external identity provider.
//!
//! The service does NOT depend on a specific identity provider. Modules
//! only know this trait. The concrete implementation (the ORY Kratos
//! client) is injected at startup time, so tests substitute fakes
//! without any global mocking.

use async_trait::async_trait;

use crate::ServiceError;

/// The identity behind a verified session, as reported by the provider.
///
/// A verifier must never return a partial identity: if the provider's
/// response lacks an email trait, verification fails with
/// `Unauthenticated` instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalIdentity {
    /// The provider's subject identifier.
    pub id: String,
    /// Email trait from the identity's profile.
    pub email: String,
    /// Display name trait, if the profile has one.
    pub name: Option<String>,
}

/// Pluggable session verifier. Called once per authenticated request
/// with the opaque credential forwarded from the client (the raw
/// cookie header).
#[async_trait]
pub trait SessionVerifier: Send + Sync + 'static {
    /// Verify a session credential and resolve the identity behind it.
    ///
    /// Returns `Unauthenticated` for rejected, expired, or malformed
    /// sessions; `Internal` when the provider itself is failing.
    async fn verify_session(&self, credential: &str) -> Result<ExternalIdentity, ServiceError>;
}

/// A verifier that accepts any credential and returns a fixed identity.
/// Used for testing.
pub struct StaticIdentity(pub ExternalIdentity);

#[async_trait]
impl SessionVerifier for StaticIdentity {
    async fn verify_session(&self, _credential: &str) -> Result<ExternalIdentity, ServiceError> {
        Ok(self.0.clone())
    }
}

/// A verifier that rejects every credential. Used for testing.
pub struct RejectAll;

#[async_trait]
impl SessionVerifier for RejectAll {
    async fn verify_session(&self, _credential: &str) -> Result<ExternalIdentity, ServiceError> {
        Err(ServiceError::Unauthenticated("invalid session".into()))
    }
}

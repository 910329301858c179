//! Users module — identity resolution + local user provisioning + roles.
//!
//! # Resources
//!
//! - **User** — local record for an externally-authenticated identity,
//!   provisioned lazily on first verified session
//! - **Role** — CLIENT / AGENT / MANAGER, assigned by managers only
//!
//! Authentication itself (login, recovery, verification) is owned by the
//! external identity provider; this module only introspects sessions via
//! the injected [`corecrm_core::SessionVerifier`].

pub mod api;
pub mod kratos;
pub mod model;
pub mod service;
pub mod store;

use std::sync::Arc;

use axum::Router;

use corecrm_core::{Module, SessionVerifier};

use crate::service::UserService;

/// Users module implementing the Module trait.
pub struct UsersModule {
    service: Arc<UserService>,
}

impl UsersModule {
    /// Create a new UsersModule with the given storage and verifier.
    pub fn new(
        sql: Arc<dyn corecrm_sql::SQLStore>,
        verifier: Arc<dyn SessionVerifier>,
    ) -> Result<Self, corecrm_core::ServiceError> {
        let service = UserService::new(sql, verifier)?;
        Ok(Self { service })
    }

    /// Get a reference to the underlying UserService.
    pub fn service(&self) -> &Arc<UserService> {
        &self.service
    }
}

impl Module for UsersModule {
    fn name(&self) -> &str {
        "users"
    }

    fn routes(&self) -> Router {
        api::router(self.service.clone())
    }
}

//! Knowledge-base module — help articles with a draft/published flow.
//!
//! Managers author and edit; everyone else sees published articles only.

pub mod api;
pub mod model;
pub mod service;
pub mod store;

use std::sync::Arc;

use axum::Router;

use corecrm_core::Module;

use crate::service::KbService;

/// Knowledge-base module implementing the Module trait.
pub struct KbModule {
    service: Arc<KbService>,
}

impl KbModule {
    pub fn new(sql: Arc<dyn corecrm_sql::SQLStore>) -> Result<Self, corecrm_core::ServiceError> {
        let service = KbService::new(sql)?;
        Ok(Self { service })
    }

    pub fn service(&self) -> &Arc<KbService> {
        &self.service
    }
}

impl Module for KbModule {
    fn name(&self) -> &str {
        "kb"
    }

    fn routes(&self) -> Router {
        api::router(self.service.clone())
    }
}

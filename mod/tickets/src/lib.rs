//! Tickets module — the support-ticket core.
//!
//! Three layers, composed in one direction only:
//!
//! - [`policy`] — pure role-authorization predicates over (actor, ticket)
//! - [`lifecycle`] — the NEW → OPEN ⇄ CLOSED state machine
//! - [`service`] — the access layer: the only code that touches storage,
//!   gated by the two layers above
//!
//! Route handlers never decide authorization themselves; they pass the
//! resolved actor down and map the typed outcome to a status code.

pub mod api;
pub mod lifecycle;
pub mod model;
pub mod policy;
pub mod service;
pub mod store;

use std::sync::Arc;

use axum::Router;

use corecrm_core::Module;

use crate::service::TicketService;

/// Tickets module implementing the Module trait.
pub struct TicketsModule {
    service: Arc<TicketService>,
}

impl TicketsModule {
    /// Create a new TicketsModule with the given storage.
    pub fn new(sql: Arc<dyn corecrm_sql::SQLStore>) -> Result<Self, corecrm_core::ServiceError> {
        let service = TicketService::new(sql)?;
        Ok(Self { service })
    }

    /// Get a reference to the underlying TicketService.
    pub fn service(&self) -> &Arc<TicketService> {
        &self.service
    }
}

impl Module for TicketsModule {
    fn name(&self) -> &str {
        "tickets"
    }

    fn routes(&self) -> Router {
        api::router(self.service.clone())
    }
}

mod messages;
mod tickets;

use std::sync::Arc;

use axum::Router;

use crate::service::TicketService;

/// Shared application state.
pub type AppState = Arc<TicketService>;

/// Build the tickets API router.
///
/// All routes are relative — the binary nests them under `/tickets`.
pub fn router(svc: Arc<TicketService>) -> Router {
    Router::new()
        .merge(tickets::routes())
        .merge(messages::routes())
        .with_state(svc)
}

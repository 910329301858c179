mod me;
pub mod middleware;
mod roles;

use std::sync::Arc;

use axum::Router;

use crate::service::UserService;

/// Shared application state.
pub type AppState = Arc<UserService>;

pub use middleware::session_middleware;

/// Build the users API router.
///
/// All routes are relative — the binary nests them under `/users`.
pub fn router(svc: Arc<UserService>) -> Router {
    Router::new()
        .merge(me::routes())
        .merge(roles::routes())
        .with_state(svc)
}

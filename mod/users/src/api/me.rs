use axum::extract::{Extension, State};
use axum::routing::get;
use axum::{Json, Router};

use corecrm_core::ServiceError;

use crate::api::AppState;
use crate::model::User;

pub fn routes() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

/// GET /users/me — the authenticated user's own record.
async fn me(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
) -> Result<Json<User>, ServiceError> {
    let user = svc.get_user(&actor.id)?;
    Ok(Json(user))
}

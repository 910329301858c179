use axum::extract::{Extension, Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use corecrm_core::{ListParams, ServiceError};

use crate::api::AppState;
use crate::model::{AssignRole, User};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/{id}/role", post(assign_role))
}

/// GET /users — manager-facing listing (backs the reassignment picker).
async fn list_users(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
    Query(params): Query<ListParams>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let result = svc.list_users(&actor, &params)?;
    Ok(Json(serde_json::json!({
        "items": result.items,
        "total": result.total,
    })))
}

/// POST /users/{id}/role — assign a role. Manager-only.
async fn assign_role(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<String>,
    Json(input): Json<AssignRole>,
) -> Result<Json<User>, ServiceError> {
    let user = svc.assign_role(&actor, &id, &input.role)?;
    Ok(Json(user))
}

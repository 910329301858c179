use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use corecrm_core::ServiceError;
use users::model::User;

use crate::api::AppState;
use crate::model::{CreateMessage, TicketMessage};

pub fn routes() -> Router<AppState> {
    Router::new().route("/{id}/messages", get(list_messages).post(create_message))
}

/// GET /tickets/{id}/messages — thread, oldest first; internal notes
/// filtered for clients.
async fn list_messages(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Vec<TicketMessage>>, ServiceError> {
    let messages = svc.list_messages(&actor, &id)?;
    Ok(Json(messages))
}

/// POST /tickets/{id}/messages — append to the thread (201).
async fn create_message(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<String>,
    Json(input): Json<CreateMessage>,
) -> Result<(StatusCode, Json<TicketMessage>), ServiceError> {
    let message = svc.create_message(&actor, &id, input)?;
    Ok((StatusCode::CREATED, Json(message)))
}

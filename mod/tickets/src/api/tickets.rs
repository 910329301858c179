use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch};
use axum::{Json, Router};

use corecrm_core::ServiceError;
use users::model::User;

use crate::api::AppState;
use crate::model::{CreateTicket, Ticket, TicketQuery, UpdateTicket};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tickets).post(create_ticket))
        .route("/{id}", get(get_ticket).patch(update_ticket))
        .route("/{id}/read", patch(mark_read))
}

/// GET /tickets?status=&unread= — role-scoped listing.
async fn list_tickets(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
    Query(query): Query<TicketQuery>,
) -> Result<Json<Vec<Ticket>>, ServiceError> {
    let tickets = svc.list_tickets(&actor, &query)?;
    Ok(Json(tickets))
}

/// POST /tickets — create a ticket (201).
async fn create_ticket(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
    Json(input): Json<CreateTicket>,
) -> Result<(StatusCode, Json<Ticket>), ServiceError> {
    let ticket = svc.create_ticket(&actor, input)?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// GET /tickets/{id} — a plain read; never mutates read state.
async fn get_ticket(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ServiceError> {
    let ticket = svc.get_ticket(&actor, &id)?;
    Ok(Json(ticket))
}

/// PATCH /tickets/{id} — status change and/or reassignment.
async fn update_ticket(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<String>,
    Json(input): Json<UpdateTicket>,
) -> Result<Json<Ticket>, ServiceError> {
    let ticket = svc.update_ticket(&actor, &id, input)?;
    Ok(Json(ticket))
}

/// PATCH /tickets/{id}/read — the explicit mark-as-viewed operation.
async fn mark_read(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ServiceError> {
    let ticket = svc.mark_read(&actor, &id)?;
    Ok(Json(ticket))
}

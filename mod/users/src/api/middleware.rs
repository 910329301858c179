use axum::extract::{Request, State};
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use corecrm_core::ServiceError;

use crate::api::AppState;

/// Paths that don't require a session.
const PUBLIC_PATHS: &[&str] = &["/health", "/version"];

/// Session-resolution middleware.
///
/// Forwards the raw cookie header to the identity provider, resolves (and
/// lazily provisions) the local user, and stores it in request extensions
/// for handlers to extract via `Extension<User>`. Authorization is NOT
/// decided here — that is the policy layer's job, downstream, with the
/// typed actor this middleware produced.
pub async fn session_middleware(
    State(svc): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ServiceError> {
    if is_public_path(req.uri().path()) {
        return Ok(next.run(req).await);
    }

    let credential = req
        .headers()
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let user = svc.resolve_session(credential.as_deref()).await?;
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

fn is_public_path(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path)
}

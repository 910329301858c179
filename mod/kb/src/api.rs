use std::sync::Arc;

use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use corecrm_core::ServiceError;
use users::model::User;

use crate::model::{Article, ArticleInput};
use crate::service::KbService;

/// Shared application state.
pub type AppState = Arc<KbService>;

/// Build the knowledge-base API router.
///
/// All routes are relative — the binary nests them under `/kb`.
pub fn router(svc: Arc<KbService>) -> Router {
    Router::new()
        .route("/articles", get(list_articles).post(create_article))
        .route(
            "/articles/{id}",
            get(get_article).put(update_article).delete(delete_article),
        )
        .with_state(svc)
}

async fn list_articles(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
) -> Result<Json<Vec<Article>>, ServiceError> {
    let articles = svc.list_articles(&actor)?;
    Ok(Json(articles))
}

async fn get_article(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<String>,
) -> Result<Json<Article>, ServiceError> {
    let article = svc.get_article(&actor, &id)?;
    Ok(Json(article))
}

async fn create_article(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
    Json(input): Json<ArticleInput>,
) -> Result<(StatusCode, Json<Article>), ServiceError> {
    let article = svc.create_article(&actor, input)?;
    Ok((StatusCode::CREATED, Json(article)))
}

async fn update_article(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<String>,
    Json(input): Json<ArticleInput>,
) -> Result<Json<Article>, ServiceError> {
    let article = svc.update_article(&actor, &id, input)?;
    Ok(Json(article))
}

async fn delete_article(
    State(svc): State<AppState>,
    Extension(actor): Extension<User>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServiceError> {
    svc.delete_article(&actor, &id)?;
    Ok(StatusCode::NO_CONTENT)
}

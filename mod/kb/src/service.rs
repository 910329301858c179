use std::sync::Arc;

use corecrm_core::{ServiceError, new_id, now_rfc3339};
use corecrm_sql::SQLStore;

use users::model::{Role, User};

use crate::model::{Article, ArticleInput, ArticleStatus};
use crate::store::ArticleStore;

/// Knowledge-base service. Managers write; everyone reads what's published.
pub struct KbService {
    store: ArticleStore,
}

impl KbService {
    pub fn new(sql: Arc<dyn SQLStore>) -> Result<Arc<Self>, ServiceError> {
        let store = ArticleStore::new(sql)?;
        Ok(Arc::new(Self { store }))
    }

    /// List articles. Non-managers see published articles only.
    pub fn list_articles(&self, actor: &User) -> Result<Vec<Article>, ServiceError> {
        let status = if actor.role == Role::Manager {
            None
        } else {
            Some(ArticleStatus::Published)
        };
        self.store.list(status)
    }

    /// Get one article. Drafts are manager-only.
    pub fn get_article(&self, actor: &User, id: &str) -> Result<Article, ServiceError> {
        let article = self.store.get(id)?;
        if article.status == ArticleStatus::Draft && actor.role != Role::Manager {
            return Err(ServiceError::Forbidden("cannot view draft articles".into()));
        }
        Ok(article)
    }

    /// Create an article. Manager-only; defaults to DRAFT.
    pub fn create_article(
        &self,
        actor: &User,
        input: ArticleInput,
    ) -> Result<Article, ServiceError> {
        self.require_manager(actor)?;
        let (title, content, status) = validate(input)?;

        let now = now_rfc3339();
        let article = Article {
            id: new_id(),
            title,
            content,
            status: status.unwrap_or(ArticleStatus::Draft),
            author_id: actor.id.clone(),
            created_at: now.clone(),
            updated_at: now,
        };
        self.store.create(&article)?;
        tracing::info!(article_id = %article.id, "article created");
        Ok(article)
    }

    /// Replace an article's title/content/status. Manager-only.
    pub fn update_article(
        &self,
        actor: &User,
        id: &str,
        input: ArticleInput,
    ) -> Result<Article, ServiceError> {
        self.require_manager(actor)?;
        let (title, content, status) = validate(input)?;

        let mut article = self.store.get(id)?;
        article.title = title;
        article.content = content;
        if let Some(status) = status {
            article.status = status;
        }
        article.updated_at = now_rfc3339();
        self.store.update(&article)?;
        Ok(article)
    }

    /// Delete an article. Manager-only.
    pub fn delete_article(&self, actor: &User, id: &str) -> Result<(), ServiceError> {
        self.require_manager(actor)?;
        self.store.delete(id)
    }

    fn require_manager(&self, actor: &User) -> Result<(), ServiceError> {
        if actor.role != Role::Manager {
            return Err(ServiceError::Forbidden(
                "only managers may edit the knowledge base".into(),
            ));
        }
        Ok(())
    }
}

fn validate(
    input: ArticleInput,
) -> Result<(String, String, Option<ArticleStatus>), ServiceError> {
    if input.title.trim().is_empty() {
        return Err(ServiceError::validation("title", "must not be empty"));
    }
    if input.content.trim().is_empty() {
        return Err(ServiceError::validation("content", "must not be empty"));
    }
    let status = input
        .status
        .as_deref()
        .map(|s| {
            ArticleStatus::parse(s)
                .ok_or_else(|| ServiceError::validation("status", format!("unknown status '{s}'")))
        })
        .transpose()?;
    Ok((input.title, input.content, status))
}

use std::sync::Arc;

use corecrm_core::ServiceError;
use corecrm_sql::{Row, SQLStore, Value};

use crate::model::{Article, ArticleStatus};

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS kb_articles (
        id         TEXT PRIMARY KEY,
        data       TEXT NOT NULL,
        status     TEXT NOT NULL,
        author_id  TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS idx_kb_status ON kb_articles(status)",
];

/// Persistent storage for knowledge-base articles.
pub struct ArticleStore {
    db: Arc<dyn SQLStore>,
}

impl ArticleStore {
    pub fn new(db: Arc<dyn SQLStore>) -> Result<Self, ServiceError> {
        for stmt in SCHEMA {
            db.exec(stmt, &[])
                .map_err(|e| ServiceError::Storage(format!("kb schema init: {e}")))?;
        }
        Ok(Self { db })
    }

    pub fn create(&self, article: &Article) -> Result<(), ServiceError> {
        let data =
            serde_json::to_string(article).map_err(|e| ServiceError::Internal(e.to_string()))?;
        self.db
            .exec(
                "INSERT INTO kb_articles (id, data, status, author_id, created_at, updated_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                &[
                    Value::Text(article.id.clone()),
                    Value::Text(data),
                    Value::Text(article.status.as_str().to_string()),
                    Value::Text(article.author_id.clone()),
                    Value::Text(article.created_at.clone()),
                    Value::Text(article.updated_at.clone()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Article, ServiceError> {
        let rows = self
            .db
            .query(
                "SELECT data FROM kb_articles WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        let row = rows
            .first()
            .ok_or_else(|| ServiceError::NotFound(format!("article {id}")))?;
        row_to_article(row)
    }

    pub fn update(&self, article: &Article) -> Result<(), ServiceError> {
        let data =
            serde_json::to_string(article).map_err(|e| ServiceError::Internal(e.to_string()))?;
        let affected = self
            .db
            .exec(
                "UPDATE kb_articles SET data = ?1, status = ?2, updated_at = ?3 WHERE id = ?4",
                &[
                    Value::Text(data),
                    Value::Text(article.status.as_str().to_string()),
                    Value::Text(article.updated_at.clone()),
                    Value::Text(article.id.clone()),
                ],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("article {}", article.id)));
        }
        Ok(())
    }

    pub fn delete(&self, id: &str) -> Result<(), ServiceError> {
        let affected = self
            .db
            .exec(
                "DELETE FROM kb_articles WHERE id = ?1",
                &[Value::Text(id.to_string())],
            )
            .map_err(|e| ServiceError::Storage(e.to_string()))?;
        if affected == 0 {
            return Err(ServiceError::NotFound(format!("article {id}")));
        }
        Ok(())
    }

    /// List articles, optionally restricted to one status, newest first.
    pub fn list(&self, status: Option<ArticleStatus>) -> Result<Vec<Article>, ServiceError> {
        let rows = match status {
            Some(status) => self.db.query(
                "SELECT data FROM kb_articles WHERE status = ?1 ORDER BY updated_at DESC",
                &[Value::Text(status.as_str().to_string())],
            ),
            None => self.db.query(
                "SELECT data FROM kb_articles ORDER BY updated_at DESC",
                &[],
            ),
        }
        .map_err(|e| ServiceError::Storage(e.to_string()))?;

        rows.iter().map(row_to_article).collect()
    }
}

fn row_to_article(row: &Row) -> Result<Article, ServiceError> {
    let json = row
        .get_str("data")
        .ok_or_else(|| ServiceError::Storage("missing data column".into()))?;
    serde_json::from_str(json).map_err(|e| ServiceError::Storage(format!("bad article json: {e}")))
}

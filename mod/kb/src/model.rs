use serde::{Deserialize, Serialize};

/// Publication state of an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArticleStatus {
    Draft,
    Published,
}

impl ArticleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Published => "PUBLISHED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "DRAFT" => Some(Self::Draft),
            "PUBLISHED" => Some(Self::Published),
            _ => None,
        }
    }
}

/// A knowledge-base article.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub id: String,
    pub title: String,
    pub content: String,
    pub status: ArticleStatus,
    pub author_id: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Body of `POST /kb/articles` and `PUT /kb/articles/{id}`. Status
/// arrives as a raw string, validated at the boundary.
#[derive(Debug, Clone, Deserialize)]
pub struct ArticleInput {
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub status: Option<String>,
}

use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

pub const MAX_CONTENT_CHARS: usize = 280;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub author_username: Option<String>,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub like_count: i64,
    pub liked_by_viewer: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PostContentError {
    #[error("post content cannot be empty")]
    Empty,
    #[error("post content cannot exceed 280 characters")]
    TooLong,
}

/// Trim and validate post content. Length is counted in characters, not
/// bytes, so a 280-character post is accepted regardless of encoding.
pub fn validate_content(raw: &str) -> Result<String, PostContentError> {
    let content = raw.trim();
    if content.is_empty() {
        return Err(PostContentError::Empty);
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Err(PostContentError::TooLong);
    }
    Ok(content.to_string())
}

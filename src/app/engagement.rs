use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::engagement::Like;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct EngagementService {
    db: Db,
}

#[derive(Debug)]
pub enum LikeOutcome {
    Liked(Like),
    AlreadyLiked,
    PostNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlikeOutcome {
    Unliked,
    NotLiked,
    PostNotFound,
}

impl EngagementService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Like a post. Liking twice is a conflict, not a no-op.
    pub async fn like(&self, user_id: Uuid, post_id: Uuid) -> Result<LikeOutcome> {
        if !self.post_exists(post_id).await? {
            return Ok(LikeOutcome::PostNotFound);
        }

        let row = sqlx::query(
            "INSERT INTO likes (user_id, post_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING \
             RETURNING user_id, post_id, created_at",
        )
        .bind(user_id)
        .bind(post_id)
        .fetch_optional(self.db.pool())
        .await?;

        let outcome = match row {
            Some(row) => LikeOutcome::Liked(Like {
                user_id: row.get("user_id"),
                post_id: row.get("post_id"),
                created_at: row.get("created_at"),
            }),
            None => LikeOutcome::AlreadyLiked,
        };

        Ok(outcome)
    }

    /// Remove a like. Unliking a post that was never liked is a conflict.
    pub async fn unlike(&self, user_id: Uuid, post_id: Uuid) -> Result<UnlikeOutcome> {
        if !self.post_exists(post_id).await? {
            return Ok(UnlikeOutcome::PostNotFound);
        }

        let result = sqlx::query("DELETE FROM likes WHERE user_id = $1 AND post_id = $2")
            .bind(user_id)
            .bind(post_id)
            .execute(self.db.pool())
            .await?;

        if result.rows_affected() > 0 {
            Ok(UnlikeOutcome::Unliked)
        } else {
            Ok(UnlikeOutcome::NotLiked)
        }
    }

    async fn post_exists(&self, post_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM posts WHERE id = $1)")
            .bind(post_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(exists)
    }
}

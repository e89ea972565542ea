use anyhow::Result;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::user::Profile;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct SocialService {
    db: Db,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    /// A new follow edge was created.
    Followed,
    /// The edge already existed; the unique constraint makes a repeat
    /// follow a no-op rather than a duplicate edge.
    AlreadyFollowing,
    SelfFollow,
    UserNotFound,
}

impl SocialService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn follow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<FollowOutcome> {
        if follower_id == followee_id {
            return Ok(FollowOutcome::SelfFollow);
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(followee_id)
            .fetch_one(self.db.pool())
            .await?;
        if !exists {
            return Ok(FollowOutcome::UserNotFound);
        }

        let result = sqlx::query(
            "INSERT INTO follows (follower_id, followee_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(follower_id)
        .bind(followee_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() > 0 {
            Ok(FollowOutcome::Followed)
        } else {
            Ok(FollowOutcome::AlreadyFollowing)
        }
    }

    /// Remove the follow edge. Returns false when there was nothing to
    /// remove.
    pub async fn unfollow(&self, follower_id: Uuid, followee_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM follows WHERE follower_id = $1 AND followee_id = $2",
        )
        .bind(follower_id)
        .bind(followee_id)
        .execute(self.db.pool())
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Number of users following `user_id`.
    pub async fn followers_count(&self, user_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE followee_id = $1")
            .bind(user_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Number of users `user_id` follows.
    pub async fn following_count(&self, user_id: Uuid) -> Result<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(user_id)
            .fetch_one(self.db.pool())
            .await?;
        Ok(count)
    }

    /// Profile header for a user: follow-graph counts plus whether the
    /// viewer follows them.
    pub async fn profile(&self, user_id: Uuid, viewer_id: Option<Uuid>) -> Result<Option<Profile>> {
        let row = sqlx::query(
            "SELECT u.id, u.username, \
                    (SELECT COUNT(*) FROM follows f WHERE f.followee_id = u.id) AS followers_count, \
                    (SELECT COUNT(*) FROM follows f WHERE f.follower_id = u.id) AS following_count, \
                    EXISTS ( \
                        SELECT 1 FROM follows f \
                        WHERE f.follower_id = $2 AND f.followee_id = u.id \
                    ) AS following_status \
             FROM users u \
             WHERE u.id = $1",
        )
        .bind(user_id)
        .bind(viewer_id)
        .fetch_optional(self.db.pool())
        .await?;

        let profile = row.map(|row| Profile {
            id: row.get("id"),
            username: row.get("username"),
            followers_count: row.get("followers_count"),
            following_count: row.get("following_count"),
            following_status: row.get("following_status"),
        });

        Ok(profile)
    }
}

use anyhow::Result;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::post::Post;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct PostService {
    db: Db,
}

impl PostService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Insert a post. Content is expected to be validated already.
    pub async fn create_post(&self, author_id: Uuid, content: String) -> Result<Post> {
        let row = sqlx::query(
            "WITH inserted_post AS ( \
                INSERT INTO posts (author_id, content) \
                VALUES ($1, $2) \
                RETURNING id, author_id, content, created_at \
             ) \
             SELECT p.id, p.author_id, u.username AS author_username, p.content, p.created_at \
             FROM inserted_post p \
             JOIN users u ON u.id = p.author_id",
        )
        .bind(author_id)
        .bind(content)
        .fetch_one(self.db.pool())
        .await?;

        Ok(Post {
            id: row.get("id"),
            author_id: row.get("author_id"),
            author_username: Some(row.get("author_username")),
            content: row.get("content"),
            created_at: row.get("created_at"),
            like_count: 0,
            liked_by_viewer: false,
        })
    }

    /// Fetch a single post annotated with its like count and whether the
    /// viewer has liked it. An anonymous viewer never has a like.
    pub async fn get_post(&self, post_id: Uuid, viewer_id: Option<Uuid>) -> Result<Option<Post>> {
        let row = sqlx::query(
            "SELECT p.id, p.author_id, u.username AS author_username, p.content, p.created_at, \
                    (SELECT COUNT(*) FROM likes k WHERE k.post_id = p.id) AS like_count, \
                    EXISTS ( \
                        SELECT 1 FROM likes k WHERE k.post_id = p.id AND k.user_id = $2 \
                    ) AS liked_by_viewer \
             FROM posts p \
             JOIN users u ON u.id = p.author_id \
             WHERE p.id = $1",
        )
        .bind(post_id)
        .bind(viewer_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| row_to_post(&row)))
    }

    /// Edit a post's content in place. Scoped to the author, so editing
    /// someone else's post comes back as `None` rather than leaking that
    /// the post exists.
    pub async fn update_content(
        &self,
        post_id: Uuid,
        author_id: Uuid,
        content: String,
    ) -> Result<Option<Post>> {
        let row = sqlx::query(
            "WITH updated_post AS ( \
                UPDATE posts \
                SET content = $3 \
                WHERE id = $1 AND author_id = $2 \
                RETURNING id, author_id, content, created_at \
             ) \
             SELECT p.id, p.author_id, u.username AS author_username, p.content, p.created_at, \
                    (SELECT COUNT(*) FROM likes k WHERE k.post_id = p.id) AS like_count, \
                    EXISTS ( \
                        SELECT 1 FROM likes k WHERE k.post_id = p.id AND k.user_id = $2 \
                    ) AS liked_by_viewer \
             FROM updated_post p \
             JOIN users u ON u.id = p.author_id",
        )
        .bind(post_id)
        .bind(author_id)
        .bind(content)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| row_to_post(&row)))
    }
}

pub(crate) fn row_to_post(row: &PgRow) -> Post {
    Post {
        id: row.get("id"),
        author_id: row.get("author_id"),
        author_username: Some(row.get("author_username")),
        content: row.get("content"),
        created_at: row.get("created_at"),
        like_count: row.get("like_count"),
        liked_by_viewer: row.get("liked_by_viewer"),
    }
}

use anyhow::Result;
use uuid::Uuid;

use crate::app::posts::row_to_post;
use crate::domain::feed::{FeedPage, FeedScope, PageWindow, PAGE_SIZE};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct FeedService {
    db: Db,
}

const POST_COLUMNS: &str =
    "p.id, p.author_id, u.username AS author_username, p.content, p.created_at, \
     (SELECT COUNT(*) FROM likes k WHERE k.post_id = p.id) AS like_count, \
     EXISTS (SELECT 1 FROM likes k WHERE k.post_id = p.id AND k.user_id = $1) AS liked_by_viewer";

impl FeedService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Assemble one page of a feed for a viewer.
    ///
    /// Posts are ordered newest-first with the id as a stable tie-break, so
    /// consecutive pages are disjoint contiguous slices of one total order.
    /// The requested 1-based page number clamps to the valid range.
    pub async fn get_feed(
        &self,
        viewer_id: Option<Uuid>,
        scope: FeedScope,
        requested_page: i64,
    ) -> Result<FeedPage> {
        let total: i64 = match scope {
            FeedScope::All => {
                sqlx::query_scalar("SELECT COUNT(*) FROM posts")
                    .fetch_one(self.db.pool())
                    .await?
            }
            FeedScope::Following(follower_id) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM posts \
                     WHERE author_id IN ( \
                         SELECT followee_id FROM follows WHERE follower_id = $1 \
                     )",
                )
                .bind(follower_id)
                .fetch_one(self.db.pool())
                .await?
            }
            FeedScope::Profile(author_id) => {
                sqlx::query_scalar("SELECT COUNT(*) FROM posts WHERE author_id = $1")
                    .bind(author_id)
                    .fetch_one(self.db.pool())
                    .await?
            }
        };

        let window = PageWindow::clamp(requested_page, total, PAGE_SIZE);

        let rows = match scope {
            FeedScope::All => {
                sqlx::query(&format!(
                    "SELECT {POST_COLUMNS} \
                     FROM posts p \
                     JOIN users u ON u.id = p.author_id \
                     ORDER BY p.created_at DESC, p.id DESC \
                     OFFSET $2 LIMIT $3",
                ))
                .bind(viewer_id)
                .bind(window.offset)
                .bind(window.limit)
                .fetch_all(self.db.pool())
                .await?
            }
            FeedScope::Following(follower_id) => {
                sqlx::query(&format!(
                    "SELECT {POST_COLUMNS} \
                     FROM posts p \
                     JOIN users u ON u.id = p.author_id \
                     WHERE p.author_id IN ( \
                         SELECT followee_id FROM follows WHERE follower_id = $2 \
                     ) \
                     ORDER BY p.created_at DESC, p.id DESC \
                     OFFSET $3 LIMIT $4",
                ))
                .bind(viewer_id)
                .bind(follower_id)
                .bind(window.offset)
                .bind(window.limit)
                .fetch_all(self.db.pool())
                .await?
            }
            FeedScope::Profile(author_id) => {
                sqlx::query(&format!(
                    "SELECT {POST_COLUMNS} \
                     FROM posts p \
                     JOIN users u ON u.id = p.author_id \
                     WHERE p.author_id = $2 \
                     ORDER BY p.created_at DESC, p.id DESC \
                     OFFSET $3 LIMIT $4",
                ))
                .bind(viewer_id)
                .bind(author_id)
                .bind(window.offset)
                .bind(window.limit)
                .fetch_all(self.db.pool())
                .await?
            }
        };

        let posts = rows.iter().map(row_to_post).collect();

        Ok(FeedPage {
            posts,
            has_next: window.has_next(),
            has_previous: window.has_previous(),
            page_number: window.page_number,
            total_pages: window.total_pages,
        })
    }
}

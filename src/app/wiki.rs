use anyhow::Result;
use rand::Rng;
use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::domain::wiki::WikiEntry;
use crate::infra::db::Db;

#[derive(Clone)]
pub struct WikiService {
    db: Db,
}

/// What a search request resolved to: the entry itself on an exact title
/// match, otherwise the titles containing the query as a substring.
#[derive(Debug)]
pub enum SearchOutcome {
    Exact(WikiEntry),
    Matches(Vec<String>),
}

impl WikiService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn list_entries(&self) -> Result<Vec<String>> {
        let titles = sqlx::query_scalar("SELECT title FROM wiki_entries ORDER BY title")
            .fetch_all(self.db.pool())
            .await?;
        Ok(titles)
    }

    /// Look up an entry by title, case-insensitively.
    pub async fn get_entry(&self, title: &str) -> Result<Option<WikiEntry>> {
        let row = sqlx::query(
            "SELECT title, body, updated_at FROM wiki_entries WHERE lower(title) = lower($1)",
        )
        .bind(title)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| row_to_entry(&row)))
    }

    /// Create an entry. Returns `None` when an entry with that title
    /// (ignoring case) already exists.
    pub async fn create_entry(&self, title: &str, body: &str) -> Result<Option<WikiEntry>> {
        let row = sqlx::query(
            "INSERT INTO wiki_entries (title, body) VALUES ($1, $2) \
             ON CONFLICT (lower(title)) DO NOTHING \
             RETURNING title, body, updated_at",
        )
        .bind(title)
        .bind(body)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| row_to_entry(&row)))
    }

    /// Replace an entry's body. Returns `None` when the entry is missing.
    pub async fn update_entry(&self, title: &str, body: &str) -> Result<Option<WikiEntry>> {
        let row = sqlx::query(
            "UPDATE wiki_entries \
             SET body = $2, updated_at = now() \
             WHERE lower(title) = lower($1) \
             RETURNING title, body, updated_at",
        )
        .bind(title)
        .bind(body)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| row_to_entry(&row)))
    }

    pub async fn search(&self, query: &str) -> Result<SearchOutcome> {
        if let Some(entry) = self.get_entry(query).await? {
            return Ok(SearchOutcome::Exact(entry));
        }

        let matches = sqlx::query_scalar(
            "SELECT title FROM wiki_entries \
             WHERE title ILIKE '%' || $1 || '%' \
             ORDER BY title",
        )
        .bind(query)
        .fetch_all(self.db.pool())
        .await?;

        Ok(SearchOutcome::Matches(matches))
    }

    /// A uniformly random entry, or `None` when the wiki is empty.
    pub async fn random_entry(&self) -> Result<Option<WikiEntry>> {
        let titles = self.list_entries().await?;
        if titles.is_empty() {
            return Ok(None);
        }

        let index = rand::thread_rng().gen_range(0..titles.len());
        self.get_entry(&titles[index]).await
    }
}

fn row_to_entry(row: &PgRow) -> WikiEntry {
    WikiEntry {
        title: row.get("title"),
        body: row.get("body"),
        updated_at: row.get("updated_at"),
    }
}

use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::listing::{Listing, Transaction, WatchlistItem};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct ListingService {
    db: Db,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchOutcome {
    Added,
    AlreadyWatching,
    ListingNotFound,
}

/// Outcome of a close attempt by a listing's owner.
#[derive(Debug)]
pub enum CloseOutcome {
    /// The listing had bids; the highest bidder bought it at their bid.
    Sold(Transaction),
    /// No bids were ever placed; the listing just went inactive.
    Deactivated,
    NotFound,
    NotSeller,
    AlreadyClosed,
}

const LISTING_COLUMNS: &str =
    "l.id, l.seller_id, u.username AS seller_username, l.title, l.description, \
     l.starting_bid, l.image_url, l.category, l.is_active, l.created_at, \
     (SELECT MAX(b.amount) FROM bids b WHERE b.listing_id = l.id) AS current_bid";

impl ListingService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn create_listing(
        &self,
        seller_id: Uuid,
        title: String,
        description: String,
        starting_bid: Decimal,
        image_url: Option<String>,
        category: Option<String>,
    ) -> Result<Listing> {
        let row = sqlx::query(&format!(
            "WITH l AS ( \
                INSERT INTO listings (seller_id, title, description, starting_bid, image_url, category) \
                VALUES ($1, $2, $3, $4, $5, $6) \
                RETURNING * \
             ) \
             SELECT {LISTING_COLUMNS} FROM l JOIN users u ON u.id = l.seller_id",
        ))
        .bind(seller_id)
        .bind(title)
        .bind(description)
        .bind(starting_bid)
        .bind(image_url)
        .bind(category)
        .fetch_one(self.db.pool())
        .await?;

        Ok(row_to_listing(&row))
    }

    pub async fn get_listing(&self, listing_id: Uuid) -> Result<Option<Listing>> {
        let row = sqlx::query(&format!(
            "SELECT {LISTING_COLUMNS} \
             FROM listings l \
             JOIN users u ON u.id = l.seller_id \
             WHERE l.id = $1",
        ))
        .bind(listing_id)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.map(|row| row_to_listing(&row)))
    }

    /// Active listings, newest first. `query` narrows by case-insensitive
    /// title substring and `category` by exact category, matching the
    /// index, search and category pages.
    pub async fn list_active(
        &self,
        query: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<Listing>> {
        let rows = sqlx::query(&format!(
            "SELECT {LISTING_COLUMNS} \
             FROM listings l \
             JOIN users u ON u.id = l.seller_id \
             WHERE l.is_active \
               AND ($1::text IS NULL OR l.title ILIKE '%' || $1 || '%') \
               AND ($2::text IS NULL OR l.category = $2) \
             ORDER BY l.created_at DESC, l.id DESC",
        ))
        .bind(query)
        .bind(category)
        .fetch_all(self.db.pool())
        .await?;

        Ok(rows.iter().map(row_to_listing).collect())
    }

    /// Distinct categories across listings that declare one.
    pub async fn categories(&self) -> Result<Vec<String>> {
        let categories = sqlx::query_scalar(
            "SELECT DISTINCT category FROM listings \
             WHERE category IS NOT NULL ORDER BY category",
        )
        .fetch_all(self.db.pool())
        .await?;

        Ok(categories)
    }

    /// Close a listing. The listing row is locked so a close cannot race a
    /// concurrent bid: the winning bid read here is final. The sale price
    /// is the winning bid amount, resolved server-side.
    pub async fn close_listing(&self, listing_id: Uuid, caller_id: Uuid) -> Result<CloseOutcome> {
        let mut tx = self.db.begin().await?;

        let listing = sqlx::query(
            "SELECT seller_id, title, is_active FROM listings WHERE id = $1 FOR UPDATE",
        )
        .bind(listing_id)
        .fetch_optional(&mut *tx)
        .await?;

        let listing = match listing {
            Some(row) => row,
            None => return Ok(CloseOutcome::NotFound),
        };

        let seller_id: Uuid = listing.get("seller_id");
        let title: String = listing.get("title");
        let is_active: bool = listing.get("is_active");

        if seller_id != caller_id {
            return Ok(CloseOutcome::NotSeller);
        }
        if !is_active {
            return Ok(CloseOutcome::AlreadyClosed);
        }

        let winner = sqlx::query(
            "SELECT bidder_id, amount FROM bids \
             WHERE listing_id = $1 \
             ORDER BY amount DESC, created_at ASC, id ASC \
             LIMIT 1",
        )
        .bind(listing_id)
        .fetch_optional(&mut *tx)
        .await?;

        sqlx::query("UPDATE listings SET is_active = FALSE WHERE id = $1")
            .bind(listing_id)
            .execute(&mut *tx)
            .await?;

        let outcome = match winner {
            Some(winner) => {
                let buyer_id: Uuid = winner.get("bidder_id");
                let price: Decimal = winner.get("amount");

                let row = sqlx::query(
                    "INSERT INTO transactions (listing_id, seller_id, buyer_id, price) \
                     VALUES ($1, $2, $3, $4) \
                     RETURNING id, created_at",
                )
                .bind(listing_id)
                .bind(seller_id)
                .bind(buyer_id)
                .bind(price)
                .fetch_one(&mut *tx)
                .await?;

                CloseOutcome::Sold(Transaction {
                    id: row.get("id"),
                    listing_id,
                    listing_title: Some(title),
                    seller_id,
                    buyer_id,
                    price,
                    created_at: row.get("created_at"),
                })
            }
            None => CloseOutcome::Deactivated,
        };

        tx.commit().await?;
        Ok(outcome)
    }

    /// Add a listing to the user's watchlist. The unique pair constraint
    /// makes watching twice a no-op.
    pub async fn watch(&self, user_id: Uuid, listing_id: Uuid) -> Result<WatchOutcome> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM listings WHERE id = $1)")
                .bind(listing_id)
                .fetch_one(self.db.pool())
                .await?;
        if !exists {
            return Ok(WatchOutcome::ListingNotFound);
        }

        let result = sqlx::query(
            "INSERT INTO watchlist (user_id, listing_id) VALUES ($1, $2) \
             ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(listing_id)
        .execute(self.db.pool())
        .await?;

        if result.rows_affected() > 0 {
            Ok(WatchOutcome::Added)
        } else {
            Ok(WatchOutcome::AlreadyWatching)
        }
    }

    pub async fn unwatch(&self, user_id: Uuid, listing_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM watchlist WHERE user_id = $1 AND listing_id = $2")
            .bind(user_id)
            .bind(listing_id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn watchlist(&self, user_id: Uuid) -> Result<Vec<WatchlistItem>> {
        let rows = sqlx::query(&format!(
            "SELECT {LISTING_COLUMNS}, w.created_at AS watched_at \
             FROM watchlist w \
             JOIN listings l ON l.id = w.listing_id \
             JOIN users u ON u.id = l.seller_id \
             WHERE w.user_id = $1 \
             ORDER BY w.created_at DESC",
        ))
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        let items = rows
            .iter()
            .map(|row| WatchlistItem {
                listing: row_to_listing(row),
                watched_at: row.get("watched_at"),
            })
            .collect();

        Ok(items)
    }

    /// Transactions where the user was the seller.
    pub async fn sales(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        self.transactions("seller_id", user_id).await
    }

    /// Transactions where the user was the buyer.
    pub async fn purchases(&self, user_id: Uuid) -> Result<Vec<Transaction>> {
        self.transactions("buyer_id", user_id).await
    }

    async fn transactions(&self, side: &str, user_id: Uuid) -> Result<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT t.id, t.listing_id, l.title AS listing_title, t.seller_id, \
                    t.buyer_id, t.price, t.created_at \
             FROM transactions t \
             JOIN listings l ON l.id = t.listing_id \
             WHERE t.{side} = $1 \
             ORDER BY t.created_at DESC, t.id DESC",
        ))
        .bind(user_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut transactions = Vec::with_capacity(rows.len());
        for row in rows {
            transactions.push(Transaction {
                id: row.get("id"),
                listing_id: row.get("listing_id"),
                listing_title: Some(row.get("listing_title")),
                seller_id: row.get("seller_id"),
                buyer_id: row.get("buyer_id"),
                price: row.get("price"),
                created_at: row.get("created_at"),
            });
        }

        Ok(transactions)
    }
}

fn row_to_listing(row: &PgRow) -> Listing {
    Listing {
        id: row.get("id"),
        seller_id: row.get("seller_id"),
        seller_username: Some(row.get("seller_username")),
        title: row.get("title"),
        description: row.get("description"),
        starting_bid: row.get("starting_bid"),
        image_url: row.get("image_url"),
        category: row.get("category"),
        is_active: row.get("is_active"),
        created_at: row.get("created_at"),
        current_bid: row.get("current_bid"),
    }
}

use anyhow::Result;
use rust_decimal::Decimal;
use sqlx::Row;
use uuid::Uuid;

use crate::domain::bidding::{validate_bid, Bid, BidRejection};
use crate::infra::db::Db;

#[derive(Clone)]
pub struct BidService {
    db: Db,
}

/// Outcome of a bid attempt. Everything short of a database failure is a
/// value, not an error.
#[derive(Debug)]
pub enum PlaceBidOutcome {
    Placed(Bid),
    ListingNotFound,
    ListingClosed,
    OwnListing,
    Rejected(BidRejection),
}

impl BidService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Place a bid. The listing row is locked for the whole
    /// read-validate-write sequence, so two concurrent bids can never both
    /// validate against the same stale maximum.
    pub async fn place_bid(
        &self,
        listing_id: Uuid,
        bidder_id: Uuid,
        amount: Decimal,
    ) -> Result<PlaceBidOutcome> {
        let mut tx = self.db.begin().await?;

        let listing = sqlx::query(
            "SELECT seller_id, starting_bid, is_active FROM listings WHERE id = $1 FOR UPDATE",
        )
        .bind(listing_id)
        .fetch_optional(&mut *tx)
        .await?;

        let listing = match listing {
            Some(row) => row,
            None => return Ok(PlaceBidOutcome::ListingNotFound),
        };

        let seller_id: Uuid = listing.get("seller_id");
        let starting_bid: Decimal = listing.get("starting_bid");
        let is_active: bool = listing.get("is_active");

        if !is_active {
            return Ok(PlaceBidOutcome::ListingClosed);
        }
        if seller_id == bidder_id {
            return Ok(PlaceBidOutcome::OwnListing);
        }

        let highest = find_max_bid(&mut tx, listing_id).await?;
        let amount = match validate_bid(starting_bid, highest, amount) {
            Ok(amount) => amount,
            Err(rejection) => return Ok(PlaceBidOutcome::Rejected(rejection)),
        };

        let row = sqlx::query(
            "WITH inserted_bid AS ( \
                INSERT INTO bids (listing_id, bidder_id, amount) \
                VALUES ($1, $2, $3) \
                RETURNING id, listing_id, bidder_id, amount, created_at \
             ) \
             SELECT b.*, u.username AS bidder_username \
             FROM inserted_bid b \
             JOIN users u ON u.id = b.bidder_id",
        )
        .bind(listing_id)
        .bind(bidder_id)
        .bind(amount)
        .fetch_one(&mut *tx)
        .await?;

        let bid = Bid {
            id: row.get("id"),
            listing_id: row.get("listing_id"),
            bidder_id: row.get("bidder_id"),
            bidder_username: Some(row.get("bidder_username")),
            amount: row.get("amount"),
            created_at: row.get("created_at"),
        };

        tx.commit().await?;
        Ok(PlaceBidOutcome::Placed(bid))
    }

    /// Bids for a listing, best first. Amount descending with insertion
    /// order as the tie-break, so the head of the list is the winning bid.
    pub async fn list_bids(&self, listing_id: Uuid) -> Result<Vec<Bid>> {
        let rows = sqlx::query(
            "SELECT b.id, b.listing_id, b.bidder_id, b.amount, b.created_at, \
                    u.username AS bidder_username \
             FROM bids b \
             JOIN users u ON u.id = b.bidder_id \
             WHERE b.listing_id = $1 \
             ORDER BY b.amount DESC, b.created_at ASC, b.id ASC",
        )
        .bind(listing_id)
        .fetch_all(self.db.pool())
        .await?;

        let mut bids = Vec::with_capacity(rows.len());
        for row in rows {
            bids.push(Bid {
                id: row.get("id"),
                listing_id: row.get("listing_id"),
                bidder_id: row.get("bidder_id"),
                bidder_username: Some(row.get("bidder_username")),
                amount: row.get("amount"),
                created_at: row.get("created_at"),
            });
        }

        Ok(bids)
    }
}

/// Highest bid amount for a listing, `None` when no bids exist. Runs inside
/// the caller's transaction so the answer is stable under the listing lock.
pub(crate) async fn find_max_bid(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    listing_id: Uuid,
) -> Result<Option<Decimal>> {
    let amount: Option<Decimal> =
        sqlx::query_scalar("SELECT MAX(amount) FROM bids WHERE listing_id = $1")
            .bind(listing_id)
            .fetch_one(&mut **tx)
            .await?;
    Ok(amount)
}

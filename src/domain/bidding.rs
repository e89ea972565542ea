use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bid {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub bidder_id: Uuid,
    pub bidder_username: Option<String>,
    pub amount: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BidRejection {
    #[error("bid must be higher than the current bid of {current}")]
    BidTooLow { current: Decimal },
    #[error("bid must be higher than or equal to the starting bid of {starting}")]
    BelowStartingBid { starting: Decimal },
}

/// Validate a proposed bid against the listing's current state.
///
/// A listing with prior bids only accepts amounts strictly greater than the
/// highest of them; a listing with no bids accepts any amount at or above
/// its starting bid.
pub fn validate_bid(
    starting_bid: Decimal,
    highest_bid: Option<Decimal>,
    amount: Decimal,
) -> Result<Decimal, BidRejection> {
    match highest_bid {
        Some(current) if amount > current => Ok(amount),
        Some(current) => Err(BidRejection::BidTooLow { current }),
        None if amount >= starting_bid => Ok(amount),
        None => Err(BidRejection::BelowStartingBid {
            starting: starting_bid,
        }),
    }
}

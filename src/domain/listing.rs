use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub seller_username: Option<String>,
    pub title: String,
    pub description: String,
    pub starting_bid: Decimal,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Highest bid amount so far, if any bid exists.
    pub current_bid: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub listing_title: Option<String>,
    pub seller_id: Uuid,
    pub buyer_id: Uuid,
    pub price: Decimal,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchlistItem {
    pub listing: Listing,
    #[serde(with = "time::serde::rfc3339")]
    pub watched_at: OffsetDateTime,
}

const IMAGE_EXTENSIONS: [&str; 9] = [
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".tiff", ".tif", ".webp", ".svg",
];

/// Check an image URL points at a recognized image file and normalize it:
/// lowercased, with any query string or fragment stripped. Returns `None`
/// for anything that does not look like an image URL.
pub fn normalize_image_url(raw: &str) -> Option<String> {
    let mut url = Url::parse(raw.trim()).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_query(None);
    url.set_fragment(None);

    let normalized = url.as_str().to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| normalized.ends_with(ext))
        .then_some(normalized)
}

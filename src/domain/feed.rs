use serde::Serialize;
use uuid::Uuid;

use crate::domain::post::Post;

pub const PAGE_SIZE: i64 = 10;

/// Which posts a feed request selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedScope {
    /// Every post on the network.
    All,
    /// Posts authored by users the given follower follows.
    Following(Uuid),
    /// Posts authored by a single user.
    Profile(Uuid),
}

/// A resolved window into a fixed-size paginated result set.
///
/// Page numbers are 1-based. Out-of-range requests clamp to the nearest
/// valid page, and an empty result set still has one (empty) page, so a
/// window can always be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page_number: i64,
    pub total_pages: i64,
    pub offset: i64,
    pub limit: i64,
}

impl PageWindow {
    pub fn clamp(requested_page: i64, total_items: i64, page_size: i64) -> Self {
        let total_pages = ((total_items + page_size - 1) / page_size).max(1);
        let page_number = requested_page.clamp(1, total_pages);
        Self {
            page_number,
            total_pages,
            offset: (page_number - 1) * page_size,
            limit: page_size,
        }
    }

    pub fn has_next(&self) -> bool {
        self.page_number < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }
}

/// One page of a feed, annotated for the viewer.
#[derive(Debug, Clone, Serialize)]
pub struct FeedPage {
    pub posts: Vec<Post>,
    pub has_next: bool,
    pub has_previous: bool,
    pub page_number: i64,
    pub total_pages: i64,
}

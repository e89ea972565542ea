pub mod auth;
pub mod bidding;
pub mod engagement;
pub mod feed;
pub mod listings;
pub mod posts;
pub mod social;
pub mod wiki;

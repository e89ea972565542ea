use axum::{routing::delete, routing::get, routing::post, routing::put, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn auth() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(handlers::register))
        .route("/auth/login", post(handlers::login))
        .route("/auth/refresh", post(handlers::refresh_token))
        .route("/auth/revoke", post(handlers::revoke_token))
        .route("/auth/me", get(handlers::get_current_user))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users/:id", get(handlers::get_profile))
        .route("/users/:id/follow", post(handlers::follow_user))
        .route("/users/:id/unfollow", post(handlers::unfollow_user))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", post(handlers::create_post))
        .route("/posts/:id", get(handlers::get_post))
        .route("/posts/:id", put(handlers::update_post))
        .route("/posts/:id/like", post(handlers::like_post))
        .route("/posts/:id/like", delete(handlers::unlike_post))
}

pub fn feed() -> Router<AppState> {
    Router::new().route("/feed", get(handlers::get_feed))
}

pub fn listings() -> Router<AppState> {
    Router::new()
        .route("/listings", post(handlers::create_listing))
        .route("/listings", get(handlers::list_listings))
        .route("/listings/:id", get(handlers::get_listing))
        .route("/listings/:id/bids", post(handlers::place_bid))
        .route("/listings/:id/bids", get(handlers::list_bids))
        .route("/listings/:id/close", post(handlers::close_listing))
        .route("/categories", get(handlers::list_categories))
}

pub fn watchlist() -> Router<AppState> {
    Router::new()
        .route("/watchlist", get(handlers::get_watchlist))
        .route("/watchlist", post(handlers::add_watch))
        .route("/watchlist/:listing_id", delete(handlers::remove_watch))
}

pub fn transactions() -> Router<AppState> {
    Router::new()
        .route("/sales", get(handlers::list_sales))
        .route("/purchases", get(handlers::list_purchases))
}

pub fn wiki() -> Router<AppState> {
    Router::new()
        .route("/wiki", get(handlers::list_wiki_entries))
        .route("/wiki", post(handlers::create_wiki_entry))
        .route("/wiki/search", get(handlers::search_wiki))
        .route("/wiki/random", get(handlers::random_wiki_entry))
        .route("/wiki/:title", get(handlers::get_wiki_entry))
        .route("/wiki/:title", put(handlers::update_wiki_entry))
}

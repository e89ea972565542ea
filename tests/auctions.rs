//! Auction Tests
//!
//! Covers listing creation, bid validation, the close/sell flow, the
//! watchlist, categories and transactions.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

// ===========================================================================
// Listings
// ===========================================================================

#[tokio::test]
async fn create_listing() {
    let app = app().await;
    let seller = app.create_user("auc_create").await;

    let resp = app
        .post_json(
            "/v1/listings",
            json!({
                "title": "Antique clock",
                "description": "Chimes on the hour.",
                "starting_bid": "25.00",
                "category": "Furniture",
            }),
            Some(&seller.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert_eq!(body["title"].as_str().unwrap(), "Antique clock");
    assert_eq!(body["starting_bid"].as_str().unwrap(), "25.00");
    assert_eq!(body["is_active"].as_bool().unwrap(), true);
    assert!(body["current_bid"].is_null());
    assert_eq!(body["seller_username"].as_str().unwrap(), seller.username);
}

#[tokio::test]
async fn create_listing_normalizes_image_url() {
    let app = app().await;
    let seller = app.create_user("auc_img").await;

    let resp = app
        .post_json(
            "/v1/listings",
            json!({
                "title": "Poster",
                "description": "A4 print.",
                "starting_bid": "5.00",
                "image_url": "https://cdn.example.com/Poster.PNG?size=large#frame",
            }),
            Some(&seller.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(
        resp.json()["image_url"].as_str().unwrap(),
        "https://cdn.example.com/poster.png"
    );
}

#[tokio::test]
async fn create_listing_rejects_bad_image_url() {
    let app = app().await;
    let seller = app.create_user("auc_img_bad").await;

    let resp = app
        .post_json(
            "/v1/listings",
            json!({
                "title": "Poster",
                "description": "A4 print.",
                "starting_bid": "5.00",
                "image_url": "https://cdn.example.com/poster.exe",
            }),
            Some(&seller.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "invalid image URL format");
}

#[tokio::test]
async fn create_listing_requires_auth() {
    let app = app().await;

    let resp = app
        .post_json(
            "/v1/listings",
            json!({
                "title": "Poster",
                "description": "A4 print.",
                "starting_bid": "5.00",
            }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn search_listings_by_title() {
    let app = app().await;
    let seller = app.create_user("auc_search").await;
    app.create_listing_for_user(seller.id, "Vintage Teapot auc_search", "10.00")
        .await;
    app.create_listing_for_user(seller.id, "Modern Lamp auc_search", "10.00")
        .await;

    let resp = app.get("/v1/listings?q=teapot%20auc_search", None).await;

    assert_eq!(resp.status, StatusCode::OK);
    let listings = resp.json()["listings"].as_array().unwrap().clone();
    assert_eq!(listings.len(), 1);
    assert_eq!(
        listings[0]["title"].as_str().unwrap(),
        "Vintage Teapot auc_search"
    );
}

#[tokio::test]
async fn categories_listed_distinct() {
    let app = app().await;
    let seller = app.create_user("auc_cat").await;

    for _ in 0..2 {
        app.post_json(
            "/v1/listings",
            json!({
                "title": "Item",
                "description": "desc",
                "starting_bid": "1.00",
                "category": "auc_cat_books",
            }),
            Some(&seller.access_token),
        )
        .await;
    }

    let resp = app.get("/v1/categories", None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let categories: Vec<String> = resp.json()["categories"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        categories.iter().filter(|c| *c == "auc_cat_books").count(),
        1
    );

    let resp = app.get("/v1/listings?category=auc_cat_books", None).await;
    assert_eq!(resp.json()["listings"].as_array().unwrap().len(), 2);
}

// ===========================================================================
// Bid validation
// ===========================================================================

#[tokio::test]
async fn bid_scenario_walkthrough() {
    let app = app().await;
    let seller = app.create_user("auc_bid_walk_s").await;
    let alice = app.create_user("auc_bid_walk_a").await;
    let bob = app.create_user("auc_bid_walk_b").await;
    let listing = app
        .create_listing_for_user(seller.id, "Walkthrough item", "10.00")
        .await;
    let path = format!("/v1/listings/{}/bids", listing);

    // First bid equal to the starting bid is accepted.
    let resp = app
        .post_json(&path, json!({"amount": "10.00"}), Some(&alice.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);

    // Repeating the same amount must fail: strictly-greater applies once a
    // bid exists.
    let resp = app
        .post_json(&path, json!({"amount": "10.00"}), Some(&bob.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.error_message(),
        "bid must be higher than the current bid of 10.00"
    );

    let resp = app
        .post_json(&path, json!({"amount": "15.00"}), Some(&bob.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);

    let resp = app
        .post_json(&path, json!({"amount": "12.00"}), Some(&alice.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.error_message(),
        "bid must be higher than the current bid of 15.00"
    );

    // The listing reflects the running maximum.
    let resp = app.get(&format!("/v1/listings/{}", listing), None).await;
    assert_eq!(resp.json()["current_bid"].as_str().unwrap(), "15.00");
}

#[tokio::test]
async fn first_bid_below_starting_bid_rejected() {
    let app = app().await;
    let seller = app.create_user("auc_bid_below_s").await;
    let bidder = app.create_user("auc_bid_below_b").await;
    let listing = app
        .create_listing_for_user(seller.id, "Below start", "10.00")
        .await;

    let resp = app
        .post_json(
            &format!("/v1/listings/{}/bids", listing),
            json!({"amount": "9.99"}),
            Some(&bidder.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.error_message(),
        "bid must be higher than or equal to the starting bid of 10.00"
    );
}

#[tokio::test]
async fn bid_one_cent_above_current_accepted() {
    let app = app().await;
    let seller = app.create_user("auc_bid_cent_s").await;
    let alice = app.create_user("auc_bid_cent_a").await;
    let bob = app.create_user("auc_bid_cent_b").await;
    let listing = app
        .create_listing_for_user(seller.id, "Penny war", "1.00")
        .await;
    let path = format!("/v1/listings/{}/bids", listing);

    let resp = app
        .post_json(&path, json!({"amount": "1.00"}), Some(&alice.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);

    let resp = app
        .post_json(&path, json!({"amount": "1.01"}), Some(&bob.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.json()["amount"].as_str().unwrap(), "1.01");
}

#[tokio::test]
async fn bid_on_own_listing_forbidden() {
    let app = app().await;
    let seller = app.create_user("auc_bid_own").await;
    let listing = app
        .create_listing_for_user(seller.id, "Own item", "10.00")
        .await;

    let resp = app
        .post_json(
            &format!("/v1/listings/{}/bids", listing),
            json!({"amount": "20.00"}),
            Some(&seller.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn bid_on_missing_listing() {
    let app = app().await;
    let bidder = app.create_user("auc_bid_ghost").await;

    let resp = app
        .post_json(
            &format!("/v1/listings/{}/bids", Uuid::new_v4()),
            json!({"amount": "20.00"}),
            Some(&bidder.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bids_listed_best_first() {
    let app = app().await;
    let seller = app.create_user("auc_bid_list_s").await;
    let alice = app.create_user("auc_bid_list_a").await;
    let bob = app.create_user("auc_bid_list_b").await;
    let listing = app
        .create_listing_for_user(seller.id, "Bid order", "1.00")
        .await;
    let path = format!("/v1/listings/{}/bids", listing);

    app.post_json(&path, json!({"amount": "1.00"}), Some(&alice.access_token))
        .await;
    app.post_json(&path, json!({"amount": "2.00"}), Some(&bob.access_token))
        .await;
    app.post_json(&path, json!({"amount": "3.00"}), Some(&alice.access_token))
        .await;

    let resp = app.get(&path, None).await;
    assert_eq!(resp.status, StatusCode::OK);
    let bids = resp.json()["bids"].as_array().unwrap().clone();
    assert_eq!(bids.len(), 3);
    assert_eq!(bids[0]["amount"].as_str().unwrap(), "3.00");
    assert_eq!(bids[1]["amount"].as_str().unwrap(), "2.00");
    assert_eq!(bids[2]["amount"].as_str().unwrap(), "1.00");
}

// ===========================================================================
// Listing lifecycle
// ===========================================================================

#[tokio::test]
async fn close_listing_records_transaction() {
    let app = app().await;
    let seller = app.create_user("auc_close_s").await;
    let buyer = app.create_user("auc_close_b").await;
    let listing = app
        .create_listing_for_user(seller.id, "Sold item", "10.00")
        .await;

    app.post_json(
        &format!("/v1/listings/{}/bids", listing),
        json!({"amount": "42.00"}),
        Some(&buyer.access_token),
    )
    .await;

    let resp = app
        .post_json(
            &format!("/v1/listings/{}/close", listing),
            json!({}),
            Some(&seller.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["closed"].as_bool().unwrap(), true);
    // The sale price is the winning bid, not anything client-supplied.
    assert_eq!(body["transaction"]["price"].as_str().unwrap(), "42.00");
    assert_eq!(
        body["transaction"]["buyer_id"].as_str().unwrap(),
        buyer.id.to_string()
    );

    // The listing is no longer active and rejects further bids.
    let resp = app.get(&format!("/v1/listings/{}", listing), None).await;
    assert_eq!(resp.json()["is_active"].as_bool().unwrap(), false);

    let resp = app
        .post_json(
            &format!("/v1/listings/{}/bids", listing),
            json!({"amount": "50.00"}),
            Some(&buyer.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CONFLICT);

    // It shows up as a sale for the seller and a purchase for the buyer.
    let resp = app.get("/v1/sales", Some(&seller.access_token)).await;
    let sales = resp.json()["transactions"].as_array().unwrap().clone();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0]["listing_title"].as_str().unwrap(), "Sold item");

    let resp = app.get("/v1/purchases", Some(&buyer.access_token)).await;
    assert_eq!(resp.json()["transactions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn close_listing_without_bids_deactivates() {
    let app = app().await;
    let seller = app.create_user("auc_close_nobids").await;
    let listing = app
        .create_listing_for_user(seller.id, "Unwanted item", "10.00")
        .await;

    let resp = app
        .post_json(
            &format!("/v1/listings/{}/close", listing),
            json!({}),
            Some(&seller.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["closed"].as_bool().unwrap(), true);
    assert!(body["transaction"].is_null());

    let resp = app.get("/v1/sales", Some(&seller.access_token)).await;
    assert_eq!(resp.json()["transactions"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn close_listing_only_by_seller() {
    let app = app().await;
    let seller = app.create_user("auc_close_other_s").await;
    let stranger = app.create_user("auc_close_other_x").await;
    let listing = app
        .create_listing_for_user(seller.id, "Not yours", "10.00")
        .await;

    let resp = app
        .post_json(
            &format!("/v1/listings/{}/close", listing),
            json!({}),
            Some(&stranger.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn close_listing_twice_conflicts() {
    let app = app().await;
    let seller = app.create_user("auc_close_twice").await;
    let listing = app
        .create_listing_for_user(seller.id, "Twice closed", "10.00")
        .await;
    let path = format!("/v1/listings/{}/close", listing);

    let resp = app.post_json(&path, json!({}), Some(&seller.access_token)).await;
    assert_eq!(resp.status, StatusCode::OK);

    let resp = app.post_json(&path, json!({}), Some(&seller.access_token)).await;
    assert_eq!(resp.status, StatusCode::CONFLICT);
    assert_eq!(resp.error_message(), "listing is already closed");
}

#[tokio::test]
async fn closed_listing_excluded_from_index() {
    let app = app().await;
    let seller = app.create_user("auc_index").await;
    let open = app
        .create_listing_for_user(seller.id, "auc_index open", "1.00")
        .await;
    let closed = app
        .create_listing_for_user(seller.id, "auc_index closed", "1.00")
        .await;
    app.post_json(
        &format!("/v1/listings/{}/close", closed),
        json!({}),
        Some(&seller.access_token),
    )
    .await;

    let resp = app.get("/v1/listings?q=auc_index", None).await;
    let listings = resp.json()["listings"].as_array().unwrap().clone();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0]["id"].as_str().unwrap(), open.to_string());
}

// ===========================================================================
// Watchlist
// ===========================================================================

#[tokio::test]
async fn watchlist_round_trip() {
    let app = app().await;
    let seller = app.create_user("auc_watch_s").await;
    let watcher = app.create_user("auc_watch_w").await;
    let listing = app
        .create_listing_for_user(seller.id, "Watched item", "10.00")
        .await;

    let resp = app
        .post_json(
            "/v1/watchlist",
            json!({"listing_id": listing}),
            Some(&watcher.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["watched"].as_bool().unwrap(), true);

    // Watching again is a no-op, not a duplicate row.
    let resp = app
        .post_json(
            "/v1/watchlist",
            json!({"listing_id": listing}),
            Some(&watcher.access_token),
        )
        .await;
    assert_eq!(resp.json()["watched"].as_bool().unwrap(), false);

    let resp = app.get("/v1/watchlist", Some(&watcher.access_token)).await;
    let items = resp.json()["items"].as_array().unwrap().clone();
    assert_eq!(items.len(), 1);
    assert_eq!(
        items[0]["listing"]["title"].as_str().unwrap(),
        "Watched item"
    );

    let resp = app
        .delete(
            &format!("/v1/watchlist/{}", listing),
            Some(&watcher.access_token),
        )
        .await;
    assert_eq!(resp.json()["removed"].as_bool().unwrap(), true);

    let resp = app.get("/v1/watchlist", Some(&watcher.access_token)).await;
    assert_eq!(resp.json()["items"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn watch_missing_listing() {
    let app = app().await;
    let watcher = app.create_user("auc_watch_ghost").await;

    let resp = app
        .post_json(
            "/v1/watchlist",
            json!({"listing_id": Uuid::new_v4()}),
            Some(&watcher.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

//! Feed & Post Tests
//!
//! Covers post creation/editing, content validation, like annotations and
//! fixed-size page assembly with clamping.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;

// ===========================================================================
// Posts
// ===========================================================================

#[tokio::test]
async fn create_post() {
    let app = app().await;
    let user = app.create_user("feed_post_create").await;

    let resp = app
        .post_json(
            "/v1/posts",
            json!({"content": "hello from the test suite"}),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert_eq!(body["content"].as_str().unwrap(), "hello from the test suite");
    assert_eq!(body["author_username"].as_str().unwrap(), user.username);
    assert_eq!(body["like_count"].as_i64().unwrap(), 0);
}

#[tokio::test]
async fn create_post_requires_auth() {
    let app = app().await;

    let resp = app
        .post_json("/v1/posts", json!({"content": "anonymous"}), None)
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn post_content_length_boundaries() {
    let app = app().await;
    let user = app.create_user("feed_post_len").await;

    // Empty content is rejected.
    let resp = app
        .post_json("/v1/posts", json!({"content": ""}), Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);

    // Exactly 280 characters is accepted.
    let resp = app
        .post_json(
            "/v1/posts",
            json!({"content": "a".repeat(280)}),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED);

    // 281 characters is rejected.
    let resp = app
        .post_json(
            "/v1/posts",
            json!({"content": "a".repeat(281)}),
            Some(&user.access_token),
        )
        .await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "post content cannot exceed 280 characters");
}

#[tokio::test]
async fn edit_post_in_place() {
    let app = app().await;
    let user = app.create_user("feed_post_edit").await;
    let post_id = app.create_post_for_user(user.id, "first draft").await;

    let resp = app
        .put_json(
            &format!("/v1/posts/{}", post_id),
            json!({"content": "second draft"}),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["content"].as_str().unwrap(), "second draft");

    let resp = app.get(&format!("/v1/posts/{}", post_id), None).await;
    assert_eq!(resp.json()["content"].as_str().unwrap(), "second draft");
}

#[tokio::test]
async fn edit_post_of_another_user() {
    let app = app().await;
    let author = app.create_user("feed_post_edit_a").await;
    let stranger = app.create_user("feed_post_edit_x").await;
    let post_id = app.create_post_for_user(author.id, "mine").await;

    let resp = app
        .put_json(
            &format!("/v1/posts/{}", post_id),
            json!({"content": "hijacked"}),
            Some(&stranger.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn single_post_annotations() {
    let app = app().await;
    let author = app.create_user("feed_post_ann_a").await;
    let liker = app.create_user("feed_post_ann_b").await;
    let other = app.create_user("feed_post_ann_c").await;
    let post_id = app.create_post_for_user(author.id, "annotated").await;
    let like_path = format!("/v1/posts/{}/like", post_id);

    app.post_json(&like_path, json!({}), Some(&liker.access_token))
        .await;
    app.post_json(&like_path, json!({}), Some(&other.access_token))
        .await;

    let resp = app
        .get(&format!("/v1/posts/{}", post_id), Some(&liker.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["like_count"].as_i64().unwrap(), 2);
    assert_eq!(resp.json()["liked_by_viewer"].as_bool().unwrap(), true);

    // Anonymous viewers see the count but no personal like state.
    let resp = app.get(&format!("/v1/posts/{}", post_id), None).await;
    assert_eq!(resp.json()["like_count"].as_i64().unwrap(), 2);
    assert_eq!(resp.json()["liked_by_viewer"].as_bool().unwrap(), false);
}

// ===========================================================================
// Pagination
// ===========================================================================

/// Seed `count` posts with strictly decreasing age, so post N is the newest.
async fn seed_posts(app: &common::TestApp, author_id: uuid::Uuid, prefix: &str, count: i64) {
    for i in 1..=count {
        app.create_post_at(author_id, &format!("{}-{}", prefix, i), 1000 - i)
            .await;
    }
}

#[tokio::test]
async fn profile_pages_are_contiguous_slices() {
    let app = app().await;
    let author = app.create_user("feed_page_author").await;
    seed_posts(app, author.id, "feedpage", 25).await;

    let mut seen = Vec::new();
    for page in 1..=3 {
        let resp = app
            .get(&format!("/v1/users/{}?page={}", author.id, page), None)
            .await;
        assert_eq!(resp.status, StatusCode::OK);
        let body = resp.json();
        assert_eq!(body["page_number"].as_i64().unwrap(), page);
        assert_eq!(body["total_pages"].as_i64().unwrap(), 3);
        assert_eq!(body["has_previous"].as_bool().unwrap(), page > 1);
        assert_eq!(body["has_next"].as_bool().unwrap(), page < 3);

        let posts = body["posts"].as_array().unwrap().clone();
        assert_eq!(posts.len(), if page < 3 { 10 } else { 5 });
        for post in posts {
            seen.push(post["content"].as_str().unwrap().to_string());
        }
    }

    // Pages concatenate to the full feed, newest first, no overlap and no
    // gaps.
    let expected: Vec<String> = (1..=25).rev().map(|i| format!("feedpage-{}", i)).collect();
    assert_eq!(seen, expected);
}

#[tokio::test]
async fn out_of_range_pages_clamp() {
    let app = app().await;
    let author = app.create_user("feed_page_clamp").await;
    seed_posts(app, author.id, "clamppage", 12).await;

    // Far beyond the end clamps to the last page.
    let resp = app
        .get(&format!("/v1/users/{}?page=99", author.id), None)
        .await;
    let body = resp.json();
    assert_eq!(body["page_number"].as_i64().unwrap(), 2);
    assert_eq!(body["posts"].as_array().unwrap().len(), 2);

    // Below the start clamps to the first page.
    let resp = app
        .get(&format!("/v1/users/{}?page=0", author.id), None)
        .await;
    assert_eq!(resp.json()["page_number"].as_i64().unwrap(), 1);
}

#[tokio::test]
async fn empty_profile_is_one_empty_page() {
    let app = app().await;
    let author = app.create_user("feed_page_empty").await;

    let resp = app.get(&format!("/v1/users/{}", author.id), None).await;
    let body = resp.json();
    assert_eq!(body["posts"].as_array().unwrap().len(), 0);
    assert_eq!(body["page_number"].as_i64().unwrap(), 1);
    assert_eq!(body["total_pages"].as_i64().unwrap(), 1);
    assert_eq!(body["has_next"].as_bool().unwrap(), false);
    assert_eq!(body["has_previous"].as_bool().unwrap(), false);
}

// ===========================================================================
// Feed scopes
// ===========================================================================

#[tokio::test]
async fn following_feed_selects_followed_authors_only() {
    let app = app().await;
    let author = app.create_user("feed_following_author").await;
    let noise = app.create_user("feed_following_noise").await;
    let reader = app.create_user("feed_following_reader").await;
    seed_posts(app, author.id, "followed", 12).await;
    seed_posts(app, noise.id, "unfollowed", 3).await;

    app.post_json(
        &format!("/v1/users/{}/follow", author.id),
        json!({}),
        Some(&reader.access_token),
    )
    .await;

    let resp = app
        .get("/v1/feed?scope=following", Some(&reader.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["total_pages"].as_i64().unwrap(), 2);
    let posts = body["posts"].as_array().unwrap().clone();
    assert_eq!(posts.len(), 10);
    for post in &posts {
        assert_eq!(
            post["author_username"].as_str().unwrap(),
            author.username,
            "following feed leaked a post from an unfollowed author"
        );
    }

    let resp = app
        .get("/v1/feed?scope=following&page=2", Some(&reader.access_token))
        .await;
    assert_eq!(resp.json()["posts"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn following_feed_requires_auth() {
    let app = app().await;

    let resp = app.get("/v1/feed?scope=following", None).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn all_feed_is_public() {
    let app = app().await;
    let author = app.create_user("feed_all_author").await;
    app.create_post_for_user(author.id, "public post").await;

    let resp = app.get("/v1/feed", None).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert!(body["posts"].as_array().unwrap().len() <= 10);
    assert!(body["total_pages"].as_i64().unwrap() >= 1);
}

#[tokio::test]
async fn unknown_feed_scope() {
    let app = app().await;

    let resp = app.get("/v1/feed?scope=trending", None).await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

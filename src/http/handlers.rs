use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::auth::AuthService;
use crate::app::bidding::{BidService, PlaceBidOutcome};
use crate::app::engagement::{EngagementService, LikeOutcome, UnlikeOutcome};
use crate::app::feed::FeedService;
use crate::app::listings::{CloseOutcome, ListingService, WatchOutcome};
use crate::app::posts::PostService;
use crate::app::social::{FollowOutcome, SocialService};
use crate::app::wiki::{SearchOutcome, WikiService};
use crate::domain::feed::{FeedPage, FeedScope};
use crate::domain::listing::{normalize_image_url, Listing, Transaction, WatchlistItem};
use crate::domain::post::{validate_content, Post};
use crate::domain::wiki::{render_markdown, WikiEntry};
use crate::http::{AppError, AuthUser};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = if state.db.ping().await.is_ok() {
        "ok"
    } else {
        "degraded"
    };

    Json(HealthResponse { status })
}

fn auth_service(state: &AppState) -> AuthService {
    AuthService::new(
        state.db.clone(),
        state.paseto_access_key,
        state.paseto_refresh_key,
        state.access_ttl_minutes,
        state.refresh_ttl_days,
    )
}

// ---------------------------------------------------------------------------
// Auth
// ---------------------------------------------------------------------------

const MAX_PASSWORD_LEN: usize = 128;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirmation: String,
}

#[derive(Serialize)]
pub struct AuthTokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(with = "time::serde::rfc3339")]
    pub access_expires_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub refresh_expires_at: OffsetDateTime,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user: crate::domain::user::User,
    #[serde(flatten)]
    pub tokens: AuthTokenResponse,
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    if payload.username.trim().is_empty() {
        return Err(AppError::bad_request("username cannot be empty"));
    }
    if payload.email.trim().is_empty() {
        return Err(AppError::bad_request("email cannot be empty"));
    }
    if payload.password != payload.confirmation {
        return Err(AppError::bad_request("passwords must match"));
    }
    if payload.password.trim().len() < 8 {
        return Err(AppError::bad_request("password must be at least 8 characters"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let service = auth_service(&state);
    let user = service
        .register(
            payload.username.trim().to_string(),
            payload.email.trim().to_string(),
            payload.password,
        )
        .await
        .map_err(|err| {
            if let Some(sqlx_err) = err.downcast_ref::<sqlx::Error>() {
                if let Some(db_err) = sqlx_err.as_database_error() {
                    if db_err.code().as_deref() == Some("23505") {
                        return AppError::conflict("username already taken");
                    }
                }
            }
            tracing::error!(error = ?err, "failed to register user");
            AppError::internal("failed to register user")
        })?;

    // The original flow logs the user straight in after registration.
    let tokens = service.issue_token_pair(user.id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %user.id, "failed to issue tokens");
        AppError::internal("failed to register user")
    })?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user,
            tokens: AuthTokenResponse {
                access_token: tokens.access_token,
                refresh_token: tokens.refresh_token,
                access_expires_at: tokens.access_expires_at,
                refresh_expires_at: tokens.refresh_expires_at,
            },
        }),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.username.trim().is_empty() || payload.password.trim().is_empty() {
        return Err(AppError::bad_request("username and password are required"));
    }
    if payload.password.len() > MAX_PASSWORD_LEN {
        return Err(AppError::bad_request("password must be at most 128 characters"));
    }

    let service = auth_service(&state);
    let tokens = service
        .login(payload.username.trim(), &payload.password)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to login");
            AppError::internal("failed to login")
        })?;

    match tokens {
        Some(tokens) => Ok(Json(AuthTokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        })),
        None => Err(AppError::unauthorized("invalid username and/or password")),
    }
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

pub async fn refresh_token(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthTokenResponse>, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let service = auth_service(&state);
    let tokens = service.refresh(&payload.refresh_token).await.map_err(|err| {
        tracing::error!(error = ?err, "failed to refresh token");
        AppError::internal("failed to refresh token")
    })?;

    match tokens {
        Some(tokens) => Ok(Json(AuthTokenResponse {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            access_expires_at: tokens.access_expires_at,
            refresh_expires_at: tokens.refresh_expires_at,
        })),
        None => Err(AppError::unauthorized("invalid refresh token")),
    }
}

#[derive(Deserialize)]
pub struct RevokeRequest {
    pub refresh_token: String,
}

pub async fn revoke_token(
    State(state): State<AppState>,
    Json(payload): Json<RevokeRequest>,
) -> Result<StatusCode, AppError> {
    if payload.refresh_token.trim().is_empty() {
        return Err(AppError::bad_request("refresh_token is required"));
    }

    let service = auth_service(&state);
    service
        .revoke_refresh_token(&payload.refresh_token)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to revoke token");
            AppError::internal("failed to revoke token")
        })?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_current_user(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<crate::domain::user::User>, AppError> {
    let service = auth_service(&state);
    let user = service.get_current_user(auth.user_id).await.map_err(|err| {
        tracing::error!(error = ?err, user_id = %auth.user_id, "failed to fetch current user");
        AppError::internal("failed to fetch current user")
    })?;

    match user {
        Some(user) => Ok(Json(user)),
        None => Err(AppError::not_found("user not found")),
    }
}

// ---------------------------------------------------------------------------
// Profiles & follow graph
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub username: String,
    pub followers_count: i64,
    pub following_count: i64,
    pub following_status: bool,
    pub posts: Vec<Post>,
    pub has_next: bool,
    pub has_previous: bool,
    pub page_number: i64,
    pub total_pages: i64,
}

pub async fn get_profile(
    Path(id): Path<Uuid>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Json<ProfileResponse>, AppError> {
    let viewer_id = auth.map(|user| user.user_id);
    let page = query.page.unwrap_or(1);

    let profile = SocialService::new(state.db.clone())
        .profile(id, viewer_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to fetch profile");
            AppError::internal("failed to fetch profile")
        })?
        .ok_or_else(|| AppError::not_found("user not found"))?;

    let feed = FeedService::new(state.db.clone())
        .get_feed(viewer_id, FeedScope::Profile(id), page)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, user_id = %id, "failed to fetch profile posts");
            AppError::internal("failed to fetch profile")
        })?;

    Ok(Json(ProfileResponse {
        id: profile.id,
        username: profile.username,
        followers_count: profile.followers_count,
        following_count: profile.following_count,
        following_status: profile.following_status,
        posts: feed.posts,
        has_next: feed.has_next,
        has_previous: feed.has_previous,
        page_number: feed.page_number,
        total_pages: feed.total_pages,
    }))
}

#[derive(Serialize)]
pub struct FollowResponse {
    pub followed: bool,
}

pub async fn follow_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<FollowResponse>, AppError> {
    let outcome = SocialService::new(state.db.clone())
        .follow(auth.user_id, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, followee_id = %id, "failed to follow user");
            AppError::internal("failed to follow user")
        })?;

    match outcome {
        FollowOutcome::Followed => Ok(Json(FollowResponse { followed: true })),
        FollowOutcome::AlreadyFollowing => Ok(Json(FollowResponse { followed: false })),
        FollowOutcome::SelfFollow => Err(AppError::bad_request("cannot follow yourself")),
        FollowOutcome::UserNotFound => Err(AppError::not_found("user not found")),
    }
}

#[derive(Serialize)]
pub struct UnfollowResponse {
    pub unfollowed: bool,
}

pub async fn unfollow_user(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UnfollowResponse>, AppError> {
    let unfollowed = SocialService::new(state.db.clone())
        .unfollow(auth.user_id, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, followee_id = %id, "failed to unfollow user");
            AppError::internal("failed to unfollow user")
        })?;

    Ok(Json(UnfollowResponse { unfollowed }))
}

// ---------------------------------------------------------------------------
// Posts & likes
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PostContentRequest {
    pub content: String,
}

pub async fn create_post(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PostContentRequest>,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let content = validate_content(&payload.content)
        .map_err(|err| AppError::bad_request(err.to_string()))?;

    let post = PostService::new(state.db.clone())
        .create_post(auth.user_id, content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create post");
            AppError::internal("failed to create post")
        })?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    Path(id): Path<Uuid>,
    auth: Option<AuthUser>,
    State(state): State<AppState>,
) -> Result<Json<Post>, AppError> {
    let viewer_id = auth.map(|user| user.user_id);
    let post = PostService::new(state.db.clone())
        .get_post(id, viewer_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to fetch post");
            AppError::internal("failed to fetch post")
        })?;

    match post {
        Some(post) => Ok(Json(post)),
        None => Err(AppError::not_found("post not found")),
    }
}

pub async fn update_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PostContentRequest>,
) -> Result<Json<Post>, AppError> {
    let content = validate_content(&payload.content)
        .map_err(|err| AppError::bad_request(err.to_string()))?;

    let post = PostService::new(state.db.clone())
        .update_content(id, auth.user_id, content)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to update post");
            AppError::internal("failed to update post")
        })?;

    match post {
        Some(post) => Ok(Json(post)),
        None => Err(AppError::not_found("post not found")),
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

pub async fn like_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let outcome = EngagementService::new(state.db.clone())
        .like(auth.user_id, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to like post");
            AppError::internal("failed to like post")
        })?;

    match outcome {
        LikeOutcome::Liked(_) => Ok(Json(MessageResponse {
            message: "post liked",
        })),
        LikeOutcome::AlreadyLiked => Err(AppError::conflict("post is already liked")),
        LikeOutcome::PostNotFound => Err(AppError::not_found("post not found")),
    }
}

pub async fn unlike_post(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MessageResponse>, AppError> {
    let outcome = EngagementService::new(state.db.clone())
        .unlike(auth.user_id, id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, post_id = %id, "failed to unlike post");
            AppError::internal("failed to unlike post")
        })?;

    match outcome {
        UnlikeOutcome::Unliked => Ok(Json(MessageResponse {
            message: "post unliked",
        })),
        UnlikeOutcome::NotLiked => Err(AppError::conflict("post is not liked")),
        UnlikeOutcome::PostNotFound => Err(AppError::not_found("post not found")),
    }
}

// ---------------------------------------------------------------------------
// Feed
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct FeedQuery {
    pub scope: Option<String>,
    pub page: Option<i64>,
}

pub async fn get_feed(
    auth: Option<AuthUser>,
    State(state): State<AppState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedPage>, AppError> {
    let viewer_id = auth.map(|user| user.user_id);
    let page = query.page.unwrap_or(1);

    let scope = match query.scope.as_deref().unwrap_or("all") {
        "all" => FeedScope::All,
        "following" => {
            let viewer_id =
                viewer_id.ok_or_else(|| AppError::unauthorized("login required"))?;
            FeedScope::Following(viewer_id)
        }
        other => {
            return Err(AppError::bad_request(format!("unknown feed scope: {}", other)));
        }
    };

    let feed = FeedService::new(state.db.clone())
        .get_feed(viewer_id, scope, page)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to assemble feed");
            AppError::internal("failed to assemble feed")
        })?;

    Ok(Json(feed))
}

// ---------------------------------------------------------------------------
// Listings
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateListingRequest {
    pub title: String,
    pub description: String,
    pub starting_bid: Decimal,
    pub image_url: Option<String>,
    pub category: Option<String>,
}

pub async fn create_listing(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<CreateListingRequest>,
) -> Result<(StatusCode, Json<Listing>), AppError> {
    if payload.title.trim().is_empty() {
        return Err(AppError::bad_request("title cannot be empty"));
    }
    if payload.description.trim().is_empty() {
        return Err(AppError::bad_request("description cannot be empty"));
    }
    if payload.starting_bid.is_sign_negative() {
        return Err(AppError::bad_request("starting bid cannot be negative"));
    }

    // Optional fields arrive as empty strings from form-like clients.
    let image_url = match payload.image_url.as_deref().map(str::trim) {
        Some("") | None => None,
        Some(raw) => Some(
            normalize_image_url(raw)
                .ok_or_else(|| AppError::bad_request("invalid image URL format"))?,
        ),
    };
    let category = payload
        .category
        .map(|category| category.trim().to_string())
        .filter(|category| !category.is_empty());

    let listing = ListingService::new(state.db.clone())
        .create_listing(
            auth.user_id,
            payload.title.trim().to_string(),
            payload.description.trim().to_string(),
            payload.starting_bid,
            image_url,
            category,
        )
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create listing");
            AppError::internal("failed to create listing")
        })?;

    Ok((StatusCode::CREATED, Json(listing)))
}

#[derive(Deserialize)]
pub struct ListingsQuery {
    pub q: Option<String>,
    pub category: Option<String>,
}

#[derive(Serialize)]
pub struct ListingsResponse {
    pub listings: Vec<Listing>,
}

pub async fn list_listings(
    State(state): State<AppState>,
    Query(query): Query<ListingsQuery>,
) -> Result<Json<ListingsResponse>, AppError> {
    let listings = ListingService::new(state.db.clone())
        .list_active(query.q.as_deref(), query.category.as_deref())
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list listings");
            AppError::internal("failed to list listings")
        })?;

    Ok(Json(ListingsResponse { listings }))
}

pub async fn get_listing(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<Listing>, AppError> {
    let listing = ListingService::new(state.db.clone())
        .get_listing(id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, listing_id = %id, "failed to fetch listing");
            AppError::internal("failed to fetch listing")
        })?;

    match listing {
        Some(listing) => Ok(Json(listing)),
        None => Err(AppError::not_found("listing not found")),
    }
}

#[derive(Serialize)]
pub struct CategoriesResponse {
    pub categories: Vec<String>,
}

pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<Json<CategoriesResponse>, AppError> {
    let categories = ListingService::new(state.db.clone())
        .categories()
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list categories");
            AppError::internal("failed to list categories")
        })?;

    Ok(Json(CategoriesResponse { categories }))
}

// ---------------------------------------------------------------------------
// Bids
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PlaceBidRequest {
    pub amount: Decimal,
}

pub async fn place_bid(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<PlaceBidRequest>,
) -> Result<(StatusCode, Json<crate::domain::bidding::Bid>), AppError> {
    let outcome = BidService::new(state.db.clone())
        .place_bid(id, auth.user_id, payload.amount)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, listing_id = %id, "failed to place bid");
            AppError::internal("failed to place bid")
        })?;

    match outcome {
        PlaceBidOutcome::Placed(bid) => Ok((StatusCode::CREATED, Json(bid))),
        PlaceBidOutcome::ListingNotFound => Err(AppError::not_found("listing not found")),
        PlaceBidOutcome::ListingClosed => Err(AppError::conflict("listing is closed")),
        PlaceBidOutcome::OwnListing => {
            Err(AppError::forbidden("cannot bid on your own listing"))
        }
        PlaceBidOutcome::Rejected(rejection) => {
            Err(AppError::bad_request(rejection.to_string()))
        }
    }
}

#[derive(Serialize)]
pub struct BidsResponse {
    pub bids: Vec<crate::domain::bidding::Bid>,
}

pub async fn list_bids(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> Result<Json<BidsResponse>, AppError> {
    let service = ListingService::new(state.db.clone());
    if service
        .get_listing(id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, listing_id = %id, "failed to fetch listing");
            AppError::internal("failed to list bids")
        })?
        .is_none()
    {
        return Err(AppError::not_found("listing not found"));
    }

    let bids = BidService::new(state.db.clone())
        .list_bids(id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, listing_id = %id, "failed to list bids");
            AppError::internal("failed to list bids")
        })?;

    Ok(Json(BidsResponse { bids }))
}

#[derive(Serialize)]
pub struct CloseListingResponse {
    pub closed: bool,
    /// Present when the listing sold; a listing closed with no bids has no
    /// transaction.
    pub transaction: Option<Transaction>,
}

pub async fn close_listing(
    Path(id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<CloseListingResponse>, AppError> {
    let outcome = ListingService::new(state.db.clone())
        .close_listing(id, auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, listing_id = %id, "failed to close listing");
            AppError::internal("failed to close listing")
        })?;

    match outcome {
        CloseOutcome::Sold(transaction) => Ok(Json(CloseListingResponse {
            closed: true,
            transaction: Some(transaction),
        })),
        CloseOutcome::Deactivated => Ok(Json(CloseListingResponse {
            closed: true,
            transaction: None,
        })),
        CloseOutcome::NotFound => Err(AppError::not_found("listing not found")),
        CloseOutcome::NotSeller => {
            Err(AppError::forbidden("only the seller can close a listing"))
        }
        CloseOutcome::AlreadyClosed => Err(AppError::conflict("listing is already closed")),
    }
}

// ---------------------------------------------------------------------------
// Watchlist & transactions
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct WatchlistResponse {
    pub items: Vec<WatchlistItem>,
}

pub async fn get_watchlist(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<WatchlistResponse>, AppError> {
    let items = ListingService::new(state.db.clone())
        .watchlist(auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to fetch watchlist");
            AppError::internal("failed to fetch watchlist")
        })?;

    Ok(Json(WatchlistResponse { items }))
}

#[derive(Deserialize)]
pub struct AddWatchRequest {
    pub listing_id: Uuid,
}

#[derive(Serialize)]
pub struct WatchResponse {
    pub watched: bool,
}

pub async fn add_watch(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(payload): Json<AddWatchRequest>,
) -> Result<Json<WatchResponse>, AppError> {
    let outcome = ListingService::new(state.db.clone())
        .watch(auth.user_id, payload.listing_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, listing_id = %payload.listing_id, "failed to watch listing");
            AppError::internal("failed to watch listing")
        })?;

    match outcome {
        WatchOutcome::Added => Ok(Json(WatchResponse { watched: true })),
        WatchOutcome::AlreadyWatching => Ok(Json(WatchResponse { watched: false })),
        WatchOutcome::ListingNotFound => Err(AppError::not_found("listing not found")),
    }
}

#[derive(Serialize)]
pub struct UnwatchResponse {
    pub removed: bool,
}

pub async fn remove_watch(
    Path(listing_id): Path<Uuid>,
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UnwatchResponse>, AppError> {
    let removed = ListingService::new(state.db.clone())
        .unwatch(auth.user_id, listing_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, listing_id = %listing_id, "failed to unwatch listing");
            AppError::internal("failed to unwatch listing")
        })?;

    Ok(Json(UnwatchResponse { removed }))
}

#[derive(Serialize)]
pub struct TransactionsResponse {
    pub transactions: Vec<Transaction>,
}

pub async fn list_sales(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let transactions = ListingService::new(state.db.clone())
        .sales(auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list sales");
            AppError::internal("failed to list sales")
        })?;

    Ok(Json(TransactionsResponse { transactions }))
}

pub async fn list_purchases(
    auth: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let transactions = ListingService::new(state.db.clone())
        .purchases(auth.user_id)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list purchases");
            AppError::internal("failed to list purchases")
        })?;

    Ok(Json(TransactionsResponse { transactions }))
}

// ---------------------------------------------------------------------------
// Wiki
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct WikiIndexResponse {
    pub entries: Vec<String>,
}

#[derive(Serialize)]
pub struct WikiEntryResponse {
    pub title: String,
    pub body: String,
    pub html: String,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<WikiEntry> for WikiEntryResponse {
    fn from(entry: WikiEntry) -> Self {
        let html = render_markdown(&entry.body);
        Self {
            title: entry.title,
            body: entry.body,
            html,
            updated_at: entry.updated_at,
        }
    }
}

pub async fn list_wiki_entries(
    State(state): State<AppState>,
) -> Result<Json<WikiIndexResponse>, AppError> {
    let entries = WikiService::new(state.db.clone())
        .list_entries()
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to list wiki entries");
            AppError::internal("failed to list wiki entries")
        })?;

    Ok(Json(WikiIndexResponse { entries }))
}

#[derive(Deserialize)]
pub struct CreateWikiEntryRequest {
    pub title: String,
    pub body: String,
}

pub async fn create_wiki_entry(
    State(state): State<AppState>,
    Json(payload): Json<CreateWikiEntryRequest>,
) -> Result<(StatusCode, Json<WikiEntryResponse>), AppError> {
    let title = payload.title.trim();
    if title.is_empty() {
        return Err(AppError::bad_request("title cannot be empty"));
    }
    if payload.body.trim().is_empty() {
        return Err(AppError::bad_request("body cannot be empty"));
    }

    let entry = WikiService::new(state.db.clone())
        .create_entry(title, &payload.body)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to create wiki entry");
            AppError::internal("failed to create wiki entry")
        })?;

    match entry {
        Some(entry) => Ok((StatusCode::CREATED, Json(entry.into()))),
        None => Err(AppError::conflict("entry with this title already exists")),
    }
}

pub async fn get_wiki_entry(
    Path(title): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<WikiEntryResponse>, AppError> {
    let entry = WikiService::new(state.db.clone())
        .get_entry(&title)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, title = %title, "failed to fetch wiki entry");
            AppError::internal("failed to fetch wiki entry")
        })?;

    match entry {
        Some(entry) => Ok(Json(entry.into())),
        None => Err(AppError::not_found("entry not found")),
    }
}

#[derive(Deserialize)]
pub struct UpdateWikiEntryRequest {
    pub body: String,
}

pub async fn update_wiki_entry(
    Path(title): Path<String>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateWikiEntryRequest>,
) -> Result<Json<WikiEntryResponse>, AppError> {
    if payload.body.trim().is_empty() {
        return Err(AppError::bad_request("body cannot be empty"));
    }

    let entry = WikiService::new(state.db.clone())
        .update_entry(&title, &payload.body)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, title = %title, "failed to update wiki entry");
            AppError::internal("failed to update wiki entry")
        })?;

    match entry {
        Some(entry) => Ok(Json(entry.into())),
        None => Err(AppError::not_found("entry not found")),
    }
}

#[derive(Deserialize)]
pub struct WikiSearchQuery {
    pub q: Option<String>,
}

#[derive(Serialize)]
pub struct WikiSearchResponse {
    /// Set on an exact title match.
    pub entry: Option<WikiEntryResponse>,
    /// Substring matches when no exact title exists.
    pub results: Vec<String>,
}

pub async fn search_wiki(
    State(state): State<AppState>,
    Query(query): Query<WikiSearchQuery>,
) -> Result<Json<WikiSearchResponse>, AppError> {
    let q = match query.q.as_deref().map(str::trim) {
        Some(q) if !q.is_empty() => q.to_string(),
        _ => return Err(AppError::bad_request("missing search query")),
    };

    let outcome = WikiService::new(state.db.clone())
        .search(&q)
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to search wiki");
            AppError::internal("failed to search wiki")
        })?;

    let response = match outcome {
        SearchOutcome::Exact(entry) => WikiSearchResponse {
            entry: Some(entry.into()),
            results: Vec::new(),
        },
        SearchOutcome::Matches(results) => WikiSearchResponse {
            entry: None,
            results,
        },
    };

    Ok(Json(response))
}

pub async fn random_wiki_entry(
    State(state): State<AppState>,
) -> Result<Json<WikiEntryResponse>, AppError> {
    let entry = WikiService::new(state.db.clone())
        .random_entry()
        .await
        .map_err(|err| {
            tracing::error!(error = ?err, "failed to pick random wiki entry");
            AppError::internal("failed to pick random wiki entry")
        })?;

    match entry {
        Some(entry) => Ok(Json(entry.into())),
        None => Err(AppError::not_found("the wiki has no entries yet")),
    }
}

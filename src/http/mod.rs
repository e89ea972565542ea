use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::AuthUser;
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::auth())
        .merge(routes::users())
        .merge(routes::posts())
        .merge(routes::feed())
        .merge(routes::listings())
        .merge(routes::watchlist())
        .merge(routes::transactions())
        .merge(routes::wiki());

    Router::new()
        .merge(routes::health())
        .nest("/v1", api)
        .with_state(state)
}

pub mod admin;
pub mod api;
pub mod assets;
pub mod auth;
pub mod dashboard;
pub mod home;
pub mod public;
pub mod share;
pub mod social;

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::messages::consume_flash;
use crate::state::AppState;

/// The full application router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.uploads.max_bytes;

    Router::new()
        .route("/", get(home::index))
        .route("/assets/{*path}", get(assets::serve))
        .merge(auth::router())
        .merge(dashboard::router())
        .merge(share::router())
        .merge(public::router())
        .merge(social::router())
        .merge(api::router())
        .merge(admin::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(consume_flash))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

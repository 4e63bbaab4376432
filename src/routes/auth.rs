use axum::routing::get;
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/auth/register",
            get(handlers::register_page).post(handlers::register),
        )
        .route("/auth/verify", get(handlers::verify_page).post(handlers::verify))
        .route("/auth/login", get(handlers::login_page).post(handlers::login))
        .route("/auth/forgot", get(handlers::forgot_page).post(handlers::forgot))
        .route("/auth/logout", get(handlers::logout).post(handlers::logout))
}

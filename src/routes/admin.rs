use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;

use crate::db::models::User;
use crate::db::{profiles, users};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, Flashes};
use crate::routes::home::{Html, Layout};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "admin/index.html")]
pub struct AdminTemplate {
    pub layout: Layout,
    pub user_count: i64,
    pub public_profiles: i64,
    pub newest_users: Vec<User>,
    pub environment: &'static str,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/admin", get(overview))
}

async fn overview(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
) -> AppResult<Response> {
    if !user.is_admin {
        tracing::warn!("Non-admin {} requested /admin", user.username);
        return Err(AppError::Forbidden);
    }

    let conn = state.db.get()?;
    Ok(Html(AdminTemplate {
        layout: Layout::for_user(&user, flashes),
        user_count: users::count(&conn)?,
        public_profiles: profiles::public_count(&conn)?,
        newest_users: users::newest(&conn, 10)?,
        environment: state.config.environment.as_str(),
    })
    .into_response())
}

use axum::extract::{Path, State};
use axum::http::{header, HeaderMap};
use axum::response::Response;
use axum::routing::post;
use axum::Router;

use crate::db::{profiles, social, users};
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::messages::{redirect_notice, redirect_with, Flash, Notice};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/follow/{user_id}", post(follow))
        .route("/unfollow/{user_id}", post(unfollow))
}

/// Where to send the user after a follow change: the referring page's path,
/// or home.
fn back_to(headers: &HeaderMap) -> String {
    let Some(referer) = headers.get(header::REFERER).and_then(|v| v.to_str().ok()) else {
        return "/".to_string();
    };
    let path = if referer.starts_with('/') {
        referer.to_string()
    } else {
        match url::Url::parse(referer) {
            Ok(url) => match url.query() {
                Some(query) => format!("{}?{}", url.path(), query),
                None => url.path().to_string(),
            },
            Err(_) => return "/".to_string(),
        }
    };
    if is_local_path(&path) {
        path
    } else {
        "/".to_string()
    }
}

/// Browsers read `//host` and `/\host` as another origin.
fn is_local_path(path: &str) -> bool {
    path.starts_with('/') && !matches!(path.as_bytes().get(1), Some(b'/' | b'\\'))
}

/// Profile name when the user has one, else the username.
fn display_name(conn: &rusqlite::Connection, user_id: i64) -> AppResult<String> {
    let user = users::find(conn, user_id)?.ok_or(AppError::NotFound)?;
    Ok(profiles::find_by_user(conn, user_id)?
        .map(|p| p.name)
        .unwrap_or(user.username))
}

async fn follow(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> AppResult<Response> {
    let back = back_to(&headers);
    let conn = state.db.get()?;
    let name = display_name(&conn, user_id)?;

    if user_id == user.id {
        return Ok(redirect_notice(&back, Notice::CannotFollowSelf));
    }
    if !social::follow(&conn, user.id, user_id)? {
        return Ok(redirect_notice(&back, Notice::AlreadyFollowing));
    }

    tracing::info!("{} now follows user {}", user.username, user_id);
    Ok(redirect_with(
        &back,
        &[Flash::success(format!("You are now following {}!", name))],
    ))
}

async fn unfollow(
    State(state): State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    Path(user_id): Path<i64>,
) -> AppResult<Response> {
    let back = back_to(&headers);
    let conn = state.db.get()?;
    let name = display_name(&conn, user_id)?;

    if !social::unfollow(&conn, user.id, user_id)? {
        return Ok(redirect_notice(&back, Notice::NotFollowing));
    }

    tracing::info!("{} unfollowed user {}", user.username, user_id);
    Ok(redirect_with(
        &back,
        &[Flash::success(format!("You have unfollowed {}.", name))],
    ))
}

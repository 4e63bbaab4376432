use askama::Template;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::db::models::Profile;
use crate::db::recommendations::{self, Listing};
use crate::db::profiles;
use crate::error::AppResult;
use crate::extractors::{CurrentUser, Flashes, MaybeUser};
use crate::messages::Flash;
use crate::state::AppState;

/// Wrapper to render askama templates as axum responses
pub struct Html<T: Template>(pub T);

impl<T: Template> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        match self.0.render() {
            Ok(body) => (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                body,
            )
                .into_response(),
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// What `base.html` needs from every page.
#[derive(Debug, Clone, Default)]
pub struct Layout {
    pub signed_in: bool,
    pub username: String,
    pub is_admin: bool,
    pub flashes: Vec<Flash>,
}

impl Layout {
    pub fn new(user: Option<&CurrentUser>, flashes: Flashes) -> Self {
        Self {
            signed_in: user.is_some(),
            username: user.map(|u| u.username.clone()).unwrap_or_default(),
            is_admin: user.map(|u| u.is_admin).unwrap_or(false),
            flashes: flashes.0,
        }
    }

    pub fn for_user(user: &CurrentUser, flashes: Flashes) -> Self {
        Self::new(Some(user), flashes)
    }

    /// Add a notice shown on this render only.
    pub fn with(mut self, flash: impl Into<Flash>) -> Self {
        self.flashes.push(flash.into());
        self
    }
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub profiles: Vec<Profile>,
    pub recent: Vec<Listing>,
    pub pro_tips: Vec<Listing>,
}

pub async fn index(
    State(state): State<AppState>,
    user: MaybeUser,
    flashes: Flashes,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let profiles = profiles::newest_public(&conn, 3)?;
    let recent = recommendations::recent_public(&conn, 8)?;
    let pro_tips = recommendations::popular_pro_tips(&conn, 4)?;

    Ok(Html(HomeTemplate {
        layout: Layout::new(user.0.as_ref(), flashes),
        profiles,
        recent,
        pro_tips,
    })
    .into_response())
}

use askama::Template;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use qrcode::render::svg;
use qrcode::QrCode;

use crate::db::models::Profile;
use crate::db::profiles;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, Flashes};
use crate::messages::{redirect_notice, Notice};
use crate::routes::home::{Html, Layout};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "dashboard/share.html")]
pub struct ShareTemplate {
    pub layout: Layout,
    pub profile: Profile,
    pub share_url: String,
    pub qr_svg: Option<String>,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/dashboard/share", get(share_page))
}

/// Base URL for links that leave the app: the configured public URL, or the
/// request's Host header.
pub fn base_url(state: &AppState, headers: &HeaderMap) -> String {
    if let Some(url) = state.config.server.public_url.as_deref() {
        return url.trim_end_matches('/').to_string();
    }
    let scheme = if state.config.is_production() {
        "https"
    } else {
        "http"
    };
    match headers.get(header::HOST).and_then(|v| v.to_str().ok()) {
        Some(host) => format!("{}://{}", scheme, host),
        None => format!("{}://localhost:{}", scheme, state.config.server.port),
    }
}

/// Render `url` as an inline SVG QR code.
pub fn qr_svg(url: &str) -> AppResult<String> {
    let code = QrCode::new(url.as_bytes()).map_err(|e| {
        tracing::error!("QR code generation failed: {}", e);
        AppError::Internal("QR code generation failed".into())
    })?;

    Ok(code
        .render::<svg::Color>()
        .min_dimensions(200, 200)
        .max_dimensions(300, 300)
        .dark_color(svg::Color("#1c1917"))
        .light_color(svg::Color("#ffffff"))
        .build())
}

async fn share_page(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
    headers: HeaderMap,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let Some(profile) = profiles::find_by_user(&conn, user.id)? else {
        return Ok(redirect_notice("/dashboard/profile", Notice::ProfileRequired));
    };

    let share_url = format!("{}/p/{}", base_url(&state, &headers), profile.slug);
    // Private profiles get the link but no code to hand out.
    let qr_svg = if profile.is_public {
        Some(qr_svg(&share_url)?)
    } else {
        None
    };

    Ok(Html(ShareTemplate {
        layout: Layout::for_user(&user, flashes),
        profile,
        share_url,
        qr_svg,
    })
    .into_response())
}

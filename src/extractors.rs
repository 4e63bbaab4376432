use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use rusqlite::params;
use std::convert::Infallible;

use crate::auth::session::{cookie_value, SESSION_COOKIE};
use crate::error::AppError;
use crate::messages::{self, Flash, FLASH_COOKIE};
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub username: String,
    pub is_admin: bool,
}

/// Extractor that requires authentication.
/// Redirects to the login page when no valid session is found.
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = cookie_value(&parts.headers, SESSION_COOKIE)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::LoginRequired)?;

        let conn = state.db.get()?;
        let user = conn.query_row(
            "SELECT u.id, u.username, u.is_admin FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token = ?1 AND s.expires_at > datetime('now')",
            params![token],
            |row| {
                Ok(CurrentUser {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    is_admin: row.get(2)?,
                })
            },
        );

        match user {
            Ok(user) => Ok(user),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(AppError::LoginRequired),
            Err(e) => Err(e.into()),
        }
    }
}

/// Optional user extractor: None instead of a redirect when not authenticated.
pub struct MaybeUser(pub Option<CurrentUser>);

impl MaybeUser {
    pub fn id(&self) -> Option<i64> {
        self.0.as_ref().map(|u| u.id)
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(AppError::LoginRequired) => Ok(MaybeUser(None)),
            Err(e) => Err(e),
        }
    }
}

/// Notices carried over from the previous request.
#[derive(Debug, Clone, Default)]
pub struct Flashes(pub Vec<Flash>);

impl<S: Send + Sync> FromRequestParts<S> for Flashes {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Flashes(
            cookie_value(&parts.headers, FLASH_COOKIE)
                .map(messages::decode)
                .unwrap_or_default(),
        ))
    }
}

//! One-shot notices shown on the next rendered page.
//!
//! Notices ride in a short-lived cookie. The `consume_flash` middleware clears
//! it once an HTML page has been rendered with them.

use axum::extract::Request;
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use url::form_urlencoded;

pub const FLASH_COOKIE: &str = "cur8tr_flash";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Info,
    Warning,
    Error,
}

impl NoticeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeKind::Success => "success",
            NoticeKind::Info => "info",
            NoticeKind::Warning => "warning",
            NoticeKind::Error => "error",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "success" => Some(NoticeKind::Success),
            "info" => Some(NoticeKind::Info),
            "warning" => Some(NoticeKind::Warning),
            "error" => Some(NoticeKind::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub kind: NoticeKind,
    pub message: String,
}

impl Flash {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, message)
    }
}

/// The fixed catalog of user-facing notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notice {
    LoginSuccess,
    LoginUserNotFound,
    LoginWrongPassword,
    LoginUnverified,
    LogoutSuccess,
    AccessDenied,
    RegisterSuccess,
    RegisterUsernameTaken,
    RegisterEmailTaken,
    VerifySuccess,
    VerifyInvalidCode,
    VerifyExpired,
    VerifyTooManyAttempts,
    ProfileUpdated,
    ProfileRequired,
    CategoryRequired,
    CategoryCreated,
    CategoryUpdated,
    CategoryDeleted,
    RecommendationAdded,
    RecommendationUpdated,
    RecommendationDeleted,
    PermissionDenied,
    AlreadyFollowing,
    NotFollowing,
    CannotFollowSelf,
    CommentAdded,
    CommentDeleted,
    CommentPermissionDenied,
    FormValidationError,
    PasswordResetSent,
    PasswordResetUnknownEmail,
}

impl Notice {
    pub fn text(&self) -> &'static str {
        match self {
            Notice::LoginSuccess => "Welcome back! You're now signed in.",
            Notice::LoginUserNotFound => {
                "We don't recognize that username. Double-check the spelling or create a new account."
            }
            Notice::LoginWrongPassword => {
                "That password doesn't match our records. Give it another try!"
            }
            Notice::LoginUnverified => {
                "Please check your email and verify your account before signing in."
            }
            Notice::LogoutSuccess => "You've been safely signed out. See you next time!",
            Notice::AccessDenied => "Please sign in to continue.",
            Notice::RegisterSuccess => {
                "Great! Check your email for a verification code to complete your account."
            }
            Notice::RegisterUsernameTaken => {
                "That username is already taken. Try something unique that represents you!"
            }
            Notice::RegisterEmailTaken => {
                "An account with this email already exists. Try signing in instead?"
            }
            Notice::VerifySuccess => {
                "Account verified! Welcome to CUR8tr - let's start building your recommendation profile."
            }
            Notice::VerifyInvalidCode => {
                "That verification code doesn't match. Check your email and try again."
            }
            Notice::VerifyExpired => "Your verification code expired. Please register again.",
            Notice::VerifyTooManyAttempts => {
                "Too many incorrect verification codes. Please register again."
            }
            Notice::ProfileUpdated => "Your profile looks great! Changes have been saved.",
            Notice::ProfileRequired => "Please create a profile first.",
            Notice::CategoryRequired => "Please create a category first.",
            Notice::CategoryCreated => {
                "New category created! Start adding recommendations to fill it out."
            }
            Notice::CategoryUpdated => "Category updated successfully!",
            Notice::CategoryDeleted => "Category removed along with all its recommendations.",
            Notice::RecommendationAdded => {
                "Recommendation added! Your followers will love this suggestion."
            }
            Notice::RecommendationUpdated => "Changes saved! Your recommendation has been updated.",
            Notice::RecommendationDeleted => "Recommendation removed from your profile.",
            Notice::PermissionDenied => "You can only edit your own content.",
            Notice::AlreadyFollowing => "You are already following this user.",
            Notice::NotFollowing => "You are not following this user.",
            Notice::CannotFollowSelf => "You can't follow yourself.",
            Notice::CommentAdded => "Comment posted! Others will see your thoughts.",
            Notice::CommentDeleted => "Comment removed.",
            Notice::CommentPermissionDenied => "You can only delete your own comments.",
            Notice::FormValidationError => "Please check the highlighted fields and try again.",
            Notice::PasswordResetSent => "Password reset instructions sent to your email.",
            Notice::PasswordResetUnknownEmail => "No account found with that email.",
        }
    }

    pub fn kind(&self) -> NoticeKind {
        match self {
            Notice::LoginSuccess
            | Notice::LogoutSuccess
            | Notice::RegisterSuccess
            | Notice::VerifySuccess
            | Notice::ProfileUpdated
            | Notice::CategoryCreated
            | Notice::CategoryUpdated
            | Notice::RecommendationAdded
            | Notice::RecommendationUpdated
            | Notice::CommentAdded => NoticeKind::Success,
            Notice::CategoryDeleted
            | Notice::RecommendationDeleted
            | Notice::AlreadyFollowing
            | Notice::NotFollowing
            | Notice::CommentDeleted
            | Notice::PasswordResetSent => NoticeKind::Info,
            Notice::LoginUnverified
            | Notice::AccessDenied
            | Notice::VerifyExpired
            | Notice::ProfileRequired
            | Notice::CategoryRequired
            | Notice::PasswordResetUnknownEmail => NoticeKind::Warning,
            Notice::LoginUserNotFound
            | Notice::LoginWrongPassword
            | Notice::RegisterUsernameTaken
            | Notice::RegisterEmailTaken
            | Notice::VerifyInvalidCode
            | Notice::VerifyTooManyAttempts
            | Notice::PermissionDenied
            | Notice::CannotFollowSelf
            | Notice::CommentPermissionDenied
            | Notice::FormValidationError => NoticeKind::Error,
        }
    }
}

impl From<Notice> for Flash {
    fn from(notice: Notice) -> Self {
        Flash::new(notice.kind(), notice.text())
    }
}

/// Encode notices as a cookie value.
pub fn encode(flashes: &[Flash]) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for flash in flashes {
        serializer.append_pair(flash.kind.as_str(), &flash.message);
    }
    serializer.finish()
}

/// Decode a cookie value; unknown kinds are dropped.
pub fn decode(value: &str) -> Vec<Flash> {
    form_urlencoded::parse(value.as_bytes())
        .filter_map(|(kind, message)| {
            NoticeKind::parse(&kind).map(|kind| Flash::new(kind, message.into_owned()))
        })
        .collect()
}

pub fn flash_cookie(flashes: &[Flash]) -> String {
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age=300",
        FLASH_COOKIE,
        encode(flashes)
    )
}

pub fn clear_flash_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", FLASH_COOKIE)
}

/// 303 redirect carrying notices for the next page.
pub fn redirect_with(location: &str, flashes: &[Flash]) -> Response {
    let mut response = (StatusCode::SEE_OTHER, [(header::LOCATION, location.to_string())])
        .into_response();
    if !flashes.is_empty() {
        if let Ok(value) = HeaderValue::from_str(&flash_cookie(flashes)) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

pub fn redirect_notice(location: &str, notice: Notice) -> Response {
    redirect_with(location, &[notice.into()])
}

/// Clears the notice cookie after a page that displayed it.
pub async fn consume_flash(request: Request, next: Next) -> Response {
    let had_flash = crate::auth::session::cookie_value(request.headers(), FLASH_COOKIE)
        .map(|v| !v.is_empty())
        .unwrap_or(false);

    let mut response = next.run(request).await;
    if !had_flash || response.status() != StatusCode::OK {
        return response;
    }

    let is_html = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("text/html"))
        .unwrap_or(false);
    let sets_flash = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .any(|v| v.starts_with(FLASH_COOKIE));

    if is_html && !sets_flash {
        if let Ok(value) = HeaderValue::from_str(&clear_flash_cookie()) {
            response.headers_mut().append(header::SET_COOKIE, value);
        }
    }
    response
}

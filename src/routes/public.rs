//! Public profile, category, and recommendation pages.

use askama::Template;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use rusqlite::Connection;
use serde::Serialize;

use crate::db::categories::{self, CategorySummary};
use crate::db::models::{Category, Comment, Profile, Recommendation};
use crate::db::recommendations::{self, Listing};
use crate::db::social::{self, CommentDeletion};
use crate::db::profiles;
use crate::error::{ApiError, ApiResult, AppError, AppResult};
use crate::extractors::{CurrentUser, Flashes, MaybeUser};
use crate::forms::{CommentForm, FieldErrors};
use crate::messages::{redirect_notice, Notice};
use crate::routes::home::{Html, Layout};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "public/profile.html")]
pub struct ProfilePageTemplate {
    pub layout: Layout,
    pub profile: Profile,
    pub summaries: Vec<CategorySummary>,
    pub follower_count: i64,
    pub is_following: bool,
    pub is_owner: bool,
}

#[derive(Template)]
#[template(path = "public/category.html")]
pub struct CategoryPageTemplate {
    pub layout: Layout,
    pub profile: Profile,
    pub category: Category,
    pub listings: Vec<Listing>,
    pub is_owner: bool,
}

#[derive(Template)]
#[template(path = "public/recommendation.html")]
pub struct RecommendationPageTemplate {
    pub layout: Layout,
    pub profile: Profile,
    pub category: Category,
    pub rec: Recommendation,
    pub comments: Vec<Comment>,
    pub like_count: i64,
    pub is_liked: bool,
    pub is_owner: bool,
    pub viewer_id: i64,
    pub comment: CommentForm,
    pub errors: FieldErrors,
}

impl RecommendationPageTemplate {
    pub fn href(&self) -> String {
        format!(
            "/p/{}/{}/{}",
            self.profile.slug, self.category.slug, self.rec.id
        )
    }

    /// Whether the viewer may delete this comment.
    pub fn can_delete(&self, comment: &Comment) -> bool {
        self.is_owner || comment.user_id == self.viewer_id
    }
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub success: bool,
    pub action: &'static str,
    pub like_count: i64,
    pub is_liked: bool,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/p/{slug}", get(profile_page))
        .route("/p/{profile}/{category}", get(category_page))
        .route(
            "/p/{profile}/{category}/{id}",
            get(recommendation_page).post(add_comment),
        )
        .route("/p/{profile}/{category}/{id}/like", post(toggle_like))
        .route(
            "/p/{profile}/{category}/{id}/comment/{comment_id}/delete",
            post(delete_comment),
        )
}

fn visible_profile(conn: &Connection, slug: &str, viewer: Option<i64>) -> AppResult<Profile> {
    profiles::find_visible_by_slug(conn, slug, viewer)?.ok_or(AppError::NotFound)
}

fn visible_category(
    conn: &Connection,
    profile_slug: &str,
    category_slug: &str,
    viewer: Option<i64>,
) -> AppResult<(Profile, Category)> {
    let profile = visible_profile(conn, profile_slug, viewer)?;
    let category =
        categories::find_by_slug(conn, profile.id, category_slug)?.ok_or(AppError::NotFound)?;
    Ok((profile, category))
}

/// Resolve a recommendation through its profile and category slugs.
fn visible_recommendation(
    conn: &Connection,
    (profile_slug, category_slug, id): &(String, String, i64),
    viewer: Option<i64>,
) -> AppResult<(Profile, Category, Recommendation)> {
    let (profile, category) = visible_category(conn, profile_slug, category_slug, viewer)?;
    let rec =
        recommendations::find_in_category(conn, *id, category.id)?.ok_or(AppError::NotFound)?;
    Ok((profile, category, rec))
}

async fn profile_page(
    State(state): State<AppState>,
    user: MaybeUser,
    flashes: Flashes,
    Path(slug): Path<String>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let profile = visible_profile(&conn, &slug, user.id())?;

    let summaries = categories::list_with_counts(&conn, profile.id)?;
    let follower_count = social::follower_count(&conn, profile.user_id)?;
    let is_following = match user.id() {
        Some(viewer) => social::is_following(&conn, viewer, profile.user_id)?,
        None => false,
    };

    Ok(Html(ProfilePageTemplate {
        layout: Layout::new(user.0.as_ref(), flashes),
        is_owner: user.id() == Some(profile.user_id),
        profile,
        summaries,
        follower_count,
        is_following,
    })
    .into_response())
}

async fn category_page(
    State(state): State<AppState>,
    user: MaybeUser,
    flashes: Flashes,
    Path((profile_slug, category_slug)): Path<(String, String)>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let (profile, category) = visible_category(&conn, &profile_slug, &category_slug, user.id())?;
    let listings = recommendations::list_for_category(&conn, category.id)?;

    Ok(Html(CategoryPageTemplate {
        layout: Layout::new(user.0.as_ref(), flashes),
        is_owner: user.id() == Some(profile.user_id),
        profile,
        category,
        listings,
    })
    .into_response())
}

fn recommendation_view(
    conn: &Connection,
    layout: Layout,
    user: &MaybeUser,
    (profile, category, rec): (Profile, Category, Recommendation),
    comment: CommentForm,
    errors: FieldErrors,
) -> AppResult<RecommendationPageTemplate> {
    let comments = social::comments_for(conn, rec.id)?;
    let like_count = social::like_count(conn, rec.id)?;
    let is_liked = match user.id() {
        Some(viewer) => social::is_liked(conn, viewer, rec.id)?,
        None => false,
    };

    Ok(RecommendationPageTemplate {
        layout,
        is_owner: user.id() == Some(profile.user_id),
        viewer_id: user.id().unwrap_or(-1),
        profile,
        category,
        rec,
        comments,
        like_count,
        is_liked,
        comment,
        errors,
    })
}

async fn recommendation_page(
    State(state): State<AppState>,
    user: MaybeUser,
    flashes: Flashes,
    Path(path): Path<(String, String, i64)>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let found = visible_recommendation(&conn, &path, user.id())?;
    let page = recommendation_view(
        &conn,
        Layout::new(user.0.as_ref(), flashes),
        &user,
        found,
        CommentForm::default(),
        FieldErrors::default(),
    )?;
    Ok(Html(page).into_response())
}

async fn add_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(path): Path<(String, String, i64)>,
    Form(form): Form<CommentForm>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let found = visible_recommendation(&conn, &path, Some(user.id))?;

    let content = match form.validate() {
        Ok(content) => content,
        Err(errors) => {
            let layout =
                Layout::for_user(&user, Flashes::default()).with(Notice::FormValidationError);
            let viewer = MaybeUser(Some(user));
            let page = recommendation_view(&conn, layout, &viewer, found, form, errors)?;
            return Ok(Html(page).into_response());
        }
    };

    let (profile, category, rec) = found;
    let tx = conn.transaction()?;
    social::add_comment(&tx, user.id, rec.id, &content)?;
    tx.commit()?;

    tracing::info!("{} commented on recommendation {}", user.username, rec.id);
    Ok(redirect_notice(
        &format!("/p/{}/{}/{}", profile.slug, category.slug, rec.id),
        Notice::CommentAdded,
    ))
}

async fn toggle_like(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(path): Path<(String, String, i64)>,
) -> ApiResult<Json<LikeResponse>> {
    let Some(user) = user.0 else {
        return Err(ApiError::AuthRequired);
    };

    let mut conn = state.db.get()?;
    let (_, _, rec) = visible_recommendation(&conn, &path, Some(user.id))?;

    let tx = conn.transaction()?;
    let action = social::toggle_like(&tx, user.id, rec.id)?;
    let like_count = social::like_count(&tx, rec.id)?;
    tx.commit()?;

    Ok(Json(LikeResponse {
        success: true,
        action: action.as_str(),
        like_count,
        is_liked: action == social::LikeAction::Liked,
    }))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((profile_slug, category_slug, id, comment_id)): Path<(String, String, i64, i64)>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let path = (profile_slug, category_slug, id);
    let (profile, category, rec) = visible_recommendation(&conn, &path, Some(user.id))?;
    let back = format!("/p/{}/{}/{}", profile.slug, category.slug, rec.id);

    let tx = conn.transaction()?;
    let outcome = social::delete_comment_as(&tx, comment_id, rec.id, user.id)?;
    tx.commit()?;

    match outcome {
        CommentDeletion::Deleted => {
            tracing::info!("Comment {} deleted by {}", comment_id, user.username);
            Ok(redirect_notice(&back, Notice::CommentDeleted))
        }
        CommentDeletion::Forbidden => {
            tracing::warn!(
                "{} tried to delete comment {} without permission",
                user.username,
                comment_id
            );
            Ok(redirect_notice(&back, Notice::CommentPermissionDenied))
        }
        CommentDeletion::NotFound => Err(AppError::NotFound),
    }
}

use askama::Template;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Router};
use rusqlite::Connection;
use serde::Deserialize;

use crate::db::categories::{self, CategorySummary};
use crate::db::models::{Category, CostTier, Profile, Recommendation};
use crate::db::recommendations::{self, Listing, RecommendationInput};
use crate::db::social::{self, ActivityStats};
use crate::db::profiles;
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, Flashes};
use crate::forms::{
    CategoryForm, FieldErrors, MultipartForm, ProfileForm, RecommendationForm, RATING_CHOICES,
};
use crate::images::{self, UploadError};
use crate::messages::{redirect_notice, redirect_with, Flash, Notice};
use crate::routes::home::{Html, Layout};
use crate::state::AppState;
use crate::welcome::{welcome_message, WelcomeMessage};

#[derive(Template)]
#[template(path = "dashboard/index.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub profile: Option<Profile>,
    pub stats: ActivityStats,
    pub welcome: WelcomeMessage,
    pub recent: Vec<Listing>,
}

#[derive(Template)]
#[template(path = "dashboard/profile.html")]
pub struct ProfileTemplate {
    pub layout: Layout,
    pub form: ProfileForm,
    pub errors: FieldErrors,
    pub profile: Option<Profile>,
}

#[derive(Template)]
#[template(path = "dashboard/categories.html")]
pub struct CategoriesTemplate {
    pub layout: Layout,
    pub profile: Profile,
    pub summaries: Vec<CategorySummary>,
}

#[derive(Template)]
#[template(path = "dashboard/category_form.html")]
pub struct CategoryFormTemplate {
    pub layout: Layout,
    pub form: CategoryForm,
    pub errors: FieldErrors,
    pub editing: Option<Category>,
    pub action: String,
}

#[derive(Template)]
#[template(path = "dashboard/recommendations.html")]
pub struct RecommendationsTemplate {
    pub layout: Layout,
    pub listings: Vec<Listing>,
}

#[derive(Template)]
#[template(path = "dashboard/recommendation_form.html")]
pub struct RecommendationFormTemplate {
    pub layout: Layout,
    pub form: RecommendationForm,
    pub errors: FieldErrors,
    pub categories: Vec<Category>,
    pub editing: Option<Recommendation>,
    pub action: String,
    pub ratings: &'static [(u8, &'static str)],
    pub cost_tiers: [CostTier; 4],
}

#[derive(Deserialize)]
pub struct NewRecommendationQuery {
    category_id: Option<i64>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(index))
        .route("/dashboard/profile", get(profile_page).post(save_profile))
        .route("/dashboard/categories", get(category_list))
        .route(
            "/dashboard/categories/new",
            get(new_category_page).post(create_category),
        )
        .route(
            "/dashboard/categories/{id}/edit",
            get(edit_category_page).post(update_category),
        )
        .route("/dashboard/categories/{id}/delete", post(delete_category))
        .route("/dashboard/recommendations", get(recommendation_list))
        .route(
            "/dashboard/recommendations/new",
            get(new_recommendation_page).post(create_recommendation),
        )
        .route(
            "/dashboard/recommendations/{id}/edit",
            get(edit_recommendation_page).post(update_recommendation),
        )
        .route(
            "/dashboard/recommendations/{id}/delete",
            post(delete_recommendation),
        )
}

fn profile_required() -> Response {
    redirect_notice("/dashboard/profile", Notice::ProfileRequired)
}

fn own_profile(conn: &Connection, user: &CurrentUser) -> AppResult<Option<Profile>> {
    Ok(profiles::find_by_user(conn, user.id)?)
}

/// Read an optional image upload into a data URL.
fn uploaded_image(data: &MultipartForm, field: &str) -> Result<Option<String>, UploadError> {
    match data.file(field) {
        Some(upload) => images::upload_to_data_url(&upload.filename, &upload.bytes),
        None => Ok(None),
    }
}

// -- Overview --

async fn index(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let profile = own_profile(&conn, &user)?;

    let (stats, recent) = match &profile {
        Some(p) => (
            Some(social::activity_stats(&conn, user.id, p.id)?),
            recommendations::recent_for_profile(&conn, p.id, 5)?,
        ),
        None => (None, Vec::new()),
    };
    let welcome = welcome_message(
        &user.username,
        stats.as_ref(),
        chrono::Local::now().naive_local(),
    );

    Ok(Html(DashboardTemplate {
        layout: Layout::for_user(&user, flashes),
        profile,
        stats: stats.unwrap_or_default(),
        welcome,
        recent,
    })
    .into_response())
}

// -- Profile --

async fn profile_page(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let profile = own_profile(&conn, &user)?;
    let form = match &profile {
        Some(p) => ProfileForm::from_profile(p),
        None => ProfileForm::new_profile(),
    };

    Ok(Html(ProfileTemplate {
        layout: Layout::for_user(&user, flashes),
        form,
        errors: FieldErrors::default(),
        profile,
    })
    .into_response())
}

async fn save_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let data = MultipartForm::read(multipart).await?;
    let form = ProfileForm::from_multipart(&data);

    let (input, mut errors) = match form.validate() {
        Ok(input) => (Some(input), FieldErrors::default()),
        Err(errors) => (None, errors),
    };
    let image = uploaded_image(&data, "profile_image").unwrap_or_else(|e| {
        errors.add("profile_image", e.to_string());
        None
    });

    let mut conn = state.db.get()?;
    let existing = own_profile(&conn, &user)?;

    let input = match input {
        Some(input) if errors.is_empty() => input,
        _ => {
            return Ok(Html(ProfileTemplate {
                layout: Layout::for_user(&user, Flashes::default())
                    .with(Notice::FormValidationError),
                form,
                errors,
                profile: existing,
            })
            .into_response());
        }
    };

    let tx = conn.transaction()?;
    match &existing {
        Some(profile) => profiles::update(&tx, profile.id, &input, image.as_deref())?,
        None => {
            profiles::create(&tx, user.id, &input, image.as_deref())?;
        }
    }
    tx.commit()?;

    tracing::info!("Profile saved for {}", user.username);
    Ok(redirect_notice("/dashboard", Notice::ProfileUpdated))
}

// -- Categories --

async fn category_list(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let Some(profile) = own_profile(&conn, &user)? else {
        return Ok(profile_required());
    };

    let tx = conn.transaction()?;
    let added = categories::ensure_defaults(&tx, profile.id)?;
    tx.commit()?;

    let mut layout = Layout::for_user(&user, flashes);
    if added > 0 {
        tracing::info!("Added {} default categories for profile {}", added, profile.id);
        layout = layout.with(Flash::success(format!(
            "Added {} default categories to your profile!",
            added
        )));
    }

    let summaries = categories::list_with_counts(&conn, profile.id)?;
    Ok(Html(CategoriesTemplate {
        layout,
        profile,
        summaries,
    })
    .into_response())
}

async fn new_category_page(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    if own_profile(&conn, &user)?.is_none() {
        return Ok(profile_required());
    }

    Ok(Html(CategoryFormTemplate {
        layout: Layout::for_user(&user, flashes),
        form: CategoryForm::default(),
        errors: FieldErrors::default(),
        editing: None,
        action: "/dashboard/categories/new".to_string(),
    })
    .into_response())
}

async fn create_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let Some(profile) = own_profile(&conn, &user)? else {
        return Ok(profile_required());
    };

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            return Ok(Html(CategoryFormTemplate {
                layout: Layout::for_user(&user, Flashes::default())
                    .with(Notice::FormValidationError),
                form,
                errors,
                editing: None,
                action: "/dashboard/categories/new".to_string(),
            })
            .into_response());
        }
    };

    let tx = conn.transaction()?;
    let id = categories::create(&tx, profile.id, &input.name, input.description.as_deref())?;
    tx.commit()?;

    tracing::info!("Category {} created for profile {}", id, profile.id);
    Ok(redirect_notice("/dashboard/categories", Notice::CategoryCreated))
}

async fn edit_category_page(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let Some(profile) = own_profile(&conn, &user)? else {
        return Ok(profile_required());
    };
    let category = categories::find_owned(&conn, id, profile.id)?.ok_or(AppError::NotFound)?;

    Ok(Html(CategoryFormTemplate {
        layout: Layout::for_user(&user, flashes),
        form: CategoryForm {
            name: category.name.clone(),
            description: category.description.clone().unwrap_or_default(),
        },
        errors: FieldErrors::default(),
        action: format!("/dashboard/categories/{}/edit", category.id),
        editing: Some(category),
    })
    .into_response())
}

async fn update_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Form(form): Form<CategoryForm>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let Some(profile) = own_profile(&conn, &user)? else {
        return Ok(profile_required());
    };
    let category = categories::find_owned(&conn, id, profile.id)?.ok_or(AppError::NotFound)?;

    let input = match form.validate() {
        Ok(input) => input,
        Err(errors) => {
            return Ok(Html(CategoryFormTemplate {
                layout: Layout::for_user(&user, Flashes::default())
                    .with(Notice::FormValidationError),
                form,
                errors,
                action: format!("/dashboard/categories/{}/edit", category.id),
                editing: Some(category),
            })
            .into_response());
        }
    };

    let tx = conn.transaction()?;
    categories::update(&tx, &category, &input.name, input.description.as_deref())?;
    tx.commit()?;

    Ok(redirect_notice("/dashboard/categories", Notice::CategoryUpdated))
}

async fn delete_category(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let Some(profile) = own_profile(&conn, &user)? else {
        return Ok(profile_required());
    };
    let category = categories::find_owned(&conn, id, profile.id)?.ok_or(AppError::NotFound)?;

    let tx = conn.transaction()?;
    categories::delete(&tx, category.id)?;
    tx.commit()?;

    tracing::info!("Category {} ({}) deleted", category.slug, category.id);
    Ok(redirect_notice("/dashboard/categories", Notice::CategoryDeleted))
}

// -- Recommendations --

fn recommendation_form_page(
    layout: Layout,
    form: RecommendationForm,
    errors: FieldErrors,
    categories: Vec<Category>,
    editing: Option<Recommendation>,
) -> Response {
    let action = match &editing {
        Some(rec) => format!("/dashboard/recommendations/{}/edit", rec.id),
        None => "/dashboard/recommendations/new".to_string(),
    };
    Html(RecommendationFormTemplate {
        layout,
        form,
        errors,
        categories,
        editing,
        action,
        ratings: RATING_CHOICES,
        cost_tiers: CostTier::ALL,
    })
    .into_response()
}

/// Validate a submitted recommendation against the user's own categories.
fn check_recommendation(
    conn: &Connection,
    form: &RecommendationForm,
    data: &MultipartForm,
    profile_id: i64,
) -> AppResult<Result<(RecommendationInput, Option<String>), FieldErrors>> {
    let (input, mut errors) = match form.validate() {
        Ok(input) => (Some(input), FieldErrors::default()),
        Err(errors) => (None, errors),
    };
    if let Some(input) = &input {
        if categories::find_owned(conn, input.category_id, profile_id)?.is_none() {
            errors.add("category_id", "Not a valid choice.");
        }
    }
    let image = uploaded_image(data, "image").unwrap_or_else(|e| {
        errors.add("image", e.to_string());
        None
    });

    Ok(match input {
        Some(input) if errors.is_empty() => Ok((input, image)),
        _ => Err(errors),
    })
}

async fn recommendation_list(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let Some(profile) = own_profile(&conn, &user)? else {
        return Ok(profile_required());
    };
    let listings = recommendations::list_for_profile(&conn, profile.id)?;

    Ok(Html(RecommendationsTemplate {
        layout: Layout::for_user(&user, flashes),
        listings,
    })
    .into_response())
}

async fn new_recommendation_page(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
    Query(query): Query<NewRecommendationQuery>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let Some(profile) = own_profile(&conn, &user)? else {
        return Ok(profile_required());
    };
    let categories = categories::list(&conn, profile.id)?;
    if categories.is_empty() {
        return Ok(redirect_notice(
            "/dashboard/categories/new",
            Notice::CategoryRequired,
        ));
    }

    Ok(recommendation_form_page(
        Layout::for_user(&user, flashes),
        RecommendationForm::new_recommendation(query.category_id),
        FieldErrors::default(),
        categories,
        None,
    ))
}

async fn create_recommendation(
    State(state): State<AppState>,
    user: CurrentUser,
    multipart: Multipart,
) -> AppResult<Response> {
    let data = MultipartForm::read(multipart).await?;
    let form = RecommendationForm::from_multipart(&data);

    let mut conn = state.db.get()?;
    let Some(profile) = own_profile(&conn, &user)? else {
        return Ok(profile_required());
    };
    let categories = categories::list(&conn, profile.id)?;
    if categories.is_empty() {
        return Ok(redirect_notice(
            "/dashboard/categories/new",
            Notice::CategoryRequired,
        ));
    }

    let (input, image) = match check_recommendation(&conn, &form, &data, profile.id)? {
        Ok(checked) => checked,
        Err(errors) => {
            return Ok(recommendation_form_page(
                Layout::for_user(&user, Flashes::default()).with(Notice::FormValidationError),
                form,
                errors,
                categories,
                None,
            ));
        }
    };

    let tx = conn.transaction()?;
    let id = recommendations::create(&tx, &input, image.as_deref())?;
    tx.commit()?;

    tracing::info!("Recommendation {} added by {}", id, user.username);
    Ok(redirect_notice(
        "/dashboard/recommendations",
        Notice::RecommendationAdded,
    ))
}

async fn edit_recommendation_page(
    State(state): State<AppState>,
    user: CurrentUser,
    flashes: Flashes,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let Some(profile) = own_profile(&conn, &user)? else {
        return Ok(profile_required());
    };
    let rec = recommendations::find_owned(&conn, id, profile.id)?.ok_or(AppError::NotFound)?;
    let categories = categories::list(&conn, profile.id)?;

    Ok(recommendation_form_page(
        Layout::for_user(&user, flashes),
        RecommendationForm::from_recommendation(&rec),
        FieldErrors::default(),
        categories,
        Some(rec),
    ))
}

async fn update_recommendation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Response> {
    let data = MultipartForm::read(multipart).await?;
    let form = RecommendationForm::from_multipart(&data);

    let mut conn = state.db.get()?;
    let Some(profile) = own_profile(&conn, &user)? else {
        return Ok(profile_required());
    };
    let rec = recommendations::find_owned(&conn, id, profile.id)?.ok_or(AppError::NotFound)?;

    let (input, image) = match check_recommendation(&conn, &form, &data, profile.id)? {
        Ok(checked) => checked,
        Err(errors) => {
            let categories = categories::list(&conn, profile.id)?;
            return Ok(recommendation_form_page(
                Layout::for_user(&user, Flashes::default()).with(Notice::FormValidationError),
                form,
                errors,
                categories,
                Some(rec),
            ));
        }
    };

    let tx = conn.transaction()?;
    recommendations::update(&tx, rec.id, &input, image.as_deref())?;
    tx.commit()?;

    Ok(redirect_notice(
        "/dashboard/recommendations",
        Notice::RecommendationUpdated,
    ))
}

async fn delete_recommendation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let mut conn = state.db.get()?;
    let Some(profile) = own_profile(&conn, &user)? else {
        return Ok(profile_required());
    };
    let rec = recommendations::find_owned(&conn, id, profile.id)?.ok_or(AppError::NotFound)?;

    let tx = conn.transaction()?;
    recommendations::delete(&tx, rec.id)?;
    tx.commit()?;

    tracing::info!("Recommendation {} deleted by {}", rec.id, user.username);
    Ok(redirect_with(
        "/dashboard/recommendations",
        &[Notice::RecommendationDeleted.into()],
    ))
}

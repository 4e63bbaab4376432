//! JSON tag API.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::db::models::CostTier;
use crate::db::recommendations::{self, Listing};
use crate::error::{ApiError, ApiResult};
use crate::extractors::MaybeUser;
use crate::state::AppState;
use crate::tags::{self, TagKind, Tags, DEFAULT_CATEGORY_TAGS};

/// Most recommendations returned by a tag search.
const SEARCH_LIMIT: i64 = 50;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tags", get(all_tags))
        .route("/api/tags/categories", get(category_tags))
        .route("/api/tags/collections", get(collection_tags))
        .route("/api/recommendations", get(search))
        .route(
            "/api/recommendations/{id}/tags",
            post(add_tag).delete(remove_tag).put(replace_tags),
        )
}

#[derive(Debug, Serialize)]
pub struct TagEntry {
    pub id: String,
    pub name: String,
    pub kind: &'static str,
}

impl TagEntry {
    fn new(slug: String, kind: TagKind) -> Self {
        Self {
            name: tags::display_name(&slug),
            id: slug,
            kind: kind.as_str(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TagLists {
    pub categories: Vec<String>,
    pub collections: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct Summary {
    pub id: i64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Serialize)]
pub struct ApiRecommendation {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub url: Option<String>,
    pub image: Option<String>,
    pub rating: u8,
    pub cost_rating: CostTier,
    pub location: Option<String>,
    pub tags: Vec<String>,
    pub created_at: String,
    pub category: Summary,
    pub profile: Summary,
}

impl From<Listing> for ApiRecommendation {
    fn from(listing: Listing) -> Self {
        let rec = listing.rec;
        Self {
            id: rec.id,
            tags: rec.tags.all(),
            title: rec.title,
            description: rec.description,
            url: rec.url,
            image: rec.image,
            rating: rec.rating,
            cost_rating: rec.cost_rating,
            location: rec.location,
            created_at: rec.created_at,
            category: Summary {
                id: rec.category_id,
                name: listing.category_name,
                slug: listing.category_slug,
            },
            profile: Summary {
                id: listing.profile_id,
                name: listing.profile_name,
                slug: listing.profile_slug,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TagUpdate {
    pub id: i64,
    pub tags: Vec<String>,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub tag: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReplaceTagsRequest {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub collections: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub tags: String,
}

/// GET /api/tags
async fn all_tags(State(state): State<AppState>, user: MaybeUser) -> ApiResult<Json<TagLists>> {
    let conn = state.db.get()?;
    let visible = recommendations::visible_tags(&conn, user.id())?;
    Ok(Json(TagLists {
        categories: visible.categories,
        collections: visible.collections,
    }))
}

/// GET /api/tags/categories: the defaults plus every category tag in use.
async fn category_tags(
    State(state): State<AppState>,
    user: MaybeUser,
) -> ApiResult<Json<serde_json::Value>> {
    let conn = state.db.get()?;
    let mut slugs = recommendations::visible_tags(&conn, user.id())?.categories;
    slugs.extend(DEFAULT_CATEGORY_TAGS.iter().map(|s| s.to_string()));
    slugs.sort();
    slugs.dedup();

    let categories: Vec<TagEntry> = slugs
        .into_iter()
        .map(|slug| TagEntry::new(slug, TagKind::Category))
        .collect();
    Ok(Json(serde_json::json!({ "categories": categories })))
}

/// GET /api/tags/collections: the signed-in user's collection tags.
async fn collection_tags(
    State(state): State<AppState>,
    user: MaybeUser,
) -> ApiResult<Json<serde_json::Value>> {
    let user_id = user.id().ok_or(ApiError::AuthRequired)?;
    let conn = state.db.get()?;
    let collections: Vec<TagEntry> = recommendations::own_collections(&conn, user_id)?
        .into_iter()
        .map(|slug| TagEntry::new(slug, TagKind::Collection))
        .collect();
    Ok(Json(serde_json::json!({ "collections": collections })))
}

/// GET /api/recommendations?tags=a,b
async fn search(
    State(state): State<AppState>,
    user: MaybeUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<ApiRecommendation>>> {
    let filter = tags::parse_filter(&query.tags);
    let conn = state.db.get()?;
    let listings = recommendations::search_by_tags(&conn, &filter, user.id(), SEARCH_LIMIT)?;
    Ok(Json(listings.into_iter().map(ApiRecommendation::from).collect()))
}

/// Load a recommendation's tags for editing by its owner.
fn owned_tags(conn: &rusqlite::Connection, id: i64, user: &MaybeUser) -> ApiResult<Tags> {
    let user_id = user.id().ok_or(ApiError::AuthRequired)?;
    let rec =
        recommendations::find(conn, id)?.ok_or(ApiError::NotFound("Recommendation not found"))?;
    if recommendations::owner_user_id(conn, id)? != Some(user_id) {
        return Err(ApiError::Forbidden("You can only edit your own recommendations"));
    }
    Ok(rec.tags)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>, missing: &str) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|_| ApiError::BadRequest(missing.to_string()))
}

fn parse_kind(kind: Option<&str>) -> ApiResult<Option<TagKind>> {
    kind.map(|k| k.parse::<TagKind>().map_err(ApiError::BadRequest))
        .transpose()
}

/// POST /api/recommendations/{id}/tags
async fn add_tag(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<i64>,
    payload: Result<Json<TagRequest>, JsonRejection>,
) -> ApiResult<Json<TagUpdate>> {
    let conn = state.db.get()?;
    let mut tags = owned_tags(&conn, id, &user)?;

    let request = body(payload, "Tag name required")?;
    let name = request
        .tag
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| ApiError::BadRequest("Tag name required".into()))?;
    if name.is_empty() {
        return Err(ApiError::BadRequest("Tag name cannot be empty".into()));
    }
    let kind = parse_kind(request.kind.as_deref())?.unwrap_or(TagKind::Collection);

    tags.add(name, kind);
    recommendations::save_tags(&conn, id, &tags)?;
    tracing::debug!("Tag {} added to recommendation {}", name, id);

    Ok(Json(TagUpdate {
        id,
        tags: tags.all(),
        message: format!("Tag \"{}\" added successfully", name),
    }))
}

/// DELETE /api/recommendations/{id}/tags
async fn remove_tag(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<i64>,
    payload: Result<Json<TagRequest>, JsonRejection>,
) -> ApiResult<Json<TagUpdate>> {
    let conn = state.db.get()?;
    let mut tags = owned_tags(&conn, id, &user)?;

    let request = body(payload, "Tag name required")?;
    let name = request
        .tag
        .as_deref()
        .map(str::trim)
        .ok_or_else(|| ApiError::BadRequest("Tag name required".into()))?;
    let kind = parse_kind(request.kind.as_deref())?;

    tags.remove(name, kind);
    recommendations::save_tags(&conn, id, &tags)?;

    Ok(Json(TagUpdate {
        id,
        tags: tags.all(),
        message: format!("Tag \"{}\" removed successfully", name),
    }))
}

/// PUT /api/recommendations/{id}/tags: replace both lists.
async fn replace_tags(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(id): Path<i64>,
    payload: Result<Json<ReplaceTagsRequest>, JsonRejection>,
) -> ApiResult<Json<TagUpdate>> {
    let conn = state.db.get()?;
    owned_tags(&conn, id, &user)?;

    let request = body(payload, "JSON data required")?;
    let tags = Tags::from_lists(&request.categories, &request.collections);
    recommendations::save_tags(&conn, id, &tags)?;

    Ok(Json(TagUpdate {
        id,
        tags: tags.all(),
        message: "Tags updated successfully".to_string(),
    }))
}

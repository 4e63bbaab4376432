use rusqlite::{params, Connection, OptionalExtension};

use super::categories;
use super::models::Profile;
use crate::tags::slugify_capped;
use crate::text::first_free_slug;

pub const MAX_SLUG_LEN: usize = 100;

/// Editable profile fields, already validated.
#[derive(Debug, Clone, Default)]
pub struct ProfileInput {
    pub name: String,
    pub bio: Option<String>,
    pub is_public: bool,
    pub instagram_handle: Option<String>,
    pub tiktok_handle: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
}

pub fn find_by_user(conn: &Connection, user_id: i64) -> rusqlite::Result<Option<Profile>> {
    conn.query_row(
        &format!("SELECT {} FROM profiles WHERE user_id = ?1", Profile::COLUMNS),
        params![user_id],
        Profile::from_row,
    )
    .optional()
}

pub fn find_by_slug(conn: &Connection, slug: &str) -> rusqlite::Result<Option<Profile>> {
    conn.query_row(
        &format!("SELECT {} FROM profiles WHERE slug = ?1", Profile::COLUMNS),
        params![slug],
        Profile::from_row,
    )
    .optional()
}

/// A profile by slug, visible to everyone when public and to its owner always.
pub fn find_visible_by_slug(
    conn: &Connection,
    slug: &str,
    viewer_id: Option<i64>,
) -> rusqlite::Result<Option<Profile>> {
    Ok(find_by_slug(conn, slug)?.filter(|p| p.is_public || Some(p.user_id) == viewer_id))
}

/// Globally unique slug derived from a profile name.
pub fn unique_slug(conn: &Connection, name: &str) -> rusqlite::Result<String> {
    let mut base = slugify_capped(name, MAX_SLUG_LEN - 8);
    if base.is_empty() {
        base = "profile".to_string();
    }
    first_free_slug(&base, |candidate| {
        conn.query_row(
            "SELECT COUNT(*) > 0 FROM profiles WHERE slug = ?1",
            params![candidate],
            |row| row.get(0),
        )
    })
}

/// Create a profile and its default categories. Returns the new profile id.
pub fn create(
    conn: &Connection,
    user_id: i64,
    input: &ProfileInput,
    image: Option<&str>,
) -> rusqlite::Result<i64> {
    let slug = unique_slug(conn, &input.name)?;
    conn.execute(
        "INSERT INTO profiles (user_id, name, bio, slug, is_public, profile_image, \
         instagram_handle, tiktok_handle, country, city) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            user_id,
            input.name,
            input.bio,
            slug,
            input.is_public,
            image,
            input.instagram_handle,
            input.tiktok_handle,
            input.country,
            input.city,
        ],
    )?;
    let profile_id = conn.last_insert_rowid();
    let added = categories::ensure_defaults(conn, profile_id)?;
    tracing::info!(
        "Created profile {} ({}) with {} default categories",
        slug,
        profile_id,
        added
    );
    Ok(profile_id)
}

/// Update a profile in place. The slug is kept; the image only changes when a
/// new one was uploaded.
pub fn update(
    conn: &Connection,
    profile_id: i64,
    input: &ProfileInput,
    image: Option<&str>,
) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE profiles SET name = ?2, bio = ?3, is_public = ?4, \
         profile_image = COALESCE(?5, profile_image), instagram_handle = ?6, \
         tiktok_handle = ?7, country = ?8, city = ?9, updated_at = datetime('now') \
         WHERE id = ?1",
        params![
            profile_id,
            input.name,
            input.bio,
            input.is_public,
            image,
            input.instagram_handle,
            input.tiktok_handle,
            input.country,
            input.city,
        ],
    )?;
    Ok(())
}

pub fn newest_public(conn: &Connection, limit: i64) -> rusqlite::Result<Vec<Profile>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM profiles WHERE is_public = 1 ORDER BY created_at DESC, id DESC LIMIT ?1",
        Profile::COLUMNS
    ))?;
    let rows = stmt.query_map(params![limit], Profile::from_row)?;
    rows.collect()
}

pub fn public_count(conn: &Connection) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM profiles WHERE is_public = 1",
        [],
        |row| row.get(0),
    )
}

#[cfg(test)]
pub(crate) fn insert_for(conn: &Connection, user_id: i64, name: &str) -> Profile {
    let input = ProfileInput {
        name: name.to_string(),
        is_public: true,
        ..Default::default()
    };
    create(conn, user_id, &input, None).unwrap();
    find_by_user(conn, user_id).unwrap().unwrap()
}

use rusqlite::{params, Connection, OptionalExtension, Params};

use super::models::Category;
use crate::tags::slugify_capped;
use crate::text::first_free_slug;

pub const MAX_SLUG_LEN: usize = 100;

/// Categories every profile starts with.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("Books", "Your favorite books and reading recommendations"),
    ("YouTube Channels", "Amazing YouTube channels worth following"),
    ("Food", "Restaurants, recipes, and food recommendations"),
    ("Where To Stay", "Hotels, accommodations, and travel spots"),
    ("Apps", "Useful apps and digital tools"),
    ("Products", "Products and services you love"),
];

/// A category with the number of recommendations in it.
#[derive(Debug, Clone)]
pub struct CategorySummary {
    pub category: Category,
    pub recommendation_count: i64,
}

fn select_one(
    conn: &Connection,
    filter: &str,
    args: impl Params,
) -> rusqlite::Result<Option<Category>> {
    conn.query_row(
        &format!("SELECT {} FROM categories WHERE {}", Category::COLUMNS, filter),
        args,
        Category::from_row,
    )
    .optional()
}

pub fn find(conn: &Connection, id: i64) -> rusqlite::Result<Option<Category>> {
    select_one(conn, "id = ?1", params![id])
}

/// A category only if it belongs to `profile_id`.
pub fn find_owned(
    conn: &Connection,
    id: i64,
    profile_id: i64,
) -> rusqlite::Result<Option<Category>> {
    select_one(conn, "id = ?1 AND profile_id = ?2", params![id, profile_id])
}

pub fn find_by_slug(
    conn: &Connection,
    profile_id: i64,
    slug: &str,
) -> rusqlite::Result<Option<Category>> {
    select_one(conn, "profile_id = ?1 AND slug = ?2", params![profile_id, slug])
}

/// All categories of a profile, by name.
pub fn list(conn: &Connection, profile_id: i64) -> rusqlite::Result<Vec<Category>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM categories WHERE profile_id = ?1 ORDER BY name",
        Category::COLUMNS
    ))?;
    let rows = stmt.query_map(params![profile_id], Category::from_row)?;
    rows.collect()
}

pub fn list_with_counts(
    conn: &Connection,
    profile_id: i64,
) -> rusqlite::Result<Vec<CategorySummary>> {
    let mut stmt = conn.prepare(
        "SELECT c.id, c.profile_id, c.name, c.description, c.slug, c.created_at, \
         (SELECT COUNT(*) FROM recommendations r WHERE r.category_id = c.id) \
         FROM categories c WHERE c.profile_id = ?1 ORDER BY c.name",
    )?;
    let rows = stmt.query_map(params![profile_id], |row| {
        Ok(CategorySummary {
            category: Category::from_row(row)?,
            recommendation_count: row.get(6)?,
        })
    })?;
    rows.collect()
}

pub fn count(conn: &Connection, profile_id: i64) -> rusqlite::Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM categories WHERE profile_id = ?1",
        params![profile_id],
        |row| row.get(0),
    )
}

/// Slug unique within the profile, ignoring `exclude_id` (the category being renamed).
pub fn unique_slug(
    conn: &Connection,
    profile_id: i64,
    name: &str,
    exclude_id: Option<i64>,
) -> rusqlite::Result<String> {
    let mut base = slugify_capped(name, MAX_SLUG_LEN - 8);
    if base.is_empty() {
        base = "category".to_string();
    }
    first_free_slug(&base, |candidate| {
        conn.query_row(
            "SELECT COUNT(*) > 0 FROM categories \
             WHERE profile_id = ?1 AND slug = ?2 AND id != ?3",
            params![profile_id, candidate, exclude_id.unwrap_or(-1)],
            |row| row.get(0),
        )
    })
}

pub fn create(
    conn: &Connection,
    profile_id: i64,
    name: &str,
    description: Option<&str>,
) -> rusqlite::Result<i64> {
    let slug = unique_slug(conn, profile_id, name, None)?;
    conn.execute(
        "INSERT INTO categories (profile_id, name, description, slug) VALUES (?1, ?2, ?3, ?4)",
        params![profile_id, name, description, slug],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Rename or re-describe a category; the slug is re-derived only when the name changes.
pub fn update(
    conn: &Connection,
    category: &Category,
    name: &str,
    description: Option<&str>,
) -> rusqlite::Result<()> {
    let slug = if category.name != name {
        unique_slug(conn, category.profile_id, name, Some(category.id))?
    } else {
        category.slug.clone()
    };
    conn.execute(
        "UPDATE categories SET name = ?2, description = ?3, slug = ?4, \
         updated_at = datetime('now') WHERE id = ?1",
        params![category.id, name, description, slug],
    )?;
    Ok(())
}

/// Delete a category; its recommendations go with it.
pub fn delete(conn: &Connection, id: i64) -> rusqlite::Result<bool> {
    Ok(conn.execute("DELETE FROM categories WHERE id = ?1", params![id])? > 0)
}

/// Create whichever default categories (matched by name) the profile lacks.
/// Returns how many were added.
pub fn ensure_defaults(conn: &Connection, profile_id: i64) -> rusqlite::Result<usize> {
    let existing: Vec<String> = list(conn, profile_id)?
        .into_iter()
        .map(|c| c.name)
        .collect();

    let mut added = 0;
    for (name, description) in DEFAULT_CATEGORIES {
        if !existing.iter().any(|n| n == name) {
            create(conn, profile_id, name, Some(description))?;
            added += 1;
        }
    }
    Ok(added)
}

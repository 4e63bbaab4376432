use chrono::NaiveDateTime;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::Row;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::images;
use crate::tags::Tags;
use crate::text;

/// Timestamp format SQLite's `datetime('now')` produces.
const SQLITE_TIMESTAMP: &str = "%Y-%m-%d %H:%M:%S";

/// Human date for a stored timestamp, e.g. `March 04, 2025`.
pub fn display_date(timestamp: &str) -> String {
    NaiveDateTime::parse_from_str(timestamp, SQLITE_TIMESTAMP)
        .map(|dt| dt.format("%B %d, %Y").to_string())
        .unwrap_or_else(|_| timestamp.to_string())
}

#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password_hash: String,
    pub is_admin: bool,
    pub is_verified: bool,
    pub created_at: String,
}

impl User {
    pub const COLUMNS: &'static str =
        "id, username, email, password_hash, is_admin, is_verified, created_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            password_hash: row.get(3)?,
            is_admin: row.get(4)?,
            is_verified: row.get(5)?,
            created_at: row.get(6)?,
        })
    }

    pub fn joined_on(&self) -> String {
        display_date(&self.created_at)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: i64,
    pub user_id: i64,
    pub name: String,
    pub bio: Option<String>,
    pub slug: String,
    pub is_public: bool,
    #[serde(skip)]
    pub profile_image: Option<String>,
    pub instagram_handle: Option<String>,
    pub tiktok_handle: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Profile {
    pub const COLUMNS: &'static str = "id, user_id, name, bio, slug, is_public, profile_image, \
         instagram_handle, tiktok_handle, country, city, created_at, updated_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            user_id: row.get(1)?,
            name: row.get(2)?,
            bio: row.get(3)?,
            slug: row.get(4)?,
            is_public: row.get(5)?,
            profile_image: row.get(6)?,
            instagram_handle: row.get(7)?,
            tiktok_handle: row.get(8)?,
            country: row.get(9)?,
            city: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    pub fn image_url(&self) -> String {
        images::safe_image_url(self.profile_image.as_deref(), &self.name, images::AVATAR_SIZE)
    }

    /// "City, Country", either part, or empty.
    pub fn location(&self) -> String {
        [self.city.as_deref(), self.country.as_deref()]
            .into_iter()
            .flatten()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn bio_text(&self) -> &str {
        self.bio.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Category {
    pub id: i64,
    pub profile_id: i64,
    pub name: String,
    pub description: Option<String>,
    pub slug: String,
    pub created_at: String,
}

impl Category {
    pub const COLUMNS: &'static str = "id, profile_id, name, description, slug, created_at";

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            profile_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            slug: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }
}

/// Price level of a recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CostTier {
    #[default]
    #[serde(rename = "$")]
    Budget,
    #[serde(rename = "$$")]
    Moderate,
    #[serde(rename = "$$$")]
    Expensive,
    #[serde(rename = "$$$$")]
    Luxury,
}

impl CostTier {
    pub const ALL: [CostTier; 4] = [
        CostTier::Budget,
        CostTier::Moderate,
        CostTier::Expensive,
        CostTier::Luxury,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CostTier::Budget => "$",
            CostTier::Moderate => "$$",
            CostTier::Expensive => "$$$",
            CostTier::Luxury => "$$$$",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            CostTier::Budget => "$ - Budget",
            CostTier::Moderate => "$$ - Moderate",
            CostTier::Expensive => "$$$ - Expensive",
            CostTier::Luxury => "$$$$ - Luxury",
        }
    }
}

impl FromStr for CostTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CostTier::ALL
            .into_iter()
            .find(|tier| tier.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown cost rating: {}", s))
    }
}

impl ToSql for CostTier {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for CostTier {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub id: i64,
    pub category_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub pro_tip: Option<String>,
    pub url: Option<String>,
    #[serde(skip)]
    pub image: Option<String>,
    pub rating: u8,
    pub cost_rating: CostTier,
    pub location: Option<String>,
    pub tags: Tags,
    pub created_at: String,
    pub updated_at: String,
}

impl Recommendation {
    pub const COLUMNS: &'static str = "r.id, r.category_id, r.title, r.description, r.pro_tip, \
         r.url, r.image, r.rating, r.cost_rating, r.location, r.tags, r.created_at, r.updated_at";

    /// Number of columns in `COLUMNS`, for queries that select more after them.
    pub const WIDTH: usize = 13;

    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            category_id: row.get(1)?,
            title: row.get(2)?,
            description: row.get(3)?,
            pro_tip: row.get(4)?,
            url: row.get(5)?,
            image: row.get(6)?,
            rating: row.get(7)?,
            cost_rating: row.get(8)?,
            location: row.get(9)?,
            tags: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    pub fn image_url(&self) -> String {
        images::safe_image_url(self.image.as_deref(), &self.title, images::DEFAULT_SIZE)
    }

    pub fn maps_link(&self) -> Option<String> {
        self.location.as_deref().and_then(text::maps_link)
    }

    pub fn formatted_url(&self) -> Option<String> {
        self.url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .map(text::format_url)
    }

    pub fn domain(&self) -> String {
        self.url.as_deref().map(text::domain_of).unwrap_or_default()
    }

    pub fn short_description(&self, max_len: usize) -> String {
        text::truncate(self.description.as_deref().unwrap_or(""), max_len)
    }

    pub fn description_text(&self) -> &str {
        self.description.as_deref().unwrap_or("")
    }

    pub fn pro_tip_text(&self) -> &str {
        self.pro_tip.as_deref().unwrap_or("")
    }

    pub fn location_text(&self) -> &str {
        self.location.as_deref().unwrap_or("")
    }

    pub fn stars(&self) -> String {
        let filled = self.rating.min(5) as usize;
        format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
    }

    pub fn added_on(&self) -> String {
        display_date(&self.created_at)
    }
}

/// A comment joined with its author's username.
#[derive(Debug, Clone, Serialize)]
pub struct Comment {
    pub id: i64,
    pub content: String,
    pub user_id: i64,
    pub recommendation_id: i64,
    pub created_at: String,
    pub author: String,
}

impl Comment {
    pub fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            user_id: row.get(2)?,
            recommendation_id: row.get(3)?,
            created_at: row.get(4)?,
            author: row.get(5)?,
        })
    }

    pub fn posted_on(&self) -> String {
        display_date(&self.created_at)
    }
}

//! Recommendation tags.
//!
//! Tags are slugs kept in two lists, `categories` and `collections`, and stored
//! as one JSON document in the `recommendations.tags` column.

use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Maximum length of a tag slug.
pub const MAX_TAG_LEN: usize = 50;

/// Category tags offered to every user, whether or not anything uses them yet.
pub const DEFAULT_CATEGORY_TAGS: &[&str] = &[
    "books",
    "youtube-channels",
    "food",
    "where-to-stay",
    "apps",
    "products",
];

/// Convert free text to a URL-safe slug: lowercase ASCII letters and digits,
/// with every other run of characters collapsed to a single hyphen.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_hyphen = false;

    for c in text.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_hyphen = true;
        }
    }

    slug
}

/// Slugify and cap at `max_len` characters, never leaving a trailing hyphen.
pub fn slugify_capped(text: &str, max_len: usize) -> String {
    let mut slug = slugify(text);
    if slug.len() > max_len {
        slug.truncate(max_len);
        while slug.ends_with('-') {
            slug.pop();
        }
    }
    slug
}

/// Normalize a tag name.
pub fn tag_slug(text: &str) -> String {
    slugify_capped(text, MAX_TAG_LEN)
}

/// Turn a slug back into a display name: `where-to-stay` -> `Where To Stay`.
pub fn display_name(slug: &str) -> String {
    slug.split('-')
        .filter(|w| !w.is_empty())
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TagKind {
    Category,
    Collection,
}

impl TagKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TagKind::Category => "category",
            TagKind::Collection => "collection",
        }
    }
}

impl FromStr for TagKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "category" => Ok(TagKind::Category),
            "collection" => Ok(TagKind::Collection),
            other => Err(format!("Unknown tag type: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tags {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub collections: Vec<String>,
}

impl Tags {
    /// Build tags from the comma separated text fields of the recommendation form.
    pub fn from_form(categories: &str, collections: &str) -> Self {
        Self {
            categories: normalize_list(categories.split(',')),
            collections: normalize_list(collections.split(',')),
        }
    }

    /// Build tags from explicit lists, as sent to the tag API.
    pub fn from_lists<S: AsRef<str>>(categories: &[S], collections: &[S]) -> Self {
        Self {
            categories: normalize_list(categories.iter().map(|s| s.as_ref())),
            collections: normalize_list(collections.iter().map(|s| s.as_ref())),
        }
    }

    /// Parse the stored JSON document. Unknown keys are ignored and anything
    /// unreadable becomes an empty tag set.
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Tags>(json) {
            Ok(tags) => Self::from_lists(&tags.categories, &tags.collections),
            Err(_) => Self::default(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.collections.is_empty()
    }

    /// Add a tag to the list for `kind`. Returns false when it was already there
    /// or normalizes to nothing.
    pub fn add(&mut self, name: &str, kind: TagKind) -> bool {
        let slug = tag_slug(name);
        if slug.is_empty() {
            return false;
        }
        let list = self.list_mut(kind);
        if list.contains(&slug) {
            return false;
        }
        list.push(slug);
        true
    }

    /// Remove a tag from the list for `kind`, or from both lists when `kind` is None.
    pub fn remove(&mut self, name: &str, kind: Option<TagKind>) -> bool {
        let slug = tag_slug(name);
        let mut removed = false;
        for k in [TagKind::Category, TagKind::Collection] {
            if kind.is_none() || kind == Some(k) {
                let list = self.list_mut(k);
                let before = list.len();
                list.retain(|t| t != &slug);
                removed |= list.len() != before;
            }
        }
        removed
    }

    pub fn has(&self, name: &str) -> bool {
        let slug = tag_slug(name);
        self.categories.contains(&slug) || self.collections.contains(&slug)
    }

    /// All tags, categories first.
    pub fn all(&self) -> Vec<String> {
        self.categories
            .iter()
            .chain(self.collections.iter())
            .cloned()
            .collect()
    }

    pub fn categories_csv(&self) -> String {
        self.categories.join(", ")
    }

    pub fn collections_csv(&self) -> String {
        self.collections.join(", ")
    }

    fn list_mut(&mut self, kind: TagKind) -> &mut Vec<String> {
        match kind {
            TagKind::Category => &mut self.categories,
            TagKind::Collection => &mut self.collections,
        }
    }
}

fn normalize_list<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        let slug = tag_slug(item);
        if !slug.is_empty() && !out.contains(&slug) {
            out.push(slug);
        }
    }
    out
}

/// Parse the `?tags=a,b` query value into slugs.
pub fn parse_filter(param: &str) -> Vec<String> {
    normalize_list(param.split(','))
}

impl ToSql for Tags {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let json = self
            .to_json()
            .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
        Ok(ToSqlOutput::from(json))
    }
}

impl FromSql for Tags {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Null => Ok(Tags::default()),
            other => other.as_str().map(Tags::from_json),
        }
    }
}

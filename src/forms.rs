//! Form input and validation.
//!
//! Each form keeps the raw submitted strings so a failed submission can be
//! re-rendered as typed, and `validate` turns it into the typed input the
//! database layer takes.

use axum::extract::Multipart;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

use crate::db::models::CostTier;
use crate::db::profiles::ProfileInput;
use crate::db::recommendations::RecommendationInput;
use crate::error::AppError;
use crate::tags::Tags;
use crate::text;

/// Validation messages keyed by field name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<&'static str, String>);

impl FieldErrors {
    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.entry(field).or_insert_with(|| message.into());
    }

    /// Message for a field, or an empty string.
    pub fn get(&self, field: &str) -> &str {
        self.0.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_result<T>(self, ok: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(ok)
        } else {
            Err(self)
        }
    }
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn optional(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_string())
}

fn check_length(
    errors: &mut FieldErrors,
    field: &'static str,
    value: &str,
    min: usize,
    max: usize,
    message: &str,
) {
    let len = char_len(value.trim());
    if len < min || len > max {
        errors.add(field, message);
    }
}

fn check_required(errors: &mut FieldErrors, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "This field is required.");
    }
}

fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn is_valid_handle(handle: &str) -> bool {
    handle
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_')
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub password_confirm: String,
}

impl RegisterForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();

        check_required(&mut errors, "username", &self.username);
        check_length(
            &mut errors,
            "username",
            &self.username,
            3,
            80,
            "Username must be between 3 and 80 characters",
        );

        check_required(&mut errors, "email", &self.email);
        if !is_valid_email(self.email.trim()) {
            errors.add("email", "Invalid email address.");
        }

        check_required(&mut errors, "password", &self.password);
        if char_len(&self.password) < 6 {
            errors.add("password", "Password must be at least 6 characters");
        }

        check_required(&mut errors, "password_confirm", &self.password_confirm);
        if self.password != self.password_confirm {
            errors.add("password_confirm", "Passwords must match");
        }

        errors.into_result(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::default();
        check_required(&mut errors, "username", &self.username);
        check_length(
            &mut errors,
            "username",
            &self.username,
            3,
            80,
            "Field must be between 3 and 80 characters long.",
        );
        check_required(&mut errors, "password", &self.password);
        errors.into_result(())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VerifyForm {
    pub verification_code: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ForgotForm {
    pub email: String,
}

#[derive(Debug, Clone, Default)]
pub struct ProfileForm {
    pub name: String,
    pub bio: String,
    pub country: String,
    pub city: String,
    pub instagram_handle: String,
    pub tiktok_handle: String,
    pub is_public: bool,
}

impl ProfileForm {
    /// A blank form for a profile that does not exist yet.
    pub fn new_profile() -> Self {
        Self {
            is_public: true,
            ..Default::default()
        }
    }

    pub fn from_profile(profile: &crate::db::models::Profile) -> Self {
        Self {
            name: profile.name.clone(),
            bio: profile.bio.clone().unwrap_or_default(),
            country: profile.country.clone().unwrap_or_default(),
            city: profile.city.clone().unwrap_or_default(),
            instagram_handle: profile.instagram_handle.clone().unwrap_or_default(),
            tiktok_handle: profile.tiktok_handle.clone().unwrap_or_default(),
            is_public: profile.is_public,
        }
    }

    pub fn from_multipart(form: &MultipartForm) -> Self {
        Self {
            name: form.text("name"),
            bio: form.text("bio"),
            country: form.text("country"),
            city: form.text("city"),
            instagram_handle: form.text("instagram_handle"),
            tiktok_handle: form.text("tiktok_handle"),
            is_public: form.checked("is_public"),
        }
    }

    pub fn validate(&self) -> Result<ProfileInput, FieldErrors> {
        let mut errors = FieldErrors::default();

        check_required(&mut errors, "name", &self.name);
        check_length(
            &mut errors,
            "name",
            &self.name,
            2,
            100,
            "Profile name must be between 2 and 100 characters",
        );
        if char_len(self.bio.trim()) > 500 {
            errors.add("bio", "Bio must be less than 500 characters");
        }
        if char_len(self.country.trim()) > 56 {
            errors.add("country", "Country name must be less than 56 characters");
        }
        if char_len(self.city.trim()) > 56 {
            errors.add("city", "City name must be less than 56 characters");
        }

        for (field, label, value) in [
            ("instagram_handle", "Instagram", &self.instagram_handle),
            ("tiktok_handle", "TikTok", &self.tiktok_handle),
        ] {
            let value = value.trim().trim_start_matches('@');
            if value.is_empty() {
                continue;
            }
            if char_len(value) > 30 {
                errors.add(field, format!("{} handle must be less than 30 characters", label));
            } else if !is_valid_handle(value) {
                errors.add(
                    field,
                    format!(
                        "{} handle can only contain letters, numbers, dots, and underscores",
                        label
                    ),
                );
            }
        }

        errors.into_result(ProfileInput {
            name: self.name.trim().to_string(),
            bio: optional(&self.bio),
            is_public: self.is_public,
            instagram_handle: optional(self.instagram_handle.trim().trim_start_matches('@')),
            tiktok_handle: optional(self.tiktok_handle.trim().trim_start_matches('@')),
            country: optional(&self.country),
            city: optional(&self.city),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CategoryForm {
    pub name: String,
    pub description: String,
}

/// A validated category form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

impl CategoryForm {
    pub fn validate(&self) -> Result<CategoryInput, FieldErrors> {
        let mut errors = FieldErrors::default();
        check_required(&mut errors, "name", &self.name);
        check_length(
            &mut errors,
            "name",
            &self.name,
            2,
            100,
            "Category name must be between 2 and 100 characters",
        );
        if char_len(self.description.trim()) > 300 {
            errors.add("description", "Description must be less than 300 characters");
        }
        errors.into_result(CategoryInput {
            name: self.name.trim().to_string(),
            description: optional(&self.description),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationForm {
    pub category_id: String,
    pub title: String,
    pub rating: String,
    pub cost_rating: String,
    pub description: String,
    pub pro_tip: String,
    pub url: String,
    pub location: String,
    pub category_tags: String,
    pub collection_tags: String,
}

pub const RATING_CHOICES: &[(u8, &str)] = &[
    (5, "👍👍👍👍👍 - Absolutely love it!"),
    (4, "👍👍👍👍 - Really great"),
    (3, "👍👍👍 - Pretty good"),
    (2, "👍👍 - It's okay"),
    (1, "👍 - Meh, not great"),
];

impl RecommendationForm {
    pub fn new_recommendation(category_id: Option<i64>) -> Self {
        Self {
            category_id: category_id.map(|id| id.to_string()).unwrap_or_default(),
            rating: "5".to_string(),
            cost_rating: CostTier::Budget.as_str().to_string(),
            ..Default::default()
        }
    }

    pub fn from_recommendation(rec: &crate::db::models::Recommendation) -> Self {
        Self {
            category_id: rec.category_id.to_string(),
            title: rec.title.clone(),
            rating: rec.rating.to_string(),
            cost_rating: rec.cost_rating.as_str().to_string(),
            description: rec.description.clone().unwrap_or_default(),
            pro_tip: rec.pro_tip.clone().unwrap_or_default(),
            url: rec.url.clone().unwrap_or_default(),
            location: rec.location.clone().unwrap_or_default(),
            category_tags: rec.tags.categories_csv(),
            collection_tags: rec.tags.collections_csv(),
        }
    }

    pub fn from_multipart(form: &MultipartForm) -> Self {
        Self {
            category_id: form.text("category_id"),
            title: form.text("title"),
            rating: form.text("rating"),
            cost_rating: form.text("cost_rating"),
            description: form.text("description"),
            pro_tip: form.text("pro_tip"),
            url: form.text("url"),
            location: form.text("location"),
            category_tags: form.text("category_tags"),
            collection_tags: form.text("collection_tags"),
        }
    }

    pub fn is_category(&self, id: &i64) -> bool {
        self.category_id.trim() == id.to_string()
    }

    pub fn is_rating(&self, rating: &u8) -> bool {
        self.rating.trim() == rating.to_string()
    }

    pub fn is_cost(&self, tier: &CostTier) -> bool {
        self.cost_rating.trim() == tier.as_str()
    }

    /// Validate field contents. Whether the category belongs to the user is
    /// checked by the caller.
    pub fn validate(&self) -> Result<RecommendationInput, FieldErrors> {
        let mut errors = FieldErrors::default();

        let category_id = self.category_id.trim().parse::<i64>().ok();
        if category_id.is_none() {
            errors.add("category_id", "Not a valid choice.");
        }

        check_required(&mut errors, "title", &self.title);
        check_length(
            &mut errors,
            "title",
            &self.title,
            2,
            200,
            "Title must be between 2 and 200 characters",
        );

        let rating = self
            .rating
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|r| (1..=5).contains(r));
        if rating.is_none() {
            errors.add("rating", "Not a valid choice.");
        }

        let cost_rating = self.cost_rating.parse::<CostTier>().ok();
        if cost_rating.is_none() {
            errors.add("cost_rating", "Not a valid choice.");
        }

        if char_len(self.description.trim()) > 1000 {
            errors.add("description", "Description must be less than 1000 characters");
        }
        if char_len(self.pro_tip.trim()) > 500 {
            errors.add("pro_tip", "Pro tip must be less than 500 characters");
        }
        let url = optional(&self.url);
        if let Some(ref url) = url {
            if !text::is_valid_url(url) {
                errors.add("url", "Please enter a valid URL");
            }
        }
        if char_len(self.location.trim()) > 300 {
            errors.add("location", "Location must be less than 300 characters");
        }

        match (category_id, rating, cost_rating) {
            (Some(category_id), Some(rating), Some(cost_rating)) if errors.is_empty() => {
                Ok(RecommendationInput {
                    category_id,
                    title: self.title.trim().to_string(),
                    description: optional(&self.description),
                    pro_tip: optional(&self.pro_tip),
                    url,
                    rating,
                    cost_rating,
                    location: optional(&self.location),
                    tags: Tags::from_form(&self.category_tags, &self.collection_tags),
                })
            }
            _ => Err(errors),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub content: String,
}

impl CommentForm {
    pub fn validate(&self) -> Result<String, FieldErrors> {
        let mut errors = FieldErrors::default();
        let content = self.content.trim();
        if content.is_empty() {
            errors.add("content", "Comment cannot be empty");
        } else if char_len(content) > 500 {
            errors.add("content", "Comment must be between 1 and 500 characters");
        }
        errors.into_result(content.to_string())
    }
}

/// An uploaded file.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// A fully read multipart body: text fields and files by field name.
#[derive(Debug, Default)]
pub struct MultipartForm {
    fields: HashMap<String, String>,
    files: HashMap<String, Upload>,
}

impl MultipartForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = MultipartForm::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match field.file_name().map(str::to_string) {
                Some(filename) => {
                    let bytes = field
                        .bytes()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    form.files.insert(
                        name,
                        Upload {
                            filename,
                            bytes: bytes.to_vec(),
                        },
                    );
                }
                None => {
                    let value = field
                        .text()
                        .await
                        .map_err(|e| AppError::BadRequest(e.to_string()))?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// A checkbox counts as checked when present with any value but "false".
    pub fn checked(&self, name: &str) -> bool {
        self.fields
            .get(name)
            .map(|v| !matches!(v.trim(), "" | "false" | "0" | "off"))
            .unwrap_or(false)
    }

    pub fn file(&self, name: &str) -> Option<&Upload> {
        self.files.get(name).filter(|f| !f.bytes.is_empty())
    }

    #[cfg(test)]
    pub fn with_fields(fields: &[(&str, &str)]) -> Self {
        Self {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: HashMap::new(),
        }
    }
}

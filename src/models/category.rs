use chrono::{DateTime, Utc};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::Validate;

lazy_static! {
    static ref HEX_COLOR_REGEX: regex::Regex =
        regex::Regex::new(r"^#([A-Fa-f0-9]{6}|[A-Fa-f0-9]{3})$").unwrap();
}

/// A category entry inside the shared relations document.
///
/// Categories are not a store-level collection of their own: all users'
/// categories live in one aggregate document and are filtered by `userId`
/// in application code.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub color: String,
    pub icon: String,
    /// Default categories are protected from deletion.
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The shared aggregate document (resource `user-todo-relations`, id `"1"`)
/// holding every user's categories. The `userTodoRelations` array is opaque
/// to this service and must survive read-modify-write cycles untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationsDoc {
    pub id: String,
    #[serde(default)]
    pub user_todo_relations: Vec<serde_json::Value>,
    #[serde(default)]
    pub categories: Vec<Category>,
}

pub const RELATIONS_RESOURCE: &str = "user-todo-relations";
pub const RELATIONS_DOC_ID: &str = "1";

impl Default for RelationsDoc {
    fn default() -> Self {
        Self {
            id: RELATIONS_DOC_ID.to_string(),
            user_todo_relations: Vec::new(),
            categories: Vec::new(),
        }
    }
}

/// Payload for creating or updating a category.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CategoryInput {
    #[validate(length(
        min = 1,
        max = 50,
        message = "Category name is required and must be less than 50 characters"
    ))]
    pub name: String,
    #[validate(length(max = 200, message = "Description must be less than 200 characters"))]
    pub description: Option<String>,
    #[validate(regex(
        path = "HEX_COLOR_REGEX",
        message = "Color must be a valid hex color code"
    ))]
    pub color: Option<String>,
    #[validate(length(max = 10, message = "Icon must be less than 10 characters"))]
    pub icon: Option<String>,
}

pub const DEFAULT_CATEGORY_COLOR: &str = "#3498db";
pub const DEFAULT_CATEGORY_ICON: &str = "📝";

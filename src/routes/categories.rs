use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use validator::Validate;

use crate::{
    auth::AuthenticatedUser,
    db::{generate_id, StoreClient},
    error::AppError,
    models::{
        category::{CategoryInput, DEFAULT_CATEGORY_COLOR, DEFAULT_CATEGORY_ICON},
        Category, TodoStatus,
    },
    response,
};

/// Case-insensitive per-user name uniqueness check. `exclude_id` skips the
/// category being renamed.
fn name_taken(
    categories: &[Category],
    user_id: &str,
    name: &str,
    exclude_id: Option<&str>,
) -> bool {
    categories.iter().any(|category| {
        category.user_id == user_id
            && Some(category.id.as_str()) != exclude_id
            && category.name.to_lowercase() == name.to_lowercase()
    })
}

/// Get all categories for the authenticated user
///
/// Categories live in one shared aggregate document; ownership filtering
/// happens here, not store-side.
#[get("")]
pub async fn list_categories(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
) -> Result<HttpResponse, AppError> {
    let relations = store.find_relations().await?;
    let categories: Vec<Category> = relations
        .categories
        .into_iter()
        .filter(|category| category.user_id == user.0.id)
        .collect();

    Ok(response::ok(json!({ "categories": categories })))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CategoryStats {
    #[serde(flatten)]
    category: Category,
    todo_count: usize,
    completed_count: usize,
    pending_count: usize,
    in_progress_count: usize,
}

/// Get category usage statistics
///
/// Joins the user's categories against their full todo set by category
/// name; recomputed on every request.
#[get("/stats")]
pub async fn get_stats(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
) -> Result<HttpResponse, AppError> {
    let relations = store.find_relations().await?;
    let todos = store.find_todos_by_user(&user.0.id, &[]).await?;

    let stats: Vec<CategoryStats> = relations
        .categories
        .into_iter()
        .filter(|category| category.user_id == user.0.id)
        .map(|category| {
            let in_category: Vec<_> = todos
                .iter()
                .filter(|todo| todo.category == category.name)
                .collect();
            CategoryStats {
                todo_count: in_category.len(),
                completed_count: in_category
                    .iter()
                    .filter(|todo| todo.status == TodoStatus::Completed)
                    .count(),
                pending_count: in_category
                    .iter()
                    .filter(|todo| todo.status == TodoStatus::Pending)
                    .count(),
                in_progress_count: in_category
                    .iter()
                    .filter(|todo| todo.status == TodoStatus::InProgress)
                    .count(),
                category,
            }
        })
        .collect();

    Ok(response::ok(json!({ "categoryStats": stats })))
}

/// Get category by ID
#[get("/{id}")]
pub async fn get_category(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let relations = store.find_relations().await?;
    let category = relations
        .categories
        .into_iter()
        .find(|category| category.id == *id && category.user_id == user.0.id)
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;

    Ok(response::ok(json!({ "category": category })))
}

/// Create a new category
#[post("")]
pub async fn create_category(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
    payload: web::Json<CategoryInput>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let input = payload.into_inner();

    let mut relations = store.find_relations().await?;
    if name_taken(&relations.categories, &user.0.id, &input.name, None) {
        return Err(AppError::Conflict("Category name already exists".into()));
    }

    let now = Utc::now();
    let category = Category {
        id: generate_id(),
        user_id: user.0.id.clone(),
        name: input.name,
        description: input.description.unwrap_or_default(),
        color: input
            .color
            .unwrap_or_else(|| DEFAULT_CATEGORY_COLOR.to_string()),
        icon: input
            .icon
            .unwrap_or_else(|| DEFAULT_CATEGORY_ICON.to_string()),
        is_default: false,
        created_at: now,
        updated_at: now,
    };

    relations.categories.push(category.clone());
    store.save_relations(&relations).await?;

    Ok(response::created(
        "Category created successfully",
        json!({ "category": category }),
    ))
}

/// Update category
#[put("/{id}")]
pub async fn update_category(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
    id: web::Path<String>,
    payload: web::Json<CategoryInput>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let input = payload.into_inner();

    let mut relations = store.find_relations().await?;
    let index = relations
        .categories
        .iter()
        .position(|category| category.id == *id && category.user_id == user.0.id)
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;

    if name_taken(&relations.categories, &user.0.id, &input.name, Some(&id)) {
        return Err(AppError::Conflict("Category name already exists".into()));
    }

    let category = &mut relations.categories[index];
    category.name = input.name;
    if let Some(description) = input.description {
        category.description = description;
    }
    if let Some(color) = input.color {
        category.color = color;
    }
    if let Some(icon) = input.icon {
        category.icon = icon;
    }
    category.updated_at = Utc::now();
    let updated = category.clone();

    store.save_relations(&relations).await?;

    Ok(response::ok_with_message(
        "Category updated successfully",
        json!({ "category": updated }),
    ))
}

/// Delete category
///
/// Refused for default categories and for categories any of the owner's
/// todos still reference by name.
#[delete("/{id}")]
pub async fn delete_category(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let mut relations = store.find_relations().await?;
    let index = relations
        .categories
        .iter()
        .position(|category| category.id == *id && category.user_id == user.0.id)
        .ok_or_else(|| AppError::NotFound("Category not found".into()))?;

    if relations.categories[index].is_default {
        return Err(AppError::Conflict("Cannot delete default category".into()));
    }

    let todos = store.find_todos_by_user(&user.0.id, &[]).await?;
    let in_use = todos
        .iter()
        .any(|todo| todo.category == relations.categories[index].name);
    if in_use {
        return Err(AppError::Conflict(
            "Cannot delete category that is being used by todos. Please reassign todos to another category first."
                .into(),
        ));
    }

    relations.categories.remove(index);
    store.save_relations(&relations).await?;

    Ok(response::message_only("Category deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(id: &str, user_id: &str, name: &str) -> Category {
        let now = Utc::now();
        Category {
            id: id.to_string(),
            user_id: user_id.to_string(),
            name: name.to_string(),
            description: String::new(),
            color: DEFAULT_CATEGORY_COLOR.to_string(),
            icon: DEFAULT_CATEGORY_ICON.to_string(),
            is_default: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_name_taken_is_case_insensitive() {
        let categories = vec![category("c1", "u1", "Work")];
        assert!(name_taken(&categories, "u1", "work", None));
        assert!(name_taken(&categories, "u1", "WORK", None));
        assert!(!name_taken(&categories, "u1", "Home", None));
    }

    #[test]
    fn test_name_taken_is_scoped_per_user() {
        let categories = vec![category("c1", "u1", "Work")];
        assert!(!name_taken(&categories, "u2", "Work", None));
    }

    #[test]
    fn test_name_taken_excludes_the_renamed_category() {
        let categories = vec![
            category("c1", "u1", "Work"),
            category("c2", "u1", "Home"),
        ];
        // Renaming c1 to its own name is fine; to a sibling's name is not.
        assert!(!name_taken(&categories, "u1", "Work", Some("c1")));
        assert!(name_taken(&categories, "u1", "Home", Some("c1")));
    }
}

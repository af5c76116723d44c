use std::collections::BTreeMap;

use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use validator::Validate;

use crate::{
    auth::AuthenticatedUser,
    db::StoreClient,
    error::AppError,
    models::{
        user::{UpdatePreferencesRequest, UpdateProfileRequest},
        PublicUser, Todo, TodoStatus, User,
    },
    response,
};

/// Get current user profile
#[get("/profile")]
pub async fn get_profile(user: AuthenticatedUser) -> HttpResponse {
    response::ok(json!({ "user": PublicUser::from(user.0) }))
}

/// Update user profile
///
/// Writes only the provided fields. A changed email is lowercased and
/// checked for uniqueness first.
#[put("/profile")]
pub async fn update_profile(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
    payload: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;
    let payload = payload.into_inner();

    let mut patch = serde_json::Map::new();
    if let Some(first_name) = payload.first_name {
        patch.insert("firstName".to_string(), json!(first_name));
    }
    if let Some(last_name) = payload.last_name {
        patch.insert("lastName".to_string(), json!(last_name));
    }
    if let Some(email) = payload.email {
        let email = email.to_lowercase();
        if email != user.0.email {
            if store.find_user_by_email(&email).await?.is_some() {
                return Err(AppError::Conflict("Email is already in use".into()));
            }
        }
        patch.insert("email".to_string(), json!(email));
    }

    let updated: User = store.partial_update("users", &user.0.id, &patch).await?;

    Ok(response::ok_with_message(
        "Profile updated successfully",
        json!({ "user": PublicUser::from(updated) }),
    ))
}

/// Update user preferences
///
/// Merges the patch into the stored preferences field by field, including
/// the nested notifications object, then writes the whole preferences
/// object back.
#[patch("/preferences")]
pub async fn update_preferences(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
    payload: web::Json<UpdatePreferencesRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;

    let mut preferences = user.0.preferences.clone();
    preferences.merge(payload.into_inner().preferences);

    let updated: User = store
        .partial_update(
            "users",
            &user.0.id,
            &json!({ "preferences": preferences }),
        )
        .await?;

    Ok(response::ok_with_message(
        "Preferences updated successfully",
        json!({ "user": PublicUser::from(updated) }),
    ))
}

/// Deactivate user account
///
/// Soft deactivation: the user record stays, but authentication is refused
/// from the next request on.
#[post("/deactivate")]
pub async fn deactivate_account(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
) -> Result<HttpResponse, AppError> {
    let _: User = store
        .partial_update(
            "users",
            &user.0.id,
            &json!({
                "isActive": false,
                "deactivatedAt": Utc::now(),
            }),
        )
        .await?;

    Ok(response::message_only("Account deactivated successfully"))
}

/// Permanently delete user account and all data
///
/// Deletes the user's todos one by one, then the user record itself.
#[delete("/account")]
pub async fn delete_account(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
) -> Result<HttpResponse, AppError> {
    let todos = store.find_todos_by_user(&user.0.id, &[]).await?;
    for todo in &todos {
        store.delete("todos", &todo.id).await?;
    }

    store.delete("users", &user.0.id).await?;

    Ok(response::message_only(
        "Account and all associated data deleted successfully",
    ))
}

/// Get user statistics
///
/// Derived by scanning the user's full todo set on every request; nothing
/// is maintained incrementally.
#[get("/stats")]
pub async fn get_stats(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
) -> Result<HttpResponse, AppError> {
    let todos = store.find_todos_by_user(&user.0.id, &[]).await?;
    let stats = compute_user_stats(&todos);

    Ok(response::ok(json!({ "stats": stats })))
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    total_todos: usize,
    completed_todos: usize,
    pending_todos: usize,
    in_progress_todos: usize,
    overdue_todos: usize,
    /// Completed share of all todos, rounded to the nearest integer percent.
    completion_rate: u32,
    category_counts: BTreeMap<String, usize>,
    priority_counts: BTreeMap<String, usize>,
}

fn compute_user_stats(todos: &[Todo]) -> UserStats {
    let now = Utc::now();
    let completed = todos
        .iter()
        .filter(|t| t.status == TodoStatus::Completed)
        .count();

    let mut category_counts = BTreeMap::new();
    let mut priority_counts = BTreeMap::new();
    for todo in todos {
        *category_counts.entry(todo.category.clone()).or_insert(0) += 1;
        *priority_counts
            .entry(todo.priority.as_str().to_string())
            .or_insert(0) += 1;
    }

    UserStats {
        total_todos: todos.len(),
        completed_todos: completed,
        pending_todos: todos
            .iter()
            .filter(|t| t.status == TodoStatus::Pending)
            .count(),
        in_progress_todos: todos
            .iter()
            .filter(|t| t.status == TodoStatus::InProgress)
            .count(),
        overdue_todos: todos
            .iter()
            .filter(|t| {
                t.due_date.map_or(false, |due| due < now) && t.status != TodoStatus::Completed
            })
            .count(),
        completion_rate: if todos.is_empty() {
            0
        } else {
            ((completed as f64 / todos.len() as f64) * 100.0).round() as u32
        },
        category_counts,
        priority_counts,
    }
}

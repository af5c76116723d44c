use std::cmp::Ordering;

use actix_web::{delete, get, patch, post, put, web, HttpResponse};
use chrono::{DateTime, Utc};
use serde_json::json;
use validator::Validate;

use crate::{
    auth::AuthenticatedUser,
    db::StoreClient,
    error::AppError,
    models::{
        todo::{
            completed_at_after, BulkDeleteRequest, NewTodo, SortOrder, StatusUpdateRequest,
        },
        Todo, TodoInput, TodoListQuery,
    },
    response,
};

/// Fetches a todo and enforces ownership: absent documents are 404, another
/// user's documents are 403 without leaking their contents.
async fn fetch_owned_todo(
    store: &StoreClient,
    id: &str,
    user_id: &str,
) -> Result<Todo, AppError> {
    let todo: Option<Todo> = store.find_by_id("todos", id).await?;
    let todo = todo.ok_or_else(|| AppError::NotFound("Todo not found".into()))?;
    if todo.user_id != user_id {
        return Err(AppError::Forbidden("Access denied".into()));
    }
    Ok(todo)
}

fn matches_search(todo: &Todo, term: &str) -> bool {
    let term = term.to_lowercase();
    todo.title.to_lowercase().contains(&term)
        || todo.description.to_lowercase().contains(&term)
        || todo.tags.iter().any(|tag| tag.to_lowercase().contains(&term))
}

fn compare_todos(a: &Todo, b: &Todo, sort_by: &str) -> Ordering {
    // Missing dates sort as the minimum timestamp.
    fn date_or_min(date: Option<DateTime<Utc>>) -> DateTime<Utc> {
        date.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    match sort_by {
        "updatedAt" => a.updated_at.cmp(&b.updated_at),
        "dueDate" => date_or_min(a.due_date).cmp(&date_or_min(b.due_date)),
        "title" => a.title.cmp(&b.title),
        "status" => a.status.as_str().cmp(b.status.as_str()),
        "priority" => a.priority.as_str().cmp(b.priority.as_str()),
        "category" => a.category.cmp(&b.category),
        // "createdAt" and any unknown field
        _ => a.created_at.cmp(&b.created_at),
    }
}

/// Sorts in place by the given field. There is no tie-break on equal keys:
/// the relative order of equal elements is unspecified.
fn sort_todos(todos: &mut [Todo], sort_by: &str, order: SortOrder) {
    todos.sort_by(|a, b| {
        let ordering = compare_todos(a, b, sort_by);
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// 1-indexed pagination. `total_pages` is `ceil(len / limit)`, so an empty
/// set has zero pages and an out-of-range page is empty.
fn paginate<T>(items: Vec<T>, page: usize, limit: usize) -> (Vec<T>, usize) {
    let total_pages = (items.len() + limit - 1) / limit;
    let start = (page - 1) * limit;
    let page_items = items.into_iter().skip(start).take(limit).collect();
    (page_items, total_pages)
}

/// Get all todos for the authenticated user
///
/// Equality filters (`status`, `priority`, `category`) are pushed to the
/// store; the substring `search` across title, description and tags, the
/// sort and the pagination run in memory on the filtered set.
#[get("")]
pub async fn list_todos(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
    query: web::Query<TodoListQuery>,
) -> Result<HttpResponse, AppError> {
    query.validate()?;
    let query = query.into_inner();

    let mut params: Vec<(&str, &str)> = Vec::new();
    if let Some(status) = query.status {
        params.push(("status", status.as_str()));
    }
    if let Some(priority) = query.priority {
        params.push(("priority", priority.as_str()));
    }
    if let Some(category) = &query.category {
        params.push(("category", category));
    }

    let mut todos = store.find_todos_by_user(&user.0.id, &params).await?;

    if let Some(search) = &query.search {
        todos.retain(|todo| matches_search(todo, search));
    }

    let sort_by = query.sort_by.as_deref().unwrap_or("createdAt");
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    sort_todos(&mut todos, sort_by, sort_order);

    let page = query.page.unwrap_or(1) as usize;
    let limit = query.limit.unwrap_or(10) as usize;
    let total_items = todos.len();
    let (page_items, total_pages) = paginate(todos, page, limit);

    Ok(response::ok(json!({
        "todos": page_items,
        "pagination": {
            "currentPage": page,
            "totalPages": total_pages,
            "totalItems": total_items,
            "limit": limit,
        },
        "filters": {
            "status": query.status,
            "priority": query.priority,
            "category": query.category,
            "search": query.search,
        },
    })))
}

/// Get todo by ID
#[get("/{id}")]
pub async fn get_todo(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let todo = fetch_owned_todo(&store, &id, &user.0.id).await?;
    Ok(response::ok(json!({ "todo": todo })))
}

/// Create a new todo
#[post("")]
pub async fn create_todo(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
    payload: web::Json<TodoInput>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;

    let new_todo = NewTodo::from_input(payload.into_inner(), &user.0.id);
    let created: Todo = store.create("todos", &new_todo).await?;

    Ok(response::created(
        "Todo created successfully",
        json!({ "todo": created }),
    ))
}

/// Update todo
///
/// Full replace of the editable fields; `userId` and `createdAt` are kept
/// from the stored document. The `completedAt` rule is the same one the
/// status endpoint applies.
#[put("/{id}")]
pub async fn update_todo(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
    id: web::Path<String>,
    payload: web::Json<TodoInput>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;

    let existing = fetch_owned_todo(&store, &id, &user.0.id).await?;
    let input = payload.into_inner();
    let new_status = input.status.unwrap_or(existing.status);

    let mut updated = existing.clone();
    updated.title = input.title;
    updated.description = input.description.unwrap_or_default();
    updated.status = new_status;
    updated.priority = input.priority.unwrap_or(existing.priority);
    updated.category = input.category.unwrap_or_else(|| existing.category.clone());
    updated.tags = input.tags.unwrap_or_else(|| existing.tags.clone());
    updated.due_date = input.due_date.or(existing.due_date);
    updated.reminder_date = input.reminder_date.or(existing.reminder_date);
    updated.estimated_time = input.estimated_time.or(existing.estimated_time);
    updated.completed_at = completed_at_after(&existing, new_status);

    let updated: Todo = store.update("todos", &id, &updated).await?;

    Ok(response::ok_with_message(
        "Todo updated successfully",
        json!({ "todo": updated }),
    ))
}

/// Update todo status
///
/// A transition into `completed` stamps `completedAt` exactly once; any
/// other target clears it.
#[patch("/{id}/status")]
pub async fn update_todo_status(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
    id: web::Path<String>,
    payload: web::Json<StatusUpdateRequest>,
) -> Result<HttpResponse, AppError> {
    let existing = fetch_owned_todo(&store, &id, &user.0.id).await?;
    let completed_at = completed_at_after(&existing, payload.status);

    let updated: Todo = store
        .partial_update(
            "todos",
            &id,
            &json!({
                "status": payload.status,
                "completedAt": completed_at,
            }),
        )
        .await?;

    Ok(response::ok_with_message(
        "Todo status updated successfully",
        json!({ "todo": updated }),
    ))
}

/// Delete todo
#[delete("/{id}")]
pub async fn delete_todo(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
    id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    fetch_owned_todo(&store, &id, &user.0.id).await?;
    store.delete("todos", &id).await?;

    Ok(response::message_only("Todo deleted successfully"))
}

/// Delete multiple todos
///
/// Best-effort per id: failures (not found, not owned, store errors) are
/// collected and reported next to the deleted ids; the batch never aborts
/// and there is no rollback.
#[post("/bulk-delete")]
pub async fn bulk_delete_todos(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
    payload: web::Json<BulkDeleteRequest>,
) -> Result<HttpResponse, AppError> {
    let mut deleted = Vec::new();
    let mut errors = Vec::new();

    for id in &payload.todo_ids {
        match store.find_by_id::<Todo>("todos", id).await {
            Ok(None) => errors.push(json!({ "id": id, "message": "Todo not found" })),
            Ok(Some(todo)) if todo.user_id != user.0.id => {
                errors.push(json!({ "id": id, "message": "Access denied" }))
            }
            Ok(Some(_)) => match store.delete("todos", id).await {
                Ok(()) => deleted.push(id.clone()),
                Err(err) => errors.push(json!({ "id": id, "message": err.to_string() })),
            },
            Err(err) => errors.push(json!({ "id": id, "message": err.to_string() })),
        }
    }

    Ok(response::ok_with_message(
        &format!("Successfully deleted {} todos", deleted.len()),
        json!({
            "deleted": deleted,
            "errors": errors,
        }),
    ))
}

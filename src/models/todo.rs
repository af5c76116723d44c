use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Status of a todo item. All transitions between the three states are
/// legal; only the `completedAt` side effect depends on the target state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TodoStatus {
    Pending,
    InProgress,
    Completed,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Pending => "pending",
            TodoStatus::InProgress => "in-progress",
            TodoStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TodoPriority {
    Low,
    Medium,
    High,
    Urgent,
}

impl TodoPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoPriority::Low => "low",
            TodoPriority::Medium => "medium",
            TodoPriority::High => "high",
            TodoPriority::Urgent => "urgent",
        }
    }
}

/// Dependency id lists carried on each todo. Not enforced: referenced ids
/// may not exist.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependencies {
    #[serde(default)]
    pub blocked_by: Vec<String>,
    #[serde(default)]
    pub blocking: Vec<String>,
}

/// A todo document as stored in the external document store.
///
/// Invariant: `completed_at` is non-null iff `status == Completed`; every
/// write path goes through [`completed_at_after`] (or its create-time
/// equivalent) to uphold it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: String,
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reminder_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub estimated_time: Option<i64>,
    #[serde(default)]
    pub actual_time: Option<i64>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurring_pattern: Option<String>,
    #[serde(default)]
    pub parent_todo_id: Option<String>,
    #[serde(default)]
    pub dependencies: Dependencies,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_archived: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A todo about to be created; the resource client stamps `id`, `createdAt`
/// and `updatedAt` on write.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub status: TodoStatus,
    pub priority: TodoPriority,
    pub category: String,
    pub tags: Vec<String>,
    pub due_date: Option<DateTime<Utc>>,
    pub reminder_date: Option<DateTime<Utc>>,
    pub estimated_time: Option<i64>,
    pub actual_time: Option<i64>,
    pub is_recurring: bool,
    pub recurring_pattern: Option<String>,
    pub parent_todo_id: Option<String>,
    pub dependencies: Dependencies,
    pub completed_at: Option<DateTime<Utc>>,
    pub is_archived: bool,
}

impl NewTodo {
    /// Applies creation defaults: status `pending`, priority `medium`,
    /// category `"General"`, empty tags and dependencies, not archived.
    pub fn from_input(input: TodoInput, user_id: &str) -> Self {
        let status = input.status.unwrap_or(TodoStatus::Pending);
        Self {
            user_id: user_id.to_string(),
            title: input.title,
            description: input.description.unwrap_or_default(),
            status,
            priority: input.priority.unwrap_or(TodoPriority::Medium),
            category: input.category.unwrap_or_else(|| "General".to_string()),
            tags: input.tags.unwrap_or_default(),
            due_date: input.due_date,
            reminder_date: input.reminder_date,
            estimated_time: input.estimated_time,
            actual_time: None,
            is_recurring: input.is_recurring.unwrap_or(false),
            recurring_pattern: input.recurring_pattern,
            parent_todo_id: input.parent_todo_id,
            dependencies: Dependencies::default(),
            completed_at: match status {
                TodoStatus::Completed => Some(Utc::now()),
                _ => None,
            },
            is_archived: false,
        }
    }
}

/// The `completedAt` value a todo must carry after its status becomes
/// `new_status`. A transition into `Completed` stamps the current time once;
/// re-completing an already completed todo keeps the existing stamp; any
/// other target clears the field.
pub fn completed_at_after(previous: &Todo, new_status: TodoStatus) -> Option<DateTime<Utc>> {
    match new_status {
        TodoStatus::Completed => previous.completed_at.or_else(|| Some(Utc::now())),
        _ => None,
    }
}

fn validate_tags(tags: &[String]) -> Result<(), ValidationError> {
    if tags
        .iter()
        .any(|tag| tag.is_empty() || tag.chars().count() > 30)
    {
        let mut err = ValidationError::new("length");
        err.message = Some("Each tag must be 1-30 characters long".into());
        return Err(err);
    }
    Ok(())
}

/// Payload for creating or fully updating a todo.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TodoInput {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title is required and must be less than 200 characters"
    ))]
    pub title: String,
    #[validate(length(max = 1000, message = "Description must be less than 1000 characters"))]
    pub description: Option<String>,
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    #[validate(length(max = 50, message = "Category must be less than 50 characters"))]
    pub category: Option<String>,
    #[validate(custom = "validate_tags")]
    pub tags: Option<Vec<String>>,
    pub due_date: Option<DateTime<Utc>>,
    pub reminder_date: Option<DateTime<Utc>>,
    pub estimated_time: Option<i64>,
    pub is_recurring: Option<bool>,
    pub recurring_pattern: Option<String>,
    pub parent_todo_id: Option<String>,
}

/// Payload for `PATCH /api/todos/{id}/status`.
#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: TodoStatus,
}

/// Payload for `POST /api/todos/bulk-delete`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkDeleteRequest {
    pub todo_ids: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    Desc,
}

/// Query parameters accepted by `GET /api/todos`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TodoListQuery {
    pub status: Option<TodoStatus>,
    pub priority: Option<TodoPriority>,
    #[validate(length(max = 50, message = "Category must be less than 50 characters"))]
    pub category: Option<String>,
    #[validate(length(max = 100, message = "Search term must be less than 100 characters"))]
    pub search: Option<String>,
    #[validate(range(min = 1, message = "Page must be a positive integer"))]
    pub page: Option<u32>,
    #[validate(range(min = 1, max = 100, message = "Limit must be between 1 and 100"))]
    pub limit: Option<u32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

//!
//! # Resource Client
//!
//! Generic CRUD operations against the external JSON document store, plus a
//! few domain-specific lookups. Every operation is a single HTTP round trip
//! with a fixed timeout: no retries, no caching, no transactions. Writes are
//! stamped with `createdAt`/`updatedAt`, and `create` generates the opaque
//! document id (millisecond timestamp + random suffix).
//!
//! Remote 404s on `find_by_id` surface as `Ok(None)`; every other remote
//! failure is wrapped into [`AppError::Upstream`] carrying the original HTTP
//! status (500 when the request never produced a response) and a contextual
//! message.

use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::category::{RelationsDoc, RELATIONS_DOC_ID, RELATIONS_RESOURCE};
use crate::models::{Todo, User};

const STORE_TIMEOUT_SECS: u64 = 5;

/// Generates an opaque document id: millisecond timestamp followed by a
/// 9-character random suffix.
pub fn generate_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}{}", Utc::now().timestamp_millis(), &suffix[..9])
}

#[derive(Debug, Clone)]
pub struct StoreClient {
    base_url: String,
    http: reqwest::Client,
}

impl StoreClient {
    pub fn new(base_url: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(STORE_TIMEOUT_SECS))
            .build()
            .expect("failed to build the store HTTP client");
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Lists a resource, optionally filtered by equality query parameters.
    pub async fn find_all<T: DeserializeOwned>(
        &self,
        resource: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<T>, AppError> {
        let context = format!("Failed to fetch {}", resource);
        log::debug!("store request: GET /{}", resource);
        let response = self
            .http
            .get(self.url(resource))
            .query(params)
            .send()
            .await
            .map_err(|err| store_error(err, &context))?;
        let response = check_status(response, &context)?;
        response
            .json()
            .await
            .map_err(|err| store_error(err, &context))
    }

    /// Fetches a single document; a remote 404 is an absent value, not an
    /// error.
    pub async fn find_by_id<T: DeserializeOwned>(
        &self,
        resource: &str,
        id: &str,
    ) -> Result<Option<T>, AppError> {
        let context = format!("Failed to fetch {} with id {}", resource, id);
        log::debug!("store request: GET /{}/{}", resource, id);
        let response = self
            .http
            .get(self.url(&format!("{}/{}", resource, id)))
            .send()
            .await
            .map_err(|err| store_error(err, &context))?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(response, &context)?;
        response
            .json()
            .await
            .map(Some)
            .map_err(|err| store_error(err, &context))
    }

    /// Creates a document, generating its id and stamping both timestamps.
    pub async fn create<T: Serialize, R: DeserializeOwned>(
        &self,
        resource: &str,
        data: &T,
    ) -> Result<R, AppError> {
        let context = format!("Failed to create {}", resource);
        let mut body = to_object(data, &context)?;
        let now = timestamp_value();
        body.insert("id".to_string(), Value::String(generate_id()));
        body.insert("createdAt".to_string(), now.clone());
        body.insert("updatedAt".to_string(), now);

        log::debug!("store request: POST /{}", resource);
        let response = self
            .http
            .post(self.url(resource))
            .json(&body)
            .send()
            .await
            .map_err(|err| store_error(err, &context))?;
        let response = check_status(response, &context)?;
        response
            .json()
            .await
            .map_err(|err| store_error(err, &context))
    }

    /// Replaces a document in full, stamping `updatedAt`.
    pub async fn update<T: Serialize, R: DeserializeOwned>(
        &self,
        resource: &str,
        id: &str,
        data: &T,
    ) -> Result<R, AppError> {
        let context = format!("Failed to update {} with id {}", resource, id);
        let mut body = to_object(data, &context)?;
        body.insert("updatedAt".to_string(), timestamp_value());

        log::debug!("store request: PUT /{}/{}", resource, id);
        let response = self
            .http
            .put(self.url(&format!("{}/{}", resource, id)))
            .json(&body)
            .send()
            .await
            .map_err(|err| store_error(err, &context))?;
        let response = check_status(response, &context)?;
        response
            .json()
            .await
            .map_err(|err| store_error(err, &context))
    }

    /// Merges the given fields into a document, stamping `updatedAt`; fields
    /// not present in `data` are left untouched.
    pub async fn partial_update<T: Serialize, R: DeserializeOwned>(
        &self,
        resource: &str,
        id: &str,
        data: &T,
    ) -> Result<R, AppError> {
        let context = format!("Failed to update {} with id {}", resource, id);
        let mut body = to_object(data, &context)?;
        body.insert("updatedAt".to_string(), timestamp_value());

        log::debug!("store request: PATCH /{}/{}", resource, id);
        let response = self
            .http
            .patch(self.url(&format!("{}/{}", resource, id)))
            .json(&body)
            .send()
            .await
            .map_err(|err| store_error(err, &context))?;
        let response = check_status(response, &context)?;
        response
            .json()
            .await
            .map_err(|err| store_error(err, &context))
    }

    pub async fn delete(&self, resource: &str, id: &str) -> Result<(), AppError> {
        let context = format!("Failed to delete {} with id {}", resource, id);
        log::debug!("store request: DELETE /{}/{}", resource, id);
        let response = self
            .http
            .delete(self.url(&format!("{}/{}", resource, id)))
            .send()
            .await
            .map_err(|err| store_error(err, &context))?;
        check_status(response, &context)?;
        Ok(())
    }

    // Domain-specific lookups, all thin wrappers over the generic operations.

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let mut users: Vec<User> = self.find_all("users", &[("email", email)]).await?;
        Ok(if users.is_empty() {
            None
        } else {
            Some(users.remove(0))
        })
    }

    pub async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let mut users: Vec<User> = self.find_all("users", &[("username", username)]).await?;
        Ok(if users.is_empty() {
            None
        } else {
            Some(users.remove(0))
        })
    }

    /// All todos owned by a user, with optional extra equality filters
    /// applied store-side.
    pub async fn find_todos_by_user(
        &self,
        user_id: &str,
        params: &[(&str, &str)],
    ) -> Result<Vec<Todo>, AppError> {
        let mut query: Vec<(&str, &str)> = vec![("userId", user_id)];
        query.extend_from_slice(params);
        self.find_all("todos", &query).await
    }

    /// The shared aggregate document holding all users' categories; an
    /// absent document reads as an empty one.
    pub async fn find_relations(&self) -> Result<RelationsDoc, AppError> {
        Ok(self
            .find_by_id(RELATIONS_RESOURCE, RELATIONS_DOC_ID)
            .await?
            .unwrap_or_default())
    }

    pub async fn save_relations(&self, doc: &RelationsDoc) -> Result<RelationsDoc, AppError> {
        self.update(RELATIONS_RESOURCE, RELATIONS_DOC_ID, doc).await
    }
}

fn timestamp_value() -> Value {
    serde_json::to_value(Utc::now()).expect("timestamp serialization cannot fail")
}

fn to_object<T: Serialize>(
    data: &T,
    context: &str,
) -> Result<serde_json::Map<String, Value>, AppError> {
    match serde_json::to_value(data) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::InternalServerError(format!(
            "{}: document body must be a JSON object",
            context
        ))),
        Err(err) => Err(AppError::InternalServerError(format!(
            "{}: {}",
            context, err
        ))),
    }
}

fn check_status(response: reqwest::Response, context: &str) -> Result<reqwest::Response, AppError> {
    let status = response.status();
    if status.is_success() {
        log::debug!("store response: {} {}", status, response.url());
        Ok(response)
    } else {
        log::error!("store response: {} {}", status, response.url());
        Err(AppError::Upstream {
            status: status.as_u16(),
            message: context.to_string(),
        })
    }
}

fn store_error(err: reqwest::Error, context: &str) -> AppError {
    log::error!("store request failed: {} ({})", context, err);
    AppError::Upstream {
        status: err.status().map(|s| s.as_u16()).unwrap_or(500),
        message: context.to_string(),
    }
}

//! Shared test harness: spawns the application against an in-process stub of
//! the external JSON document store, both on OS-assigned ports.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::TcpListener;
use std::sync::Mutex;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::middleware::Logger;
use actix_web::{web, App, HttpResponse, HttpServer};
use serde_json::{json, Value};

use todoforge::auth::AuthMiddleware;
use todoforge::config::Config;
use todoforge::db::StoreClient;
use todoforge::error;
use todoforge::rate_limit::RateLimiter;
use todoforge::routes;

/// In-memory document store speaking the same dialect as the real mock
/// server: per-resource collections, equality query filters, merge PATCH.
#[derive(Default)]
struct StubStore {
    collections: Mutex<HashMap<String, Vec<Value>>>,
}

fn doc_id_matches(doc: &Value, id: &str) -> bool {
    doc.get("id").and_then(Value::as_str) == Some(id)
}

fn value_matches(doc: &Value, key: &str, expected: &str) -> bool {
    match doc.get(key) {
        Some(Value::String(s)) => s == expected,
        Some(other) => other.to_string() == expected,
        None => false,
    }
}

async fn list_docs(
    store: web::Data<StubStore>,
    resource: web::Path<String>,
    query: web::Query<HashMap<String, String>>,
) -> HttpResponse {
    let collections = store.collections.lock().unwrap();
    let docs = collections
        .get(resource.as_str())
        .cloned()
        .unwrap_or_default();
    let filtered: Vec<Value> = docs
        .into_iter()
        .filter(|doc| {
            query
                .iter()
                .all(|(key, expected)| value_matches(doc, key, expected))
        })
        .collect();
    HttpResponse::Ok().json(filtered)
}

async fn get_doc(store: web::Data<StubStore>, path: web::Path<(String, String)>) -> HttpResponse {
    let (resource, id) = path.into_inner();
    let collections = store.collections.lock().unwrap();
    match collections
        .get(&resource)
        .and_then(|docs| docs.iter().find(|doc| doc_id_matches(doc, &id)))
    {
        Some(doc) => HttpResponse::Ok().json(doc),
        None => HttpResponse::NotFound().json(json!({})),
    }
}

async fn create_doc(
    store: web::Data<StubStore>,
    resource: web::Path<String>,
    body: web::Json<Value>,
) -> HttpResponse {
    let mut collections = store.collections.lock().unwrap();
    let docs = collections.entry(resource.into_inner()).or_default();
    let body = body.into_inner();
    docs.push(body.clone());
    HttpResponse::Created().json(body)
}

async fn replace_doc(
    store: web::Data<StubStore>,
    path: web::Path<(String, String)>,
    body: web::Json<Value>,
) -> HttpResponse {
    let (resource, id) = path.into_inner();
    let mut collections = store.collections.lock().unwrap();
    let docs = match collections.get_mut(&resource) {
        Some(docs) => docs,
        None => return HttpResponse::NotFound().json(json!({})),
    };
    match docs.iter_mut().find(|doc| doc_id_matches(doc, &id)) {
        Some(doc) => {
            let mut replacement = body.into_inner();
            if let Value::Object(ref mut map) = replacement {
                map.insert("id".to_string(), json!(id));
            }
            *doc = replacement.clone();
            HttpResponse::Ok().json(replacement)
        }
        None => HttpResponse::NotFound().json(json!({})),
    }
}

async fn merge_doc(
    store: web::Data<StubStore>,
    path: web::Path<(String, String)>,
    body: web::Json<Value>,
) -> HttpResponse {
    let (resource, id) = path.into_inner();
    let mut collections = store.collections.lock().unwrap();
    let docs = match collections.get_mut(&resource) {
        Some(docs) => docs,
        None => return HttpResponse::NotFound().json(json!({})),
    };
    match docs.iter_mut().find(|doc| doc_id_matches(doc, &id)) {
        Some(doc) => {
            let patch = body.into_inner();
            match (doc.as_object_mut(), patch.as_object()) {
                (Some(target), Some(patch)) => {
                    for (key, value) in patch {
                        target.insert(key.clone(), value.clone());
                    }
                    HttpResponse::Ok().json(Value::Object(target.clone()))
                }
                _ => HttpResponse::BadRequest().json(json!({})),
            }
        }
        None => HttpResponse::NotFound().json(json!({})),
    }
}

async fn delete_doc(
    store: web::Data<StubStore>,
    path: web::Path<(String, String)>,
) -> HttpResponse {
    let (resource, id) = path.into_inner();
    let mut collections = store.collections.lock().unwrap();
    let docs = match collections.get_mut(&resource) {
        Some(docs) => docs,
        None => return HttpResponse::NotFound().json(json!({})),
    };
    let before = docs.len();
    docs.retain(|doc| !doc_id_matches(doc, &id));
    if docs.len() < before {
        HttpResponse::Ok().json(json!({}))
    } else {
        HttpResponse::NotFound().json(json!({}))
    }
}

fn listen_on_random_port() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let address = format!("http://127.0.0.1:{}", listener.local_addr().unwrap().port());
    (listener, address)
}

/// Spawns the stub store, seeded with an empty relations document, and
/// returns its base URL.
fn spawn_stub_store() -> String {
    let (listener, address) = listen_on_random_port();

    let data = web::Data::new(StubStore::default());
    data.collections.lock().unwrap().insert(
        "user-todo-relations".to_string(),
        vec![json!({
            "id": "1",
            "userTodoRelations": [],
            "categories": []
        })],
    );

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .route("/{resource}", web::get().to(list_docs))
            .route("/{resource}", web::post().to(create_doc))
            .route("/{resource}/{id}", web::get().to(get_doc))
            .route("/{resource}/{id}", web::put().to(replace_doc))
            .route("/{resource}/{id}", web::patch().to(merge_doc))
            .route("/{resource}/{id}", web::delete().to(delete_doc))
    })
    .listen(listener)
    .expect("Failed to listen on stub store port")
    .workers(1)
    .run();
    actix_web::rt::spawn(server);

    address
}

pub struct TestApp {
    /// Base URL of the application under test.
    pub address: String,
    /// Base URL of the stub document store, for direct state assertions.
    pub store_url: String,
    pub client: reqwest::Client,
}

fn test_config(store_url: &str) -> Config {
    Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 0,
        database_url: store_url.to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_expires_hours: 24,
        // The minimum bcrypt cost keeps the auth flows fast in tests.
        bcrypt_cost: 4,
        max_login_attempts: 5,
        account_lock_minutes: 15,
        // High enough that only the dedicated rate-limit tests hit it.
        rate_limit_max: 1000,
        rate_limit_window_secs: 900,
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(|_| {}).await
}

/// Spawns the stub store and the application, with a hook to adjust the
/// configuration (lockout threshold, rate limits) before startup.
pub async fn spawn_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let store_url = spawn_stub_store();
    let mut config = test_config(&store_url);
    customize(&mut config);

    let (listener, address) = listen_on_random_port();

    let store = web::Data::new(StoreClient::new(&config.database_url));
    let rate_limiter = web::Data::new(RateLimiter::new(
        config.rate_limit_max,
        Duration::from_secs(config.rate_limit_window_secs),
    ));
    let config = web::Data::new(config);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(config.clone())
            .app_data(store.clone())
            .app_data(rate_limiter.clone())
            .app_data(web::JsonConfig::default().error_handler(error::json_error_handler))
            .app_data(web::QueryConfig::default().error_handler(error::query_error_handler))
            .wrap(
                Cors::default()
                    .allow_any_origin()
                    .allow_any_method()
                    .allow_any_header()
                    .max_age(3600),
            )
            .wrap(Logger::default())
            .service(routes::health::health)
            .service(
                web::scope("/api")
                    .wrap(AuthMiddleware)
                    .configure(routes::config),
            )
    })
    .listen(listener)
    .expect("Failed to listen on app port")
    .workers(1)
    .run();
    actix_web::rt::spawn(server);

    TestApp {
        address,
        store_url,
        client: reqwest::Client::new(),
    }
}

/// Registers a user and returns `(user_id, token)`.
pub async fn register_user(
    app: &TestApp,
    username: &str,
    email: &str,
    password: &str,
) -> (String, String) {
    let resp = app
        .client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({
            "username": username,
            "email": email,
            "password": password,
            "firstName": "Test",
            "lastName": "User"
        }))
        .send()
        .await
        .expect("Failed to send register request");
    let status = resp.status();
    let body: Value = resp.json().await.expect("Failed to parse register response");
    assert_eq!(status, 201, "registration failed: {}", body);

    (
        body["data"]["user"]["id"].as_str().unwrap().to_string(),
        body["data"]["token"].as_str().unwrap().to_string(),
    )
}

/// Creates a todo through the API and returns the created document.
pub async fn create_todo(app: &TestApp, token: &str, payload: Value) -> Value {
    let resp = app
        .client
        .post(format!("{}/api/todos", app.address))
        .bearer_auth(token)
        .json(&payload)
        .send()
        .await
        .expect("Failed to send create todo request");
    let status = resp.status();
    let body: Value = resp
        .json()
        .await
        .expect("Failed to parse create todo response");
    assert_eq!(status, 201, "todo creation failed: {}", body);
    body["data"]["todo"].clone()
}

/// Creates a category through the API and returns the created document.
pub async fn create_category(app: &TestApp, token: &str, payload: Value) -> Value {
    let resp = app
        .client
        .post(format!("{}/api/categories", app.address))
        .bearer_auth(token)
        .json(&payload)
        .send()
        .await
        .expect("Failed to send create category request");
    let status = resp.status();
    let body: Value = resp
        .json()
        .await
        .expect("Failed to parse create category response");
    assert_eq!(status, 201, "category creation failed: {}", body);
    body["data"]["category"].clone()
}

mod common;

use common::{register_user, spawn_app, spawn_app_with};
use serde_json::{json, Value};

#[actix_rt::test]
async fn test_register_and_login_flow() {
    let app = spawn_app().await;

    let (user_id, token) = register_user(&app, "alice", "alice@example.com", "Passw0rd").await;
    assert!(!user_id.is_empty());
    assert!(!token.is_empty());

    // Login with the username
    let resp = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "username": "alice", "password": "Passw0rd" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["username"], "alice");
    assert!(body["data"]["user"]["lastLoginAt"].is_string());
    // The password hash never leaves the server
    assert!(body["data"]["user"].get("password").is_none());
    let token = body["data"]["token"].as_str().unwrap();

    // The token authenticates /me
    let resp = app
        .client
        .get(format!("{}/api/auth/me", app.address))
        .bearer_auth(token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user"]["id"], user_id.as_str());
}

#[actix_rt::test]
async fn test_login_with_email_fallback() {
    let app = spawn_app().await;
    register_user(&app, "bob", "bob@example.com", "Passw0rd").await;

    let resp = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "username": "bob@example.com", "password": "Passw0rd" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[actix_rt::test]
async fn test_duplicate_email_creates_no_record() {
    let app = spawn_app().await;
    register_user(&app, "carol", "carol@example.com", "Passw0rd").await;

    let resp = app
        .client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({
            "username": "carol2",
            "email": "carol@example.com",
            "password": "Passw0rd",
            "firstName": "Carol",
            "lastName": "Two"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(
        body["error"]["message"],
        "User with this email already exists"
    );

    // No second record landed in the store
    let users: Vec<Value> = app
        .client
        .get(format!("{}/users", app.store_url))
        .query(&[("email", "carol@example.com")])
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(users.len(), 1);
}

#[actix_rt::test]
async fn test_duplicate_username_rejected() {
    let app = spawn_app().await;
    register_user(&app, "dave", "dave@example.com", "Passw0rd").await;

    let resp = app
        .client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({
            "username": "dave",
            "email": "other@example.com",
            "password": "Passw0rd",
            "firstName": "Dave",
            "lastName": "Other"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Username is already taken");
}

#[actix_rt::test]
async fn test_register_validation_details() {
    let app = spawn_app().await;

    let resp = app
        .client
        .post(format!("{}/api/auth/register", app.address))
        .json(&json!({
            "username": "x!",
            "email": "not-an-email",
            "password": "weak",
            "firstName": "",
            "lastName": "User"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Validation failed");
    // Every violated field is reported at once
    let details = body["error"]["details"].as_array().unwrap();
    let fields: Vec<&str> = details
        .iter()
        .map(|d| d.as_str().unwrap().split(':').next().unwrap())
        .collect();
    assert!(fields.contains(&"username"));
    assert!(fields.contains(&"email"));
    assert!(fields.contains(&"password"));
    assert!(fields.contains(&"firstName"));
}

#[actix_rt::test]
async fn test_account_lockout_after_repeated_failures() {
    let app = spawn_app_with(|config| config.max_login_attempts = 3).await;
    register_user(&app, "eve", "eve@example.com", "Passw0rd").await;

    for _ in 0..3 {
        let resp = app
            .client
            .post(format!("{}/api/auth/login", app.address))
            .json(&json!({ "username": "eve", "password": "WrongPassw0rd" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
    }

    // Locked now, even with the correct password
    let resp = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "username": "eve", "password": "Passw0rd" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 423);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
}

#[actix_rt::test]
async fn test_failed_logins_below_threshold_do_not_lock() {
    let app = spawn_app().await;
    register_user(&app, "frank", "frank@example.com", "Passw0rd").await;

    for _ in 0..2 {
        let resp = app
            .client
            .post(format!("{}/api/auth/login", app.address))
            .json(&json!({ "username": "frank", "password": "Nope1234" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 401);
    }

    // Still below the threshold: the correct password works and resets the
    // counter.
    let resp = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "username": "frank", "password": "Passw0rd" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user"]["loginAttempts"], 0);
}

#[actix_rt::test]
async fn test_requests_without_token_are_rejected() {
    let app = spawn_app().await;

    let resp = app
        .client
        .get(format!("{}/api/auth/me", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .client
        .get(format!("{}/api/todos", app.address))
        .bearer_auth("garbage-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Invalid token.");
}

#[actix_rt::test]
async fn test_change_password_flow() {
    let app = spawn_app().await;
    let (_, token) = register_user(&app, "grace", "grace@example.com", "Passw0rd").await;

    // Wrong current password is refused
    let resp = app
        .client
        .post(format!("{}/api/auth/change-password", app.address))
        .bearer_auth(&token)
        .json(&json!({ "currentPassword": "Wrong0ne", "newPassword": "NewPassw0rd" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = app
        .client
        .post(format!("{}/api/auth/change-password", app.address))
        .bearer_auth(&token)
        .json(&json!({ "currentPassword": "Passw0rd", "newPassword": "NewPassw0rd" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // The old password no longer logs in, the new one does
    let resp = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "username": "grace", "password": "Passw0rd" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);

    let resp = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "username": "grace", "password": "NewPassw0rd" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
}

#[actix_rt::test]
async fn test_auth_rate_limit() {
    let app = spawn_app_with(|config| config.rate_limit_max = 2).await;

    // The register and login endpoints share one window per source address.
    register_user(&app, "henry", "henry@example.com", "Passw0rd").await;
    let resp = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "username": "henry", "password": "Passw0rd" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = app
        .client
        .post(format!("{}/api/auth/login", app.address))
        .json(&json!({ "username": "henry", "password": "Passw0rd" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 429);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(
        body["error"]["message"],
        "Too many authentication attempts, please try again later."
    );
}

#[actix_rt::test]
async fn test_logout() {
    let app = spawn_app().await;
    let (_, token) = register_user(&app, "iris", "iris@example.com", "Passw0rd").await;

    let resp = app
        .client
        .post(format!("{}/api/auth/logout", app.address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["message"], "Logout successful");
}

#[actix_rt::test]
async fn test_health_is_public() {
    let app = spawn_app().await;

    let resp = app
        .client
        .get(format!("{}/health", app.address))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["status"], "ok");
}

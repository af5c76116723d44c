use actix_web::{get, post, web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde_json::json;
use validator::Validate;

use crate::{
    auth::{
        generate_token, hash_password, verify_password, AuthenticatedUser, ChangePasswordRequest,
        LoginRequest, RegisterRequest,
    },
    config::Config,
    db::StoreClient,
    error::AppError,
    models::{user::NewUser, PublicUser, User},
    rate_limit::RateLimiter,
    response,
};

fn client_ip(req: &HttpRequest) -> String {
    req.peer_addr()
        .map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Register a new user
///
/// Creates a new user account with default preferences and returns the
/// public user together with an authentication token. Rate limited per
/// source address.
#[post("/register")]
pub async fn register(
    req: HttpRequest,
    store: web::Data<StoreClient>,
    config: web::Data<Config>,
    limiter: web::Data<RateLimiter>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, AppError> {
    limiter.check(&client_ip(&req))?;
    payload.validate()?;

    let email = payload.email.to_lowercase();

    if store.find_user_by_email(&email).await?.is_some() {
        return Err(AppError::Conflict(
            "User with this email already exists".into(),
        ));
    }
    if store
        .find_user_by_username(&payload.username)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Username is already taken".into()));
    }

    let password = hash_password(&payload.password, config.bcrypt_cost)?;
    let new_user = NewUser::new(
        payload.username.clone(),
        email,
        password,
        payload.first_name.clone(),
        payload.last_name.clone(),
    );

    let created: User = store.create("users", &new_user).await?;
    let token = generate_token(&created.id, &config.jwt_secret, config.jwt_expires_hours)?;

    Ok(response::created(
        "User registered successfully",
        json!({
            "user": PublicUser::from(created),
            "token": token,
        }),
    ))
}

/// Login user
///
/// Authenticates by username (falling back to email), enforcing the
/// account-lockout policy, and returns an authentication token. Rate limited
/// per source address.
#[post("/login")]
pub async fn login(
    req: HttpRequest,
    store: web::Data<StoreClient>,
    config: web::Data<Config>,
    limiter: web::Data<RateLimiter>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, AppError> {
    limiter.check(&client_ip(&req))?;
    payload.validate()?;

    let user = match store.find_user_by_username(&payload.username).await? {
        Some(user) => Some(user),
        None => store.find_user_by_email(&payload.username).await?,
    };
    let user = user.ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

    if let Some(locked_until) = user.account_locked_until {
        if locked_until > Utc::now() {
            return Err(AppError::AccountLocked(
                "Account is temporarily locked due to multiple failed login attempts".into(),
            ));
        }
    }

    if !user.is_active {
        return Err(AppError::Unauthorized("Account is deactivated".into()));
    }

    if !verify_password(&payload.password, &user.password)? {
        let attempts = user.login_attempts + 1;
        let mut patch = json!({ "loginAttempts": attempts });
        if attempts >= config.max_login_attempts {
            let locked_until = Utc::now() + chrono::Duration::minutes(config.account_lock_minutes);
            patch["accountLockedUntil"] = json!(locked_until);
        }
        let _: User = store.partial_update("users", &user.id, &patch).await?;
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let user: User = store
        .partial_update(
            "users",
            &user.id,
            &json!({
                "loginAttempts": 0,
                "accountLockedUntil": null,
                "lastLoginAt": Utc::now(),
            }),
        )
        .await?;

    let token = generate_token(&user.id, &config.jwt_secret, config.jwt_expires_hours)?;

    Ok(response::ok_with_message(
        "Login successful",
        json!({
            "user": PublicUser::from(user),
            "token": token,
        }),
    ))
}

/// Logout user
///
/// Tokens are stateless; logout is a client-side token removal.
#[post("/logout")]
pub async fn logout(_user: AuthenticatedUser) -> HttpResponse {
    response::message_only("Logout successful")
}

/// Get current user profile
#[get("/me")]
pub async fn me(user: AuthenticatedUser) -> HttpResponse {
    response::ok(json!({ "user": PublicUser::from(user.0) }))
}

/// Change user password
///
/// Verifies the current password before storing the new hash.
#[post("/change-password")]
pub async fn change_password(
    user: AuthenticatedUser,
    store: web::Data<StoreClient>,
    config: web::Data<Config>,
    payload: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, AppError> {
    payload.validate()?;

    if !verify_password(&payload.current_password, &user.0.password)? {
        return Err(AppError::BadRequest(
            "Current password is incorrect".into(),
        ));
    }

    let password = hash_password(&payload.new_password, config.bcrypt_cost)?;
    let _: User = store
        .partial_update("users", &user.0.id, &json!({ "password": password }))
        .await?;

    Ok(response::message_only("Password changed successfully"))
}

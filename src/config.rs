use std::env;

/// Runtime configuration, loaded once at startup and injected into the
/// application as shared data. Handlers and middleware read tunables from
/// here instead of the process environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,
    /// Base URL of the external JSON document store.
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expires_hours: i64,
    pub bcrypt_cost: u32,
    /// Failed logins tolerated before the account is locked.
    pub max_login_attempts: u32,
    pub account_lock_minutes: i64,
    /// Sliding-window ceiling for the auth endpoints, per source address.
    pub rate_limit_max: usize,
    pub rate_limit_window_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .expect("SERVER_PORT must be a number"),
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            jwt_expires_hours: env::var("JWT_EXPIRES_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .expect("JWT_EXPIRES_HOURS must be a number"),
            bcrypt_cost: env::var("BCRYPT_COST")
                .unwrap_or_else(|_| "12".to_string())
                .parse()
                .expect("BCRYPT_COST must be a number"),
            max_login_attempts: env::var("MAX_LOGIN_ATTEMPTS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("MAX_LOGIN_ATTEMPTS must be a number"),
            account_lock_minutes: env::var("ACCOUNT_LOCK_MINUTES")
                .unwrap_or_else(|_| "15".to_string())
                .parse()
                .expect("ACCOUNT_LOCK_MINUTES must be a number"),
            rate_limit_max: env::var("RATE_LIMIT_MAX")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .expect("RATE_LIMIT_MAX must be a number"),
            rate_limit_window_secs: env::var("RATE_LIMIT_WINDOW_SECS")
                .unwrap_or_else(|_| "900".to_string())
                .parse()
                .expect("RATE_LIMIT_WINDOW_SECS must be a number"),
        }
    }

    pub fn server_url(&self) -> String {
        format!("http://{}:{}", self.server_host, self.server_port)
    }
}

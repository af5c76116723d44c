use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// A user document as stored in the external document store.
///
/// Field names are camelCase on the wire to match the store's documents.
/// The `password` field holds the bcrypt hash and must never reach a client;
/// responses go through [`PublicUser`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub avatar: String,
    pub is_active: bool,
    #[serde(default)]
    pub login_attempts: u32,
    #[serde(default)]
    pub account_locked_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub preferences: Preferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The client-facing projection of a [`User`]: everything except the
/// password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: String,
    pub is_active: bool,
    pub login_attempts: u32,
    pub account_locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub preferences: Preferences,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            avatar: user.avatar,
            is_active: user.is_active,
            login_attempts: user.login_attempts,
            account_locked_until: user.account_locked_until,
            last_login_at: user.last_login_at,
            preferences: user.preferences,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// A user about to be created; the resource client stamps `id`, `createdAt`
/// and `updatedAt` on write.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub avatar: String,
    pub is_active: bool,
    pub login_attempts: u32,
    pub account_locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub preferences: Preferences,
}

impl NewUser {
    /// Applies registration defaults: active account, zeroed lockout
    /// counters, default preferences.
    pub fn new(
        username: String,
        email: String,
        password: String,
        first_name: String,
        last_name: String,
    ) -> Self {
        Self {
            username,
            email,
            password,
            first_name,
            last_name,
            avatar: String::new(),
            is_active: true,
            login_attempts: 0,
            account_locked_until: None,
            last_login_at: None,
            preferences: Preferences::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPrefs {
    pub browser: bool,
    pub in_app: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub theme: Theme,
    pub language: String,
    pub notifications: NotificationPrefs,
    pub timezone: String,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            language: "en".to_string(),
            notifications: NotificationPrefs {
                browser: true,
                in_app: true,
            },
            timezone: "UTC".to_string(),
        }
    }
}

/// Partial update of [`Preferences`]; absent fields keep their current value.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PreferencesPatch {
    pub theme: Option<Theme>,
    #[validate(length(min = 2, max = 5, message = "Language code must be 2-5 characters"))]
    pub language: Option<String>,
    pub notifications: Option<NotificationsPatch>,
    #[validate(length(min = 1, max = 50, message = "Timezone must be 1-50 characters"))]
    pub timezone: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationsPatch {
    pub browser: Option<bool>,
    pub in_app: Option<bool>,
}

impl Preferences {
    /// Deterministic field-by-field merge of a patch into the current
    /// preferences, including the nested notifications object.
    pub fn merge(&mut self, patch: PreferencesPatch) {
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
        if let Some(language) = patch.language {
            self.language = language;
        }
        if let Some(timezone) = patch.timezone {
            self.timezone = timezone;
        }
        if let Some(notifications) = patch.notifications {
            if let Some(browser) = notifications.browser {
                self.notifications.browser = browser;
            }
            if let Some(in_app) = notifications.in_app {
                self.notifications.in_app = in_app;
            }
        }
    }
}

/// Payload for `PATCH /api/users/preferences`; the patch is nested under a
/// `preferences` key.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdatePreferencesRequest {
    #[validate]
    pub preferences: PreferencesPatch,
}

/// Payload for `PUT /api/users/profile`. All fields optional; only the
/// provided ones are written.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 50, message = "First name must be 1-50 characters long"))]
    pub first_name: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Last name must be 1-50 characters long"))]
    pub last_name: Option<String>,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: Option<String>,
}

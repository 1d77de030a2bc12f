//! Model users
use chrono::{DateTime, Utc};

use validator::Validate;

use models::{CouponCode, UserId, UserRole};

/// DB representation of a user.
///
/// Users are keyed by email: products reference their owner by email value,
/// not by id. A user starts unverified and gets `is_verified` flipped by the
/// checkout confirmation handler.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub photo: Option<String>,
    pub role: UserRole,
    pub is_verified: bool,
    pub settings: UserSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Per-user presentation settings.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UserSettings {
    pub theme: String,
    pub notifications: bool,
    pub privacy: String,
}

impl Default for UserSettings {
    fn default() -> Self {
        UserSettings {
            theme: "light".to_string(),
            notifications: true,
            privacy: "public".to_string(),
        }
    }
}

/// Payload for the idempotent first-sign-in upsert.
#[derive(Serialize, Deserialize, Clone, Validate, Debug)]
pub struct NewUser {
    #[validate(email)]
    pub email: String,
    #[validate(length(max = "120"))]
    pub name: String,
    pub photo: Option<String>,
}

/// Payload for updating user settings.
#[derive(Serialize, Deserialize, Clone, Validate, Debug)]
pub struct UpdateUserSettings {
    #[validate(length(max = "120"))]
    pub name: String,
    pub theme: String,
    pub notifications: bool,
    pub privacy: String,
}

/// Settings as presented to the owner.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct UserSettingsView {
    pub theme: String,
    pub notifications: bool,
    pub privacy: String,
    pub name: String,
}

impl From<User> for UserSettingsView {
    fn from(user: User) -> Self {
        UserSettingsView {
            theme: user.settings.theme,
            notifications: user.settings.notifications,
            privacy: user.settings.privacy,
            name: user.name,
        }
    }
}

/// Payload delivered by the payment gateway success signal.
#[derive(Serialize, Deserialize, Clone, Validate, Debug)]
pub struct ConfirmPayment {
    #[validate(email)]
    pub email: String,
    pub coupon_code: Option<CouponCode>,
}

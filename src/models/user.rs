// src/models/user.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Represents the 'users' table in the database.
///
/// There is no public registration; the admin account is seeded from
/// configuration on startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique sign-in email.
    pub email: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role; currently only 'admin' exists.
    pub role: String,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// DTO for admin login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,

    /// Persistence mode: true keeps the session for the durable lifetime,
    /// false scopes it to a short session lifetime.
    #[serde(default)]
    pub remember_me: bool,
}

/// DTO for requesting a password reset.
#[derive(Debug, Deserialize, Validate)]
pub struct ForgotPasswordRequest {
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
}

/// DTO for consuming a password reset token.
#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(length(min = 1))]
    pub token: String,

    #[validate(length(
        min = 8,
        max = 128,
        message = "Password length must be between 8 and 128 characters"
    ))]
    pub new_password: String,
}

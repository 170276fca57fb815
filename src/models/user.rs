// src/models/user.rs

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use validator::Validate;

use crate::models::exam_result::AttemptHistoryEntry;

/// Letters, spaces, apostrophes, dots and hyphens.
static DISPLAY_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}][\p{L} .'-]{0,59}$").expect("valid display name regex"));

/// Represents the 'users' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,

    /// Unique login name.
    pub username: String,

    /// Argon2 password hash.
    /// Skipped during serialization to prevent leaking sensitive data.
    #[serde(skip)]
    pub password: String,

    /// User role: 'user' or 'admin'.
    pub role: String,

    pub display_name: Option<String>,

    /// Dark mode display preference.
    pub dark_mode: bool,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Profile screen payload for the current user.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub role: String,
    pub dark_mode: bool,
    pub progress_percentage: u8,
    pub results: Vec<AttemptHistoryEntry>,
}

/// DTO for creating a new user (Registration).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(
        min = 3,
        max = 50,
        message = "Username length must be between 3 and 50 characters."
    ))]
    pub username: String,
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password length must be between 6 and 128 characters."
    ))]
    pub password: String,
    #[validate(regex(path = *DISPLAY_NAME_RE, message = "Display name contains invalid characters."))]
    pub display_name: Option<String>,
}

/// DTO for user login.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 1, max = 50))]
    pub username: String,
    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// DTO for changing the password of the signed-in user.
#[derive(Debug, Deserialize, Validate)]
pub struct ChangePasswordRequest {
    #[validate(length(
        min = 6,
        max = 128,
        message = "Password must be at least 6 characters."
    ))]
    pub new_password: String,
    #[validate(must_match(other = "new_password", message = "Passwords do not match."))]
    pub confirm_password: String,
}

/// DTO for profile edits. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(regex(path = *DISPLAY_NAME_RE, message = "Display name contains invalid characters."))]
    pub display_name: Option<String>,
    pub dark_mode: Option<bool>,
}

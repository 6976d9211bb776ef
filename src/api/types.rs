use serde::{Deserialize, Serialize};

use crate::db::User;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
    pub password: String,
    pub confirm_password: String,
}

/// Registration response. Carries the TOTP seed exactly once, for
/// authenticator enrolment; there is no endpoint to read it back.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub email: String,
    pub totp_seed: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    pub totp_code: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub email: String,
    pub role: String,
    /// Post-login destination, keyed by role.
    pub redirect_to: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub id: i32,
    pub email: String,
    pub firstname: String,
    pub lastname: String,
    pub phone: String,
    pub role: String,
    pub registered_on: String,
    pub current_login: Option<String>,
    pub last_login: Option<String>,
}

impl From<User> for AccountResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            firstname: user.firstname,
            lastname: user.lastname,
            phone: user.phone,
            role: user.role.as_str().to_string(),
            registered_on: user.registered_on,
            current_login: user.current_login,
            last_login: user.last_login,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubmitDrawRequest {
    pub numbers: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct ClearPlayedResponse {
    pub deleted: u64,
}

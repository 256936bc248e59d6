use serde::{Deserialize, Serialize};

use crate::auth::repo::User;

/// Registration payload. Fields are optional so the validation layer can
/// report every missing field at once instead of failing deserialization.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthData {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Serialize)]
pub struct UserData {
    pub user: User,
}

use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use tracing::{info, instrument, warn};

use crate::auth::dto::{AuthData, LoginRequest, RegisterRequest, UserData};
use crate::auth::extractors::CurrentUser;
use crate::auth::jwt::JwtKeys;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::User;
use crate::error::{is_unique_violation, ApiError};
use crate::extract::JsonBody;
use crate::response::ApiBody;
use crate::state::AppState;
use crate::validate::{is_valid_email, Checker, Mode, Violation};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
}

fn validate_register(payload: &RegisterRequest) -> Result<(), Vec<Violation>> {
    let mut c = Checker::new(Mode::Create);

    if c.required(
        "email",
        payload.email.is_some(),
        "Please provide a valid email address",
    ) {
        let email = payload.email.as_deref().unwrap_or_default().trim();
        c.check(
            "email",
            is_valid_email(email),
            "Please provide a valid email address",
        );
    }
    if c.required(
        "password",
        payload.password.is_some(),
        "Password must be at least 8 characters",
    ) {
        let password = payload.password.as_deref().unwrap_or_default();
        c.check(
            "password",
            password.chars().count() >= 8,
            "Password must be at least 8 characters",
        );
    }
    if c.required(
        "firstName",
        payload.first_name.is_some(),
        "First name is required and must be less than 50 characters",
    ) {
        let name = payload.first_name.as_deref().unwrap_or_default().trim();
        c.check(
            "firstName",
            !name.is_empty() && name.chars().count() <= 50,
            "First name is required and must be less than 50 characters",
        );
    }
    if c.required(
        "lastName",
        payload.last_name.is_some(),
        "Last name is required and must be less than 50 characters",
    ) {
        let name = payload.last_name.as_deref().unwrap_or_default().trim();
        c.check(
            "lastName",
            !name.is_empty() && name.chars().count() <= 50,
            "Last name is required and must be less than 50 characters",
        );
    }

    c.finish()
}

fn validate_login(payload: &LoginRequest) -> Result<(), Vec<Violation>> {
    let mut c = Checker::new(Mode::Create);
    c.required(
        "email",
        payload.email.as_deref().is_some_and(|e| !e.trim().is_empty()),
        "Email is required",
    );
    c.required(
        "password",
        payload.password.as_deref().is_some_and(|p| !p.is_empty()),
        "Password is required",
    );
    c.finish()
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiBody<AuthData>>), ApiError> {
    validate_register(&payload).map_err(ApiError::Validation)?;

    let email = payload
        .email
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let first_name = payload.first_name.as_deref().unwrap_or_default().trim();
    let last_name = payload.last_name.as_deref().unwrap_or_default().trim();

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(ApiError::Conflict("email"));
    }

    let hash = hash_password(payload.password.as_deref().unwrap_or_default())?;

    let user = match User::create(&state.db, &email, &hash, first_name, last_name).await {
        Ok(user) => user,
        // Concurrent registration can slip past the pre-check.
        Err(e) if is_unique_violation(&e) => return Err(ApiError::Conflict("email")),
        Err(e) => return Err(e.into()),
    };

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.email)?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(ApiBody::with_message(
            "User registered successfully",
            AuthData { token, user },
        )),
    ))
}

#[instrument(skip(state, payload))]
async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<Json<ApiBody<AuthData>>, ApiError> {
    validate_login(&payload).map_err(ApiError::Validation)?;

    let email = payload
        .email
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_lowercase();

    // Unknown email and wrong password are indistinguishable to the caller.
    let user = match User::find_by_email(&state.db, &email).await? {
        Some(user) => user,
        None => {
            warn!(email = %email, "login unknown email");
            return Err(ApiError::Unauthorized("Invalid credentials".into()));
        }
    };

    let password = payload.password.as_deref().unwrap_or_default();
    if !verify_password(password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id, &user.email)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(ApiBody::with_message(
        "Login successful",
        AuthData { token, user },
    )))
}

#[instrument(skip_all)]
async fn me(CurrentUser(user): CurrentUser) -> Json<ApiBody<UserData>> {
    Json(ApiBody::data(UserData { user }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_requires_all_fields() {
        let violations = validate_register(&RegisterRequest::default()).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "password", "firstName", "lastName"]);
    }

    #[test]
    fn register_rejects_bad_email_and_short_password() {
        let payload = RegisterRequest {
            email: Some("invalid-email".into()),
            password: Some("123".into()),
            first_name: Some("A".into()),
            last_name: Some("B".into()),
        };
        let violations = validate_register(&payload).unwrap_err();
        let fields: Vec<&str> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, vec!["email", "password"]);
    }

    #[test]
    fn register_accepts_minimal_valid_payload() {
        let payload = RegisterRequest {
            email: Some("a@x.com".into()),
            password: Some("abcdefgh".into()),
            first_name: Some("A".into()),
            last_name: Some("B".into()),
        };
        assert!(validate_register(&payload).is_ok());
    }

    #[test]
    fn register_caps_name_length() {
        let payload = RegisterRequest {
            email: Some("a@x.com".into()),
            password: Some("abcdefgh".into()),
            first_name: Some("x".repeat(51)),
            last_name: Some("B".into()),
        };
        let violations = validate_register(&payload).unwrap_err();
        assert_eq!(violations[0].field, "firstName");
    }

    #[test]
    fn register_lengths_count_characters_not_bytes() {
        // 50 accented characters are 100 bytes but fit the 50-char cap.
        let payload = RegisterRequest {
            email: Some("a@x.com".into()),
            password: Some("abcdefgh".into()),
            first_name: Some("é".repeat(50)),
            last_name: Some("B".into()),
        };
        assert!(validate_register(&payload).is_ok());

        // 4 accented characters are 8 bytes but only 4 of the 8 required.
        let payload = RegisterRequest {
            email: Some("a@x.com".into()),
            password: Some("é".repeat(4)),
            first_name: Some("A".into()),
            last_name: Some("B".into()),
        };
        let violations = validate_register(&payload).unwrap_err();
        assert_eq!(violations[0].field, "password");
    }

    #[test]
    fn login_requires_email_and_password() {
        let violations = validate_login(&LoginRequest::default()).unwrap_err();
        assert_eq!(violations.len(), 2);

        let payload = LoginRequest {
            email: Some("  ".into()),
            password: Some("secret".into()),
        };
        let violations = validate_login(&payload).unwrap_err();
        assert_eq!(violations[0].field, "email");
    }
}

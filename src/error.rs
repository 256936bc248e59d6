use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::validate::Violation;

/// Everything a handler can fail with, mapped onto the JSON error envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthorized(String),
    #[error("Validation failed")]
    Validation(Vec<Violation>),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0} already exists")]
    Conflict(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Validation(_) | ApiError::Conflict(_) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(source) = &self {
            tracing::error!(error = ?source, "internal error");
        }
        let mut body = json!({
            "success": false,
            "message": self.to_string(),
        });
        if let ApiError::Validation(violations) = &self {
            body["errors"] = serde_json::to_value(violations).unwrap_or_default();
        }
        (self.status(), Json(body)).into_response()
    }
}

/// Detects a unique-index violation surfaced through an anyhow chain.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<sqlx::Error>(),
        Some(sqlx::Error::Database(db)) if db.code().as_deref() == Some("23505")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn unauthorized_maps_to_401_envelope() {
        let (status, body) = body_json(ApiError::Unauthorized("Invalid or expired token".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Invalid or expired token");
    }

    #[tokio::test]
    async fn validation_carries_all_violations() {
        let violations = vec![
            Violation::new("name", "Wine name is required and must be less than 200 characters"),
            Violation::new("vintage", "Vintage must be a valid year between 1800 and current year"),
        ];
        let (status, body) = body_json(ApiError::Validation(violations)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"].as_array().map(Vec::len), Some(2));
        assert_eq!(body["errors"][0]["field"], "name");
    }

    #[tokio::test]
    async fn not_found_is_uniform() {
        let (status, body) = body_json(ApiError::NotFound("Wine")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Wine not found");
    }

    #[tokio::test]
    async fn conflict_names_the_field() {
        let (status, body) = body_json(ApiError::Conflict("email")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "email already exists");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let (status, body) = body_json(ApiError::Internal(anyhow::anyhow!("pool timed out"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }
}

/// Error handling for the API server
///
/// This module provides a unified error type that maps to HTTP responses.
/// All handlers return `Result<T, ApiError>`, which converts to the wire
/// failure shape `{"success": false, "message": "...", "error": "..."?}`
/// with the appropriate status code.
///
/// # Taxonomy
///
/// - `Validation` (400): missing or malformed input
/// - `Unauthorized` (401): missing/invalid/expired token, wrong password
/// - `Forbidden` (403): authenticated but not permitted
/// - `NotFound` (404): target entity does not resolve
/// - `Conflict` (409): duplicate membership or email
/// - `Internal` (500): everything unexpected; the cause is logged and also
///   attached to the response body (existing behavior carried forward from
///   the original service, documented as an information-disclosure gap)

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

use taskcrew_shared::auth::jwt::JwtError;
use taskcrew_shared::auth::middleware::AuthError;
use taskcrew_shared::auth::password::PasswordError;

/// API result type alias
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type
#[derive(Debug)]
pub enum ApiError {
    /// Bad request (400): missing or malformed input
    Validation(String),

    /// Unauthorized (401)
    Unauthorized(String),

    /// Forbidden (403): wrong role, not a member, not the creator
    Forbidden(String),

    /// Not found (404)
    NotFound(String),

    /// Conflict (409): duplicate membership, duplicate email
    Conflict(String),

    /// Internal server error (500)
    Internal(String),
}

/// Wire shape of a failed response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,

    /// Human-readable error message
    pub message: String,

    /// Underlying cause, attached for internal errors only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Validation(msg) => write!(f, "Validation failed: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, error) = match self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg, None),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg, None),
            ApiError::Internal(cause) => {
                tracing::error!(error = %cause, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                    Some(cause),
                )
            }
        };

        let body = Json(ErrorResponse {
            success: false,
            message,
            error,
        });

        (status, body).into_response()
    }
}

/// Convert sqlx errors to API errors
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Resource not found".to_string()),
            sqlx::Error::Database(db_err) => {
                // Unique constraint violations surface as conflicts.
                if let Some(constraint) = db_err.constraint() {
                    if constraint.contains("email") {
                        return ApiError::Conflict(
                            "User with this email already exists".to_string(),
                        );
                    }
                    if constraint.contains("memberships") {
                        return ApiError::Conflict(
                            "User is already a member of this team".to_string(),
                        );
                    }
                    return ApiError::Conflict(format!("Constraint violation: {}", constraint));
                }

                ApiError::Internal(format!("Database error: {}", db_err))
            }
            _ => ApiError::Internal(format!("Database error: {}", err)),
        }
    }
}

/// Convert token errors to API errors
impl From<JwtError> for ApiError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::Expired => ApiError::Unauthorized("Token expired".to_string()),
            JwtError::InvalidSignature => {
                ApiError::Unauthorized("Invalid token signature".to_string())
            }
            JwtError::Malformed(_) => ApiError::Unauthorized("Invalid token".to_string()),
            JwtError::Create(msg) => ApiError::Internal(msg),
        }
    }
}

/// Convert middleware auth errors to API errors
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::MissingCredentials => {
                ApiError::Unauthorized("Not authorized to access this route".to_string())
            }
            AuthError::InvalidFormat => ApiError::Unauthorized("Expected Bearer token".to_string()),
            AuthError::InvalidToken(jwt_err) => jwt_err.into(),
        }
    }
}

/// Convert password errors to API errors
impl From<PasswordError> for ApiError {
    fn from(err: PasswordError) -> Self {
        ApiError::Internal(format!("Password operation failed: {}", err))
    }
}

/// Flattens validator's per-field errors into one message
pub fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut messages: Vec<String> = errors
        .field_errors()
        .iter()
        .flat_map(|(field, errors)| {
            errors.iter().map(move |error| {
                error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value for {}", field))
            })
        })
        .collect();

    messages.sort();
    messages.join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[test]
    fn test_error_display() {
        let err = ApiError::Validation("Team name is required".to_string());
        assert_eq!(err.to_string(), "Validation failed: Team name is required");

        let err = ApiError::NotFound("Task not found".to_string());
        assert_eq!(err.to_string(), "Not found: Task not found");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Unauthorized("x".into()).into_response().status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Forbidden("x".into()).into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("x".into()).into_response().status(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::Internal("x".into()).into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_jwt_error_mapping() {
        assert!(matches!(
            ApiError::from(JwtError::Expired),
            ApiError::Unauthorized(_)
        ));
        assert!(matches!(
            ApiError::from(JwtError::InvalidSignature),
            ApiError::Unauthorized(_)
        ));
    }

    #[test]
    fn test_validation_message_flattening() {
        #[derive(Validate)]
        struct Probe {
            #[validate(email(message = "Invalid email format"))]
            email: String,
        }

        let probe = Probe {
            email: "not-an-email".to_string(),
        };
        let errors = probe.validate().unwrap_err();
        assert_eq!(validation_message(&errors), "Invalid email format");
    }
}

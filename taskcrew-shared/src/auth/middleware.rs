/// Authentication middleware for Axum
///
/// Extracts and validates the `Authorization: Bearer <token>` header and
/// places an [`AuthContext`] in the request extensions for handlers to
/// consume via `Extension<AuthContext>`.

use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::jwt::{validate_token, JwtError};

/// Authentication context added to request extensions after a successful
/// bearer-token validation
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,
}

/// Error type for the authentication middleware
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("Not authorized to access this route")]
    MissingCredentials,

    /// Authorization header is not a Bearer token
    #[error("Expected Bearer token")]
    InvalidFormat,

    /// Token validation failed
    #[error("{0}")]
    InvalidToken(#[from] JwtError),
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        // Every authentication failure is a 401; the message narrows it.
        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));

        (StatusCode::UNAUTHORIZED, body).into_response()
    }
}

/// Pulls the bearer token out of a request's headers
pub fn bearer_token(req: &Request) -> Result<&str, AuthError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AuthError::MissingCredentials)?;

    auth_header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::InvalidFormat)
}

/// Validates a bearer token and builds the auth context
pub fn authenticate(token: &str, secret: &str) -> Result<AuthContext, AuthError> {
    let claims = validate_token(token, secret)?;
    Ok(AuthContext {
        user_id: claims.sub,
    })
}

/// JWT authentication middleware
///
/// On success the request proceeds with an [`AuthContext`] extension; any
/// failure short-circuits with 401.
pub async fn jwt_auth_middleware(
    secret: String,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = bearer_token(&req)?;
    let auth_context = authenticate(token, &secret)?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{create_token, Claims};
    use axum::body::Body;

    const SECRET: &str = "test-secret-key-at-least-32-bytes-long";

    fn request_with_auth(value: Option<&str>) -> Request {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_extraction() {
        let req = request_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&req).unwrap(), "abc.def.ghi");

        let req = request_with_auth(None);
        assert!(matches!(
            bearer_token(&req),
            Err(AuthError::MissingCredentials)
        ));

        let req = request_with_auth(Some("Basic dXNlcjpwYXNz"));
        assert!(matches!(bearer_token(&req), Err(AuthError::InvalidFormat)));
    }

    #[test]
    fn test_authenticate_round_trip() {
        let user_id = Uuid::new_v4();
        let token = create_token(&Claims::new(user_id), SECRET).unwrap();

        let context = authenticate(&token, SECRET).unwrap();
        assert_eq!(context.user_id, user_id);

        assert!(authenticate(&token, "another-secret-of-32-bytes-here!").is_err());
        assert!(authenticate("garbage", SECRET).is_err());
    }

    #[test]
    fn test_auth_error_statuses() {
        let response = AuthError::MissingCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidFormat.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AuthError::InvalidToken(JwtError::Expired).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

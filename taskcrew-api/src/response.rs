/// The success response envelope
///
/// Every successful response is shaped `{"success": true, "data": {...}}`;
/// 201 responses use the same body with a Created status.

use axum::{http::StatusCode, Json};
use serde::Serialize;

/// Wire shape of a successful response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Always true
    pub success: bool,

    /// The endpoint's payload
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wraps a payload for a 200 response
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data,
        })
    }

    /// Wraps a payload for a 201 response
    pub fn created(data: T) -> (StatusCode, Json<Self>) {
        (StatusCode::CREATED, Self::ok(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shape() {
        let Json(body) = ApiResponse::ok(json!({ "id": 1 }));
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["data"]["id"], 1);
    }

    #[test]
    fn test_created_status() {
        let (status, _) = ApiResponse::created(json!({}));
        assert_eq!(status, StatusCode::CREATED);
    }
}

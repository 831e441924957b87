//! Success envelope shared by every endpoint.
//!
//! Errors use the same shape (see [`crate::errors::AppError`]), so clients can
//! always branch on `success` first.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            status: StatusCode::OK,
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::ok(message, data)
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl ApiResponse<()> {
    /// A success response without a payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: None,
            status: StatusCode::OK,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ok_serializes_data() {
        let response = ApiResponse::ok("Fetched", json!({ "id": 1 }));
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({ "success": true, "message": "Fetched", "data": { "id": 1 } }));
    }

    #[test]
    fn test_message_omits_data() {
        let value = serde_json::to_value(ApiResponse::message("Logged out")).unwrap();
        assert_eq!(value, json!({ "success": true, "message": "Logged out" }));
    }

    #[test]
    fn test_created_status() {
        assert_eq!(ApiResponse::created("Created", 1).status(), StatusCode::CREATED);
    }
}

//! Uniform success envelope returned by every API endpoint

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// `{ statusCode, isSuccess, message, detail }`
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub is_success: bool,
    pub message: String,
    pub detail: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 with the given message
    pub fn ok(message: impl Into<String>, detail: T) -> Self {
        Self {
            status_code: StatusCode::OK.as_u16(),
            is_success: true,
            message: message.into(),
            detail,
        }
    }

    /// 201 for newly created records
    pub fn created(message: impl Into<String>, detail: T) -> Self {
        Self {
            status_code: StatusCode::CREATED.as_u16(),
            is_success: true,
            message: message.into(),
            detail,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or(StatusCode::OK);
        (status, Json(self)).into_response()
    }
}

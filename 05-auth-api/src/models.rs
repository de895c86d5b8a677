//! Response envelope and error types shared by every route.
//! All JSON bodies follow `{ "success": bool, "message": string, ... }`; handlers add
//! their own fields through the flattened `data` part of `ApiResponse`.

use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const HEALTH_MESSAGE: &str = "JWT Auth API is running";
pub const ROUTE_NOT_FOUND_MESSAGE: &str = "Route not found";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Placeholder payload for envelopes that carry only `success` and `message`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoData {}

/// The standard response envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiResponse<T = NoData> {
    pub success: bool,
    pub message: String,
    #[serde(flatten)]
    pub data: T,
}

impl ApiResponse<NoData> {
    pub fn ok<M: Into<String>>(message: M) -> Self {
        Self { success: true, message: message.into(), data: NoData {} }
    }

    pub fn failure<M: Into<String>>(message: M) -> Self {
        Self { success: false, message: message.into(), data: NoData {} }
    }
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    pub fn success<M: Into<String>>(message: M, data: T) -> Self {
        Self { success: true, message: message.into(), data }
    }
}

impl<T> IntoResponse for ApiResponse<T>
where
    T: Serialize,
{
    fn into_response(self) -> Response {
        let status = if self.success { StatusCode::OK } else { StatusCode::BAD_REQUEST };
        (status, axum::Json(self)).into_response()
    }
}

/// Extra fields of the health envelope.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub timestamp: String,
}

impl HealthStatus {
    pub fn at(at: DateTime<Utc>) -> Self {
        Self { timestamp: iso_timestamp(at) }
    }
}

/// ISO-8601 in UTC with millisecond precision, e.g. `2024-01-01T00:00:00.000Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Application-wide error type. Only `RouteNotFound` maps to a client error; everything
/// else is an unhandled failure and reaches the client as the generic 500 envelope.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("route not found")]
    RouteNotFound,
    #[error("configuration error: {0}")]
    Config(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("invalid request body: {0}")]
    Body(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::RouteNotFound => StatusCode::NOT_FOUND,
            AppError::Config(_) | AppError::Database(_) | AppError::Body(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text sent to the client. Never includes the underlying cause.
    pub fn public_message(&self) -> &'static str {
        match self {
            AppError::RouteNotFound => ROUTE_NOT_FOUND_MESSAGE,
            _ => INTERNAL_ERROR_MESSAGE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Unhandled error");
        }
        (status, axum::Json(ApiResponse::failure(self.public_message()))).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self { AppError::Database(e.to_string()) }
}
impl From<BytesRejection> for AppError {
    fn from(e: BytesRejection) -> Self { AppError::Body(e.body_text()) }
}
impl From<anyhow::Error> for AppError {
    fn from(e: anyhow::Error) -> Self { AppError::Internal(e.to_string()) }
}

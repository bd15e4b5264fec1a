// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum AppError {
    #[error("no credential presented")]
    Unauthenticated,
    #[error("credential does not match any live token")]
    InvalidOrExpiredToken,
    #[error("token was consumed by a concurrent request")]
    TokenAlreadyConsumed,
    #[error("no tokens are currently issued")]
    ServiceNotReady,
    #[error("secret is not configured")]
    SecretNotConfigured,
    #[error("internal server error")]
    InternalServerError,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                "Missing or invalid Authorization header",
            ),
            Self::InvalidOrExpiredToken => {
                (StatusCode::FORBIDDEN, "Token not available or expired")
            }
            Self::TokenAlreadyConsumed => (StatusCode::FORBIDDEN, "Token already consumed"),
            Self::ServiceNotReady => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Service authentication is not ready",
            ),
            Self::SecretNotConfigured => (StatusCode::NOT_FOUND, "Password not found"),
            Self::InternalServerError => {
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
            }
        };

        let body = Json(json!({"error": message}));

        (status, body).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(_source: std::io::Error) -> Self {
        tracing::error!("{:?}", _source);
        AppError::InternalServerError
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(_source: tokio::task::JoinError) -> Self {
        tracing::error!("{:?}", _source);
        AppError::InternalServerError
    }
}

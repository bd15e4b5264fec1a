// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! HTTP route handlers for the credential broker API.
//!
//! | Method | Path | Handler | Description |
//! |--------|------|---------|-------------|
//! | GET | `/health` | [`health`] | Health check endpoint |
//! | GET | `/api/health` | [`health`] | Health check endpoint (alias) |
//! | GET | `/secrets/database/password` | [`get_database_password`] | Release the database password |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::response::IntoResponse;

use crate::application::AppState;
use crate::endpoint::{extract_credential, release_secret};
use crate::errors::AppError;
use crate::models::{HealthResponse, PasswordResponse};

/// Health check endpoint.
///
/// # Response
///
/// ```json
/// {"status": "OK"}
/// ```
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK".to_string(),
    })
}

/// Releases the database password in exchange for a one-time token.
///
/// The token is read from `Authorization: Bearer <token>` or the legacy
/// `X-Auth-Token` header and is consumed on success.
///
/// # Errors
///
/// - [`AppError::Unauthenticated`] - No token presented
/// - [`AppError::ServiceNotReady`] - No tokens are issued
/// - [`AppError::InvalidOrExpiredToken`] - Token does not match a live token
/// - [`AppError::SecretNotConfigured`] - The password is empty
/// - [`AppError::TokenAlreadyConsumed`] - A concurrent request used the token first
/// - [`AppError::InternalServerError`] - Token storage failure
#[tracing::instrument(skip(state, headers))]
pub async fn get_database_password(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<PasswordResponse>, AppError> {
    tracing::info!("[broker] database password requested");

    let credential = extract_credential(&headers);

    // token files are touched with blocking I/O
    let state_ref = state.clone();
    let secret = tokio::task::spawn_blocking(move || {
        release_secret(
            &state_ref.tokens,
            &state_ref.database_password,
            credential.as_deref(),
        )
    })
    .await??;

    Ok(Json(PasswordResponse {
        password: secret.expose().to_string(),
    }))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::StatusCode;

    // Integration tests using TestServer are in tests/http_integration.rs

    #[tokio::test]
    async fn test_health_returns_ok() {
        let response = health().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "OK");
    }

    #[tokio::test]
    async fn test_health_response_structure() {
        let response = health().await.into_response();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        // Should have exactly one key
        assert_eq!(json.as_object().unwrap().len(), 1);
        assert!(json.get("status").is_some());
    }
}

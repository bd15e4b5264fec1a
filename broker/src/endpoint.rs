// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Guarded secret release.
//!
//! The rules for handing out a secret in exchange for a one-time token,
//! independent of the HTTP framework:
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | no credential presented | [`AppError::Unauthenticated`] |
//! | no token is live | [`AppError::ServiceNotReady`] |
//! | credential matches no live token | [`AppError::InvalidOrExpiredToken`] |
//! | secret is empty | [`AppError::SecretNotConfigured`] |
//! | token consumed by a concurrent request | [`AppError::TokenAlreadyConsumed`] |
//! | token files cannot be read or deleted | [`AppError::InternalServerError`] |
//! | otherwise | the secret, and the token is consumed |
//!
//! Each guarded endpoint releases exactly one secret.

use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;

use crate::constants::{BEARER_PREFIX, LEGACY_TOKEN_HEADER};
use crate::errors::AppError;
use crate::models::SecretValue;
use crate::tokens::TokenStore;

/// Extracts the presented token from request headers.
///
/// `Authorization: Bearer <token>` takes precedence over the legacy
/// `X-Auth-Token: <token>` header. An `Authorization` header that is not a
/// bearer credential, or an empty token, counts as no credential.
pub fn extract_credential(headers: &HeaderMap) -> Option<String> {
    let token = match headers.get(AUTHORIZATION) {
        Some(value) => value
            .to_str()
            .ok()
            .and_then(|value| value.strip_prefix(BEARER_PREFIX)),
        None => headers
            .get(LEGACY_TOKEN_HEADER)
            .and_then(|value| value.to_str().ok()),
    };

    token
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

/// Releases `secret` to the holder of `credential`, consuming the token.
///
/// Performs blocking filesystem I/O.
pub fn release_secret(
    tokens: &TokenStore,
    secret: &SecretValue,
    credential: Option<&str>,
) -> Result<SecretValue, AppError> {
    let Some(credential) = credential else {
        tracing::warn!("[broker] missing or invalid authorization header");
        return Err(AppError::Unauthenticated);
    };

    if !tokens.has_live_tokens()? {
        tracing::warn!("[broker] no tokens are currently issued");
        return Err(AppError::ServiceNotReady);
    }

    if !tokens.is_valid(credential)? {
        tracing::warn!("[broker] token not available or expired");
        return Err(AppError::InvalidOrExpiredToken);
    }

    if secret.is_empty() {
        tracing::error!("[broker] secret is not configured");
        return Err(AppError::SecretNotConfigured);
    }

    match tokens.consume_role(credential)? {
        Some(role) => {
            tracing::info!("[broker] secret released to {} and token consumed", role);
            Ok(secret.clone())
        }
        None => {
            tracing::error!("[broker] token was consumed by a concurrent request");
            Err(AppError::TokenAlreadyConsumed)
        }
    }
}

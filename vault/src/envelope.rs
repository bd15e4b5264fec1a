// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Encrypted-at-rest value envelope.
//!
//! A value stored in a secrets document is either plaintext or an encrypted
//! value of the form `encrypted:<base64 ciphertext>`.

use crate::constants::ENCRYPTED_PREFIX;
use crate::errors::VaultError;

/// Returns true if `value` carries the encrypted marker.
#[inline]
pub fn is_encrypted(value: &str) -> bool {
    value.starts_with(ENCRYPTED_PREFIX)
}

/// Strips the encrypted marker from `value`.
///
/// # Errors
///
/// Returns [`VaultError::InvalidFormat`] if the marker is absent. Callers that
/// want unmarked values treated as plaintext should check [`is_encrypted`]
/// first, as [`SecretVault::unseal`](crate::cipher::SecretVault::unseal) does.
pub fn extract_ciphertext(value: &str) -> Result<&str, VaultError> {
    value
        .strip_prefix(ENCRYPTED_PREFIX)
        .ok_or(VaultError::InvalidFormat)
}

/// Prepends the encrypted marker to `ciphertext`.
#[inline]
pub fn wrap_ciphertext(ciphertext: &str) -> String {
    format!("{ENCRYPTED_PREFIX}{ciphertext}")
}

// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Passphrase stretching.
//!
//! The vault passphrase is a human-managed string of arbitrary length. It is
//! stretched into an AES-256 key with PBKDF2-HMAC-SHA256 using the fixed
//! [`KDF_SALT`] and [`KDF_ITERATIONS`], so the same passphrase always yields
//! the same key.

use std::fmt;

use aws_lc_rs::pbkdf2;
use zeroize::ZeroizeOnDrop;

use crate::constants::{KDF_ITERATIONS, KDF_SALT, KEY_LEN};

/// 32-byte symmetric key derived from the vault passphrase.
#[derive(Clone, ZeroizeOnDrop)]
pub struct KeyMaterial([u8; KEY_LEN]);

impl KeyMaterial {
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }
}

// Custom Debug implementation to prevent accidental logging of key material
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("KeyMaterial").field(&"[REDACTED]").finish()
    }
}

/// Derives the vault key from `passphrase`.
pub fn derive_key(passphrase: &str) -> KeyMaterial {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::derive(
        pbkdf2::PBKDF2_HMAC_SHA256,
        KDF_ITERATIONS,
        KDF_SALT,
        passphrase.as_bytes(),
        &mut key,
    );
    KeyMaterial(key)
}

// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::num::NonZeroU32;

/// Marker carried by values stored encrypted at rest.
pub const ENCRYPTED_PREFIX: &str = "encrypted:";

/// Fixed application salt for passphrase stretching.
///
/// Keeping the salt constant lets a secrets document be decrypted with nothing
/// but the passphrase. The cost is that two deployments sharing a passphrase
/// derive the same key.
pub const KDF_SALT: &[u8] = b"credential-broker/secret-vault/v1";

pub const KDF_ITERATIONS: NonZeroU32 = match NonZeroU32::new(100_000) {
    Some(iterations) => iterations,
    None => panic!("iteration count must be non-zero"),
};

/// AES-256 key length in bytes
pub const KEY_LEN: usize = 32;

/// AES-GCM nonce length in bytes (96 bits)
pub const NONCE_LEN: usize = 12;

/// AES-GCM authentication tag length in bytes
pub const TAG_LEN: usize = 16;

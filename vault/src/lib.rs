// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! # Secret Vault
//!
//! Passphrase-keyed encryption for values stored at rest in the credential
//! broker's secrets document.
//!
//! - [`kdf`]: PBKDF2-HMAC-SHA256 passphrase stretching
//! - [`envelope`]: the `encrypted:` value marker
//! - [`cipher`]: AES-256-GCM sealing with a passthrough fallback on failure

pub mod cipher;
pub mod constants;
pub mod envelope;
pub mod errors;
pub mod kdf;
pub mod utils;

pub use cipher::{Decryption, SecretVault};
pub use errors::VaultError;

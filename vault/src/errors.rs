// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum VaultError {
    #[error("value is not marked as encrypted")]
    InvalidFormat,
    #[error("unable to decode ciphertext: {0}")]
    Encoding(String),
    #[error("ciphertext is too short")]
    Truncated,
    #[error("unable to derive key")]
    KeyDerivation,
    #[error("unable to generate nonce")]
    Random,
    #[error("unable to encrypt value")]
    Seal,
    #[error("unable to decrypt value")]
    Open,
    #[error("decrypted value is not valid UTF-8")]
    Utf8,
}

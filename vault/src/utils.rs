// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use data_encoding::BASE64URL;

use crate::errors::VaultError;

#[inline]
pub fn base64_encode(input: &[u8]) -> String {
    BASE64URL.encode(input)
}

#[inline]
pub fn base64_decode(input: &str) -> Result<Vec<u8>, VaultError> {
    BASE64URL
        .decode(input.trim().as_bytes())
        .map_err(|err| VaultError::Encoding(err.to_string()))
}

// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Authenticated encryption of vault values.
//!
//! Values are sealed with AES-256-GCM under the key derived from the vault
//! passphrase (see [`crate::kdf`]). Every encryption draws a fresh 96-bit
//! nonce from the system CSPRNG.
//!
//! # Wire Format
//!
//! ```text
//! base64url( nonce (12 bytes) | ciphertext (N bytes) | tag (16 bytes) )
//! ```
//!
//! # Degraded Mode
//!
//! Decryption never fails. A value that cannot be decoded or authenticated
//! is returned unchanged as [`Decryption::Passthrough`], so documents that
//! still hold pre-migration plaintext keep working. Callers that need to
//! tell the two apart match on [`Decryption`].

use std::fmt;

use aws_lc_rs::aead::{AES_256_GCM, Aad, LessSafeKey, Nonce, UnboundKey};
use aws_lc_rs::rand::{SecureRandom, SystemRandom};

use crate::constants::{NONCE_LEN, TAG_LEN};
use crate::envelope::{extract_ciphertext, is_encrypted, wrap_ciphertext};
use crate::errors::VaultError;
use crate::kdf::{KeyMaterial, derive_key};
use crate::utils::{base64_decode, base64_encode};

/// Outcome of decrypting a stored value.
#[derive(Clone, PartialEq, Eq)]
pub enum Decryption {
    /// The value authenticated and decrypted under the vault key.
    Decrypted(String),
    /// The value could not be decrypted and is returned as-is.
    Passthrough(String),
}

impl Decryption {
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Passthrough(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Decrypted(value) | Self::Passthrough(value) => value,
        }
    }

    pub fn into_inner(self) -> String {
        match self {
            Self::Decrypted(value) | Self::Passthrough(value) => value,
        }
    }
}

impl fmt::Debug for Decryption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Decrypted(_) => f.write_str("Decrypted([REDACTED])"),
            Self::Passthrough(_) => f.write_str("Passthrough([REDACTED])"),
        }
    }
}

/// Decrypts and encrypts values with a key derived from a passphrase.
pub struct SecretVault {
    key: KeyMaterial,
    rng: SystemRandom,
}

impl fmt::Debug for SecretVault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretVault")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl SecretVault {
    /// Creates a vault keyed by `passphrase`.
    ///
    /// Key derivation runs PBKDF2 with a high iteration count, so this is
    /// deliberately slow. Build one vault per passphrase and reuse it.
    pub fn new(passphrase: &str) -> Self {
        Self::with_key(derive_key(passphrase))
    }

    pub fn with_key(key: KeyMaterial) -> Self {
        Self {
            key,
            rng: SystemRandom::new(),
        }
    }

    fn aead_key(&self) -> Result<LessSafeKey, VaultError> {
        let unbound = UnboundKey::new(&AES_256_GCM, self.key.as_bytes())
            .map_err(|_| VaultError::KeyDerivation)?;
        Ok(LessSafeKey::new(unbound))
    }

    /// Encrypts `plaintext`, returning the base64 ciphertext.
    ///
    /// An empty plaintext yields an empty string.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        if plaintext.is_empty() {
            return Ok(String::new());
        }

        let key = self.aead_key()?;

        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| VaultError::Random)?;
        let nonce = Nonce::assume_unique_for_key(nonce_bytes);

        let mut in_out = plaintext.as_bytes().to_vec();
        key.seal_in_place_append_tag(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| VaultError::Seal)?;

        let mut sealed = Vec::with_capacity(NONCE_LEN + in_out.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&in_out);

        Ok(base64_encode(&sealed))
    }

    /// Decrypts `ciphertext`, falling back to the input on any failure.
    ///
    /// An empty ciphertext decrypts to an empty string.
    pub fn decrypt(&self, ciphertext: &str) -> Decryption {
        if ciphertext.is_empty() {
            return Decryption::Decrypted(String::new());
        }

        match self.try_decrypt(ciphertext) {
            Ok(plaintext) => Decryption::Decrypted(plaintext),
            Err(err) => {
                tracing::debug!("[vault] decryption failed: {}", err);
                Decryption::Passthrough(ciphertext.to_string())
            }
        }
    }

    /// Decrypts `ciphertext` and returns the resulting string, logging when
    /// the passthrough fallback was taken.
    pub fn decrypt_value(&self, ciphertext: &str) -> String {
        let decryption = self.decrypt(ciphertext);
        if decryption.is_degraded() {
            tracing::warn!("[vault] value could not be decrypted, using it as stored");
        }
        decryption.into_inner()
    }

    fn try_decrypt(&self, ciphertext: &str) -> Result<String, VaultError> {
        let mut sealed = base64_decode(ciphertext)?;
        if sealed.len() < NONCE_LEN + TAG_LEN {
            return Err(VaultError::Truncated);
        }

        let mut in_out = sealed.split_off(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(&sealed).map_err(|_| VaultError::Truncated)?;

        let key = self.aead_key()?;
        let plaintext = key
            .open_in_place(nonce, Aad::empty(), &mut in_out)
            .map_err(|_| VaultError::Open)?;

        String::from_utf8(plaintext.to_vec()).map_err(|_| VaultError::Utf8)
    }

    /// Encrypts `plaintext` and wraps it in the `encrypted:` envelope.
    pub fn seal(&self, plaintext: &str) -> Result<String, VaultError> {
        Ok(wrap_ciphertext(&self.encrypt(plaintext)?))
    }

    /// Recovers the plaintext of a stored value.
    ///
    /// Values without the `encrypted:` marker are plaintext and are returned
    /// unchanged.
    pub fn unseal(&self, value: &str) -> String {
        if !is_encrypted(value) {
            return value.to_string();
        }
        match extract_ciphertext(value) {
            Ok(ciphertext) => self.decrypt_value(ciphertext),
            Err(_) => value.to_string(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let vault = SecretVault::new("k1");
        let ciphertext = vault.encrypt("secretpw").unwrap();
        assert_ne!(ciphertext, "secretpw");
        assert_eq!(
            vault.decrypt(&ciphertext),
            Decryption::Decrypted("secretpw".to_string())
        );
    }

    #[test]
    fn test_round_trip_across_instances() {
        let ciphertext = SecretVault::new("k1").encrypt("p@ss wörd").unwrap();
        let other = SecretVault::new("k1");
        assert_eq!(other.decrypt_value(&ciphertext), "p@ss wörd");
    }

    #[test]
    fn test_encryption_is_randomized() {
        let vault = SecretVault::new("k1");
        let first = vault.encrypt("secretpw").unwrap();
        let second = vault.encrypt("secretpw").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_empty_input_identities() {
        let vault = SecretVault::new("k1");
        assert_eq!(vault.encrypt("").unwrap(), "");
        assert_eq!(vault.decrypt(""), Decryption::Decrypted(String::new()));
    }

    #[test]
    fn test_invalid_ciphertext_passes_through() {
        let vault = SecretVault::new("k1");
        let decryption = vault.decrypt("not-a-valid-ciphertext");
        assert!(decryption.is_degraded());
        assert_eq!(decryption.as_str(), "not-a-valid-ciphertext");
    }

    #[test]
    fn test_wrong_key_passes_through() {
        let ciphertext = SecretVault::new("k1").encrypt("secretpw").unwrap();
        let decryption = SecretVault::new("k2").decrypt(&ciphertext);
        assert_eq!(decryption, Decryption::Passthrough(ciphertext));
    }

    #[test]
    fn test_tampered_ciphertext_passes_through() {
        let vault = SecretVault::new("k1");
        let ciphertext = vault.encrypt("secretpw").unwrap();
        let mut raw = base64_decode(&ciphertext).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0x01;
        let tampered = base64_encode(&raw);
        assert!(vault.decrypt(&tampered).is_degraded());
    }

    #[test]
    fn test_truncated_ciphertext_passes_through() {
        let vault = SecretVault::new("k1");
        let short = base64_encode(&[0u8; NONCE_LEN]);
        assert_eq!(vault.decrypt_value(&short), short);
    }

    #[test]
    fn test_seal_and_unseal() {
        let vault = SecretVault::new("k1");
        let sealed = vault.seal("secretpw").unwrap();
        assert!(is_encrypted(&sealed));
        assert_eq!(vault.unseal(&sealed), "secretpw");
    }

    #[test]
    fn test_unseal_plaintext_passes_through() {
        let vault = SecretVault::new("k1");
        assert_eq!(vault.unseal("legacy-password"), "legacy-password");
        assert_eq!(vault.unseal(""), "");
    }

    #[test]
    fn test_debug_does_not_leak_values() {
        let decryption = Decryption::Decrypted("secretpw".to_string());
        assert!(!format!("{decryption:?}").contains("secretpw"));
        let vault = SecretVault::new("k1");
        assert!(format!("{vault:?}").contains("[REDACTED]"));
    }
}

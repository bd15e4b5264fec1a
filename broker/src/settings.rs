// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! Settings and secrets documents.
//!
//! Two YAML documents configure the broker:
//!
//! - `config.yaml`: plaintext settings, including the vault passphrase
//!   (`secret_key`) and the `server` section.
//! - `secrets.yaml.encrypted`: the secrets themselves. Any string value of
//!   the form `encrypted:<ciphertext>` is decrypted with the vault; other
//!   values are taken as they are. Values may sit at the top level or one
//!   mapping deep (`database.password`).
//!
//! The `database` mapping of the secrets document is merged over the one in
//! the settings document, and the merged `database.password` becomes the
//! secret the broker releases.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use secret_vault::SecretVault;
use serde::Deserialize;
use serde_yaml::Value;

use crate::models::SecretValue;

#[derive(thiserror::Error, Debug)]
pub enum SettingsError {
    #[error("required file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("{0} is empty")]
    Empty(PathBuf),
    #[error("secret_key is not set")]
    MissingSecretKey,
    #[error("database.password is not set")]
    MissingPassword,
}

/// `server` section of `config.yaml`. Command line flags take precedence.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

/// Plaintext settings document (`config.yaml`).
#[derive(Clone, Default, Deserialize)]
pub struct SettingsDocument {
    #[serde(default)]
    pub server: ServerSection,
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub database: BTreeMap<String, Value>,
}

impl std::fmt::Debug for SettingsDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsDocument")
            .field("server", &self.server)
            .field("secret_key", &"[REDACTED]")
            .field("database", &self.database.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Everything the broker needs from its documents.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSection,
    pub database_password: SecretValue,
}

fn read_document(path: &Path) -> Result<Value, SettingsError> {
    let contents = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            SettingsError::NotFound(path.to_path_buf())
        } else {
            SettingsError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let value: Value = serde_yaml::from_str(&contents).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let is_empty = match &value {
        Value::Null => true,
        Value::Mapping(mapping) => mapping.is_empty(),
        _ => false,
    };
    if is_empty {
        return Err(SettingsError::Empty(path.to_path_buf()));
    }

    Ok(value)
}

/// Loads the plaintext settings document.
pub fn load_settings_document(path: &Path) -> Result<SettingsDocument, SettingsError> {
    let value = read_document(path)?;
    serde_yaml::from_value(value).map_err(|source| SettingsError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn unseal_value(vault: &SecretVault, value: Value) -> Value {
    match value {
        Value::String(value) => Value::String(vault.unseal(&value)),
        other => other,
    }
}

/// Loads the secrets document and decrypts every `encrypted:` value in it.
pub fn load_secrets_document(
    path: &Path,
    vault: &SecretVault,
) -> Result<BTreeMap<String, Value>, SettingsError> {
    let Value::Mapping(mapping) = read_document(path)? else {
        return Err(SettingsError::Parse {
            path: path.to_path_buf(),
            source: serde::de::Error::custom("expected a mapping at the top level"),
        });
    };

    let mut secrets = BTreeMap::new();
    for (key, value) in mapping {
        let Some(key) = key.as_str().map(str::to_string) else {
            continue;
        };
        let value = match value {
            Value::Mapping(nested) => Value::Mapping(
                nested
                    .into_iter()
                    .map(|(sub_key, sub_value)| (sub_key, unseal_value(vault, sub_value)))
                    .collect(),
            ),
            other => unseal_value(vault, other),
        };
        secrets.insert(key, value);
    }

    Ok(secrets)
}

impl Settings {
    /// Loads both documents, decrypting secrets with the vault keyed by
    /// `secret_key_override` if given, else by the settings document's
    /// `secret_key`.
    #[tracing::instrument(skip(secret_key_override))]
    pub fn load(
        config_file: &Path,
        secrets_file: &Path,
        secret_key_override: Option<&str>,
    ) -> Result<Self, SettingsError> {
        let document = load_settings_document(config_file)?;

        let secret_key = secret_key_override
            .or(document.secret_key.as_deref())
            .filter(|key| !key.is_empty())
            .ok_or(SettingsError::MissingSecretKey)?;

        tracing::debug!("[broker] deriving vault key");
        let vault = SecretVault::new(secret_key);

        let mut secrets = load_secrets_document(secrets_file, &vault)?;

        let mut database = document.database.clone();
        if let Some(Value::Mapping(secret_database)) = secrets.remove("database") {
            for (key, value) in secret_database {
                if let Some(key) = key.as_str() {
                    database.insert(key.to_string(), value);
                }
            }
        }

        let password = match database.remove("password") {
            Some(Value::String(password)) => password,
            Some(Value::Number(number)) => number.to_string(),
            Some(Value::Bool(flag)) => flag.to_string(),
            _ => return Err(SettingsError::MissingPassword),
        };

        Ok(Self {
            server: document.server,
            database_password: SecretValue::new(password),
        })
    }
}

// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

//! One-time bearer tokens backed by files.
//!
//! Each [`Role`] owns exactly one token file under the token directory. A
//! role moves through three states, and never backwards:
//!
//! ```text
//! UNISSUED --generate_all--> ISSUED --consume--> CONSUMED
//! ```
//!
//! The presence of a role's file is its state: the file exists while the
//! token is live and is deleted when the token is consumed.
//!
//! # Concurrency
//!
//! [`TokenStore::consume`] runs its compare-and-delete under an exclusive
//! lock, so two requests presenting the same token cannot both succeed. The
//! read-only operations take no lock and tolerate a file disappearing
//! between the existence check and the read.

use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use aws_lc_rs::constant_time::verify_slices_are_equal;
use aws_lc_rs::rand::{SecureRandom, SystemRandom};
use data_encoding::BASE64URL_NOPAD;
use zeroize::Zeroize;

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

use crate::constants::TOKEN_BYTES;

const TOKEN_FILE_MODE: u32 = 0o600;

/// Caller identity a token authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Database,
    Backend,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Database, Role::Backend];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Database => "database",
            Self::Backend => "backend",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Database => "database_token.txt",
            Self::Backend => "backend_token.txt",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Filesystem-backed store of one-time tokens, one file per [`Role`].
pub struct TokenStore {
    dir: PathBuf,
    rng: SystemRandom,
    consume_lock: Mutex<()>,
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenStore")
            .field("dir", &self.dir)
            .finish_non_exhaustive()
    }
}

impl TokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            rng: SystemRandom::new(),
            consume_lock: Mutex::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `role`'s token.
    pub fn path_for(&self, role: Role) -> PathBuf {
        self.dir.join(role.file_name())
    }

    /// Issues a fresh token for every role, replacing any existing record.
    ///
    /// Each token is written to a temporary file created with owner-only
    /// permissions and then renamed into place, so readers never observe a
    /// partially written token.
    #[tracing::instrument(skip(self))]
    pub fn generate_all(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;

        for role in Role::ALL {
            let mut token = self.generate_token()?;
            let result = self.write_token(role, &token);
            token.zeroize();
            result?;
            tracing::info!("[broker] generated token file: {}", role.file_name());
        }

        Ok(())
    }

    fn generate_token(&self) -> io::Result<String> {
        let mut bytes = [0u8; TOKEN_BYTES];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| io::Error::other("unable to generate random token"))?;
        let token = BASE64URL_NOPAD.encode(&bytes);
        bytes.zeroize();
        Ok(token)
    }

    fn write_token(&self, role: Role, token: &str) -> io::Result<()> {
        let path = self.path_for(role);
        let tmp_path = path.with_extension("txt.tmp");

        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(TOKEN_FILE_MODE);

        let mut file = options.open(&tmp_path)?;
        // the mode above only applies when the file is created
        #[cfg(unix)]
        file.set_permissions(fs::Permissions::from_mode(TOKEN_FILE_MODE))?;
        file.write_all(token.as_bytes())?;
        file.sync_all()?;
        drop(file);

        fs::rename(&tmp_path, &path)
    }

    /// Reads the stored token for `role`, or `None` if it is not live.
    fn read_token(&self, role: Role) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path_for(role)) {
            Ok(mut contents) => {
                let token = contents.trim().to_string();
                contents.zeroize();
                Ok(Some(token))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Finds the live role whose token equals `presented`.
    fn find_role(&self, presented: &str) -> io::Result<Option<Role>> {
        if presented.is_empty() {
            return Ok(None);
        }

        for role in Role::ALL {
            if let Some(mut stored) = self.read_token(role)? {
                let matches =
                    verify_slices_are_equal(stored.as_bytes(), presented.as_bytes()).is_ok();
                stored.zeroize();
                if matches {
                    return Ok(Some(role));
                }
            }
        }

        Ok(None)
    }

    /// Returns true if `presented` matches the live token of any role.
    ///
    /// Does not change any state.
    pub fn is_valid(&self, presented: &str) -> io::Result<bool> {
        Ok(self.find_role(presented)?.is_some())
    }

    /// Consumes the live token equal to `presented`.
    ///
    /// Returns the role the token belonged to, or `None` if no live token
    /// matched. A token is consumed at most once: a concurrent caller
    /// presenting the same token gets `None`.
    #[tracing::instrument(skip(self, presented))]
    pub fn consume_role(&self, presented: &str) -> io::Result<Option<Role>> {
        let _guard = self
            .consume_lock
            .lock()
            .map_err(|_| io::Error::other("token lock poisoned"))?;

        let Some(role) = self.find_role(presented)? else {
            return Ok(None);
        };

        match fs::remove_file(self.path_for(role)) {
            Ok(()) => {
                tracing::info!("[broker] consumed and deleted token file: {}", role.file_name());
                Ok(Some(role))
            }
            // another process removed it between the read and the delete
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// Consumes the live token equal to `presented`, returning whether one
    /// was found.
    pub fn consume(&self, presented: &str) -> io::Result<bool> {
        Ok(self.consume_role(presented)?.is_some())
    }

    /// Roles whose token is still live.
    ///
    /// A filesystem fault other than a missing file is returned, not
    /// treated as a consumed token.
    pub fn live_roles(&self) -> io::Result<Vec<Role>> {
        let mut live = Vec::with_capacity(Role::ALL.len());
        for role in Role::ALL {
            if self.path_for(role).try_exists()? {
                live.push(role);
            }
        }
        Ok(live)
    }

    pub fn has_live_tokens(&self) -> io::Result<bool> {
        Ok(!self.live_roles()?.is_empty())
    }

    /// Returns true once no role has a live token.
    pub fn all_consumed(&self) -> io::Result<bool> {
        Ok(!self.has_live_tokens()?)
    }

    /// Checks that token files left by a previous run can be reused in place
    /// of [`TokenStore::generate_all`].
    pub fn reuse_existing(&self) -> io::Result<()> {
        let live = self.live_roles()?;
        if live.is_empty() {
            return Err(io::Error::new(
                ErrorKind::NotFound,
                format!("no live token files in {}", self.dir.display()),
            ));
        }
        tracing::info!("[broker] reusing {} existing token files", live.len());
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn issued_store() -> (TempDir, TokenStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("tokens"));
        store.generate_all().unwrap();
        (dir, store)
    }

    fn token_for(store: &TokenStore, role: Role) -> String {
        fs::read_to_string(store.path_for(role)).unwrap()
    }

    #[test]
    fn test_generate_all_writes_one_file_per_role() {
        let (_dir, store) = issued_store();
        for role in Role::ALL {
            let token = token_for(&store, role);
            assert_eq!(token.len(), 43);
            assert!(BASE64URL_NOPAD.decode(token.as_bytes()).is_ok());
        }
        assert_ne!(
            token_for(&store, Role::Database),
            token_for(&store, Role::Backend)
        );
        assert_eq!(store.live_roles().unwrap(), Role::ALL.to_vec());
    }

    #[cfg(unix)]
    #[test]
    fn test_token_files_are_owner_only() {
        let (_dir, store) = issued_store();
        for role in Role::ALL {
            let mode = fs::metadata(store.path_for(role))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_generate_all_overwrites_previous_tokens() {
        let (_dir, store) = issued_store();
        let before = token_for(&store, Role::Database);
        store.generate_all().unwrap();
        assert_ne!(before, token_for(&store, Role::Database));
        assert!(!store.is_valid(&before).unwrap());
    }

    #[test]
    fn test_is_valid_does_not_consume() {
        let (_dir, store) = issued_store();
        let token = token_for(&store, Role::Database);
        assert!(store.is_valid(&token).unwrap());
        assert!(store.is_valid(&token).unwrap());
        assert!(store.path_for(Role::Database).exists());
    }

    #[test]
    fn test_unknown_and_empty_tokens_are_invalid() {
        let (_dir, store) = issued_store();
        assert!(!store.is_valid("invalid_token").unwrap());
        assert!(!store.is_valid("").unwrap());
        assert!(!store.consume("invalid_token").unwrap());
        assert_eq!(store.live_roles().unwrap().len(), 2);
    }

    #[test]
    fn test_consume_is_single_use() {
        let (_dir, store) = issued_store();
        let token = token_for(&store, Role::Database);

        assert_eq!(store.consume_role(&token).unwrap(), Some(Role::Database));
        assert!(!store.path_for(Role::Database).exists());

        assert!(!store.consume(&token).unwrap());
        assert!(!store.is_valid(&token).unwrap());
    }

    #[test]
    fn test_consume_leaves_other_roles_untouched() {
        let (_dir, store) = issued_store();
        let database = token_for(&store, Role::Database);
        let backend = token_for(&store, Role::Backend);

        assert!(store.consume(&database).unwrap());
        assert!(store.is_valid(&backend).unwrap());
        assert_eq!(store.live_roles().unwrap(), vec![Role::Backend]);
    }

    #[test]
    fn test_stored_token_is_trimmed() {
        let (_dir, store) = issued_store();
        let token = token_for(&store, Role::Backend);
        fs::write(store.path_for(Role::Backend), format!("{token}\n")).unwrap();
        assert!(store.is_valid(&token).unwrap());
    }

    #[test]
    fn test_all_consumed() {
        let (_dir, store) = issued_store();
        assert!(!store.all_consumed().unwrap());

        let database = token_for(&store, Role::Database);
        let backend = token_for(&store, Role::Backend);

        assert!(store.consume(&database).unwrap());
        assert!(!store.all_consumed().unwrap());
        assert!(store.consume(&backend).unwrap());
        assert!(store.all_consumed().unwrap());
        assert!(!store.has_live_tokens().unwrap());
    }

    #[test]
    fn test_store_without_directory_has_no_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("missing"));
        assert!(store.all_consumed().unwrap());
        assert!(!store.is_valid("anything").unwrap());
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_not_all_consumed() {
        let (dir, store) = issued_store();
        fs::remove_dir_all(store.dir()).unwrap();
        fs::write(dir.path().join("tokens"), "not a directory").unwrap();

        assert!(store.live_roles().is_err());
        assert!(store.all_consumed().is_err());
        assert!(store.is_valid("anything").is_err());
    }

    #[test]
    fn test_reuse_existing_requires_live_tokens() {
        let (_dir, store) = issued_store();
        assert!(store.reuse_existing().is_ok());

        let database = token_for(&store, Role::Database);
        assert!(store.consume(&database).unwrap());
        assert!(store.reuse_existing().is_ok());

        let backend = token_for(&store, Role::Backend);
        assert!(store.consume(&backend).unwrap());
        let err = store.reuse_existing().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_concurrent_consume_succeeds_once() {
        let (_dir, store) = issued_store();
        let store = Arc::new(store);
        let token = token_for(&store, Role::Database);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                let token = token.clone();
                std::thread::spawn(move || store.consume(&token).unwrap())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|consumed| *consumed)
            .count();

        assert_eq!(successes, 1);
    }
}

//! Durable persistence of the session credential.
//!
//! The console keeps exactly one durable value: the raw credential under
//! [`AUTH_TOKEN_KEY`]. Its absence is the only signal that bootstrap should
//! start unauthenticated. Implementations serialize their own reads and
//! writes so a store can be shared between the session store and the HTTP
//! client.

use crate::error::StorageError;
use crate::token::Credential;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Key under which the credential is persisted.
pub const AUTH_TOKEN_KEY: &str = "authToken";

/// Single-key durable storage for the session credential.
pub trait CredentialStore: Send + Sync {
    /// Returns the persisted credential, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be read.
    fn load(&self) -> Result<Option<Credential>, StorageError>;

    /// Persists `credential`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn save(&self, credential: &Credential) -> Result<(), StorageError>;

    /// Erases the persisted credential. Clearing an empty store succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing storage cannot be written.
    fn clear(&self) -> Result<(), StorageError>;
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Process-local store, for tests and ephemeral consoles.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryCredentialStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `credential`.
    #[must_use]
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<Credential>, StorageError> {
        Ok(lock(&self.slot).clone())
    }

    fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        *lock(&self.slot) = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *lock(&self.slot) = None;
        Ok(())
    }
}

/// Store backed by a JSON object file (`{"authToken": "..."}`).
///
/// Other keys in the file are preserved. Writes go to a sibling temporary
/// file that is renamed over the original.
#[derive(Debug)]
pub struct FileCredentialStore {
    path: PathBuf,
    io: Mutex<()>,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            io: Mutex::new(()),
        }
    }

    /// Returns the path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, StorageError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(StorageError::ReadFailed {
                    reason: format!("{}: {e}", self.path.display()),
                });
            }
        };
        if contents.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&contents).map_err(|e| StorageError::Corrupt {
            reason: format!("{}: {e}", self.path.display()),
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let write_failed = |e: &dyn std::fmt::Display| StorageError::WriteFailed {
            reason: format!("{}: {e}", self.path.display()),
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| write_failed(&e))?;
        }

        let json = serde_json::to_vec_pretty(entries).map_err(|e| write_failed(&e))?;
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, json).map_err(|e| write_failed(&e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| write_failed(&e))
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<Credential>, StorageError> {
        let _io = lock(&self.io);
        Ok(self
            .read_entries()?
            .remove(AUTH_TOKEN_KEY)
            .filter(|token| !token.is_empty())
            .map(Credential::new))
    }

    fn save(&self, credential: &Credential) -> Result<(), StorageError> {
        let _io = lock(&self.io);
        // A corrupt file is replaced rather than blocking a fresh login.
        let mut entries = match self.read_entries() {
            Ok(entries) => entries,
            Err(StorageError::Corrupt { .. }) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        entries.insert(AUTH_TOKEN_KEY.to_string(), credential.as_str().to_string());
        self.write_entries(&entries)
    }

    fn clear(&self) -> Result<(), StorageError> {
        let _io = lock(&self.io);
        if !self.path.exists() {
            return Ok(());
        }
        let entries = match self.read_entries() {
            Ok(mut entries) => {
                if entries.remove(AUTH_TOKEN_KEY).is_none() {
                    return Ok(());
                }
                entries
            }
            // Nothing in a corrupt file can be trusted, including the token.
            Err(StorageError::Corrupt { .. }) => BTreeMap::new(),
            Err(e) => return Err(e),
        };
        self.write_entries(&entries)
    }
}

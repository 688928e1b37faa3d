//! Client identity and the local store it lives in.
//!
//! A client keeps two strings in local persistent storage: `user_id`, a
//! random token generated on first use and never changed afterwards, and
//! `username`, the display name entered on a separate name-entry surface.
//! Neither is ever sent to the relay as a profile; they only ride along in
//! each outgoing message.

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use parley_proto::ChatMessage;
use thiserror::Error;

use crate::env::Environment;

/// Store key of the stable sender id.
pub const USER_ID_KEY: &str = "user_id";
/// Store key of the display name.
pub const USERNAME_KEY: &str = "username";

/// Identity store errors.
#[derive(Error, Debug)]
pub enum IdentityError {
    /// Reading or writing the backing file failed.
    #[error("identity store I/O error at {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// The backing file is not a JSON object of strings.
    #[error("identity store at {path} is corrupt: {source}")]
    Corrupt {
        /// File that failed to parse
        path: PathBuf,
        /// Underlying error
        source: serde_json::Error,
    },
}

/// Client-local key-value string storage.
pub trait IdentityStore {
    /// Value stored under `key`. `None` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, IdentityError>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<(), IdentityError>;
}

/// In-memory store. Nothing survives the process.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, IdentityError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), IdentityError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Store backed by a JSON object on disk.
///
/// The whole file is rewritten on every `set`. A missing file reads as an
/// empty store.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`, loading existing entries.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, IdentityError> {
        let path = path.as_ref().to_path_buf();

        let entries = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|source| IdentityError::Corrupt { path: path.clone(), source })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => return Err(IdentityError::Io { path, source }),
        };

        Ok(Self { path, entries })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), IdentityError> {
        let json = serde_json::to_vec_pretty(&self.entries)
            .map_err(|source| IdentityError::Corrupt { path: self.path.clone(), source })?;

        fs::write(&self.path, json)
            .map_err(|source| IdentityError::Io { path: self.path.clone(), source })
    }
}

impl IdentityStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, IdentityError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), IdentityError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }
}

/// Who this client is, as far as outgoing messages are concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity {
    /// Stable random token for this installation.
    pub sender_id: String,
    /// Display name for this session.
    pub sender_name: String,
}

impl ClientIdentity {
    /// Create an identity from its parts.
    pub fn new(sender_id: impl Into<String>, sender_name: impl Into<String>) -> Self {
        Self { sender_id: sender_id.into(), sender_name: sender_name.into() }
    }

    /// Build an outgoing message from this identity.
    pub fn compose(&self, text: impl Into<String>) -> ChatMessage {
        ChatMessage::new(text, self.sender_name.clone(), self.sender_id.clone())
    }

    /// Message was sent by this identity.
    pub fn is_own(&self, message: &ChatMessage) -> bool {
        message.sender_id == self.sender_id
    }
}

/// Sender id from the store, generating and persisting one on first use.
pub fn get_or_create_sender_id<S, E>(store: &mut S, env: &E) -> Result<String, IdentityError>
where
    S: IdentityStore,
    E: Environment,
{
    if let Some(id) = store.get(USER_ID_KEY)?.filter(|id| !id.is_empty()) {
        return Ok(id);
    }

    let id = env.random_uuid();
    store.set(USER_ID_KEY, &id)?;
    tracing::debug!("generated sender id {}", id);
    Ok(id)
}

/// Load the client identity.
///
/// Always ensures a sender id exists. Returns `None` when no display name is
/// stored; the caller must send the user to name entry instead of connecting.
pub fn load_identity<S, E>(store: &mut S, env: &E) -> Result<Option<ClientIdentity>, IdentityError>
where
    S: IdentityStore,
    E: Environment,
{
    let sender_id = get_or_create_sender_id(store, env)?;

    Ok(store
        .get(USERNAME_KEY)?
        .filter(|name| !name.trim().is_empty())
        .map(|sender_name| ClientIdentity { sender_id, sender_name }))
}

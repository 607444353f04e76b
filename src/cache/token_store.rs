use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::Result;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cache::token::{Identity, Token};
use crate::config::error::ConfigError;

/// On-disk layout of the store file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreSnapshot {
    identity: Option<Identity>,
    #[serde(default)]
    tokens: Vec<Token>,
}

/// Tokens keyed by domain, plus the client identity shared by every domain.
///
/// Lookups are synchronous and never touch the network. When a path is set,
/// every mutation can be flushed with [`TokenStore::persist`].
#[derive(Debug, Clone, Default)]
pub struct TokenStore {
    tokens: Arc<DashMap<String, Token>>,
    identity: Arc<RwLock<Option<Identity>>>,
    path: Option<PathBuf>,
    /// serializes snapshot + write + rename
    write_lock: Arc<Mutex<()>>,
}

impl TokenStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Open the store backed by `path`. A missing file yields an empty store.
    pub fn open(path: &Path) -> Result<Self, ConfigError> {
        let store = Self {
            path: Some(path.to_path_buf()),
            ..Self::default()
        };

        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!("token store '{}' does not exist yet", path.display());
                return Ok(store);
            }
            Err(err) => return Err(ConfigError::Storage(format!("{}: {}", path.display(), err))),
        };

        let snapshot: StoreSnapshot = serde_json::from_str(&content)
            .map_err(|err| ConfigError::Storage(format!("{}: {}", path.display(), err)))?;

        for token in snapshot.tokens {
            store.tokens.insert(token.domain.clone(), token);
        }
        store.replace_identity(snapshot.identity);
        info!("token store loaded, {} token(s)", store.len());
        Ok(store)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get token if it exists and is not expired
    pub fn get(&self, domain: &str) -> Option<Token> {
        self.tokens
            .get(domain)
            .map(|token| token.value().clone())
            .filter(|token| !token.is_expired())
    }

    /// Insert token, replacing the previous one for the same domain
    pub fn set(&self, token: Token) {
        debug!("token store: set token for domain '{}'", token.domain);
        self.tokens.insert(token.domain.clone(), token);
    }

    pub fn remove(&self, domain: &str) -> Option<Token> {
        self.tokens.remove(domain).map(|(_, token)| token)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.identity
            .read()
            .map(|guard| guard.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn set_identity(&self, identity: Identity) {
        self.replace_identity(Some(identity));
    }

    /// Drop the identity only while it is still `rejected`. Returns whether it was dropped.
    pub fn clear_identity_if(&self, rejected: &Identity) -> bool {
        let mut guard = match self.identity.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if guard.as_ref() == Some(rejected) {
            *guard = None;
            true
        } else {
            false
        }
    }

    fn replace_identity(&self, identity: Option<Identity>) {
        match self.identity.write() {
            Ok(mut guard) => *guard = identity,
            Err(poisoned) => *poisoned.into_inner() = identity,
        }
    }

    /// Flush to disk (unique tmp file -> rename, 0600). No-op for in-memory stores.
    ///
    /// The snapshot is taken under the write lock, so the last rename always
    /// carries the latest state.
    pub async fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let _guard = self.write_lock.lock().await;

        let snapshot = StoreSnapshot {
            identity: self.identity(),
            tokens: self.tokens.iter().map(|entry| entry.value().clone()).collect(),
        };
        let content = serde_json::to_vec_pretty(&snapshot)?;

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_atomically(&target, &content)).await??;
        debug!("token store written to '{}'", path.display());
        Ok(())
    }
}

fn write_atomically(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent)?;

    let mut tmp = NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(tmp.path(), std::fs::Permissions::from_mode(0o600))?;
    }
    tmp.persist(path)?;
    Ok(())
}

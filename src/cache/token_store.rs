use std::path::PathBuf;

use async_trait::async_trait;
use chrono::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{error, info, warn};

use crate::cache::credential::Credential;
use crate::cache::persist;
use crate::observability::metrics::get_metrics;

/// Holder of the current CJ credential.
///
/// Reads never block on persistence and never look at the clock: an access
/// token is considered valid until the upstream API rejects it.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Current credential, if any.
    async fn get(&self) -> Option<Credential>;

    /// Replace the current credential and persist it.
    ///
    /// Returns the credential as stored; `updated_at` is bumped when needed so it
    /// strictly increases across puts. Persistence failures are logged, the
    /// in-memory value still wins.
    async fn put(&self, credential: Credential) -> Credential;
}

/// In-memory credential mirrored to a JSON cache file.
#[derive(Debug)]
pub struct FileTokenStore {
    current: RwLock<Option<Credential>>,
    path: Option<PathBuf>,
    // keeps the file in the same order as the in-memory updates
    persist_lock: Mutex<()>,
}

impl FileTokenStore {
    /// Seed from the cache file at `path`, falling back to `seed` when the
    /// file is missing or unreadable.
    pub async fn load(path: impl Into<PathBuf>, seed: Option<Credential>) -> Self {
        let path = path.into();
        let initial = match persist::read_cached(&path).await {
            Ok(Some(credential)) => {
                info!(
                    "token store: loaded credential from '{}', updated at {}",
                    path.display(),
                    credential.updated_at
                );
                Some(credential)
            }
            Ok(None) => {
                info!("token store: no cache at '{}', seeded: {}", path.display(), seed.is_some());
                seed
            }
            Err(err) => {
                warn!("token store: {}, seeded: {}", err, seed.is_some());
                seed
            }
        };

        Self {
            current: RwLock::new(initial),
            path: Some(path),
            persist_lock: Mutex::new(()),
        }
    }

    /// Store without a backing file.
    pub fn in_memory(initial: Option<Credential>) -> Self {
        Self {
            current: RwLock::new(initial),
            path: None,
            persist_lock: Mutex::new(()),
        }
    }
}

#[async_trait]
impl TokenStore for FileTokenStore {
    async fn get(&self) -> Option<Credential> {
        self.current.read().await.clone()
    }

    async fn put(&self, mut credential: Credential) -> Credential {
        let _persist = self.persist_lock.lock().await;

        {
            let mut current = self.current.write().await;
            if let Some(previous) = current.as_ref() {
                if credential.updated_at <= previous.updated_at {
                    credential.updated_at = previous.updated_at + Duration::microseconds(1);
                }
            }
            *current = Some(credential.clone());
        }

        let metrics = get_metrics().await;
        metrics.store_updated_unix.set(credential.updated_at.timestamp());

        if let Some(path) = &self.path {
            match persist::write_atomic(path, &credential).await {
                Ok(()) => info!("token store: credential persisted to '{}'", path.display()),
                Err(err) => {
                    metrics.store_persist_failures.inc();
                    error!("token store: failed to persist to '{}': {}", path.display(), err);
                }
            }
        }

        credential
    }
}

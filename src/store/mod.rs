//! Quota-limited key-value persistence behind a fail-soft adapter.
//!
//! Gameplay must never block on storage: the adapter converts backend
//! failures into booleans and log lines, and remediates quota pressure by
//! trimming the history archive before giving up.

pub mod archive;
pub mod file;
pub mod memory;
pub mod snapshot;

use std::{error::Error, sync::Arc};

use futures::future::BoxFuture;
use thiserror::Error;
use tracing::warn;

use crate::state::case::HistoryEntry;

/// Key under which the finished-case archive is persisted.
pub const HISTORY_KEY: &str = "history";
/// Key under which the in-progress session snapshot is persisted.
pub const SESSION_KEY: &str = "session";
/// Entries kept when the archive is trimmed to relieve quota pressure.
pub const QUOTA_TRIM_LEN: usize = 10;

/// Result alias for backend operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Error raised by a key-value backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The write would exceed the configured byte budget.
    #[error("quota exceeded writing `{key}`: {attempted} bytes against a {quota} byte budget")]
    QuotaExceeded {
        /// Key being written.
        key: String,
        /// Projected total size after the write.
        attempted: usize,
        /// Configured budget.
        quota: usize,
    },
    /// Any other backend failure.
    #[error("storage backend failure: {message}")]
    Backend {
        /// What went wrong.
        message: String,
        /// Underlying cause, when one exists.
        #[source]
        source: Option<Box<dyn Error + Send + Sync>>,
    },
}

impl StoreError {
    /// Wrap an arbitrary backend failure.
    pub fn backend(message: impl Into<String>, source: impl Error + Send + Sync + 'static) -> Self {
        StoreError::Backend {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Minimal key-value contract the game persists through. Implementations
/// enforce a byte quota across all keys.
pub trait KvBackend: Send + Sync {
    /// Fetch a value; absent keys are `None`, not errors.
    fn get(&self, key: &str) -> BoxFuture<'static, StoreResult<Option<String>>>;
    /// Store a value, failing with [`StoreError::QuotaExceeded`] when the
    /// budget would be overrun.
    fn set(&self, key: &str, value: String) -> BoxFuture<'static, StoreResult<()>>;
    /// Remove a key; removing an absent key succeeds.
    fn remove(&self, key: &str) -> BoxFuture<'static, StoreResult<()>>;
}

/// Fail-soft wrapper around a [`KvBackend`]. Reads degrade to `None`, writes
/// degrade to `false`, and nothing here ever propagates an error into
/// gameplay.
#[derive(Clone)]
pub struct StoreAdapter {
    backend: Arc<dyn KvBackend>,
}

impl StoreAdapter {
    /// Wrap a backend.
    pub fn new(backend: Arc<dyn KvBackend>) -> Self {
        Self { backend }
    }

    /// Fetch a value, treating backend failures as absence.
    pub async fn get(&self, key: &str) -> Option<String> {
        match self.backend.get(key).await {
            Ok(value) => value,
            Err(err) => {
                warn!(key, error = %err, "storage read failed");
                None
            }
        }
    }

    /// Best-effort write. On quota exhaustion the history archive, the
    /// largest collection the game keeps, is trimmed to its
    /// [`QUOTA_TRIM_LEN`] most recent entries and the write retried once.
    /// Returns whether the value was persisted.
    pub async fn set(&self, key: &str, value: String) -> bool {
        match self.backend.set(key, value.clone()).await {
            Ok(()) => return true,
            Err(StoreError::QuotaExceeded { .. }) => {
                warn!(key, "storage quota exceeded; trimming history archive");
            }
            Err(err) => {
                warn!(key, error = %err, "storage write failed");
                return false;
            }
        }

        // When the oversized value is the archive itself, trim the incoming
        // copy; otherwise trim the stored archive to make room and retry the
        // original write untouched.
        let retry_value = if key == HISTORY_KEY {
            match trim_history_value(&value) {
                Some(trimmed) => trimmed,
                None => return false,
            }
        } else {
            self.trim_stored_history().await;
            value
        };

        match self.backend.set(key, retry_value).await {
            Ok(()) => true,
            Err(err) => {
                warn!(key, error = %err, "storage write still failing after trim");
                false
            }
        }
    }

    /// Remove a key, swallowing backend failures.
    pub async fn remove(&self, key: &str) {
        if let Err(err) = self.backend.remove(key).await {
            warn!(key, error = %err, "storage remove failed");
        }
    }

    /// Cut the stored archive down to its newest entries, freeing space for
    /// whatever write just failed.
    async fn trim_stored_history(&self) {
        let Some(raw) = self.get(HISTORY_KEY).await else {
            return;
        };
        match trim_history_value(&raw) {
            Some(trimmed) => {
                let _ = self.backend.set(HISTORY_KEY, trimmed).await;
            }
            None => {
                // An unparseable archive frees the most space of all.
                self.remove(HISTORY_KEY).await;
            }
        }
    }
}

/// Re-serialise a history payload keeping only the newest entries.
fn trim_history_value(raw: &str) -> Option<String> {
    let mut entries = serde_json::from_str::<Vec<HistoryEntry>>(raw).ok()?;
    entries.truncate(QUOTA_TRIM_LEN);
    serde_json::to_string(&entries).ok()
}

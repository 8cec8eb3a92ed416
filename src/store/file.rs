use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use futures::future::BoxFuture;
use tokio::fs;

use super::{KvBackend, StoreError, StoreResult};

/// File-backed backend: one JSON document per key inside a data directory,
/// with a byte budget enforced across the directory. Writes go through a
/// temporary file and a rename so a crash never leaves a half-written value.
#[derive(Clone)]
pub struct FileKvBackend {
    dir: Arc<PathBuf>,
    quota_bytes: usize,
}

impl FileKvBackend {
    /// Open (creating if needed) the data directory.
    pub async fn open(dir: impl Into<PathBuf>, quota_bytes: usize) -> StoreResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .await
            .map_err(|source| StoreError::backend("creating data directory", source))?;
        Ok(Self {
            dir: Arc::new(dir),
            quota_bytes,
        })
    }

    fn path_for(dir: &Path, key: &str) -> StoreResult<PathBuf> {
        // Keys are internal identifiers; refuse anything that could escape
        // the data directory.
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(StoreError::Backend {
                message: format!("invalid store key `{key}`"),
                source: None,
            });
        }
        Ok(dir.join(format!("{key}.json")))
    }

    /// Total bytes currently stored, excluding `except`.
    async fn used_bytes(dir: &Path, except: &Path) -> StoreResult<usize> {
        let mut total = 0usize;
        let mut entries = fs::read_dir(dir)
            .await
            .map_err(|source| StoreError::backend("listing data directory", source))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| StoreError::backend("listing data directory", source))?
        {
            let path = entry.path();
            if path == except || path.extension().is_none_or(|ext| ext != "json") {
                continue;
            }
            if let Ok(metadata) = entry.metadata().await {
                total += metadata.len() as usize;
            }
        }
        Ok(total)
    }
}

impl KvBackend for FileKvBackend {
    fn get(&self, key: &str) -> BoxFuture<'static, StoreResult<Option<String>>> {
        let dir = Arc::clone(&self.dir);
        let key = key.to_string();
        Box::pin(async move {
            let path = Self::path_for(&dir, &key)?;
            match fs::read_to_string(&path).await {
                Ok(contents) => Ok(Some(contents)),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
                Err(source) => Err(StoreError::backend(
                    format!("reading `{}`", path.display()),
                    source,
                )),
            }
        })
    }

    fn set(&self, key: &str, value: String) -> BoxFuture<'static, StoreResult<()>> {
        let dir = Arc::clone(&self.dir);
        let quota = self.quota_bytes;
        let key = key.to_string();
        Box::pin(async move {
            let path = Self::path_for(&dir, &key)?;
            let attempted = Self::used_bytes(&dir, &path).await? + value.len();
            if attempted > quota {
                return Err(StoreError::QuotaExceeded {
                    key,
                    attempted,
                    quota,
                });
            }

            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, value.as_bytes())
                .await
                .map_err(|source| StoreError::backend("writing temporary file", source))?;
            fs::rename(&tmp, &path)
                .await
                .map_err(|source| StoreError::backend("installing value file", source))
        })
    }

    fn remove(&self, key: &str) -> BoxFuture<'static, StoreResult<()>> {
        let dir = Arc::clone(&self.dir);
        let key = key.to_string();
        Box::pin(async move {
            let path = Self::path_for(&dir, &key)?;
            match fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
                Err(source) => Err(StoreError::backend(
                    format!("removing `{}`", path.display()),
                    source,
                )),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_values_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileKvBackend::open(dir.path(), 4096).await.unwrap();

        assert_eq!(backend.get("session").await.unwrap(), None);
        backend
            .set("session", r#"{"screen":"playing"}"#.into())
            .await
            .unwrap();
        assert_eq!(
            backend.get("session").await.unwrap().as_deref(),
            Some(r#"{"screen":"playing"}"#)
        );
        backend.remove("session").await.unwrap();
        assert_eq!(backend.get("session").await.unwrap(), None);
    }

    #[tokio::test]
    async fn enforces_quota_across_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileKvBackend::open(dir.path(), 32).await.unwrap();

        backend.set("history", "h".repeat(20)).await.unwrap();
        let err = backend
            .set("session", "s".repeat(20))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { .. }));

        // Overwriting a key is measured against the replacement, not the sum.
        backend.set("history", "h".repeat(30)).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_path_escaping_keys() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileKvBackend::open(dir.path(), 1024).await.unwrap();
        assert!(backend.set("../evil", "x".into()).await.is_err());
        assert!(backend.get("a/b").await.is_err());
    }
}

//! Persistence boundaries backing the watchlist across restarts.
use crate::error::PersistError;
use crate::models::MovieRecord;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Key under which the local backend stores the serialized watchlist.
pub const WATCHLIST_KEY: &str = "watchedMovies";
pub const DEFAULT_COLLECTION: &str = "movies";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Storage behind a [`crate::watchlist::WatchlistStore`].
///
/// Every mutation hook receives the full in-memory sequence after the change so
/// snapshot-based backends can rewrite it while collection-based backends only
/// act on the delta.
#[async_trait]
pub trait WatchlistBackend: Send + Sync {
    async fn load(&self) -> Result<Vec<MovieRecord>, PersistError>;
    async fn record_added(
        &self,
        record: &MovieRecord,
        snapshot: &[MovieRecord],
    ) -> Result<(), PersistError>;
    async fn record_removed(&self, id: &str, snapshot: &[MovieRecord])
        -> Result<(), PersistError>;
}

/// Minimal string key/value storage, the device-local boundary.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError>;
    async fn set(&self, key: &str, value: String) -> Result<(), PersistError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistError> {
        self.values.lock().await.insert(key.to_string(), value);
        Ok(())
    }
}

/// One JSON file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, PersistError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: String) -> Result<(), PersistError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Snapshot backend: the whole watchlist as a JSON array under [`WATCHLIST_KEY`].
#[derive(Debug)]
pub struct LocalBackend<S> {
    store: S,
}

impl<S: KeyValueStore> LocalBackend<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    async fn write(&self, snapshot: &[MovieRecord]) -> Result<(), PersistError> {
        let json = serde_json::to_string(snapshot)?;
        self.store.set(WATCHLIST_KEY, json).await
    }
}

#[async_trait]
impl<S: KeyValueStore> WatchlistBackend for LocalBackend<S> {
    async fn load(&self) -> Result<Vec<MovieRecord>, PersistError> {
        match self.store.get(WATCHLIST_KEY).await? {
            Some(raw) => Ok(serde_json::from_str(&raw)?),
            None => Ok(Vec::new()),
        }
    }

    async fn record_added(
        &self,
        _record: &MovieRecord,
        snapshot: &[MovieRecord],
    ) -> Result<(), PersistError> {
        self.write(snapshot).await
    }

    async fn record_removed(
        &self,
        _id: &str,
        snapshot: &[MovieRecord],
    ) -> Result<(), PersistError> {
        self.write(snapshot).await
    }
}

/// REST collection backend: `GET`/`POST {base}/{collection}`, `DELETE {base}/{collection}/{id}`.
#[derive(Debug, Clone)]
pub struct RemoteBackend {
    client: Client,
    base_url: String,
    collection: String,
}

impl RemoteBackend {
    pub fn new(base_url: &str, collection: &str) -> Result<Self, PersistError> {
        Self::with_timeout(base_url, collection, REQUEST_TIMEOUT)
    }

    /// Each request, body included, is capped at `timeout`.
    pub fn with_timeout(
        base_url: &str,
        collection: &str,
        timeout: Duration,
    ) -> Result<Self, PersistError> {
        let user_agent = format!("watchdiary/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection: collection.trim_matches('/').to_string(),
        })
    }

    fn collection_url(&self) -> String {
        format!("{}/{}", self.base_url, self.collection)
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), urlencoding::encode(id))
    }
}

#[async_trait]
impl WatchlistBackend for RemoteBackend {
    async fn load(&self) -> Result<Vec<MovieRecord>, PersistError> {
        let url = self.collection_url();
        let res = self.client.get(&url).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(PersistError::Status { status, url });
        }
        let bytes = res.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn record_added(
        &self,
        record: &MovieRecord,
        _snapshot: &[MovieRecord],
    ) -> Result<(), PersistError> {
        let url = self.collection_url();
        let res = self.client.post(&url).json(record).send().await?;
        let status = res.status();
        if !status.is_success() {
            return Err(PersistError::Status { status, url });
        }
        debug!(id = %record.id, "Backend stored record");
        Ok(())
    }

    async fn record_removed(
        &self,
        id: &str,
        _snapshot: &[MovieRecord],
    ) -> Result<(), PersistError> {
        let url = self.item_url(id);
        let res = self.client.delete(&url).send().await?;
        let status = res.status();
        // Already gone on the backend is as good as deleted.
        if status.is_success() || status == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(PersistError::Status { status, url })
    }
}

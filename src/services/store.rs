//! BlobStore — the object-store backend the relay streams from.
//!
//! Metadata lives in SQLite, payload bytes on local disk sharded beneath
//! `base_path/{container}/{shard}/{shard}/{key}`. The relay only reaches
//! the store through `fetch_conditional`, which folds the freshness check
//! into the fetch so a payload file is opened at most once per request,
//! and only when the client's cached copy is stale.

use crate::conditional::ConditionalPredicate;
use crate::models::{container::Container, object::ObjectRecord};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("container `{0}` not found")]
    ContainerNotFound(String),
    #[error("object `{key}` not found in container `{container}`")]
    ObjectNotFound { container: String, key: String },
    #[error("invalid object key")]
    InvalidObjectKey,
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of a conditional fetch. Exactly one variant per call.
///
/// "Not modified" is a first-class value here, never an error: only a
/// genuine backend failure travels the `StoreError` channel, so the HTTP
/// layer cannot accidentally collapse a broken backend into a 304.
#[derive(Debug)]
pub enum FetchVerdict {
    /// Object is newer than the client's copy (or no condition was given).
    /// Carries an open payload handle ready for streaming.
    Fresh(File, ObjectRecord),
    /// Object exists but is not newer than the condition. No payload
    /// handle is opened on this path.
    NotModified(ObjectRecord),
    /// Object does not exist.
    Missing,
}

/// SQLite-backed metadata plus on-disk payloads.
///
/// Cloneable request state: the pool is shared, the base path is cheap to
/// copy. No per-request state lives here.
#[derive(Clone)]
pub struct BlobStore {
    /// Shared SQLite connection pool used for metadata operations.
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where object payloads are stored.
    pub base_path: PathBuf,
}

const MAX_OBJECT_KEY_LEN: usize = 1024;

impl BlobStore {
    /// Create a new BlobStore backed by the provided SQLite pool and
    /// using `base_path` as the root directory for object payloads.
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            db,
            base_path: base_path.into(),
        }
    }

    /// Basic key validation to avoid trivial path traversal vectors.
    ///
    /// Rejects empty keys, keys that begin with `/` or contain `..`, and
    /// keys carrying control bytes.
    fn ensure_key_safe(&self, key: &str) -> StoreResult<()> {
        if key.is_empty() || key.len() > MAX_OBJECT_KEY_LEN {
            return Err(StoreError::InvalidObjectKey);
        }
        if key.starts_with('/') || key.contains("..") {
            return Err(StoreError::InvalidObjectKey);
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StoreError::InvalidObjectKey);
        }
        Ok(())
    }

    /// Generate two-level shard identifiers for an object key.
    ///
    /// Uses MD5(container/key) and returns the first two bytes as
    /// lowercase hex. Reduces file count per directory.
    fn object_shards(container: &str, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", container, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Construct a fully-qualified object payload path:
    /// `base_path/container/{shard}/{shard}/{key}`.
    fn object_path(&self, container: &str, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(container, key);
        let mut path = self.base_path.clone();
        path.push(container);
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    /// Fetch container metadata; ContainerNotFound if missing.
    async fn fetch_container(&self, container: &str) -> StoreResult<Container> {
        sqlx::query_as::<_, Container>(
            "SELECT id, name, created_at FROM containers WHERE name = ?",
        )
        .bind(container)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => StoreError::ContainerNotFound(container.to_string()),
            other => StoreError::Sqlx(other),
        })
    }

    /// Fetch an object metadata row, or `None` if absent.
    async fn fetch_object(
        &self,
        container: &Container,
        key: &str,
    ) -> StoreResult<Option<ObjectRecord>> {
        sqlx::query_as::<_, ObjectRecord>(
            "SELECT id, container_id, key, content_type, size_bytes, etag, last_modified
             FROM objects
             WHERE key = ? AND container_id = ?",
        )
        .bind(key)
        .bind(container.id)
        .fetch_optional(&*self.db)
        .await
        .map_err(StoreError::Sqlx)
    }

    /// Whether an object exists in the container.
    pub async fn exists(&self, container: &str, key: &str) -> StoreResult<bool> {
        self.ensure_key_safe(key)?;
        let container_rec = self.fetch_container(container).await?;
        Ok(self.fetch_object(&container_rec, key).await?.is_some())
    }

    /// Fetch only object metadata.
    pub async fn metadata(&self, container: &str, key: &str) -> StoreResult<ObjectRecord> {
        self.ensure_key_safe(key)?;
        let container_rec = self.fetch_container(container).await?;
        self.fetch_object(&container_rec, key)
            .await?
            .ok_or_else(|| StoreError::ObjectNotFound {
                container: container.to_string(),
                key: key.to_string(),
            })
    }

    /// Conditional fetch: metadata first, freshness decision second, and
    /// the payload file opened last — never speculatively.
    ///
    /// Within one request the steps are strictly sequential; the open
    /// handle travels inside `FetchVerdict::Fresh` and closes when the
    /// verdict (or the response built from it) is dropped.
    pub async fn fetch_conditional(
        &self,
        container: &str,
        key: &str,
        predicate: &ConditionalPredicate,
    ) -> StoreResult<FetchVerdict> {
        self.ensure_key_safe(key)?;
        let container_rec = self.fetch_container(container).await?;

        let object = match self.fetch_object(&container_rec, key).await? {
            Some(object) => object,
            None => return Ok(FetchVerdict::Missing),
        };

        if !predicate.satisfies(object.last_modified) {
            debug!(key, "object not newer than client copy, skipping payload open");
            return Ok(FetchVerdict::NotModified(object));
        }

        let file_path = self.object_path(&container_rec.name, key);
        let file = File::open(&file_path).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                // Metadata row without a payload file is an internal
                // inconsistency, not a missing object.
                StoreError::Io(io::Error::new(
                    ErrorKind::NotFound,
                    format!("payload file missing for object `{}`", key),
                ))
            } else {
                StoreError::Io(err)
            }
        })?;

        Ok(FetchVerdict::Fresh(file, object))
    }

    /// Upload a buffered payload and upsert its metadata row.
    ///
    /// - Writes to a temporary file, fsyncs, then atomically renames.
    /// - Computes the MD5 etag over the payload.
    /// - Overwrite semantics: re-uploading a key bumps `last_modified`.
    pub async fn put_object(
        &self,
        container: &str,
        key: &str,
        content_type: Option<String>,
        payload: Bytes,
    ) -> StoreResult<ObjectRecord> {
        self.ensure_key_safe(key)?;
        let container_rec = self.fetch_container(container).await?;

        let file_path = self.object_path(&container_rec.name, key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StoreError::Io(io::Error::other("object path missing parent directory"))
        })?;
        fs::create_dir_all(&parent).await?;

        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;
        if let Err(err) = write_durably(&mut file, &payload).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StoreError::Io(err));
        }
        drop(file);

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            if err.kind() == ErrorKind::AlreadyExists {
                fs::remove_file(&file_path).await?;
                fs::rename(&tmp_path, &file_path).await?;
            } else {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StoreError::Io(err));
            }
        }

        let etag = format!("{:x}", md5::compute(&payload));
        let last_modified = Utc::now();
        let record = self
            .upsert_object(
                &container_rec,
                key,
                content_type,
                payload.len() as i64,
                &etag,
                last_modified,
            )
            .await;

        match record {
            Ok(object) => Ok(object),
            Err(err) => {
                let _ = fs::remove_file(&file_path).await;
                Err(err)
            }
        }
    }

    async fn upsert_object(
        &self,
        container: &Container,
        key: &str,
        content_type: Option<String>,
        size_bytes: i64,
        etag: &str,
        last_modified: DateTime<Utc>,
    ) -> StoreResult<ObjectRecord> {
        sqlx::query_as::<_, ObjectRecord>(
            r#"
            INSERT INTO objects (
                id, container_id, key, content_type, size_bytes, etag, last_modified
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(container_id, key) DO UPDATE SET
                content_type = excluded.content_type,
                size_bytes = excluded.size_bytes,
                etag = excluded.etag,
                last_modified = excluded.last_modified
            RETURNING id, container_id, key, content_type, size_bytes, etag, last_modified
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(container.id)
        .bind(key)
        .bind(content_type)
        .bind(size_bytes)
        .bind(etag)
        .bind(last_modified)
        .fetch_one(&*self.db)
        .await
        .map_err(StoreError::Sqlx)
    }

    /// Create a container if it does not exist; returns the record either way.
    pub async fn create_container(&self, name: &str) -> StoreResult<Container> {
        if let Ok(existing) = self.fetch_container(name).await {
            return Ok(existing);
        }
        sqlx::query_as::<_, Container>(
            r#"
            INSERT INTO containers (id, name, created_at) VALUES (?, ?, ?)
            ON CONFLICT(name) DO UPDATE SET name = excluded.name
            RETURNING id, name, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(name)
        .bind(Utc::now())
        .fetch_one(&*self.db)
        .await
        .map_err(StoreError::Sqlx)
    }

    /// Remove every object in a container, metadata and payloads both.
    pub async fn empty_container(&self, name: &str) -> StoreResult<()> {
        let container_rec = self.fetch_container(name).await?;

        let keys: Vec<String> =
            sqlx::query_scalar("SELECT key FROM objects WHERE container_id = ?")
                .bind(container_rec.id)
                .fetch_all(&*self.db)
                .await?;

        for key in &keys {
            let path = self.object_path(&container_rec.name, key);
            if let Err(err) = fs::remove_file(&path).await {
                if err.kind() != ErrorKind::NotFound {
                    return Err(StoreError::Io(err));
                }
            }
        }

        sqlx::query("DELETE FROM objects WHERE container_id = ?")
            .bind(container_rec.id)
            .execute(&*self.db)
            .await?;

        debug!(container = name, removed = keys.len(), "emptied container");
        Ok(())
    }
}

async fn write_durably(file: &mut File, payload: &[u8]) -> io::Result<()> {
    file.write_all(payload).await?;
    file.flush().await?;
    file.sync_all().await
}

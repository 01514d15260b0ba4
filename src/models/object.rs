//! Represents an object (blob) stored in a container.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metadata snapshot for a single stored object.
///
/// Produced by the backend on every access and discarded once the
/// response is written; never cached across requests. The payload bytes
/// live on disk, addressed through `BlobStore`.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct ObjectRecord {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Foreign key linking to the parent container.
    pub container_id: Uuid,

    /// Object key (path-like identifier within the container).
    pub key: String,

    /// Content type (MIME type), if one was supplied at upload time.
    pub content_type: Option<String>,

    /// Size in bytes.
    pub size_bytes: i64,

    /// MD5 checksum of the payload.
    pub etag: String,

    /// Timestamp when the object was last modified. Drives the
    /// `Last-Modified` header and the freshness decision.
    pub last_modified: DateTime<Utc>,
}

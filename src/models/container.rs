//! Represents a container (namespace) holding stored objects.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A namespace for objects, equivalent to a bucket.
///
/// The relay serves from a single demonstration container created at
/// startup, but the store keys every object by its parent container so
/// object names only need to be unique within one.
#[derive(Serialize, Deserialize, Clone, FromRow, Debug)]
pub struct Container {
    /// Internal UUID for DB indexing.
    pub id: Uuid,

    /// Container name, unique across the store.
    pub name: String,

    /// Timestamp when the container was created.
    pub created_at: DateTime<Utc>,
}

//! HTTP handlers and the shared state they run against.

pub mod download_handlers;
pub mod health_handlers;
pub mod index_handlers;

use crate::{pipeline::ContentPipeline, services::store::BlobStore};

/// Request state shared by every handler.
///
/// Constructed once at startup and cloned per request; nothing in here is
/// mutable across requests. The store handle is a constructed dependency,
/// not a lazily-initialized global.
#[derive(Clone)]
pub struct AppState {
    pub store: BlobStore,
    pub pipeline: ContentPipeline,
    /// Container every download request is resolved against.
    pub container: String,
    /// Key of the object the index page showcases.
    pub showcase_object: String,
}

use async_trait::async_trait;
use plex_dubs_config::CollectionTarget;
use plex_dubs_models::{MediaEvent, MediaId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("{0} not found on the media server")]
    ItemNotFound(String),

    #[error("Library section '{0}' not found on the media server")]
    LibraryNotFound(String),

    #[error("Media server request failed: {0}")]
    Request(String),
}

/// Executes collection intents against the media server.
///
/// Calls happen outside the engine lock and may be slow; implementations must
/// tolerate at-least-once delivery (adding an item that is already a member
/// is not an error).
#[async_trait]
pub trait CollectionBackend: Send + Sync {
    fn backend_name(&self) -> &str;

    /// Add the item described by `event` to the target collection
    async fn add_item(&self, target: &CollectionTarget, event: &MediaEvent) -> Result<(), BackendError>;

    /// Remove a previously added item from the target collection
    async fn remove_item(&self, target: &CollectionTarget, media_id: &MediaId) -> Result<(), BackendError>;
}

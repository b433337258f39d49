use crate::backend::BackendError;
use plex_dubs_models::LibraryKind;
use thiserror::Error;

/// Per-event failure; never affects other events
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("No Plex library configured for {0} events")]
    LibraryNotConfigured(LibraryKind),

    #[error("Plex collection update failed: {0}")]
    External(#[from] BackendError),
}

impl ProcessError {
    /// Whether redelivering the same event may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, ProcessError::External(_))
    }
}

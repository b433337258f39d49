pub mod event;
pub mod media;

pub use event::{EpisodeRef, MediaDetails, MediaEvent};
pub use media::{EventKind, LibraryKind, MediaId};

pub mod backend;
pub mod classifier;
pub mod collection;
pub mod engine;
pub mod error;
pub mod processor;
pub mod recency;
pub mod registry;
pub mod registry_storage;

pub use backend::{BackendError, CollectionBackend};
pub use classifier::{has_dub, is_english};
pub use collection::{AddOutcome, CollectionManager, PlexCollection};
pub use engine::{decide, Decision, IgnoreReason};
pub use error::ProcessError;
pub use processor::{EngineState, EventProcessor, Outcome};
pub use recency::is_relevant_release;
pub use registry::DedupRegistry;
pub use registry_storage::RegistryStorage;

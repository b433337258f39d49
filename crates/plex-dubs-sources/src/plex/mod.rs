pub mod api;
pub mod backend;
pub mod matching;

pub use api::PlexHttpClient;
pub use backend::{LookupPolicy, PlexCollectionBackend};

pub mod error;
pub mod filter;
pub mod payload;
pub mod plex;
pub mod radarr;
pub mod sonarr;

pub use error::PayloadError;
pub use filter::passes_tag_filter;
pub use plex::{PlexCollectionBackend, PlexHttpClient, LookupPolicy};
pub use radarr::parse_radarr;
pub use sonarr::parse_sonarr;

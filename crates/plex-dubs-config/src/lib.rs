pub mod config;
pub mod paths;

pub use config::{CollectionTarget, Config, ConfigError, FileConfig, DEFAULT_COLLECTION_NAME, DEFAULT_DEDUP_REGISTRY_SIZE, DEFAULT_LISTEN_ADDR, DEFAULT_MAX_COLLECTION_SIZE, DEFAULT_MAX_DATE_DIFF};
pub use paths::{PathManager, container_base_path};

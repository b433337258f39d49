use crate::plex::api::{MetadataItem, PlexHttpClient, TYPE_EPISODE, TYPE_MOVIE, TYPE_SHOW};
use crate::plex::matching::{exact_match, find_episode, fuzzy_match, FUZZY_CUTOFF};
use async_trait::async_trait;
use plex_dubs_config::{CollectionTarget, Config};
use plex_dubs_core::{BackendError, CollectionBackend};
use plex_dubs_models::{LibraryKind, MediaEvent, MediaId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};

const CONNECT_ATTEMPTS: u32 = 6;
const CONNECT_INITIAL_DELAY: Duration = Duration::from_secs(5);

/// How long to wait for Plex to pick up freshly imported files
#[derive(Debug, Clone, Copy)]
pub struct LookupPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for LookupPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(10),
        }
    }
}

/// `CollectionBackend` backed by a Plex Media Server.
///
/// New members go to the front of a custom-sorted collection, so the tail
/// always holds the oldest items.
pub struct PlexCollectionBackend {
    api: PlexHttpClient,
    machine_id: String,
    lookup: LookupPolicy,
    // Library section title -> section key
    sections: Arc<RwLock<HashMap<String, String>>>,
    // Items added by this process -> Plex rating key, used for removals
    rating_keys: Arc<RwLock<HashMap<(LibraryKind, MediaId), String>>>,
    // (library section, collection name) -> lock held across find-or-create, add, move and trim
    collection_locks: Arc<Mutex<HashMap<(String, String), Arc<Mutex<()>>>>>,
}

impl PlexCollectionBackend {
    pub fn new(api: PlexHttpClient, machine_id: String) -> Self {
        Self {
            api,
            machine_id,
            lookup: LookupPolicy::default(),
            sections: Arc::new(RwLock::new(HashMap::new())),
            rating_keys: Arc::new(RwLock::new(HashMap::new())),
            collection_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn with_lookup_policy(mut self, lookup: LookupPolicy) -> Self {
        self.lookup = lookup;
        self
    }

    /// Connect to the configured server, waiting for it to come up
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        let api = PlexHttpClient::new(&config.plex_url, &config.plex_token)?;
        let machine_id = api
            .connect_with_retry(CONNECT_ATTEMPTS, CONNECT_INITIAL_DELAY)
            .await?;
        Ok(Self::new(api, machine_id))
    }

    async fn section_key(&self, target: &CollectionTarget) -> Result<String, BackendError> {
        let title = target.library_section.as_str();
        {
            let cache = self.sections.read().await;
            if let Some(key) = cache.get(title) {
                return Ok(key.clone());
            }
        }

        let libraries = self.api.get_libraries().await.map_err(request_error)?;
        let section = libraries
            .into_iter()
            .find(|library| library.title == title)
            .ok_or_else(|| BackendError::LibraryNotFound(title.to_string()))?;

        let expected = section_type(target.library_kind);
        if section.type_ != expected {
            warn!(
                library = %title,
                section_type = %section.type_,
                expected,
                "Plex library type does not match the configured library kind"
            );
        }
        debug!("Plex: Library '{}' has section key {}", title, section.key);
        self.sections
            .write()
            .await
            .insert(title.to_string(), section.key.clone());
        Ok(section.key)
    }

    /// Serializes mutations of one collection. Without it two concurrent
    /// first adds would both see no collection and both create one.
    async fn lock_collection(&self, target: &CollectionTarget) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.collection_locks.lock().await;
            locks
                .entry((target.library_section.clone(), target.collection_name.clone()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    /// Find an item by exact title, retrying while Plex scans, then fall back
    /// to fuzzy matching over the whole section
    async fn find_titled(&self, section_key: &str, type_num: u32, title: &str) -> Result<MetadataItem, BackendError> {
        for attempt in 1..=self.lookup.attempts {
            let results = self
                .api
                .search_library(section_key, type_num, title)
                .await
                .map_err(request_error)?;
            if let Some(found) = exact_match(title, &results) {
                return Ok(found.clone());
            }
            if attempt < self.lookup.attempts {
                debug!(
                    "Plex: '{}' not found (attempt {}/{}), retrying in {:?}",
                    title, attempt, self.lookup.attempts, self.lookup.delay
                );
                tokio::time::sleep(self.lookup.delay).await;
            }
        }

        let all = self
            .api
            .list_library(section_key, type_num)
            .await
            .map_err(request_error)?;
        match fuzzy_match(title, &all, FUZZY_CUTOFF) {
            Some(found) => {
                info!("Plex: Fuzzy matched '{}' to '{}'", title, found.title);
                Ok(found.clone())
            }
            None => {
                info!("Plex: No close match found for '{}'", title);
                Err(BackendError::ItemNotFound(format!("'{}'", title)))
            }
        }
    }

    async fn episode_rating_key(&self, section_key: &str, event: &MediaEvent) -> Result<String, BackendError> {
        let episode = event
            .details
            .episode
            .as_ref()
            .ok_or_else(|| BackendError::ItemNotFound(format!("episode of '{}'", event.details.title)))?;
        let show = self.find_titled(section_key, TYPE_SHOW, &event.details.title).await?;

        for attempt in 1..=self.lookup.attempts {
            let episodes = self
                .api
                .get_all_leaves(&show.rating_key)
                .await
                .map_err(request_error)?;
            if let Some(found) = find_episode(&episodes, episode.season, episode.episode) {
                return Ok(found.rating_key.clone());
            }
            if attempt < self.lookup.attempts {
                debug!(
                    "Plex: {} not found (attempt {}/{}), retrying in {:?}",
                    event.display_title(),
                    attempt,
                    self.lookup.attempts,
                    self.lookup.delay
                );
                tokio::time::sleep(self.lookup.delay).await;
            }
        }

        Err(BackendError::ItemNotFound(event.display_title()))
    }

    async fn rating_key_for(&self, section_key: &str, event: &MediaEvent) -> Result<String, BackendError> {
        match event.library_kind {
            LibraryKind::Series => self.episode_rating_key(section_key, event).await,
            LibraryKind::Movie => self
                .find_titled(section_key, TYPE_MOVIE, &event.details.title)
                .await
                .map(|movie| movie.rating_key),
        }
    }

    async fn collection_key(&self, section_key: &str, name: &str) -> Result<Option<String>, BackendError> {
        let collections = self
            .api
            .get_collections(section_key)
            .await
            .map_err(request_error)?;
        Ok(collections
            .into_iter()
            .find(|collection| collection.title == name)
            .map(|collection| collection.rating_key))
    }

    /// Remove items from the tail until the collection fits `max_size`.
    /// Returns how many were removed.
    async fn trim(&self, collection_key: &str, max_size: usize) -> Result<usize, BackendError> {
        let items = self
            .api
            .collection_items(collection_key)
            .await
            .map_err(request_error)?;
        if items.len() <= max_size {
            return Ok(0);
        }

        let excess = &items[max_size..];
        for item in excess {
            info!("Plex: Removing '{}' from collection", item.title);
            self.api
                .remove_from_collection(collection_key, &item.rating_key)
                .await
                .map_err(request_error)?;
        }
        self.rating_keys
            .write()
            .await
            .retain(|_, key| !excess.iter().any(|item| item.rating_key == *key));
        Ok(excess.len())
    }
}

#[async_trait]
impl CollectionBackend for PlexCollectionBackend {
    fn backend_name(&self) -> &str {
        "plex"
    }

    async fn add_item(&self, target: &CollectionTarget, event: &MediaEvent) -> Result<(), BackendError> {
        let section_key = self.section_key(target).await?;
        let rating_key = self.rating_key_for(&section_key, event).await?;
        let type_num = match target.library_kind {
            LibraryKind::Series => TYPE_EPISODE,
            LibraryKind::Movie => TYPE_MOVIE,
        };

        let _guard = self.lock_collection(target).await;
        match self.collection_key(&section_key, &target.collection_name).await? {
            None => {
                info!(
                    operation = "plex_create_collection",
                    collection = %target.collection_name,
                    library = %target.library_section,
                    "Creating collection"
                );
                let collection_key = self
                    .api
                    .create_collection(&section_key, type_num, &target.collection_name, &self.machine_id, &rating_key)
                    .await
                    .map_err(request_error)?;
                self.api
                    .set_custom_sort(&section_key, &collection_key)
                    .await
                    .map_err(request_error)?;
            }
            Some(collection_key) => {
                let items = self
                    .api
                    .collection_items(&collection_key)
                    .await
                    .map_err(request_error)?;

                if items.iter().any(|item| item.rating_key == rating_key) {
                    debug!("Plex: '{}' already in collection '{}'", event.display_title(), target.collection_name);
                } else {
                    self.api
                        .add_to_collection(&collection_key, &self.machine_id, &rating_key)
                        .await
                        .map_err(request_error)?;
                    self.api
                        .move_to_front(&collection_key, &rating_key)
                        .await
                        .map_err(request_error)?;
                    info!(
                        operation = "plex_add",
                        media_id = %event.media_id,
                        title = %event.display_title(),
                        collection = %target.collection_name,
                        "Added to front of collection"
                    );
                }

                // Membership on the server may predate this process
                let removed = self.trim(&collection_key, target.max_size).await?;
                if removed > 0 {
                    info!(
                        operation = "plex_trim",
                        removed,
                        collection = %target.collection_name,
                        "Trimmed collection to maximum size"
                    );
                }
            }
        }

        self.rating_keys
            .write()
            .await
            .insert((target.library_kind, event.media_id.clone()), rating_key);
        Ok(())
    }

    async fn remove_item(&self, target: &CollectionTarget, media_id: &MediaId) -> Result<(), BackendError> {
        let section_key = self.section_key(target).await?;
        let _guard = self.lock_collection(target).await;
        let collection_key = self
            .collection_key(&section_key, &target.collection_name)
            .await?
            .ok_or_else(|| BackendError::ItemNotFound(format!("collection '{}'", target.collection_name)))?;

        let known = self
            .rating_keys
            .write()
            .await
            .remove(&(target.library_kind, media_id.clone()));

        match known {
            Some(rating_key) => {
                let items = self
                    .api
                    .collection_items(&collection_key)
                    .await
                    .map_err(request_error)?;
                if items.iter().any(|item| item.rating_key == rating_key) {
                    self.api
                        .remove_from_collection(&collection_key, &rating_key)
                        .await
                        .map_err(request_error)?;
                    info!(
                        operation = "plex_remove",
                        media_id = %media_id,
                        collection = %target.collection_name,
                        "Removed from collection"
                    );
                } else {
                    debug!("Plex: {} no longer in collection '{}'", media_id, target.collection_name);
                }
                Ok(())
            }
            None => {
                // Already trimmed by the add that evicted it, or added before a restart
                let removed = self.trim(&collection_key, target.max_size).await?;
                debug!("Plex: No rating key known for {}, trimmed {} items", media_id, removed);
                Ok(())
            }
        }
    }
}

/// Plex's `type` for a library section holding this kind of media
fn section_type(kind: LibraryKind) -> &'static str {
    match kind {
        LibraryKind::Series => "show",
        LibraryKind::Movie => "movie",
    }
}

fn request_error(err: anyhow::Error) -> BackendError {
    BackendError::Request(format!("{:#}", err))
}

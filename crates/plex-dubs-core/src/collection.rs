use crate::error::ProcessError;
use plex_dubs_config::{CollectionTarget, Config};
use plex_dubs_models::{LibraryKind, MediaId};
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadyPresent,
    /// Added, and the oldest member was pushed out to stay within `max_size`
    AddedWithEviction(MediaId),
}

/// Local view of one managed collection's membership, oldest member first.
///
/// Holds `len() <= max_size` after every operation.
#[derive(Debug, Clone)]
pub struct PlexCollection {
    target: CollectionTarget,
    members: VecDeque<MediaId>,
}

impl PlexCollection {
    pub fn new(target: CollectionTarget) -> Self {
        Self {
            target,
            members: VecDeque::new(),
        }
    }

    pub fn target(&self) -> &CollectionTarget {
        &self.target
    }

    pub fn name(&self) -> &str {
        &self.target.collection_name
    }

    pub fn max_size(&self) -> usize {
        self.target.max_size
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, media_id: &MediaId) -> bool {
        self.members.contains(media_id)
    }

    pub fn members(&self) -> impl Iterator<Item = &MediaId> {
        self.members.iter()
    }

    pub fn add(&mut self, media_id: MediaId) -> AddOutcome {
        if self.contains(&media_id) {
            return AddOutcome::AlreadyPresent;
        }

        self.members.push_back(media_id);

        if self.members.len() > self.max_size() {
            if let Some(evicted) = self.members.pop_front() {
                return AddOutcome::AddedWithEviction(evicted);
            }
        }
        AddOutcome::Added
    }

    /// Undo an `add` of `media_id` that produced `outcome`.
    ///
    /// An evicted member is restored as the oldest member unless it has been
    /// re-added meanwhile or there is no longer room for it.
    pub fn revert(&mut self, media_id: &MediaId, outcome: &AddOutcome) {
        match outcome {
            AddOutcome::AlreadyPresent => {}
            AddOutcome::Added => {
                self.remove(media_id);
            }
            AddOutcome::AddedWithEviction(evicted) => {
                self.remove(media_id);
                if !self.contains(evicted) && self.members.len() < self.max_size() {
                    self.members.push_front(evicted.clone());
                }
            }
        }
    }

    pub fn remove(&mut self, media_id: &MediaId) -> bool {
        match self.members.iter().position(|m| m == media_id) {
            Some(pos) => {
                self.members.remove(pos);
                true
            }
            None => false,
        }
    }
}

/// Owns the managed collection of every configured anime library
#[derive(Debug, Clone, Default)]
pub struct CollectionManager {
    collections: BTreeMap<LibraryKind, PlexCollection>,
}

impl CollectionManager {
    pub fn from_targets<I>(targets: I) -> Self
    where
        I: IntoIterator<Item = CollectionTarget>,
    {
        let collections = targets
            .into_iter()
            .map(|target| (target.library_kind, PlexCollection::new(target)))
            .collect();
        Self { collections }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::from_targets(config.targets())
    }

    pub fn collection(&self, kind: LibraryKind) -> Option<&PlexCollection> {
        self.collections.get(&kind)
    }

    pub fn target(&self, kind: LibraryKind) -> Result<&CollectionTarget, ProcessError> {
        self.collections
            .get(&kind)
            .map(PlexCollection::target)
            .ok_or(ProcessError::LibraryNotConfigured(kind))
    }

    pub fn add(&mut self, media_id: MediaId, kind: LibraryKind) -> Result<AddOutcome, ProcessError> {
        let collection = self
            .collections
            .get_mut(&kind)
            .ok_or(ProcessError::LibraryNotConfigured(kind))?;

        let outcome = collection.add(media_id.clone());
        match &outcome {
            AddOutcome::AlreadyPresent => {
                debug!(media_id = %media_id, collection = collection.name(), "Already in collection");
            }
            AddOutcome::Added => {
                info!(
                    operation = "collection_add",
                    media_id = %media_id,
                    collection = collection.name(),
                    size = collection.len(),
                    "Added to collection"
                );
            }
            AddOutcome::AddedWithEviction(evicted) => {
                info!(
                    operation = "collection_add",
                    media_id = %media_id,
                    evicted = %evicted,
                    collection = collection.name(),
                    size = collection.len(),
                    "Added to collection, evicted oldest member"
                );
            }
        }
        Ok(outcome)
    }

    pub fn revert(&mut self, kind: LibraryKind, media_id: &MediaId, outcome: &AddOutcome) {
        if let Some(collection) = self.collections.get_mut(&kind) {
            collection.revert(media_id, outcome);
            debug!(media_id = %media_id, collection = collection.name(), "Reverted tentative add");
        }
    }
}

use plex_dubs_models::MediaId;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Media ids whose dub track was removed as part of an upgrade.
///
/// A later Download of one of these ids is the upgraded file coming back and
/// must not re-enter the collection. Insertion ordered and bounded: once
/// `capacity` is exceeded the oldest id is forgotten. Ids stay registered
/// after they suppress a re-add and only leave through that bound.
#[derive(Debug, Clone)]
pub struct DedupRegistry {
    order: VecDeque<MediaId>,
    index: HashSet<MediaId>,
    capacity: usize,
}

impl DedupRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            order: VecDeque::new(),
            index: HashSet::new(),
            capacity: capacity.max(1),
        }
    }

    /// Rebuild from a persisted snapshot (oldest first)
    pub fn from_ids<I>(capacity: usize, ids: I) -> Self
    where
        I: IntoIterator<Item = MediaId>,
    {
        let mut registry = Self::new(capacity);
        for id in ids {
            registry.register(id);
        }
        registry
    }

    pub fn contains(&self, media_id: &MediaId) -> bool {
        self.index.contains(media_id)
    }

    /// Insert `media_id`; returns false when it was already registered
    pub fn register(&mut self, media_id: MediaId) -> bool {
        if self.index.contains(&media_id) {
            return false;
        }

        self.index.insert(media_id.clone());
        self.order.push_back(media_id);

        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                debug!(media_id = %evicted, "Dedup registry full, forgetting oldest entry");
                self.index.remove(&evicted);
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Registered ids, oldest first
    pub fn iter(&self) -> impl Iterator<Item = &MediaId> {
        self.order.iter()
    }

    pub fn clear(&mut self) {
        self.order.clear();
        self.index.clear();
    }
}

use crate::backend::CollectionBackend;
use crate::collection::{AddOutcome, CollectionManager};
use crate::engine::{decide, Decision, IgnoreReason};
use crate::error::ProcessError;
use crate::registry::DedupRegistry;
use crate::registry_storage::RegistryStorage;
use chrono::{DateTime, Utc};
use plex_dubs_config::{CollectionTarget, Config};
use plex_dubs_models::{LibraryKind, MediaEvent, MediaId};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// What processing an event did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Added { evicted: Option<MediaId> },
    AlreadyPresent,
    Suppressed,
    Ignored(IgnoreReason),
    SuppressionRegistered { newly_registered: bool },
}

/// Registries and collection membership, guarded together by one lock
#[derive(Debug)]
pub struct EngineState {
    registries: BTreeMap<LibraryKind, DedupRegistry>,
    collections: CollectionManager,
    registry_capacity: usize,
    // Bumped on every new registration; orders snapshot writes
    registry_generation: u64,
}

impl EngineState {
    pub fn new(collections: CollectionManager, registry_capacity: usize) -> Self {
        Self {
            registries: BTreeMap::new(),
            collections,
            registry_capacity,
            registry_generation: 0,
        }
    }

    /// Start from previously persisted registries
    pub fn with_registries(mut self, registries: BTreeMap<LibraryKind, DedupRegistry>) -> Self {
        self.registries = registries;
        self
    }

    pub fn registry(&self, kind: LibraryKind) -> Option<&DedupRegistry> {
        self.registries.get(&kind)
    }

    pub fn registries(&self) -> &BTreeMap<LibraryKind, DedupRegistry> {
        &self.registries
    }

    pub fn collections(&self) -> &CollectionManager {
        &self.collections
    }

    fn registry_mut(&mut self, kind: LibraryKind) -> &mut DedupRegistry {
        let capacity = self.registry_capacity;
        self.registries
            .entry(kind)
            .or_insert_with(|| DedupRegistry::new(capacity))
    }
}

/// Work left to do once the engine lock is released
enum Pending {
    Done(Outcome),
    Persist {
        outcome: Outcome,
        generation: u64,
        snapshot: BTreeMap<LibraryKind, DedupRegistry>,
    },
    Mutate {
        target: CollectionTarget,
        outcome: AddOutcome,
    },
}

/// Runs events through the decision engine and applies the result.
///
/// The read-decide-write step happens under a single lock; the media server
/// call happens after the lock is released. A failed add is reverted so the
/// same event can be redelivered safely.
#[derive(Clone)]
pub struct EventProcessor {
    state: Arc<Mutex<EngineState>>,
    backend: Arc<dyn CollectionBackend>,
    storage: Option<RegistryStorage>,
    // Generation of the newest snapshot on disk
    saved_generation: Arc<Mutex<u64>>,
    max_date_diff: i64,
}

impl EventProcessor {
    pub fn new(state: EngineState, backend: Arc<dyn CollectionBackend>, max_date_diff: i64) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
            backend,
            storage: None,
            saved_generation: Arc::new(Mutex::new(0)),
            max_date_diff,
        }
    }

    /// Build from configuration, restoring registries from `storage` when given
    pub fn from_config(
        config: &Config,
        backend: Arc<dyn CollectionBackend>,
        storage: Option<RegistryStorage>,
    ) -> anyhow::Result<Self> {
        let mut state = EngineState::new(CollectionManager::from_config(config), config.dedup_registry_size);
        if let Some(ref storage) = storage {
            state = state.with_registries(storage.load(config.dedup_registry_size)?);
        }

        let mut processor = Self::new(state, backend, config.max_date_diff);
        processor.storage = storage;
        Ok(processor)
    }

    pub fn with_storage(mut self, storage: RegistryStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn state(&self) -> &Arc<Mutex<EngineState>> {
        &self.state
    }

    /// Fails with `LibraryNotConfigured` when no collection exists for `kind`
    pub async fn target(&self, kind: LibraryKind) -> Result<CollectionTarget, ProcessError> {
        let state = self.state.lock().await;
        state.collections.target(kind).cloned()
    }

    pub async fn process(&self, event: &MediaEvent) -> Result<Outcome, ProcessError> {
        self.process_at(event, Utc::now()).await
    }

    pub async fn process_at(&self, event: &MediaEvent, now: DateTime<Utc>) -> Result<Outcome, ProcessError> {
        let pending = self.decide_and_apply(event, now).await?;

        let (target, outcome) = match pending {
            Pending::Done(outcome) => return Ok(outcome),
            Pending::Persist {
                outcome,
                generation,
                snapshot,
            } => {
                self.persist(generation, snapshot).await;
                return Ok(outcome);
            }
            Pending::Mutate { target, outcome } => (target, outcome),
        };

        if let Err(e) = self.backend.add_item(&target, event).await {
            error!(
                operation = "collection_add_failed",
                media_id = %event.media_id,
                title = %event.display_title(),
                backend = self.backend.backend_name(),
                error = %e,
                "Failed to add item to collection, reverting"
            );
            let mut state = self.state.lock().await;
            state.collections.revert(event.library_kind, &event.media_id, &outcome);
            return Err(ProcessError::External(e));
        }

        let evicted = match outcome {
            AddOutcome::AddedWithEviction(evicted) => {
                // The add already happened; a failed eviction only leaves the collection oversized
                if let Err(e) = self.backend.remove_item(&target, &evicted).await {
                    warn!(
                        operation = "collection_evict_failed",
                        media_id = %evicted,
                        collection = %target.collection_name,
                        error = %e,
                        "Failed to remove evicted item from collection"
                    );
                }
                Some(evicted)
            }
            _ => None,
        };

        Ok(Outcome::Added { evicted })
    }

    /// Write a registry snapshot off the async runtime. Snapshots older than
    /// the one already on disk are skipped. A failure only costs restart
    /// survival; in-memory suppression still holds.
    async fn persist(&self, generation: u64, snapshot: BTreeMap<LibraryKind, DedupRegistry>) {
        let Some(storage) = self.storage.clone() else {
            return;
        };

        let mut saved = self.saved_generation.lock().await;
        if *saved >= generation {
            return;
        }

        let path = storage.path().to_path_buf();
        match tokio::task::spawn_blocking(move || storage.save(&snapshot)).await {
            Ok(Ok(())) => *saved = generation,
            Ok(Err(e)) => {
                warn!(error = %e, path = %path.display(), "Failed to persist dedup registry");
            }
            Err(e) => {
                warn!(error = %e, path = %path.display(), "Dedup registry save task failed");
            }
        }
    }

    async fn decide_and_apply(&self, event: &MediaEvent, now: DateTime<Utc>) -> Result<Pending, ProcessError> {
        let kind = event.library_kind;
        let mut state = self.state.lock().await;
        let target = state.collections.target(kind)?.clone();

        let decision = match state.registry(kind) {
            Some(registry) => decide(event, registry, now, self.max_date_diff),
            None => decide(event, &DedupRegistry::new(1), now, self.max_date_diff),
        };

        match decision {
            Decision::Ignore(reason) => {
                info!(
                    operation = "skip",
                    source = kind.source_name(),
                    media_id = %event.media_id,
                    title = %event.display_title(),
                    reason = %reason,
                    "Event does not meet criteria"
                );
                Ok(Pending::Done(Outcome::Ignored(reason)))
            }
            Decision::Suppress => {
                info!(
                    operation = "skip",
                    source = kind.source_name(),
                    media_id = %event.media_id,
                    title = %event.display_title(),
                    reason = "previous upgrade of dubbed item",
                    "Suppressed re-add"
                );
                Ok(Pending::Done(Outcome::Suppressed))
            }
            Decision::RegisterSuppression => {
                let newly_registered = state.registry_mut(kind).register(event.media_id.clone());
                if newly_registered {
                    info!(
                        operation = "register_suppression",
                        source = kind.source_name(),
                        media_id = %event.media_id,
                        title = %event.display_title(),
                        "Added to deletion record"
                    );
                    if self.storage.is_some() {
                        state.registry_generation += 1;
                        return Ok(Pending::Persist {
                            outcome: Outcome::SuppressionRegistered { newly_registered },
                            generation: state.registry_generation,
                            snapshot: state.registries.clone(),
                        });
                    }
                }
                Ok(Pending::Done(Outcome::SuppressionRegistered { newly_registered }))
            }
            Decision::Add => {
                let outcome = state.collections.add(event.media_id.clone(), kind)?;
                if outcome == AddOutcome::AlreadyPresent {
                    return Ok(Pending::Done(Outcome::AlreadyPresent));
                }
                let operation = if event.is_upgrade { "process_upgrade" } else { "process_recent_release" };
                info!(
                    operation,
                    source = kind.source_name(),
                    media_id = %event.media_id,
                    title = %event.display_title(),
                    collection = %target.collection_name,
                    "Queued collection add"
                );
                Ok(Pending::Mutate { target, outcome })
            }
        }
    }
}

use crate::classifier::has_dub;
use crate::recency::is_relevant_release;
use crate::registry::DedupRegistry;
use chrono::{DateTime, Utc};
use plex_dubs_models::{EventKind, MediaEvent};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoDubTrack,
    /// Neither an upgrade nor released within the freshness window
    NotRecent,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::NoDubTrack => f.write_str("no english audio track"),
            IgnoreReason::NotRecent => f.write_str("not upgrade or recent release"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Hand the item to the collection manager
    Add,
    /// A download of an item whose dub was removed during an upgrade
    Suppress,
    Ignore(IgnoreReason),
    /// Remember the item so its re-download is suppressed
    RegisterSuppression,
}

/// Decide what to do with `event`.
///
/// `registry` must be the registry of the event's library. Pure: nothing is
/// mutated, the caller applies the decision.
pub fn decide(
    event: &MediaEvent,
    registry: &DedupRegistry,
    now: DateTime<Utc>,
    max_date_diff: i64,
) -> Decision {
    if !has_dub(event) {
        return Decision::Ignore(IgnoreReason::NoDubTrack);
    }

    match event.event_kind {
        EventKind::Delete => Decision::RegisterSuppression,
        EventKind::Download => {
            if registry.contains(&event.media_id) {
                Decision::Suppress
            } else if is_relevant_release(event, now, max_date_diff) {
                Decision::Add
            } else {
                Decision::Ignore(IgnoreReason::NotRecent)
            }
        }
    }
}

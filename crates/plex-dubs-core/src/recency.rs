use chrono::{DateTime, Utc};
use plex_dubs_models::MediaEvent;

/// Upgrades always qualify; otherwise the release must be within `max_date_diff`
/// days of `now`, in either direction. Events without a release date only
/// qualify as upgrades.
pub fn is_relevant_release(event: &MediaEvent, now: DateTime<Utc>, max_date_diff: i64) -> bool {
    if event.is_upgrade {
        return true;
    }

    match event.release_date {
        Some(release_date) => {
            let days = (now.date_naive() - release_date).num_days().abs();
            days <= max_date_diff
        }
        None => false,
    }
}

//! Radarr webhook payloads.

use crate::error::PayloadError;
use crate::payload::{parse_release_date, ArrFile, TagValue};
use crate::sonarr::is_upgrade_delete;
use plex_dubs_models::{EventKind, LibraryKind, MediaDetails, MediaEvent};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RadarrPayload {
    event_type: String,
    #[serde(default)]
    movie: Option<RadarrMovie>,
    #[serde(default)]
    movie_file: Option<ArrFile>,
    #[serde(default)]
    is_upgrade: Option<bool>,
    #[serde(default)]
    delete_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RadarrMovie {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    release_date: Option<String>,
    #[serde(default)]
    tags: Vec<TagValue>,
}

/// Normalize a Radarr webhook body; `Ok(None)` for events of no interest
pub fn parse_radarr(body: &[u8]) -> Result<Option<MediaEvent>, PayloadError> {
    let payload: RadarrPayload = serde_json::from_slice(body)?;

    let event_kind = match payload.event_type.as_str() {
        "Download" => EventKind::Download,
        "MovieFileDelete" if is_upgrade_delete(payload.delete_reason.as_deref()) => EventKind::Delete,
        _ => return Ok(None),
    };

    let movie = payload.movie.ok_or(PayloadError::MissingField("movie"))?;
    let movie_id = movie.id.ok_or(PayloadError::MissingField("movie.id"))?;

    let audio_tracks = payload
        .movie_file
        .map(|file| file.audio_tracks())
        .unwrap_or_default();

    Ok(Some(
        MediaEvent::new(event_kind, movie_id, LibraryKind::Movie)
            .with_audio_tracks(audio_tracks)
            .with_tags(movie.tags.into_iter().map(TagValue::into_label))
            .with_release_date(parse_release_date(movie.release_date.as_deref()))
            .with_upgrade(payload.is_upgrade.unwrap_or(false))
            .with_details(MediaDetails {
                title: movie.title,
                episode: None,
            }),
    ))
}

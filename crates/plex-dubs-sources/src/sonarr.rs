//! Sonarr webhook payloads.

use crate::error::PayloadError;
use crate::payload::{parse_release_date, ArrFile, TagValue};
use plex_dubs_models::{EpisodeRef, EventKind, LibraryKind, MediaDetails, MediaEvent};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrPayload {
    event_type: String,
    #[serde(default)]
    series: Option<SonarrSeries>,
    #[serde(default)]
    episodes: Vec<SonarrEpisode>,
    #[serde(default)]
    episode_file: Option<ArrFile>,
    #[serde(default)]
    is_upgrade: Option<bool>,
    #[serde(default)]
    delete_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrSeries {
    #[serde(default)]
    title: String,
    #[serde(default)]
    tags: Vec<TagValue>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SonarrEpisode {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    season_number: Option<u32>,
    #[serde(default)]
    episode_number: Option<u32>,
    #[serde(default)]
    air_date: Option<String>,
}

/// Normalize a Sonarr webhook body.
///
/// `Ok(None)` means the event is valid but of no interest (tests, grabs,
/// renames, deletes that are not part of an upgrade).
pub fn parse_sonarr(body: &[u8]) -> Result<Option<MediaEvent>, PayloadError> {
    let payload: SonarrPayload = serde_json::from_slice(body)?;

    let event_kind = match payload.event_type.as_str() {
        "Download" => EventKind::Download,
        "EpisodeFileDelete" if is_upgrade_delete(payload.delete_reason.as_deref()) => EventKind::Delete,
        _ => return Ok(None),
    };

    let episode = payload
        .episodes
        .into_iter()
        .next()
        .ok_or(PayloadError::MissingField("episodes"))?;
    let episode_id = episode.id.ok_or(PayloadError::MissingField("episodes[0].id"))?;

    let (series_title, tags): (String, Vec<String>) = match payload.series {
        Some(series) => (
            series.title,
            series.tags.into_iter().map(TagValue::into_label).collect(),
        ),
        None => (String::new(), Vec::new()),
    };

    let episode_ref = match (episode.season_number, episode.episode_number) {
        (Some(season), Some(number)) => Some(EpisodeRef {
            season,
            episode: number,
            title: episode.title,
        }),
        _ => None,
    };

    let audio_tracks = payload
        .episode_file
        .map(|file| file.audio_tracks())
        .unwrap_or_default();

    Ok(Some(
        MediaEvent::new(event_kind, episode_id, LibraryKind::Series)
            .with_audio_tracks(audio_tracks)
            .with_tags(tags)
            .with_release_date(parse_release_date(episode.air_date.as_deref()))
            .with_upgrade(payload.is_upgrade.unwrap_or(false))
            .with_details(MediaDetails {
                title: series_title,
                episode: episode_ref,
            }),
    ))
}

pub(crate) fn is_upgrade_delete(reason: Option<&str>) -> bool {
    reason.is_some_and(|r| r.eq_ignore_ascii_case("upgrade"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use plex_dubs_models::MediaId;

    const DOWNLOAD: &str = r#"{
        "eventType": "Download",
        "isUpgrade": false,
        "series": {"id": 7, "title": "Dandadan", "tags": ["anime", "simulcast"]},
        "episodes": [{
            "id": 42, "episodeNumber": 5, "seasonNumber": 1,
            "title": "Like, Totally Unreal", "airDate": "2024-11-01"
        }],
        "episodeFile": {"mediaInfo": {"audioLanguages": ["jpn", "eng"]}}
    }"#;

    #[test]
    fn test_download_normalized() {
        let event = parse_sonarr(DOWNLOAD.as_bytes()).unwrap().unwrap();
        assert_eq!(event.event_kind, EventKind::Download);
        assert_eq!(event.media_id, MediaId::from("42"));
        assert_eq!(event.library_kind, LibraryKind::Series);
        assert_eq!(event.audio_tracks, vec!["jpn", "eng"]);
        assert!(event.has_tag("Anime"));
        assert_eq!(event.release_date, NaiveDate::from_ymd_opt(2024, 11, 1));
        assert!(!event.is_upgrade);
        assert_eq!(event.display_title(), "Dandadan S01E05");
    }

    #[test]
    fn test_upgrade_delete_is_delete_event() {
        let body = r#"{
            "eventType": "EpisodeFileDelete",
            "deleteReason": "upgrade",
            "series": {"title": "Dandadan"},
            "episodes": [{"id": 42}],
            "episodeFile": {"mediaInfo": {"audioLanguages": "eng / jpn"}}
        }"#;
        let event = parse_sonarr(body.as_bytes()).unwrap().unwrap();
        assert_eq!(event.event_kind, EventKind::Delete);
        assert_eq!(event.audio_tracks, vec!["eng", "jpn"]);
    }

    #[test]
    fn test_irrelevant_events_ignored() {
        for body in [
            r#"{"eventType": "Test"}"#,
            r#"{"eventType": "Grab", "episodes": [{"id": 1}]}"#,
            r#"{"eventType": "EpisodeFileDelete", "deleteReason": "manual", "episodes": [{"id": 1}]}"#,
        ] {
            assert!(parse_sonarr(body.as_bytes()).unwrap().is_none(), "{body}");
        }
    }

    #[test]
    fn test_missing_episode_id_rejected() {
        let body = r#"{"eventType": "Download", "episodes": [{"title": "x"}]}"#;
        assert!(matches!(
            parse_sonarr(body.as_bytes()),
            Err(PayloadError::MissingField("episodes[0].id"))
        ));

        let body = r#"{"eventType": "Download"}"#;
        assert!(matches!(
            parse_sonarr(body.as_bytes()),
            Err(PayloadError::MissingField("episodes"))
        ));
    }

    #[test]
    fn test_malformed_json_rejected() {
        assert!(matches!(parse_sonarr(b"{not json"), Err(PayloadError::Json(_))));
        assert!(matches!(parse_sonarr(b"{}"), Err(PayloadError::Json(_))));
    }

    #[test]
    fn test_numeric_tags_and_missing_media_info() {
        let body = r#"{
            "eventType": "Download",
            "isUpgrade": true,
            "series": {"title": "Frieren", "tags": [3]},
            "episodes": [{"id": 9, "seasonNumber": 1, "episodeNumber": 2}]
        }"#;
        let event = parse_sonarr(body.as_bytes()).unwrap().unwrap();
        assert!(event.has_tag("3"));
        assert!(event.audio_tracks.is_empty());
        assert!(event.is_upgrade);
        assert_eq!(event.release_date, None);
    }
}

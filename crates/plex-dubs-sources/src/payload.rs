//! Pieces shared by the Sonarr and Radarr webhook formats.

use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use tracing::warn;

/// `episodeFile` / `movieFile`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ArrFile {
    #[serde(default)]
    pub media_info: Option<MediaInfo>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MediaInfo {
    #[serde(default)]
    pub audio_languages: Option<AudioLanguages>,
}

/// Newer releases send a list, older ones a single "eng / jpn" string
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum AudioLanguages {
    List(Vec<String>),
    Joined(String),
}

/// Tags arrive as labels or, from older versions, as numeric ids
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum TagValue {
    Label(String),
    Id(i64),
}

impl TagValue {
    pub fn into_label(self) -> String {
        match self {
            TagValue::Label(label) => label,
            TagValue::Id(id) => id.to_string(),
        }
    }
}

impl ArrFile {
    pub fn audio_tracks(&self) -> Vec<String> {
        let languages = self
            .media_info
            .as_ref()
            .and_then(|info| info.audio_languages.as_ref());

        match languages {
            Some(AudioLanguages::List(list)) => list
                .iter()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
            Some(AudioLanguages::Joined(joined)) => joined
                .split('/')
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect(),
            None => Vec::new(),
        }
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp
pub(crate) fn parse_release_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }

    warn!(date = raw, "Invalid date format");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_release_date_formats() {
        assert_eq!(parse_release_date(Some("2024-04-07")), NaiveDate::from_ymd_opt(2024, 4, 7));
        assert_eq!(
            parse_release_date(Some("2024-04-07T15:00:00Z")),
            NaiveDate::from_ymd_opt(2024, 4, 7)
        );
        assert_eq!(parse_release_date(Some("April 7th")), None);
        assert_eq!(parse_release_date(Some("")), None);
        assert_eq!(parse_release_date(None), None);
    }

    #[test]
    fn test_joined_audio_languages_split() {
        let file: ArrFile =
            serde_json::from_str(r#"{"mediaInfo": {"audioLanguages": "jpn / eng"}}"#).unwrap();
        assert_eq!(file.audio_tracks(), vec!["jpn", "eng"]);
    }

    #[test]
    fn test_missing_media_info_has_no_tracks() {
        let file: ArrFile = serde_json::from_str("{}").unwrap();
        assert!(file.audio_tracks().is_empty());
    }
}

use crate::media::{EventKind, LibraryKind, MediaId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Normalized Download or Delete notification from Sonarr/Radarr.
///
/// Built once by the payload parsers and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaEvent {
    pub event_kind: EventKind,
    pub media_id: MediaId,
    pub library_kind: LibraryKind,
    pub tags: BTreeSet<String>,
    /// Audio track languages exactly as reported in the payload (e.g. "eng", "jpn")
    pub audio_tracks: Vec<String>,
    /// Air date (episodes) or release date (movies), if known
    pub release_date: Option<NaiveDate>,
    pub is_upgrade: bool,
    pub details: MediaDetails,
}

/// Identifying information used to find the item on the Plex server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaDetails {
    /// Series title for episodes, movie title for movies
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub episode: Option<EpisodeRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeRef {
    pub season: u32,
    pub episode: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl MediaEvent {
    pub fn new(event_kind: EventKind, media_id: impl Into<MediaId>, library_kind: LibraryKind) -> Self {
        Self {
            event_kind,
            media_id: media_id.into(),
            library_kind,
            tags: BTreeSet::new(),
            audio_tracks: Vec::new(),
            release_date: None,
            is_upgrade: false,
            details: MediaDetails::default(),
        }
    }

    pub fn with_audio_tracks<I, S>(mut self, tracks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audio_tracks = tracks.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_release_date(mut self, date: Option<NaiveDate>) -> Self {
        self.release_date = date;
        self
    }

    pub fn with_upgrade(mut self, is_upgrade: bool) -> Self {
        self.is_upgrade = is_upgrade;
        self
    }

    pub fn with_details(mut self, details: MediaDetails) -> Self {
        self.details = details;
        self
    }

    /// Case-insensitive tag membership
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    /// Human readable label for logs, e.g. "Frieren S01E05" or "Your Name"
    pub fn display_title(&self) -> String {
        match &self.details.episode {
            Some(ep) => format!("{} S{:02}E{:02}", self.details.title, ep.season, ep.episode),
            None => self.details.title.clone(),
        }
    }
}

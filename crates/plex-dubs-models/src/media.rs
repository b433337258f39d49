use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identifier of a media item as reported by Sonarr (episode id) or
/// Radarr (movie id).
///
/// Ids from the two services live in different libraries, so the id alone is
/// only unique within a `LibraryKind`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaId(String);

impl MediaId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MediaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MediaId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for MediaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for MediaId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Download,
    Delete,
}

/// Which Plex library an event belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LibraryKind {
    /// Anime series managed by Sonarr
    Series,
    /// Anime movies managed by Radarr
    Movie,
}

impl LibraryKind {
    /// Name of the *arr service that reports events for this library
    pub fn source_name(&self) -> &'static str {
        match self {
            LibraryKind::Series => "sonarr",
            LibraryKind::Movie => "radarr",
        }
    }
}

impl fmt::Display for LibraryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LibraryKind::Series => f.write_str("series"),
            LibraryKind::Movie => f.write_str("movie"),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::Download => f.write_str("download"),
            EventKind::Delete => f.write_str("delete"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_id_from_number_and_str_match() {
        assert_eq!(MediaId::from(42u64), MediaId::from("42"));
        assert_eq!(MediaId::from(42u64).to_string(), "42");
    }

    #[test]
    fn test_media_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&MediaId::new("ep42")).unwrap();
        assert_eq!(json, "\"ep42\"");
    }
}

use plex_dubs_models::MediaEvent;

/// Language codes Sonarr/Radarr use for English audio (ISO 639-2, ISO 639-1, name)
const ENGLISH_CODES: [&str; 3] = ["eng", "en", "english"];

/// Whether the event reports at least one English audio track
pub fn has_dub(event: &MediaEvent) -> bool {
    event.audio_tracks.iter().any(|track| is_english(track))
}

pub fn is_english(language: &str) -> bool {
    let language = language.trim();
    ENGLISH_CODES.iter().any(|code| language.eq_ignore_ascii_case(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use plex_dubs_models::{EventKind, LibraryKind};

    fn event_with_tracks(tracks: &[&str]) -> MediaEvent {
        MediaEvent::new(EventKind::Download, "1", LibraryKind::Series).with_audio_tracks(tracks.iter().copied())
    }

    #[test]
    fn test_dual_audio_has_dub() {
        assert!(has_dub(&event_with_tracks(&["jpn", "eng"])));
    }

    #[test]
    fn test_language_names_and_case() {
        assert!(has_dub(&event_with_tracks(&[" English "])));
        assert!(has_dub(&event_with_tracks(&["ENG"])));
        assert!(has_dub(&event_with_tracks(&["en"])));
    }

    #[test]
    fn test_sub_only_has_no_dub() {
        assert!(!has_dub(&event_with_tracks(&["jpn"])));
        assert!(!has_dub(&event_with_tracks(&[])));
    }

    #[test]
    fn test_garbage_entries_are_not_english() {
        assert!(!has_dub(&event_with_tracks(&["", "engl", "eng/jpn", "Englishish"])));
    }
}

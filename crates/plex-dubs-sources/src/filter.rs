use plex_dubs_config::Config;
use plex_dubs_models::MediaEvent;

/// Whether the event carries the configured anime tag for its library.
///
/// With no tag configured every event passes.
pub fn passes_tag_filter(event: &MediaEvent, config: &Config) -> bool {
    match config.anime_tag_for(event.library_kind) {
        Some(tag) => event.has_tag(tag),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plex_dubs_config::FileConfig;
    use plex_dubs_models::{EventKind, LibraryKind};

    fn config(sonarr_tag: Option<&str>) -> Config {
        let mut file = FileConfig {
            plex_url: Some("http://plex:32400".to_string()),
            plex_token: Some("token".to_string()),
            plex_anime_series: Some("Anime".to_string()),
            plex_anime_movies: Some("Anime Movies".to_string()),
            ..FileConfig::default()
        };
        file.sonarr_anime_tag = sonarr_tag.map(str::to_string);
        Config::from_sources(file, |_| None).unwrap()
    }

    #[test]
    fn test_untagged_series_rejected_when_tag_configured() {
        let event = MediaEvent::new(EventKind::Download, "1", LibraryKind::Series).with_tags(["4k"]);
        assert!(!passes_tag_filter(&event, &config(Some("anime"))));
        assert!(passes_tag_filter(&event.with_tags(["ANIME"]), &config(Some("anime"))));
    }

    #[test]
    fn test_no_tag_configured_passes_everything() {
        let movie = MediaEvent::new(EventKind::Download, "1", LibraryKind::Movie);
        assert!(passes_tag_filter(&movie, &config(Some("anime"))));
        assert!(passes_tag_filter(&movie, &config(None)));
    }
}

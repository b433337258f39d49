use plex_dubs_models::LibraryKind;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

pub const DEFAULT_COLLECTION_NAME: &str = "Latest Dubs";
pub const DEFAULT_MAX_COLLECTION_SIZE: usize = 100;
pub const DEFAULT_MAX_DATE_DIFF: i64 = 4;
pub const DEFAULT_DEDUP_REGISTRY_SIZE: usize = 100;
pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Every problem found during validation, reported together
    #[error("Invalid configuration: {}", .0.join("; "))]
    Invalid(Vec<String>),
}

/// Optional TOML overlay. Keys mirror the environment variable names in lower case;
/// anything set in the environment takes precedence.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub plex_url: Option<String>,
    pub plex_token: Option<String>,
    pub plex_anime_series: Option<String>,
    pub plex_anime_movies: Option<String>,
    pub plex_collection_name: Option<String>,
    pub max_collection_size: Option<usize>,
    pub max_date_diff: Option<i64>,
    pub dedup_registry_size: Option<usize>,
    pub sonarr_anime_tag: Option<String>,
    pub radarr_anime_tag: Option<String>,
    pub listen_addr: Option<String>,
}

impl FileConfig {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Process-wide settings, read once at startup
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    pub plex_url: String,
    #[serde(skip_serializing)]
    pub plex_token: String,
    /// Plex library section holding anime series
    pub series_library: Option<String>,
    /// Plex library section holding anime movies
    pub movie_library: Option<String>,
    pub collection_name: String,
    pub max_collection_size: usize,
    pub max_date_diff: i64,
    pub dedup_registry_size: usize,
    pub sonarr_anime_tag: Option<String>,
    pub radarr_anime_tag: Option<String>,
    pub listen_addr: String,
}

/// The managed collection inside one anime library
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionTarget {
    pub library_kind: LibraryKind,
    pub library_section: String,
    pub collection_name: String,
    pub max_size: usize,
}

impl Config {
    /// Load from the process environment, optionally layered over a TOML file
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let file_config = match file {
            Some(path) => FileConfig::load_from_file(path)?,
            None => FileConfig::default(),
        };
        Self::from_sources(file_config, |key| std::env::var(key).ok())
    }

    /// Resolve every setting from `lookup` first, then `file`, then defaults
    pub fn from_sources<F>(file: FileConfig, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut errors = Vec::new();

        // Empty values count as unset, same as an absent variable
        let get = |key: &str, fallback: Option<String>| -> Option<String> {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .or(fallback.filter(|v| !v.trim().is_empty()))
        };

        let plex_url = get("PLEX_URL", file.plex_url);
        let plex_token = get("PLEX_TOKEN", file.plex_token);
        let series_library = get("PLEX_ANIME_SERIES", file.plex_anime_series);
        let movie_library = get("PLEX_ANIME_MOVIES", file.plex_anime_movies);

        if plex_url.is_none() {
            errors.push("The PLEX_URL environment variable is required".to_string());
        }
        if plex_token.is_none() {
            errors.push("The PLEX_TOKEN environment variable is required".to_string());
        }
        if series_library.is_none() && movie_library.is_none() {
            errors.push(
                "At least one of PLEX_ANIME_SERIES or PLEX_ANIME_MOVIES environment variables is required"
                    .to_string(),
            );
        }
        if let Some(ref url) = plex_url {
            if !is_valid_url(url) {
                errors.push(format!("{} is not a valid URL", url));
            }
        }

        let max_collection_size = parse_number(
            "MAX_COLLECTION_SIZE",
            lookup("MAX_COLLECTION_SIZE"),
            file.max_collection_size,
            DEFAULT_MAX_COLLECTION_SIZE,
            &mut errors,
        );
        if max_collection_size == 0 {
            errors.push("MAX_COLLECTION_SIZE must be greater than zero".to_string());
        }

        let max_date_diff = parse_number(
            "MAX_DATE_DIFF",
            lookup("MAX_DATE_DIFF"),
            file.max_date_diff,
            DEFAULT_MAX_DATE_DIFF,
            &mut errors,
        );
        if max_date_diff < 0 {
            errors.push("MAX_DATE_DIFF must be non-negative".to_string());
        }

        let dedup_registry_size = parse_number(
            "DEDUP_REGISTRY_SIZE",
            lookup("DEDUP_REGISTRY_SIZE"),
            file.dedup_registry_size,
            DEFAULT_DEDUP_REGISTRY_SIZE,
            &mut errors,
        );
        if dedup_registry_size == 0 {
            errors.push("DEDUP_REGISTRY_SIZE must be greater than zero".to_string());
        }

        if !errors.is_empty() {
            return Err(ConfigError::Invalid(errors));
        }

        Ok(Self {
            plex_url: plex_url.unwrap_or_default().trim_end_matches('/').to_string(),
            plex_token: plex_token.unwrap_or_default(),
            series_library,
            movie_library,
            collection_name: get("PLEX_COLLECTION_NAME", file.plex_collection_name)
                .unwrap_or_else(|| DEFAULT_COLLECTION_NAME.to_string()),
            max_collection_size,
            max_date_diff,
            dedup_registry_size,
            sonarr_anime_tag: get("SONARR_ANIME_TAG", file.sonarr_anime_tag),
            radarr_anime_tag: get("RADARR_ANIME_TAG", file.radarr_anime_tag),
            listen_addr: get("LISTEN_ADDR", file.listen_addr)
                .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string()),
        })
    }

    /// Plex library section configured for a library kind
    pub fn library_for(&self, kind: LibraryKind) -> Option<&str> {
        match kind {
            LibraryKind::Series => self.series_library.as_deref(),
            LibraryKind::Movie => self.movie_library.as_deref(),
        }
    }

    /// Tag an event must carry to be considered anime, if filtering is enabled
    pub fn anime_tag_for(&self, kind: LibraryKind) -> Option<&str> {
        match kind {
            LibraryKind::Series => self.sonarr_anime_tag.as_deref(),
            LibraryKind::Movie => self.radarr_anime_tag.as_deref(),
        }
    }

    pub fn target_for(&self, kind: LibraryKind) -> Option<CollectionTarget> {
        self.library_for(kind).map(|section| CollectionTarget {
            library_kind: kind,
            library_section: section.to_string(),
            collection_name: self.collection_name.clone(),
            max_size: self.max_collection_size,
        })
    }

    /// Collection targets for every configured anime library
    pub fn targets(&self) -> Vec<CollectionTarget> {
        [LibraryKind::Series, LibraryKind::Movie]
            .into_iter()
            .filter_map(|kind| self.target_for(kind))
            .collect()
    }
}

fn is_valid_url(url: &str) -> bool {
    match Url::parse(url) {
        Ok(parsed) => matches!(parsed.scheme(), "http" | "https") && parsed.host_str().is_some(),
        Err(_) => false,
    }
}

fn parse_number<T>(
    key: &str,
    env_value: Option<String>,
    file_value: Option<T>,
    default: T,
    errors: &mut Vec<String>,
) -> T
where
    T: std::str::FromStr + Copy,
{
    match env_value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(raw) => match raw.parse::<T>() {
            Ok(value) => value,
            Err(_) => {
                errors.push(format!("{} must be a whole number, got '{}'", key, raw));
                default
            }
        },
        None => file_value.unwrap_or(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn invalid_messages(err: ConfigError) -> Vec<String> {
        match err {
            ConfigError::Invalid(messages) => messages,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_defaults_applied() {
        let config = Config::from_sources(
            FileConfig::default(),
            env(&[
                ("PLEX_URL", "http://plex:32400/"),
                ("PLEX_TOKEN", "token"),
                ("PLEX_ANIME_SERIES", "Anime"),
            ]),
        )
        .unwrap();

        assert_eq!(config.plex_url, "http://plex:32400");
        assert_eq!(config.max_collection_size, 100);
        assert_eq!(config.max_date_diff, 4);
        assert_eq!(config.dedup_registry_size, 100);
        assert_eq!(config.collection_name, "Latest Dubs");
        assert_eq!(config.listen_addr, "0.0.0.0:5000");
        assert_eq!(config.movie_library, None);
    }

    #[test]
    fn test_missing_everything_reports_all_problems() {
        let messages = invalid_messages(Config::from_sources(FileConfig::default(), env(&[])).unwrap_err());
        assert_eq!(messages.len(), 3);
        assert!(messages.iter().any(|m| m.contains("PLEX_URL")));
        assert!(messages.iter().any(|m| m.contains("PLEX_TOKEN")));
        assert!(messages.iter().any(|m| m.contains("PLEX_ANIME_SERIES or PLEX_ANIME_MOVIES")));
    }

    #[test]
    fn test_empty_library_values_count_as_missing() {
        let err = Config::from_sources(
            FileConfig::default(),
            env(&[
                ("PLEX_URL", "http://plex:32400"),
                ("PLEX_TOKEN", "token"),
                ("PLEX_ANIME_SERIES", ""),
                ("PLEX_ANIME_MOVIES", "  "),
            ]),
        )
        .unwrap_err();
        assert_eq!(invalid_messages(err).len(), 1);
    }

    #[test]
    fn test_malformed_numbers_rejected() {
        let err = Config::from_sources(
            FileConfig::default(),
            env(&[
                ("PLEX_URL", "http://plex:32400"),
                ("PLEX_TOKEN", "token"),
                ("PLEX_ANIME_MOVIES", "Anime Movies"),
                ("MAX_COLLECTION_SIZE", "lots"),
                ("MAX_DATE_DIFF", "-1"),
            ]),
        )
        .unwrap_err();
        let messages = invalid_messages(err);
        assert!(messages.iter().any(|m| m.contains("MAX_COLLECTION_SIZE")));
        assert!(messages.iter().any(|m| m.contains("MAX_DATE_DIFF")));
    }

    #[test]
    fn test_invalid_url_rejected() {
        let err = Config::from_sources(
            FileConfig::default(),
            env(&[
                ("PLEX_URL", "plex.local"),
                ("PLEX_TOKEN", "token"),
                ("PLEX_ANIME_SERIES", "Anime"),
            ]),
        )
        .unwrap_err();
        assert!(invalid_messages(err)[0].contains("not a valid URL"));
    }

    #[test]
    fn test_environment_overrides_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "plex_url = \"http://file:32400\"\nplex_token = \"file-token\"\nplex_anime_series = \"Anime\"\nmax_collection_size = 25"
        )
        .unwrap();

        let file_config = FileConfig::load_from_file(file.path()).unwrap();
        let config = Config::from_sources(file_config, env(&[("PLEX_URL", "http://env:32400")])).unwrap();

        assert_eq!(config.plex_url, "http://env:32400");
        assert_eq!(config.plex_token, "file-token");
        assert_eq!(config.max_collection_size, 25);
    }

    #[test]
    fn test_targets_follow_configured_libraries() {
        let config = Config::from_sources(
            FileConfig::default(),
            env(&[
                ("PLEX_URL", "https://plex.example.com"),
                ("PLEX_TOKEN", "token"),
                ("PLEX_ANIME_MOVIES", "Anime Movies"),
                ("PLEX_COLLECTION_NAME", "Fresh Dubs"),
                ("MAX_COLLECTION_SIZE", "10"),
            ]),
        )
        .unwrap();

        assert!(config.target_for(LibraryKind::Series).is_none());
        assert_eq!(
            config.targets(),
            vec![CollectionTarget {
                library_kind: LibraryKind::Movie,
                library_section: "Anime Movies".to_string(),
                collection_name: "Fresh Dubs".to_string(),
                max_size: 10,
            }]
        );
    }

    #[test]
    fn test_unreadable_file_is_io_error() {
        let err = FileConfig::load_from_file(Path::new("/nonexistent/plex-dubs.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

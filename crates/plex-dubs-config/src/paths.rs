use anyhow::Result;
use std::path::{Path, PathBuf};

/// Get the container base path from environment variable, defaulting to "/app"
pub fn container_base_path() -> PathBuf {
    std::env::var("PLEX_DUBS_BASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/app"))
}

pub struct PathManager {
    data_dir: PathBuf,
}

impl PathManager {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?
            .join("plex-dubs");

        Ok(Self::with_base(&base_dir))
    }

    pub fn from_docker_env() -> Self {
        Self::with_base(&container_base_path())
    }

    pub fn with_base(base: &Path) -> Self {
        Self {
            data_dir: base.join("data"),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Snapshot of media ids whose dub track was removed during an upgrade
    pub fn registry_file(&self) -> PathBuf {
        self.data_dir.join("deleted_media_ids.bin")
    }

    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

impl Default for PathManager {
    fn default() -> Self {
        // The container image creates the base directory, so its presence means Docker
        let base = container_base_path();
        if base.exists() {
            return Self::from_docker_env();
        }

        Self::new().unwrap_or_else(|_| Self::from_docker_env())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_base_layout() {
        let paths = PathManager::with_base(Path::new("/srv/plex-dubs"));
        assert_eq!(paths.registry_file(), PathBuf::from("/srv/plex-dubs/data/deleted_media_ids.bin"));
        assert_eq!(paths.data_dir(), Path::new("/srv/plex-dubs/data"));
    }

    #[test]
    fn test_ensure_directories_creates_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathManager::with_base(dir.path());
        paths.ensure_directories().unwrap();
        assert!(paths.data_dir().is_dir());
        assert!(!dir.path().join("logs").exists());
    }
}

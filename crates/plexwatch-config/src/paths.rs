use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "plexwatch";

/// Base directory inside the container image: `$PLEXWATCH_BASE_PATH`, or `/app`
pub fn container_base_path() -> PathBuf {
    std::env::var("PLEXWATCH_BASE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/app"))
}

/// File layout under one base directory:
///
/// ```text
/// <base>/config.toml
/// <base>/credentials.toml
/// <base>/data/state.json
/// <base>/logs/
/// ```
#[derive(Debug, Clone)]
pub struct PathManager {
    base: PathBuf,
}

impl PathManager {
    pub fn with_base(base: PathBuf) -> Self {
        Self { base }
    }

    /// `~/.config/plexwatch` on Linux, the platform equivalent elsewhere
    pub fn platform() -> Option<Self> {
        dirs::config_dir().map(|dir| Self::with_base(dir.join(APP_DIR)))
    }

    pub fn container() -> Self {
        Self::with_base(container_base_path())
    }

    pub fn config_dir(&self) -> &Path {
        &self.base
    }

    pub fn data_dir(&self) -> PathBuf {
        self.base.join("data")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.base.join("logs")
    }

    pub fn config_file(&self) -> PathBuf {
        self.base.join("config.toml")
    }

    pub fn credentials_file(&self) -> PathBuf {
        self.base.join("credentials.toml")
    }

    pub fn state_file(&self) -> PathBuf {
        self.data_dir().join("state.json")
    }

    /// Relative log file names land in the log directory
    pub fn resolve_log_file(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.log_dir().join(file)
        }
    }

    pub fn ensure_directories(&self) -> Result<()> {
        for dir in [self.base.clone(), self.data_dir(), self.log_dir()] {
            std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

impl Default for PathManager {
    /// The container image creates its base directory, so its presence means
    /// we are running inside it
    fn default() -> Self {
        if container_base_path().exists() {
            return Self::container();
        }
        Self::platform().unwrap_or_else(Self::container)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_under_base() {
        let dir = tempfile::tempdir().unwrap();
        let paths = PathManager::with_base(dir.path().to_path_buf());
        assert_eq!(paths.config_file(), dir.path().join("config.toml"));
        assert_eq!(paths.state_file(), dir.path().join("data").join("state.json"));

        paths.ensure_directories().unwrap();
        assert!(paths.data_dir().is_dir());
        assert!(paths.log_dir().is_dir());
    }

    #[test]
    fn test_resolve_log_file() {
        let paths = PathManager::with_base(PathBuf::from("/srv/plexwatch"));
        assert_eq!(
            paths.resolve_log_file(Path::new("plexwatch.log")),
            PathBuf::from("/srv/plexwatch/logs/plexwatch.log")
        );
        assert_eq!(
            paths.resolve_log_file(Path::new("/var/log/plexwatch.log")),
            PathBuf::from("/var/log/plexwatch.log")
        );
    }
}

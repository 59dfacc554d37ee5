//! Locating and reading the TOML configuration.
//!
//! Without `--config` the first existing candidate wins and a missing file
//! means defaults. An explicit path must exist.

use std::path::{Path, PathBuf};

use super::AppConfig;

/// File name looked up in the current directory.
pub const LOCAL_CONFIG_FILE: &str = ".ideaforge.toml";

/// File name looked up under `<config_dir>/ideaforge/`.
pub const USER_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Candidates(Vec<PathBuf>),
    Explicit(PathBuf),
}

/// Resolves which configuration file to read, if any.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    source: Source,
}

impl ConfigLoader {
    /// Look in the current directory, then the user config directory.
    #[must_use]
    pub fn discover() -> Self {
        let mut candidates = vec![PathBuf::from(LOCAL_CONFIG_FILE)];
        if let Some(dir) = dirs::config_dir() {
            candidates.push(dir.join(env!("CARGO_PKG_NAME")).join(USER_CONFIG_FILE));
        }
        Self {
            source: Source::Candidates(candidates),
        }
    }

    /// Read exactly `path`.
    #[must_use]
    pub fn explicit(path: PathBuf) -> Self {
        Self {
            source: Source::Explicit(path),
        }
    }

    /// Paths considered, in priority order.
    #[must_use]
    pub fn candidates(&self) -> &[PathBuf] {
        match &self.source {
            Source::Candidates(paths) => paths,
            Source::Explicit(path) => std::slice::from_ref(path),
        }
    }

    /// The file that [`ConfigLoader::load`] would read.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if an explicit path does not exist.
    pub fn locate(&self) -> Result<Option<&Path>, ConfigError> {
        match &self.source {
            Source::Explicit(path) if path.is_file() => Ok(Some(path.as_path())),
            Source::Explicit(path) => Err(ConfigError::Missing { path: path.clone() }),
            Source::Candidates(paths) => Ok(paths
                .iter()
                .map(PathBuf::as_path)
                .find(|path| path.is_file())),
        }
    }

    /// Load the located file, or defaults when discovery finds none.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit file is missing, or if the file
    /// cannot be read or parsed.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let Some(path) = self.locate()? else {
            tracing::debug!(candidates = ?self.candidates(), "No config file, using defaults");
            return Ok(AppConfig::default());
        };

        tracing::debug!(path = %path.display(), "Loading config file");
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;
        parse_config(&text, path)
    }
}

/// Parse configuration text read from `path`.
///
/// # Errors
///
/// Returns `ConfigError::ParseError` naming `path` if the text is not a
/// valid configuration.
pub fn parse_config(text: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

/// Errors that can occur during configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    Missing { path: PathBuf },

    #[error("Failed to read config file {path}: {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
}

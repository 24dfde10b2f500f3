use std::path::PathBuf;

use thiserror::Error;

/// Failure to read or parse a settings file
///
/// These never abort a run: the resolver falls back to defaults and hands the
/// error back so it can be logged.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse YAML settings file {}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse TOML settings file {}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to parse JSON settings file {}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl ConfigError {
    /// Path of the file that could not be loaded
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Read { path, .. }
            | Self::Yaml { path, .. }
            | Self::Toml { path, .. }
            | Self::Json { path, .. } => path,
        }
    }
}

use std::path::PathBuf;

use ctrlprop_core::ConfigError;
use thiserror::Error;

/// Errors that can occur around a batch run.
///
/// Individual checks never fail a batch; these cover setup and persistence.
#[derive(Debug, Error)]
pub enum BatchError {
    #[error("model key `{0}` is registered more than once")]
    DuplicateKey(String),

    #[error("no model registered under `{0}`")]
    UnknownModel(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid batch config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("existing file {} is not a YAML mapping", .0.display())]
    NotAMapping(PathBuf),
}

impl BatchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use ctrlprop_core::{CheckConfig, OracleConfig};
use serde::Deserialize;

use crate::BatchError;

/// Settings of a batch run, read from TOML.
///
/// Every field has a default, so an empty document is a valid config:
///
/// ```toml
/// timeout_seconds = 60
/// models = ["pendulum", "cart_pole"]
/// report_path = "results.txt"
///
/// [oracle]
/// seed = 7
/// samples = 5
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    pub timeout_seconds: f64,
    pub max_expression_nodes: usize,

    /// Model keys to run, in order. `None` runs every registered model.
    pub models: Option<Vec<String>>,

    /// Text log the report is appended to.
    pub report_path: Option<PathBuf>,

    /// YAML file the results mapping is merged into.
    pub mapping_path: Option<PathBuf>,

    pub oracle: OracleSettings,
}

/// The `[oracle]` table of a [`BatchConfig`].
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OracleSettings {
    pub seed: u64,
    pub samples: usize,
    pub rel_tol: f64,
    pub range: [f64; 2],
    pub max_redraws: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        let check = CheckConfig::default();
        Self {
            timeout_seconds: check.timeout().as_secs_f64(),
            max_expression_nodes: check.max_expression_nodes(),
            models: None,
            report_path: None,
            mapping_path: None,
            oracle: OracleSettings::default(),
        }
    }
}

impl Default for OracleSettings {
    fn default() -> Self {
        let oracle = OracleConfig::default();
        Self {
            seed: oracle.seed(),
            samples: oracle.samples(),
            rel_tol: oracle.rel_tol(),
            range: oracle.range(),
            max_redraws: oracle.max_redraws(),
        }
    }
}

impl BatchConfig {
    /// Parses a config from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Toml`] if the text is not a valid config.
    pub fn from_toml_str(text: &str) -> Result<Self, BatchError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads and parses the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: &Path) -> Result<Self, BatchError> {
        let text = fs::read_to_string(path).map_err(|e| BatchError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// The validated per-check configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BatchError::Config`] if a value is out of range.
    pub fn check_config(&self) -> Result<CheckConfig, BatchError> {
        let timeout = Duration::try_from_secs_f64(self.timeout_seconds)
            .map_err(|_| ctrlprop_core::ConfigError::Timeout)?;
        let o = &self.oracle;
        let oracle = OracleConfig::new(o.seed, o.samples, o.rel_tol, o.range, o.max_redraws)?;
        Ok(CheckConfig::new(timeout, self.max_expression_nodes, oracle)?)
    }
}

#[cfg(test)]
mod tests {
    use ctrlprop_core::ConfigError;

    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config = BatchConfig::from_toml_str("").unwrap();

        assert_eq!(config, BatchConfig::default());
        assert_eq!(config.check_config().unwrap(), CheckConfig::default());
    }

    #[test]
    fn partial_tables_fill_in_defaults() {
        let config = BatchConfig::from_toml_str(
            r#"
            timeout_seconds = 2.5
            models = ["pendulum"]

            [oracle]
            seed = 7
            "#,
        )
        .unwrap();

        let check = config.check_config().unwrap();
        assert_eq!(check.timeout(), Duration::from_millis(2500));
        assert_eq!(check.oracle().seed(), 7);
        assert_eq!(check.oracle().samples(), OracleConfig::default().samples());
        assert_eq!(config.models, Some(vec!["pendulum".to_owned()]));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let result = BatchConfig::from_toml_str("timeout = 5");

        assert!(matches!(result, Err(BatchError::Toml(_))));
    }

    #[test]
    fn invalid_values_surface_config_errors() {
        let zero_timeout = BatchConfig::from_toml_str("timeout_seconds = 0").unwrap();
        let negative = BatchConfig::from_toml_str("timeout_seconds = -1.0").unwrap();
        let bad_range = BatchConfig::from_toml_str("[oracle]\nrange = [1.0, 1.0]").unwrap();

        assert!(matches!(
            zero_timeout.check_config(),
            Err(BatchError::Config(ConfigError::Timeout))
        ));
        assert!(matches!(
            negative.check_config(),
            Err(BatchError::Config(ConfigError::Timeout))
        ));
        assert!(matches!(
            bad_range.check_config(),
            Err(BatchError::Config(ConfigError::Range))
        ));
    }

    #[test]
    fn reads_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("batch.toml");
        fs::write(&path, "max_expression_nodes = 1000\n").unwrap();

        let config = BatchConfig::from_path(&path).unwrap();

        assert_eq!(config.max_expression_nodes, 1000);
    }
}

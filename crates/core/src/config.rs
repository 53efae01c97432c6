use std::time::Duration;

use thiserror::Error;

use crate::TimeoutGuard;

/// Configuration for the sampling rank oracle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OracleConfig {
    seed: u64,
    samples: usize,
    rel_tol: f64,
    range: [f64; 2],
    max_redraws: usize,
}

/// Configuration for a property check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CheckConfig {
    timeout: Duration,
    max_expression_nodes: usize,
    oracle: OracleConfig,
}

/// Errors that can occur when validating a check or oracle config.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("samples must be at least one")]
    Samples,

    #[error("rel_tol must be finite and positive")]
    RelTol,

    #[error("sample range must be finite with lower < upper")]
    Range,

    #[error("timeout must be non-zero")]
    Timeout,

    #[error("max_expression_nodes must be at least one")]
    ExpressionNodes,
}

impl Default for OracleConfig {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(0x5eed_c0de, 3, 1e-9, [0.2, 1.8], 8).unwrap()
    }
}

impl OracleConfig {
    /// Creates a new oracle config.
    ///
    /// Sample coordinates are drawn uniformly from `range`. A sample point
    /// that evaluates to a non-finite value is redrawn up to `max_redraws`
    /// times.
    ///
    /// # Errors
    ///
    /// Returns an error if `samples` is zero, `rel_tol` is not finite and
    /// positive, or `range` is not a finite, non-empty interval.
    pub fn new(
        seed: u64,
        samples: usize,
        rel_tol: f64,
        range: [f64; 2],
        max_redraws: usize,
    ) -> Result<Self, ConfigError> {
        if samples == 0 {
            return Err(ConfigError::Samples);
        }
        if !rel_tol.is_finite() || rel_tol <= 0.0 {
            return Err(ConfigError::RelTol);
        }
        let [lo, hi] = range;
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(ConfigError::Range);
        }

        Ok(Self {
            seed,
            samples,
            rel_tol,
            range,
            max_redraws,
        })
    }

    /// Returns a copy of this config with a different seed.
    #[must_use]
    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the number of sample points per rank decision.
    #[must_use]
    pub fn samples(&self) -> usize {
        self.samples
    }

    /// Returns the relative pivot tolerance for numeric rank.
    #[must_use]
    pub fn rel_tol(&self) -> f64 {
        self.rel_tol
    }

    #[must_use]
    pub fn range(&self) -> [f64; 2] {
        self.range
    }

    #[must_use]
    pub fn max_redraws(&self) -> usize {
        self.max_redraws
    }
}

impl Default for CheckConfig {
    fn default() -> Self {
        // Known-good values, unwrap is safe
        Self::new(TimeoutGuard::DEFAULT_BUDGET, 250_000, OracleConfig::default()).unwrap()
    }
}

impl CheckConfig {
    /// Creates a new check config.
    ///
    /// # Errors
    ///
    /// Returns an error if `timeout` is zero or `max_expression_nodes` is zero.
    pub fn new(
        timeout: Duration,
        max_expression_nodes: usize,
        oracle: OracleConfig,
    ) -> Result<Self, ConfigError> {
        if timeout.is_zero() {
            return Err(ConfigError::Timeout);
        }
        if max_expression_nodes == 0 {
            return Err(ConfigError::ExpressionNodes);
        }

        Ok(Self {
            timeout,
            max_expression_nodes,
            oracle,
        })
    }

    /// Returns the wall-clock budget of one check.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns the largest expression, in nodes, a bracket step may produce.
    #[must_use]
    pub fn max_expression_nodes(&self) -> usize {
        self.max_expression_nodes
    }

    #[must_use]
    pub fn oracle(&self) -> &OracleConfig {
        &self.oracle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = CheckConfig::default();

        assert_eq!(config.timeout(), Duration::from_secs(600));
        assert_eq!(config.oracle().samples(), 3);
    }

    #[test]
    fn rejects_invalid_oracle_settings() {
        assert_eq!(
            OracleConfig::new(1, 0, 1e-9, [0.0, 1.0], 0),
            Err(ConfigError::Samples)
        );
        assert_eq!(
            OracleConfig::new(1, 2, f64::NAN, [0.0, 1.0], 0),
            Err(ConfigError::RelTol)
        );
        assert_eq!(
            OracleConfig::new(1, 2, 1e-9, [1.0, 1.0], 0),
            Err(ConfigError::Range)
        );
    }

    #[test]
    fn rejects_zero_budgets() {
        let oracle = OracleConfig::default();

        assert_eq!(
            CheckConfig::new(Duration::ZERO, 10, oracle),
            Err(ConfigError::Timeout)
        );
        assert_eq!(
            CheckConfig::new(Duration::from_secs(1), 0, oracle),
            Err(ConfigError::ExpressionNodes)
        );
    }
}

//! Generic rank and involutivity decisions.
//!
//! The [`Oracle`] trait is the boundary between the Lie-algebraic
//! construction and whatever decides rank questions about symbolic matrices.
//! [`SampledOracle`] decides them numerically: the generic rank of a matrix of
//! analytic functions equals its rank at almost every point, so the rank at a
//! few pseudo-random points is the generic rank with overwhelming probability.

use std::collections::{BTreeSet, HashMap};

use ctrlprop_symbolic::{Expr, ExprError, Node, SymMatrix, Symbol, lie_bracket, numeric_rank};
use ndarray::Array2;
use rand::{Rng, SeedableRng, rngs::StdRng};
use thiserror::Error;
use tracing::debug;

use crate::{CancelToken, Distribution, OracleConfig};

/// Errors from a rank or involutivity decision.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RankError {
    #[error("no finite sample point found after {attempts} attempts")]
    NonFinite { attempts: usize },

    #[error("computation cancelled")]
    Cancelled,

    #[error(transparent)]
    Expr(#[from] ExprError),
}

/// Outcome of an involutivity test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Involutivity {
    pub involutive: bool,

    /// Indices of the first pair whose bracket leaves the span, if any.
    pub violating_pair: Option<(usize, usize)>,
}

/// Decides rank questions about symbolic matrices and distributions.
pub trait Oracle: Send + Sync {
    /// The rank of `matrix` on a dense open subset of its variables.
    ///
    /// # Errors
    ///
    /// Returns an error if the matrix cannot be evaluated or `cancel` is raised.
    fn generic_rank(&self, matrix: &SymMatrix, cancel: &CancelToken) -> Result<usize, RankError>;

    /// Whether the bracket of every pair of fields lies in the span of `distribution`.
    ///
    /// # Errors
    ///
    /// Returns an error if a bracket or rank cannot be computed, or `cancel` is raised.
    fn is_involutive(
        &self,
        distribution: &Distribution,
        states: &[Symbol],
        cancel: &CancelToken,
    ) -> Result<Involutivity, RankError>;

    /// Whether `expr` vanishes identically.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression cannot be evaluated.
    fn is_generically_zero(&self, expr: &Expr) -> Result<bool, RankError>;
}

/// An [`Oracle`] that evaluates at seeded pseudo-random points.
///
/// The value drawn for a symbol depends only on the seed, the symbol's name,
/// the sample index and the redraw attempt, so every matrix sees the same
/// point for the same sample and repeated runs give the same answers.
#[derive(Debug, Clone, Default)]
pub struct SampledOracle {
    config: OracleConfig,
}

impl SampledOracle {
    #[must_use]
    pub fn new(config: OracleConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &OracleConfig {
        &self.config
    }

    fn coordinate(&self, symbol: &Symbol, sample: usize, attempt: usize) -> f64 {
        let seed = [symbol.stable_hash(), sample as u64, attempt as u64]
            .into_iter()
            .fold(self.config.seed(), |acc, v| {
                (acc ^ v).wrapping_mul(0x9e37_79b9_7f4a_7c15).rotate_left(29)
            });
        let [lo, hi] = self.config.range();
        StdRng::seed_from_u64(seed).gen_range(lo..hi)
    }

    fn point(&self, symbols: &BTreeSet<Symbol>, sample: usize, attempt: usize) -> HashMap<Symbol, f64> {
        symbols
            .iter()
            .map(|s| (s.clone(), self.coordinate(s, sample, attempt)))
            .collect()
    }

    /// Evaluates `matrix` at sample `sample`, redrawing non-finite points.
    fn evaluate(
        &self,
        matrix: &SymMatrix,
        symbols: &BTreeSet<Symbol>,
        sample: usize,
    ) -> Result<Array2<f64>, RankError> {
        let attempts = self.config.max_redraws() + 1;
        for attempt in 0..attempts {
            let values = matrix.evaluate(&self.point(symbols, sample, attempt))?;
            if values.iter().all(|v| v.is_finite()) {
                return Ok(values);
            }
        }
        Err(RankError::NonFinite { attempts })
    }
}

impl Oracle for SampledOracle {
    fn generic_rank(&self, matrix: &SymMatrix, cancel: &CancelToken) -> Result<usize, RankError> {
        let bound = matrix.nrows().min(matrix.ncols());
        if bound == 0 {
            return Ok(0);
        }

        let symbols = matrix.free_symbols();
        let mut best = 0;
        for sample in 0..self.config.samples() {
            if cancel.is_cancelled() {
                return Err(RankError::Cancelled);
            }
            let values = self.evaluate(matrix, &symbols, sample)?;
            best = best.max(numeric_rank(&values, self.config.rel_tol()));
            if best == bound || symbols.is_empty() {
                break;
            }
        }
        Ok(best)
    }

    fn is_involutive(
        &self,
        distribution: &Distribution,
        states: &[Symbol],
        cancel: &CancelToken,
    ) -> Result<Involutivity, RankError> {
        let fields = distribution.fields();
        let matrix = distribution.to_matrix();
        let rank = self.generic_rank(&matrix, cancel)?;

        for i in 0..fields.len() {
            for j in i + 1..fields.len() {
                if cancel.is_cancelled() {
                    return Err(RankError::Cancelled);
                }
                let bracket = lie_bracket(fields[i].components(), fields[j].components(), states)?;
                if bracket.iter().all(Expr::is_zero) {
                    continue;
                }
                let extended = matrix.hstack(&SymMatrix::column_vector(bracket))?;
                if self.generic_rank(&extended, cancel)? > rank {
                    debug!(i, j, rank, "bracket leaves the distribution");
                    return Ok(Involutivity {
                        involutive: false,
                        violating_pair: Some((i, j)),
                    });
                }
            }
        }

        Ok(Involutivity {
            involutive: true,
            violating_pair: None,
        })
    }

    fn is_generically_zero(&self, expr: &Expr) -> Result<bool, RankError> {
        let expanded = expr.expand();
        if expanded.is_zero() {
            return Ok(true);
        }

        // Terms are evaluated separately so cancellation is judged against
        // their magnitudes rather than against an absolute threshold.
        let terms = match expanded.node() {
            Node::Add(terms) => terms.clone(),
            _ => vec![expanded],
        };
        let matrix = SymMatrix::column_vector(terms);
        let symbols = matrix.free_symbols();
        for sample in 0..self.config.samples() {
            let values = self.evaluate(&matrix, &symbols, sample)?;
            let sum: f64 = values.iter().sum();
            let scale: f64 = values.iter().map(|v| v.abs()).sum();
            if sum.abs() > self.config.rel_tol() * scale {
                return Ok(false);
            }
            if symbols.is_empty() {
                break;
            }
        }
        Ok(true)
    }
}

//! Splitting a right-hand side into drift and input fields.

use ctrlprop_symbolic::{Expr, ExprError, SymMatrix, Symbol, jacobian};
use thiserror::Error;
use tracing::debug;

use crate::{Oracle, ParameterBinding, RankError};

/// Errors from [`decompose`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AffineError {
    /// The input matrix still depends on the inputs.
    #[error("not input affine: entry ({row}, {col}) of the input matrix depends on the inputs")]
    NotInputAffine { row: usize, col: usize },

    #[error(transparent)]
    Rank(#[from] RankError),

    #[error(transparent)]
    Expr(#[from] ExprError),
}

/// A system `ẋ = f(x) + G(x) u`.
#[derive(Debug, Clone)]
pub struct AffineSystem {
    states: Vec<Symbol>,
    inputs: Vec<Symbol>,
    drift: Vec<Expr>,
    input_field: Vec<Expr>,
    input_matrix: SymMatrix,
}

/// Decomposes `rhs` into drift and input parts and checks input affinity.
///
/// The drift is `f = rhs(x, 0)`, the input field is `g = rhs - f` and the
/// input matrix is `G = ∂g/∂u`. The system is input affine when `G` does not
/// depend on `u`, that is when `G - G(u = 0)` vanishes identically.
///
/// # Errors
///
/// Returns [`AffineError::NotInputAffine`] if an entry of `G` depends on the
/// inputs, [`AffineError::Expr`] if expanding `g` would exceed `max_nodes`
/// terms, or another [`AffineError`] if the zero test cannot be decided.
pub fn decompose(
    rhs: &[Expr],
    states: &[Symbol],
    inputs: &[Symbol],
    oracle: &dyn Oracle,
    max_nodes: usize,
) -> Result<AffineSystem, AffineError> {
    let drift: Vec<Expr> = rhs.iter().map(|e| e.subs_zero(inputs)).collect();
    let input_field = rhs
        .iter()
        .zip(&drift)
        .map(|(e, f)| (e - f).expand_within(max_nodes))
        .collect::<Result<Vec<_>, _>>()?;

    let g = jacobian(&input_field, inputs);
    let g_at_zero = g.map(|e| e.subs_zero(inputs));
    let residual = g.difference(&g_at_zero)?;

    for (col, column) in residual.columns().enumerate() {
        for (row, entry) in column.iter().enumerate() {
            if !entry.is_zero() && !oracle.is_generically_zero(entry)? {
                debug!(row, col, %entry, "input matrix depends on the inputs");
                return Err(AffineError::NotInputAffine { row, col });
            }
        }
    }

    Ok(AffineSystem {
        states: states.to_vec(),
        inputs: inputs.to_vec(),
        drift,
        input_field,
        input_matrix: g_at_zero,
    })
}

impl AffineSystem {
    #[must_use]
    pub fn states(&self) -> &[Symbol] {
        &self.states
    }

    #[must_use]
    pub fn inputs(&self) -> &[Symbol] {
        &self.inputs
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.states.len()
    }

    /// The drift field `f(x)`.
    #[must_use]
    pub fn drift(&self) -> &[Expr] {
        &self.drift
    }

    /// The input part `g(x, u) = rhs - f`.
    #[must_use]
    pub fn input_field(&self) -> &[Expr] {
        &self.input_field
    }

    /// The input matrix `G(x)`, one column per input.
    #[must_use]
    pub fn input_matrix(&self) -> &SymMatrix {
        &self.input_matrix
    }

    /// Substitutes parameter values into every field.
    #[must_use]
    pub fn with_binding(&self, binding: &ParameterBinding) -> AffineSystem {
        let substitution = binding.substitution();
        AffineSystem {
            states: self.states.clone(),
            inputs: self.inputs.clone(),
            drift: self.drift.iter().map(|e| e.subs(&substitution)).collect(),
            input_field: self.input_field.iter().map(|e| e.subs(&substitution)).collect(),
            input_matrix: self.input_matrix.subs(&substitution),
        }
    }

    /// Evaluates `f(x) + G(x) u` for the given input expressions.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::DimensionMismatch`] if `u` has the wrong length.
    pub fn recompose(&self, u: &[Expr]) -> Result<Vec<Expr>, ExprError> {
        let gu = self.input_matrix.mul_vector(u)?;
        Ok(self.drift.iter().zip(gu).map(|(f, gu)| f + gu).collect())
    }
}

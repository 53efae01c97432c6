use ctrlprop_core::{ControlModel, ModelError};
use ctrlprop_symbolic::{Expr, Symbol};

use crate::indexed_symbols;

/// A chain of `n` integrators driven at the end: `ẋᵢ = xᵢ₊₁`, `ẋₙ = u`.
///
/// The dimension is chosen at construction, which makes this the model to
/// use for scaling tests.
#[derive(Debug, Clone)]
pub struct NIntegrator {
    states: Vec<Symbol>,
    input: Symbol,
}

impl NIntegrator {
    /// The default chain length.
    pub const DEFAULT_DIMENSION: usize = 2;

    /// # Errors
    ///
    /// Returns [`ModelError::DimensionMismatch`] if `n` is zero.
    pub fn new(n: usize) -> Result<Self, ModelError> {
        if n == 0 {
            return Err(ModelError::DimensionMismatch {
                dimension: 0,
                states: 0,
                rhs: 0,
            });
        }
        Ok(Self {
            states: indexed_symbols("x", n),
            input: Symbol::new("u1"),
        })
    }
}

impl Default for NIntegrator {
    fn default() -> Self {
        Self {
            states: indexed_symbols("x", Self::DEFAULT_DIMENSION),
            input: Symbol::new("u1"),
        }
    }
}

impl ControlModel for NIntegrator {
    fn state_symbols(&self) -> Vec<Symbol> {
        self.states.clone()
    }

    fn input_symbols(&self) -> Vec<Symbol> {
        vec![self.input.clone()]
    }

    fn rhs_symbolic(&self) -> Option<Vec<Expr>> {
        let rhs = self
            .states
            .iter()
            .skip(1)
            .chain(std::iter::once(&self.input))
            .map(Expr::sym)
            .collect();
        Some(rhs)
    }
}

use ctrlprop_core::{ControlModel, ModelError};
use ctrlprop_symbolic::{Expr, Symbol};

use crate::indexed_symbols;

/// A linear system `ẋ = A x + B u` with numeric matrices.
#[derive(Debug, Clone)]
pub struct LinearSystem {
    a: Vec<Vec<f64>>,
    b: Vec<Vec<f64>>,
    states: Vec<Symbol>,
    inputs: Vec<Symbol>,
}

impl LinearSystem {
    /// Creates a system from row-major `A` (`n × n`) and `B` (`n × m`).
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::DimensionMismatch`] if `A` is not square, `B`
    /// does not have `n` rows, or the rows of `B` differ in length.
    pub fn new(a: Vec<Vec<f64>>, b: Vec<Vec<f64>>) -> Result<Self, ModelError> {
        let n = a.len();
        let m = b.first().map_or(0, Vec::len);

        let mismatch = |rhs| ModelError::DimensionMismatch {
            dimension: n,
            states: n,
            rhs,
        };
        if let Some(row) = a.iter().find(|row| row.len() != n) {
            return Err(mismatch(row.len()));
        }
        if b.len() != n {
            return Err(mismatch(b.len()));
        }
        if let Some(row) = b.iter().find(|row| row.len() != m) {
            return Err(mismatch(row.len()));
        }

        Ok(Self {
            a,
            b,
            states: indexed_symbols("x", n),
            inputs: indexed_symbols("u", m),
        })
    }

    /// `ẍ = u` in first-order form.
    #[must_use]
    pub fn double_integrator() -> Self {
        Self {
            a: vec![vec![0.0, 1.0], vec![0.0, 0.0]],
            b: vec![vec![0.0], vec![1.0]],
            states: indexed_symbols("x", 2),
            inputs: indexed_symbols("u", 1),
        }
    }
}

impl ControlModel for LinearSystem {
    fn state_symbols(&self) -> Vec<Symbol> {
        self.states.clone()
    }

    fn input_symbols(&self) -> Vec<Symbol> {
        self.inputs.clone()
    }

    fn rhs_symbolic(&self) -> Option<Vec<Expr>> {
        let x: Vec<Expr> = self.states.iter().map(Expr::sym).collect();
        let u: Vec<Expr> = self.inputs.iter().map(Expr::sym).collect();

        let rhs = self
            .a
            .iter()
            .zip(&self.b)
            .map(|(a_row, b_row)| {
                let drift = a_row.iter().zip(&x).map(|(a, x)| *a * x);
                let input = b_row.iter().zip(&u).map(|(b, u)| *b * u);
                Expr::sum(drift.chain(input))
            })
            .collect();
        Some(rhs)
    }
}

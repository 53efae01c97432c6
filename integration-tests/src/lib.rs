//! Shared models and oracles for the cross-crate tests.

use std::{thread, time::Duration};

use ctrlprop_core::{
    CancelToken, ControlModel, Distribution, Involutivity, Oracle, RankError, SymbolicModel,
};
use ctrlprop_symbolic::{Expr, SymMatrix, Symbol};

/// Builds a symbolic model, panicking on an invalid definition.
#[must_use]
pub fn model(states: &str, inputs: &str, rhs: &[&str]) -> SymbolicModel {
    SymbolicModel::builder()
        .states(states)
        .inputs(inputs)
        .rhs(rhs.iter().copied())
        .build()
        .expect("test model should build")
}

/// An oracle whose rank decisions only return once cancelled.
pub struct StallingOracle;

impl StallingOracle {
    fn stall(cancel: &CancelToken) -> RankError {
        while !cancel.is_cancelled() {
            thread::sleep(Duration::from_millis(5));
        }
        RankError::Cancelled
    }
}

impl Oracle for StallingOracle {
    fn generic_rank(&self, _: &SymMatrix, cancel: &CancelToken) -> Result<usize, RankError> {
        Err(Self::stall(cancel))
    }

    fn is_involutive(
        &self,
        _: &Distribution,
        _: &[Symbol],
        cancel: &CancelToken,
    ) -> Result<Involutivity, RankError> {
        Err(Self::stall(cancel))
    }

    fn is_generically_zero(&self, expr: &Expr) -> Result<bool, RankError> {
        Ok(expr.is_zero())
    }
}

/// A model that panics as soon as its right-hand side is requested.
pub struct PanickingModel;

impl ControlModel for PanickingModel {
    fn state_symbols(&self) -> Vec<Symbol> {
        vec![Symbol::new("x1")]
    }

    fn input_symbols(&self) -> Vec<Symbol> {
        vec![Symbol::new("u1")]
    }

    fn rhs_symbolic(&self) -> Option<Vec<Expr>> {
        panic!("right-hand side unavailable")
    }
}

use ctrlprop_core::ControlModel;
use ctrlprop_symbolic::{Expr, Symbol, symbols};

/// A mass pushed by a thrust proportional to the square of its input.
///
/// The input enters quadratically, so the model is not input affine.
#[derive(Debug, Clone)]
pub struct QuadraticThrust {
    states: Vec<Symbol>,
    input: Symbol,
}

impl Default for QuadraticThrust {
    fn default() -> Self {
        Self {
            states: symbols("x1 x2"),
            input: Symbol::new("u1"),
        }
    }
}

impl ControlModel for QuadraticThrust {
    fn state_symbols(&self) -> Vec<Symbol> {
        self.states.clone()
    }

    fn input_symbols(&self) -> Vec<Symbol> {
        vec![self.input.clone()]
    }

    fn rhs_symbolic(&self) -> Option<Vec<Expr>> {
        let velocity = Expr::sym(&self.states[1]);
        let thrust = Expr::sym(&self.input).powi(2);

        Some(vec![velocity.clone(), thrust - 0.2 * velocity])
    }
}

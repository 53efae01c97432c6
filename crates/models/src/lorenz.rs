use ctrlprop_core::{ControlModel, ParameterBinding};
use ctrlprop_symbolic::{Expr, Symbol, symbols};

/// The Lorenz system, an autonomous model with no input.
#[derive(Debug, Clone)]
pub struct Lorenz {
    states: Vec<Symbol>,
    params: Vec<Symbol>,
    values: [f64; 3],
}

impl Default for Lorenz {
    fn default() -> Self {
        Self {
            states: symbols("x1 x2 x3"),
            params: symbols("sigma rho beta"),
            values: [10.0, 28.0, 8.0 / 3.0],
        }
    }
}

impl ControlModel for Lorenz {
    fn state_symbols(&self) -> Vec<Symbol> {
        self.states.clone()
    }

    fn input_symbols(&self) -> Vec<Symbol> {
        Vec::new()
    }

    fn parameter_symbols(&self) -> Vec<Symbol> {
        self.params.clone()
    }

    fn parameter_substitutions(&self) -> ParameterBinding {
        ParameterBinding::from_pairs(self.params.iter().cloned().zip(self.values))
    }

    fn rhs_symbolic(&self) -> Option<Vec<Expr>> {
        let [x, y, z] = [0, 1, 2].map(|i| Expr::sym(&self.states[i]));
        let [sigma, rho, beta] = [0, 1, 2].map(|i| Expr::sym(&self.params[i]));

        Some(vec![
            sigma * (&y - &x),
            &x * (rho - &z) - &y,
            &x * &y - beta * &z,
        ])
    }
}

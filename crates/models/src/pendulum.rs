use ctrlprop_core::{ControlModel, ParameterBinding};
use ctrlprop_symbolic::{Expr, Symbol, symbols};

/// A damped pendulum driven by a torque at the pivot.
///
/// States are the angle `x1` and angular velocity `x2`. Parameters are the
/// mass `m`, length `l`, gravity `g` and damping `d`.
#[derive(Debug, Clone)]
pub struct Pendulum {
    states: Vec<Symbol>,
    input: Symbol,
    params: Vec<Symbol>,
    values: [f64; 4],
}

impl Pendulum {
    /// Creates a pendulum with the given default values for `m`, `l`, `g`, `d`.
    #[must_use]
    pub fn new(mass: f64, length: f64, gravity: f64, damping: f64) -> Self {
        Self {
            states: symbols("x1 x2"),
            input: Symbol::new("u1"),
            params: symbols("m l g d"),
            values: [mass, length, gravity, damping],
        }
    }
}

impl Default for Pendulum {
    fn default() -> Self {
        Self::new(1.0, 0.5, 9.81, 0.1)
    }
}

impl ControlModel for Pendulum {
    fn state_symbols(&self) -> Vec<Symbol> {
        self.states.clone()
    }

    fn input_symbols(&self) -> Vec<Symbol> {
        vec![self.input.clone()]
    }

    fn parameter_symbols(&self) -> Vec<Symbol> {
        self.params.clone()
    }

    fn parameter_substitutions(&self) -> ParameterBinding {
        ParameterBinding::from_pairs(self.params.iter().cloned().zip(self.values))
    }

    fn rhs_symbolic(&self) -> Option<Vec<Expr>> {
        let [x1, x2] = [&self.states[0], &self.states[1]].map(Expr::sym);
        let [m, l, g, d] = [&self.params[0], &self.params[1], &self.params[2], &self.params[3]]
            .map(Expr::sym);
        let u = Expr::sym(&self.input);

        let inertia = &m * l.powi(2);
        let x2_dot = -(&g / &l) * x1.sin() - &d / &inertia * &x2 + u / &inertia;

        Some(vec![x2, x2_dot])
    }
}

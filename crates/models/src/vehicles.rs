use ctrlprop_core::{ControlModel, ParameterBinding};
use ctrlprop_symbolic::{Expr, Symbol, symbols};

/// A kinematic unicycle driven by forward speed `u1` and turn rate `u2`.
///
/// The model is driftless, so every drift bracket vanishes and the
/// accessibility construction stays at the span of the two input fields.
#[derive(Debug, Clone)]
pub struct Unicycle {
    states: Vec<Symbol>,
    inputs: Vec<Symbol>,
}

impl Default for Unicycle {
    fn default() -> Self {
        Self {
            states: symbols("x1 x2 x3"),
            inputs: symbols("u1 u2"),
        }
    }
}

impl ControlModel for Unicycle {
    fn state_symbols(&self) -> Vec<Symbol> {
        self.states.clone()
    }

    fn input_symbols(&self) -> Vec<Symbol> {
        self.inputs.clone()
    }

    fn rhs_symbolic(&self) -> Option<Vec<Expr>> {
        let heading = Expr::sym(&self.states[2]);
        let speed = Expr::sym(&self.inputs[0]);
        let turn = Expr::sym(&self.inputs[1]);

        Some(vec![heading.cos() * &speed, heading.sin() * &speed, turn])
    }
}

/// A cart with an inverted pendulum, pushed by a horizontal force.
///
/// States are cart position `x1`, pole angle `x2` (zero upright), cart
/// velocity `x3` and pole angular velocity `x4`. Parameters are the cart
/// mass `mc`, pole mass `mp`, pole length `l` and gravity `g`.
#[derive(Debug, Clone)]
pub struct CartPole {
    states: Vec<Symbol>,
    input: Symbol,
    params: Vec<Symbol>,
    values: [f64; 4],
}

impl CartPole {
    #[must_use]
    pub fn new(cart_mass: f64, pole_mass: f64, length: f64, gravity: f64) -> Self {
        Self {
            states: symbols("x1 x2 x3 x4"),
            input: Symbol::new("u1"),
            params: symbols("mc mp l g"),
            values: [cart_mass, pole_mass, length, gravity],
        }
    }
}

impl Default for CartPole {
    fn default() -> Self {
        Self::new(1.0, 0.1, 0.5, 9.81)
    }
}

impl ControlModel for CartPole {
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
        let [_, angle, velocity, rate] = [0, 1, 2, 3].map(|i| Expr::sym(&self.states[i]));
        let [mc, mp, l, g] = [0, 1, 2, 3].map(|i| Expr::sym(&self.params[i]));
        let force = Expr::sym(&self.input);

        let (sin, cos) = (angle.sin(), angle.cos());
        let denominator = &mc + &mp * sin.powi(2);

        let cart = (&force + &mp * &sin * (&l * rate.powi(2) - &g * &cos)) / &denominator;
        let pole = (-&force * &cos - &mp * &l * rate.powi(2) * &sin * &cos
            + (&mc + &mp) * &g * &sin)
            / (&l * &denominator);

        Some(vec![velocity, rate, cart, pole])
    }
}

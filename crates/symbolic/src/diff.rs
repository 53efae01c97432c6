use std::collections::HashMap;

use crate::{Expr, Func, Node, Symbol};

impl Expr {
    /// Returns the partial derivative with respect to `var`.
    #[must_use]
    pub fn diff(&self, var: &Symbol) -> Expr {
        Differentiator::new(var).diff(self)
    }
}

/// Differentiates expressions with respect to one symbol.
///
/// Results are memoized per shared node, so differentiating several
/// expressions that share subtrees (as the components of a Lie bracket do)
/// visits each subtree once.
pub(crate) struct Differentiator<'a> {
    var: &'a Symbol,
    mask: u64,
    memo: HashMap<usize, Expr>,
}

impl<'a> Differentiator<'a> {
    pub(crate) fn new(var: &'a Symbol) -> Self {
        Self {
            var,
            mask: var.mask(),
            memo: HashMap::new(),
        }
    }

    pub(crate) fn diff(&mut self, expr: &Expr) -> Expr {
        if expr.mask() & self.mask == 0 {
            return Expr::zero();
        }
        if let Some(known) = self.memo.get(&expr.addr()) {
            return known.clone();
        }

        let derivative = match expr.node() {
            Node::Num(_) => Expr::zero(),
            Node::Sym(s) => {
                if s == self.var {
                    Expr::one()
                } else {
                    Expr::zero()
                }
            }
            Node::Add(terms) => {
                let parts: Vec<_> = terms.iter().map(|term| self.diff(term)).collect();
                Expr::sum(parts)
            }
            Node::Mul(factors) => {
                let mut parts = Vec::with_capacity(factors.len());
                for (i, factor) in factors.iter().enumerate() {
                    let d = self.diff(factor);
                    if d.is_zero() {
                        continue;
                    }
                    let mut replaced = factors.clone();
                    replaced[i] = d;
                    parts.push(Expr::product(replaced));
                }
                Expr::sum(parts)
            }
            Node::Pow(base, exp) => {
                let db = self.diff(base);
                let de = self.diff(exp);
                if de.is_zero() {
                    if db.is_zero() {
                        Expr::zero()
                    } else {
                        Expr::product([exp.clone(), base.pow(exp - 1.0), db])
                    }
                } else {
                    expr * (de * base.ln() + exp * db / base)
                }
            }
            Node::Apply(func, arg) => {
                let da = self.diff(arg);
                if da.is_zero() {
                    Expr::zero()
                } else {
                    Expr::product([outer_derivative(*func, arg), da])
                }
            }
        };

        self.memo.insert(expr.addr(), derivative.clone());
        derivative
    }
}

fn outer_derivative(func: Func, arg: &Expr) -> Expr {
    match func {
        Func::Sin => arg.cos(),
        Func::Cos => -arg.sin(),
        Func::Tan => 1.0 + arg.tan().powi(2),
        Func::Exp => arg.exp(),
        Func::Ln => arg.recip(),
        Func::Sinh => arg.cosh(),
        Func::Cosh => arg.sinh(),
        Func::Tanh => 1.0 - arg.tanh().powi(2),
        Func::Atan => (1.0 + arg.powi(2)).recip(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use approx::assert_relative_eq;

    use crate::symbols;

    use super::*;

    #[test]
    fn polynomial() {
        let s = symbols("x y");
        let x = Expr::sym(&s[0]);
        let y = Expr::sym(&s[1]);

        let e = 3.0 * x.powi(2) * &y + &y;

        assert_eq!(e.diff(&s[0]), 6.0 * &x * &y);
        assert_eq!(e.diff(&s[1]), 3.0 * x.powi(2) + 1.0);
    }

    #[test]
    fn chain_rule_through_functions() {
        let s = symbols("x");
        let x = Expr::sym(&s[0]);

        let e = (2.0 * &x).sin();

        assert_eq!(e.diff(&s[0]), 2.0 * (2.0 * &x).cos());
    }

    #[test]
    fn symbolic_exponent_matches_finite_difference() {
        let s = symbols("x y");
        let x = Expr::sym(&s[0]);
        let y = Expr::sym(&s[1]);

        let e = x.pow(y.clone()).atan() + (&x * &y).tanh() / (&x + 2.0);
        let d = e.diff(&s[0]);

        let at = |xv: f64| {
            let values = HashMap::from([(s[0].clone(), xv), (s[1].clone(), 1.3)]);
            e.eval(&values).unwrap()
        };
        let h = 1e-6;
        let numeric = (at(0.7 + h) - at(0.7 - h)) / (2.0 * h);

        let values = HashMap::from([(s[0].clone(), 0.7), (s[1].clone(), 1.3)]);
        assert_relative_eq!(d.eval(&values).unwrap(), numeric, epsilon = 1e-7);
    }

    #[test]
    fn absent_symbol_gives_zero() {
        let s = symbols("x y");
        let x = Expr::sym(&s[0]);

        assert!(x.exp().diff(&s[1]).is_zero());
    }
}

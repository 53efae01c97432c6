use std::collections::HashMap;

use crate::{Expr, ExprError, Node, Symbol};

impl Expr {
    /// Evaluates the expression numerically.
    ///
    /// The result may be non-finite (for example `ln` of a negative value);
    /// callers decide how to treat such points.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::Unbound`] if a symbol in the expression has no value.
    pub fn eval(&self, values: &HashMap<Symbol, f64>) -> Result<f64, ExprError> {
        Evaluator::new(values).eval(self)
    }
}

/// Evaluates expressions at one point, memoizing shared subtrees.
///
/// Reuse one evaluator for all entries of a matrix so subtrees shared between
/// entries are computed once.
pub struct Evaluator<'a> {
    values: &'a HashMap<Symbol, f64>,
    memo: HashMap<usize, f64>,
}

impl<'a> Evaluator<'a> {
    #[must_use]
    pub fn new(values: &'a HashMap<Symbol, f64>) -> Self {
        Self {
            values,
            memo: HashMap::new(),
        }
    }

    /// Evaluates `expr` at this evaluator's point.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::Unbound`] if a symbol in the expression has no value.
    pub fn eval(&mut self, expr: &Expr) -> Result<f64, ExprError> {
        match expr.node() {
            Node::Num(v) => return Ok(*v),
            Node::Sym(s) => {
                return self
                    .values
                    .get(s)
                    .copied()
                    .ok_or_else(|| ExprError::Unbound(s.clone()));
            }
            _ => {}
        }

        if let Some(&known) = self.memo.get(&expr.addr()) {
            return Ok(known);
        }

        let value = match expr.node() {
            Node::Add(terms) => {
                let mut total = 0.0;
                for term in terms {
                    total += self.eval(term)?;
                }
                total
            }
            Node::Mul(factors) => {
                let mut total = 1.0;
                for factor in factors {
                    total *= self.eval(factor)?;
                }
                total
            }
            Node::Pow(base, exp) => {
                let b = self.eval(base)?;
                let e = self.eval(exp)?;
                power(b, e)
            }
            Node::Apply(func, arg) => func.apply_f64(self.eval(arg)?),
            Node::Num(_) | Node::Sym(_) => unreachable!("leaves return early"),
        };

        self.memo.insert(expr.addr(), value);
        Ok(value)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn power(base: f64, exp: f64) -> f64 {
    if exp.fract() == 0.0 && exp.abs() <= f64::from(i32::MAX) {
        base.powi(exp as i32)
    } else {
        base.powf(exp)
    }
}

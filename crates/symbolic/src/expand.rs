use std::collections::HashMap;

use crate::{Expr, ExprError, Node};

/// Largest integer power of a sum that [`Expr::expand`] multiplies out.
const MAX_EXPANDED_POWER: f64 = 8.0;

impl Expr {
    /// Distributes products over sums and multiplies out small positive
    /// integer powers of sums, recursively.
    ///
    /// Function arguments are expanded too, but functions themselves are left
    /// alone (`sin(a + b)` stays a single factor).
    #[must_use]
    pub fn expand(&self) -> Expr {
        // No product can exceed usize::MAX terms, unwrap is safe
        self.expand_within(usize::MAX).unwrap()
    }

    /// Like [`Expr::expand`], but gives up once a distributed product would
    /// have more than `max_terms` terms.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::TooLarge`] if the expansion exceeds `max_terms`.
    pub fn expand_within(&self, max_terms: usize) -> Result<Expr, ExprError> {
        Expander::new(max_terms).expand(self)
    }
}

struct Expander {
    memo: HashMap<usize, Expr>,
    max_terms: usize,
}

impl Expander {
    fn new(max_terms: usize) -> Self {
        Self {
            memo: HashMap::new(),
            max_terms,
        }
    }

    fn expand(&mut self, expr: &Expr) -> Result<Expr, ExprError> {
        if let Some(known) = self.memo.get(&expr.addr()) {
            return Ok(known.clone());
        }

        let result = match expr.node() {
            Node::Num(_) | Node::Sym(_) => expr.clone(),
            Node::Add(terms) => {
                let terms = terms.iter().map(|t| self.expand(t)).collect::<Result<Vec<_>, _>>()?;
                Expr::sum(terms)
            }
            Node::Mul(factors) => {
                let factors =
                    factors.iter().map(|f| self.expand(f)).collect::<Result<Vec<_>, _>>()?;
                self.distribute(&factors)?
            }
            Node::Pow(base, exp) => {
                let base = self.expand(base)?;
                let exp = self.expand(exp)?;
                match exp.as_num() {
                    Some(n)
                        if matches!(base.node(), Node::Add(_))
                            && n.fract() == 0.0
                            && (2.0..=MAX_EXPANDED_POWER).contains(&n) =>
                    {
                        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                        let factors = vec![base; n as usize];
                        self.distribute(&factors)?
                    }
                    _ => base.pow(exp),
                }
            }
            Node::Apply(func, arg) => Expr::apply(*func, self.expand(arg)?),
        };

        self.memo.insert(expr.addr(), result.clone());
        Ok(result)
    }

    /// Multiplies already-expanded factors, distributing over any sums.
    fn distribute(&self, factors: &[Expr]) -> Result<Expr, ExprError> {
        let mut terms = vec![Expr::one()];

        for factor in factors {
            let parts: &[Expr] = match factor.node() {
                Node::Add(parts) => parts,
                _ => std::slice::from_ref(factor),
            };
            let size = terms.len().saturating_mul(parts.len());
            if size > self.max_terms {
                return Err(ExprError::TooLarge {
                    size,
                    limit: self.max_terms,
                });
            }
            terms = terms
                .iter()
                .flat_map(|term| parts.iter().map(move |part| term * part))
                .collect();
        }

        Ok(Expr::sum(terms))
    }
}

#[cfg(test)]
mod tests {
    use crate::symbols;

    use super::*;

    #[test]
    fn distributes_products_over_sums() {
        let s = symbols("x u y");
        let x = Expr::sym(&s[0]);
        let u = Expr::sym(&s[1]);
        let y = Expr::sym(&s[2]);

        let e = (&x + &u) * &y - &x * &y;

        assert_eq!(e.expand(), &u * &y);
    }

    #[test]
    fn expands_integer_powers_of_sums() {
        let s = symbols("a b");
        let a = Expr::sym(&s[0]);
        let b = Expr::sym(&s[1]);

        let e = (&a + &b).powi(2);

        assert_eq!(e.expand(), a.powi(2) + 2.0 * &a * &b + b.powi(2));
    }

    #[test]
    fn leaves_function_applications_intact() {
        let s = symbols("a b");
        let a = Expr::sym(&s[0]);
        let b = Expr::sym(&s[1]);

        let e = (&a + &b).sin() * 2.0;

        assert_eq!(e.expand(), 2.0 * (&a + &b).sin());
    }

    #[test]
    fn bounded_expansion_stops_early() {
        let s = symbols("a b c d");
        let sum = Expr::sum(s.iter().map(Expr::sym));
        let e = sum.powi(8) * Expr::sym(&s[0]);

        let result = e.expand_within(1000);

        assert!(matches!(result, Err(ExprError::TooLarge { limit: 1000, .. })));
        assert_eq!(sum.powi(2).expand_within(16).map(|e| e.free_symbols().len()), Ok(4));
    }
}

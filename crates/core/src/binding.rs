use ctrlprop_symbolic::{Expr, Substitution, Symbol};

use crate::ModelError;

/// Values substituted for a model's parameters before any analysis.
///
/// Entries keep their insertion order, which is the order of the model's
/// parameter symbols when built with [`ParameterBinding::from_values`].
/// Rebinding produces a new binding and leaves the model untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterBinding {
    entries: Vec<(Symbol, Expr)>,
}

impl ParameterBinding {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a binding from `(symbol, value)` pairs.
    ///
    /// A symbol that appears twice keeps its last value.
    pub fn from_pairs<I, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Symbol, V)>,
        V: Into<Expr>,
    {
        let mut binding = Self::new();
        for (symbol, value) in pairs {
            binding.set(symbol, value.into());
        }
        binding
    }

    /// Matches an ordered list of values against `parameters`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ParameterCount`] if the lengths differ.
    pub fn from_values(parameters: &[Symbol], values: &[f64]) -> Result<Self, ModelError> {
        if parameters.len() != values.len() {
            return Err(ModelError::ParameterCount {
                expected: parameters.len(),
                found: values.len(),
            });
        }
        Ok(Self::from_pairs(parameters.iter().cloned().zip(values.iter().copied())))
    }

    /// Returns a new binding with some values replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::UnknownParameter`] if an override names a
    /// symbol this binding does not contain.
    pub fn rebind<I, V>(&self, overrides: I) -> Result<Self, ModelError>
    where
        I: IntoIterator<Item = (Symbol, V)>,
        V: Into<Expr>,
    {
        let mut rebound = self.clone();
        for (symbol, value) in overrides {
            if rebound.get(&symbol).is_none() {
                return Err(ModelError::UnknownParameter(symbol));
            }
            rebound.set(symbol, value.into());
        }
        Ok(rebound)
    }

    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<&Expr> {
        self.entries.iter().find(|(s, _)| s == symbol).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Expr)> {
        self.entries.iter().map(|(s, v)| (s, v))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn substitution(&self) -> Substitution {
        self.entries.iter().cloned().collect()
    }

    /// Substitutes the bound values into each expression.
    #[must_use]
    pub fn apply(&self, exprs: &[Expr]) -> Vec<Expr> {
        let substitution = self.substitution();
        exprs.iter().map(|e| e.subs(&substitution)).collect()
    }

    fn set(&mut self, symbol: Symbol, value: Expr) {
        match self.entries.iter_mut().find(|(s, _)| *s == symbol) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((symbol, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use ctrlprop_symbolic::symbols;

    use super::*;

    #[test]
    fn values_follow_parameter_order() {
        let p = symbols("m l g");

        let binding = ParameterBinding::from_values(&p, &[1.0, 0.5, 9.81]).unwrap();

        assert_eq!(binding.get(&p[1]), Some(&Expr::num(0.5)));
        let order: Vec<_> = binding.iter().map(|(s, _)| s.name().to_owned()).collect();
        assert_eq!(order, ["m", "l", "g"]);
    }

    #[test]
    fn value_count_must_match() {
        let p = symbols("m l");

        assert_eq!(
            ParameterBinding::from_values(&p, &[1.0]),
            Err(ModelError::ParameterCount {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn rebinding_leaves_the_original_alone() {
        let p = symbols("m l");
        let original = ParameterBinding::from_values(&p, &[1.0, 2.0]).unwrap();

        let rebound = original.rebind([(p[0].clone(), 3.0)]).unwrap();

        assert_eq!(original.get(&p[0]), Some(&Expr::num(1.0)));
        assert_eq!(rebound.get(&p[0]), Some(&Expr::num(3.0)));
        assert_eq!(rebound.get(&p[1]), Some(&Expr::num(2.0)));
    }

    #[test]
    fn rebinding_an_unknown_symbol_fails() {
        let p = symbols("m");
        let binding = ParameterBinding::from_values(&p, &[1.0]).unwrap();

        let result = binding.rebind([(Symbol::new("k"), 1.0)]);

        assert_eq!(result, Err(ModelError::UnknownParameter(Symbol::new("k"))));
    }

    #[test]
    fn applies_to_expressions() {
        let s = symbols("x m");
        let x = Expr::sym(&s[0]);
        let m = Expr::sym(&s[1]);
        let binding = ParameterBinding::from_pairs([(s[1].clone(), 2.0)]);

        assert_eq!(binding.apply(&[&x / &m]), vec![0.5 * &x]);
    }
}

use std::collections::HashMap;

use crate::{Expr, Node, Symbol};

/// A simultaneous substitution of expressions for symbols.
#[derive(Debug, Clone, Default)]
pub struct Substitution {
    map: HashMap<Symbol, Expr>,
    mask: u64,
}

impl Substitution {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Substitutes zero for each of `symbols`.
    #[must_use]
    pub fn zeros(symbols: &[Symbol]) -> Self {
        symbols.iter().map(|s| (s.clone(), Expr::zero())).collect()
    }

    /// Adds or replaces the value substituted for `symbol`.
    pub fn insert(&mut self, symbol: Symbol, value: impl Into<Expr>) {
        self.mask |= symbol.mask();
        self.map.insert(symbol, value.into());
    }

    #[must_use]
    pub fn get(&self, symbol: &Symbol) -> Option<&Expr> {
        self.map.get(symbol)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl<V: Into<Expr>> FromIterator<(Symbol, V)> for Substitution {
    fn from_iter<I: IntoIterator<Item = (Symbol, V)>>(iter: I) -> Self {
        let mut substitution = Self::new();
        for (symbol, value) in iter {
            substitution.insert(symbol, value);
        }
        substitution
    }
}

impl Expr {
    /// Replaces symbols simultaneously according to `substitution`.
    #[must_use]
    pub fn subs(&self, substitution: &Substitution) -> Expr {
        if substitution.is_empty() {
            return self.clone();
        }
        Substituter {
            substitution,
            memo: HashMap::new(),
        }
        .apply(self)
    }

    /// Replaces each of `symbols` with zero.
    #[must_use]
    pub fn subs_zero(&self, symbols: &[Symbol]) -> Expr {
        self.subs(&Substitution::zeros(symbols))
    }
}

struct Substituter<'a> {
    substitution: &'a Substitution,
    memo: HashMap<usize, Expr>,
}

impl Substituter<'_> {
    fn apply(&mut self, expr: &Expr) -> Expr {
        if expr.mask() & self.substitution.mask == 0 {
            return expr.clone();
        }
        if let Some(known) = self.memo.get(&expr.addr()) {
            return known.clone();
        }

        let result = match expr.node() {
            Node::Num(_) => expr.clone(),
            Node::Sym(s) => self
                .substitution
                .get(s)
                .cloned()
                .unwrap_or_else(|| expr.clone()),
            Node::Add(terms) => {
                let terms: Vec<_> = terms.iter().map(|t| self.apply(t)).collect();
                Expr::sum(terms)
            }
            Node::Mul(factors) => {
                let factors: Vec<_> = factors.iter().map(|f| self.apply(f)).collect();
                Expr::product(factors)
            }
            Node::Pow(base, exp) => self.apply(base).pow(self.apply(exp)),
            Node::Apply(func, arg) => Expr::apply(*func, self.apply(arg)),
        };

        self.memo.insert(expr.addr(), result.clone());
        result
    }
}

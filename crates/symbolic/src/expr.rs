//! Immutable symbolic expressions with light canonicalization.
//!
//! Every [`Expr`] is built through smart constructors ([`Expr::sum`],
//! [`Expr::product`], [`Expr::pow`], [`Expr::apply`]) that flatten nested sums
//! and products, fold numeric constants, collect like terms and like bases, and
//! drop identities. Structurally equal inputs therefore produce equal trees,
//! which keeps Lie-bracket iteration from accumulating dead terms.
//!
//! Expressions are reference counted, so cloning is cheap and subtrees are
//! shared between the results of differentiation and substitution.

mod func;
mod ops;

pub use func::Func;

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet, HashSet},
    hash::{Hash, Hasher},
    sync::Arc,
};

use crate::Symbol;

/// Sums whose magnitude falls below this fraction of their largest
/// contribution are treated as exact cancellation.
const CANCELLATION: f64 = 1e-13;

/// A symbolic expression.
#[derive(Clone)]
pub struct Expr(Arc<Inner>);

struct Inner {
    node: Node,
    size: usize,
    mask: u64,
    hash: u64,
}

/// The shape of an expression node.
#[derive(Debug, Clone)]
pub enum Node {
    /// A numeric constant.
    Num(f64),

    /// A symbolic variable.
    Sym(Symbol),

    /// A sum of at least two terms; at most one term is numeric and it comes first.
    Add(Vec<Expr>),

    /// A product of at least two factors; at most one factor is numeric and it comes first.
    Mul(Vec<Expr>),

    /// `base ^ exponent`.
    Pow(Expr, Expr),

    /// An elementary function applied to an argument.
    Apply(Func, Expr),
}

impl Node {
    fn rank(&self) -> u8 {
        match self {
            Node::Num(_) => 0,
            Node::Sym(_) => 1,
            Node::Pow(..) => 2,
            Node::Mul(_) => 3,
            Node::Add(_) => 4,
            Node::Apply(..) => 5,
        }
    }
}

impl Expr {
    fn from_node(node: Node) -> Self {
        let (size, mask, hash) = match &node {
            Node::Num(v) => (1, 0, mix(0, v.to_bits())),
            Node::Sym(s) => (1, s.mask(), mix(1, s.stable_hash())),
            Node::Add(children) | Node::Mul(children) => {
                let seed = u64::from(node.rank());
                children.iter().fold((1_usize, 0, seed), |(size, mask, hash), c| {
                    (size.saturating_add(c.size()), mask | c.mask(), mix(hash, c.0.hash))
                })
            }
            Node::Pow(base, exp) => (
                1_usize.saturating_add(base.size()).saturating_add(exp.size()),
                base.mask() | exp.mask(),
                mix(mix(2, base.0.hash), exp.0.hash),
            ),
            Node::Apply(func, arg) => (
                1_usize.saturating_add(arg.size()),
                arg.mask(),
                mix(mix(5, *func as u64), arg.0.hash),
            ),
        };

        Self(Arc::new(Inner {
            node,
            size,
            mask,
            hash,
        }))
    }

    /// Returns the node at the root of this expression.
    #[must_use]
    pub fn node(&self) -> &Node {
        &self.0.node
    }

    /// Number of nodes in the expression tree, counting shared subtrees once
    /// per occurrence. Saturates at `usize::MAX`.
    #[must_use]
    pub fn size(&self) -> usize {
        self.0.size
    }

    pub(crate) fn mask(&self) -> u64 {
        self.0.mask
    }

    /// Address of the shared node, used to memoize traversals.
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    /// Creates a numeric constant.
    #[must_use]
    pub fn num(value: f64) -> Self {
        // Normalize -0.0 so equality and hashing agree.
        let value = if value == 0.0 { 0.0 } else { value };
        Self::from_node(Node::Num(value))
    }

    #[must_use]
    pub fn zero() -> Self {
        Self::num(0.0)
    }

    #[must_use]
    pub fn one() -> Self {
        Self::num(1.0)
    }

    /// Creates an expression consisting of a single symbol.
    #[must_use]
    pub fn sym(symbol: &Symbol) -> Self {
        Self::from_node(Node::Sym(symbol.clone()))
    }

    /// Returns the value if this expression is a numeric constant.
    #[must_use]
    pub fn as_num(&self) -> Option<f64> {
        match self.node() {
            Node::Num(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the symbol if this expression is a single symbol.
    #[must_use]
    pub fn as_symbol(&self) -> Option<&Symbol> {
        match self.node() {
            Node::Sym(s) => Some(s),
            _ => None,
        }
    }

    /// Returns `true` if this expression is structurally the constant zero.
    ///
    /// This is a structural test only; an expression like `sin(x)^2 + cos(x)^2 - 1`
    /// is not recognized as zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.as_num() == Some(0.0)
    }

    #[must_use]
    pub fn is_one(&self) -> bool {
        self.as_num() == Some(1.0)
    }

    /// Returns `true` if the symbol occurs anywhere in the expression.
    #[must_use]
    pub fn contains(&self, symbol: &Symbol) -> bool {
        let bit = symbol.mask();
        let mut seen = HashSet::new();
        let mut stack = vec![self];

        while let Some(expr) = stack.pop() {
            if expr.mask() & bit == 0 || !seen.insert(expr.addr()) {
                continue;
            }
            match expr.node() {
                Node::Num(_) => {}
                Node::Sym(s) => {
                    if s == symbol {
                        return true;
                    }
                }
                Node::Add(children) | Node::Mul(children) => stack.extend(children),
                Node::Pow(base, exp) => stack.extend([base, exp]),
                Node::Apply(_, arg) => stack.push(arg),
            }
        }

        false
    }

    /// Returns every symbol occurring in the expression.
    #[must_use]
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols, &mut HashSet::new());
        symbols
    }

    pub(crate) fn collect_symbols(&self, symbols: &mut BTreeSet<Symbol>, seen: &mut HashSet<usize>) {
        let mut stack = vec![self];

        while let Some(expr) = stack.pop() {
            if expr.mask() == 0 || !seen.insert(expr.addr()) {
                continue;
            }
            match expr.node() {
                Node::Num(_) => {}
                Node::Sym(s) => {
                    symbols.insert(s.clone());
                }
                Node::Add(children) | Node::Mul(children) => stack.extend(children),
                Node::Pow(base, exp) => stack.extend([base, exp]),
                Node::Apply(_, arg) => stack.push(arg),
            }
        }
    }

    /// Builds the canonical sum of `terms`.
    pub fn sum<I: IntoIterator<Item = Expr>>(terms: I) -> Self {
        let mut acc = SumAccumulator::default();
        for term in terms {
            acc.push(&term);
        }
        acc.finish()
    }

    /// Builds the canonical product of `factors`.
    pub fn product<I: IntoIterator<Item = Expr>>(factors: I) -> Self {
        let mut acc = ProductAccumulator::default();
        for factor in factors {
            acc.push(&factor);
        }
        acc.finish()
    }

    /// Raises this expression to `exponent`.
    #[must_use]
    pub fn pow(&self, exponent: impl Into<Expr>) -> Self {
        power(self.clone(), exponent.into())
    }

    /// Raises this expression to an integer power.
    #[must_use]
    pub fn powi(&self, n: i32) -> Self {
        self.pow(f64::from(n))
    }

    #[must_use]
    pub fn recip(&self) -> Self {
        self.powi(-1)
    }

    #[must_use]
    pub fn sqrt(&self) -> Self {
        self.pow(0.5)
    }

    /// Applies an elementary function, folding numeric arguments.
    #[must_use]
    pub fn apply(func: Func, arg: Expr) -> Self {
        if let Some(x) = arg.as_num() {
            let value = func.apply_f64(x);
            if value.is_finite() {
                return Self::num(value);
            }
        }
        Self::from_node(Node::Apply(func, arg))
    }

    #[must_use]
    pub fn sin(&self) -> Self {
        Self::apply(Func::Sin, self.clone())
    }

    #[must_use]
    pub fn cos(&self) -> Self {
        Self::apply(Func::Cos, self.clone())
    }

    #[must_use]
    pub fn tan(&self) -> Self {
        Self::apply(Func::Tan, self.clone())
    }

    #[must_use]
    pub fn exp(&self) -> Self {
        Self::apply(Func::Exp, self.clone())
    }

    #[must_use]
    pub fn ln(&self) -> Self {
        Self::apply(Func::Ln, self.clone())
    }

    #[must_use]
    pub fn sinh(&self) -> Self {
        Self::apply(Func::Sinh, self.clone())
    }

    #[must_use]
    pub fn cosh(&self) -> Self {
        Self::apply(Func::Cosh, self.clone())
    }

    #[must_use]
    pub fn tanh(&self) -> Self {
        Self::apply(Func::Tanh, self.clone())
    }

    #[must_use]
    pub fn atan(&self) -> Self {
        Self::apply(Func::Atan, self.clone())
    }

    /// Splits a term into its numeric coefficient and the remaining factor.
    pub(crate) fn split_coefficient(&self) -> (f64, Expr) {
        match self.node() {
            Node::Num(v) => (*v, Self::one()),
            Node::Mul(factors) => match factors[0].as_num() {
                Some(c) if factors.len() == 2 => (c, factors[1].clone()),
                Some(c) => (c, Self::from_node(Node::Mul(factors[1..].to_vec()))),
                None => (1.0, self.clone()),
            },
            _ => (1.0, self.clone()),
        }
    }

    /// Multiplies a coefficient-free term by `c` without re-canonicalizing.
    fn scaled(&self, c: f64) -> Expr {
        if c == 1.0 {
            return self.clone();
        }
        if self.is_one() {
            return Self::num(c);
        }
        let factors = match self.node() {
            Node::Mul(factors) => std::iter::once(Self::num(c))
                .chain(factors.iter().cloned())
                .collect(),
            _ => vec![Self::num(c), self.clone()],
        };
        Self::from_node(Node::Mul(factors))
    }
}

#[derive(Default)]
struct Coefficient {
    value: f64,
    scale: f64,
}

impl Coefficient {
    fn add(&mut self, v: f64) {
        self.value += v;
        self.scale = self.scale.max(v.abs());
    }

    fn settled(&self) -> f64 {
        if self.value.abs() <= CANCELLATION * self.scale {
            0.0
        } else {
            self.value
        }
    }
}

#[derive(Default)]
struct SumAccumulator {
    constant: Coefficient,
    terms: BTreeMap<Expr, Coefficient>,
}

impl SumAccumulator {
    fn push(&mut self, term: &Expr) {
        match term.node() {
            Node::Num(v) => self.constant.add(*v),
            Node::Add(children) => {
                for child in children {
                    self.push(child);
                }
            }
            _ => {
                let (c, rest) = term.split_coefficient();
                self.terms.entry(rest).or_default().add(c);
            }
        }
    }

    fn finish(self) -> Expr {
        let mut out = Vec::with_capacity(self.terms.len() + 1);

        let constant = self.constant.settled();
        if constant != 0.0 {
            out.push(Expr::num(constant));
        }
        for (rest, coefficient) in self.terms {
            let c = coefficient.settled();
            if c != 0.0 {
                out.push(rest.scaled(c));
            }
        }

        match out.len() {
            0 => Expr::zero(),
            1 => out.swap_remove(0),
            _ => Expr::from_node(Node::Add(out)),
        }
    }
}

struct ProductAccumulator {
    coefficient: f64,
    bases: BTreeMap<Expr, Vec<Expr>>,
}

impl Default for ProductAccumulator {
    fn default() -> Self {
        Self {
            coefficient: 1.0,
            bases: BTreeMap::new(),
        }
    }
}

impl ProductAccumulator {
    fn push(&mut self, factor: &Expr) {
        match factor.node() {
            Node::Num(v) => self.coefficient *= v,
            Node::Mul(children) => {
                for child in children {
                    self.push(child);
                }
            }
            Node::Pow(base, exp) => self.bases.entry(base.clone()).or_default().push(exp.clone()),
            _ => self.bases.entry(factor.clone()).or_default().push(Expr::one()),
        }
    }

    fn finish(self) -> Expr {
        let mut coefficient = self.coefficient;
        if coefficient == 0.0 {
            return Expr::zero();
        }

        let mut out = Vec::with_capacity(self.bases.len() + 1);
        let mut regroup = false;

        for (base, mut exponents) in self.bases {
            let exponent = if exponents.len() == 1 {
                exponents.swap_remove(0)
            } else {
                Expr::sum(exponents)
            };

            let factor = power(base, exponent);
            match factor.node() {
                Node::Num(v) => coefficient *= v,
                Node::Mul(_) => {
                    regroup = true;
                    out.push(factor);
                }
                _ => out.push(factor),
            }
        }

        if coefficient == 0.0 {
            return Expr::zero();
        }
        if regroup {
            out.push(Expr::num(coefficient));
            return Expr::product(out);
        }

        out.sort();
        if coefficient != 1.0 {
            out.insert(0, Expr::num(coefficient));
        }

        match out.len() {
            0 => Expr::one(),
            1 => out.swap_remove(0),
            _ => Expr::from_node(Node::Mul(out)),
        }
    }
}

fn power(base: Expr, exponent: Expr) -> Expr {
    if let Some(e) = exponent.as_num() {
        if e == 0.0 {
            return Expr::one();
        }
        if e == 1.0 {
            return base;
        }

        let integral = e.fract() == 0.0;
        match base.node() {
            Node::Num(b) => {
                let value = b.powf(e);
                if value.is_finite() && (*b >= 0.0 || integral) {
                    return Expr::num(value);
                }
            }
            Node::Pow(inner_base, inner_exp) if integral => {
                let combined = Expr::product([inner_exp.clone(), exponent.clone()]);
                return power(inner_base.clone(), combined);
            }
            Node::Mul(factors) if integral => {
                return Expr::product(
                    factors
                        .iter()
                        .map(|factor| power(factor.clone(), exponent.clone())),
                );
            }
            _ => {}
        }
    }

    if base.is_one() {
        return Expr::one();
    }

    Expr::from_node(Node::Pow(base, exponent))
}

fn mix(hash: u64, value: u64) -> u64 {
    // splitmix64 finalizer over the combined state.
    let mut z = (hash ^ value)
        .wrapping_add(0x9e37_79b9_7f4a_7c15)
        .wrapping_add(hash << 6);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

impl Ord for Expr {
    fn cmp(&self, other: &Self) -> Ordering {
        if Arc::ptr_eq(&self.0, &other.0) {
            return Ordering::Equal;
        }

        match (self.node(), other.node()) {
            (Node::Num(a), Node::Num(b)) => a.total_cmp(b),
            (Node::Sym(a), Node::Sym(b)) => a.cmp(b),
            (a, b) if a.rank() != b.rank() => a.rank().cmp(&b.rank()),
            // Compound nodes of the same kind: the cached hash decides
            // cheaply, structure breaks ties.
            (a, b) => self.0.hash.cmp(&other.0.hash).then_with(|| match (a, b) {
                (Node::Add(x), Node::Add(y)) | (Node::Mul(x), Node::Mul(y)) => x.cmp(y),
                (Node::Pow(xb, xe), Node::Pow(yb, ye)) => xb.cmp(yb).then_with(|| xe.cmp(ye)),
                (Node::Apply(f, x), Node::Apply(g, y)) => f.cmp(g).then_with(|| x.cmp(y)),
                _ => Ordering::Equal,
            }),
        }
    }
}

impl PartialOrd for Expr {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.0.hash == other.0.hash && self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Expr {}

impl Hash for Expr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl std::fmt::Debug for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Expr({self})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols;

    fn xyz() -> (Expr, Expr, Expr) {
        let s = symbols("x y z");
        (Expr::sym(&s[0]), Expr::sym(&s[1]), Expr::sym(&s[2]))
    }

    #[test]
    fn like_terms_collect() {
        let (x, y, _) = xyz();

        let e = &x + &y + 2.0 * &x - &y;

        assert_eq!(e, 3.0 * &x);
    }

    #[test]
    fn exact_cancellation_yields_zero() {
        let (x, y, z) = xyz();

        let e = &x * &y * &z - &z * &y * &x;

        assert!(e.is_zero());
    }

    #[test]
    fn near_cancellation_of_float_coefficients_yields_zero() {
        let (x, _, _) = xyz();

        let e = 0.1 * &x + 0.2 * &x - 0.3 * &x;

        assert!(e.is_zero());
    }

    #[test]
    fn like_bases_collect_exponents() {
        let (x, y, _) = xyz();

        let e = &x * &y * &x / &y;

        assert_eq!(e, x.powi(2));
    }

    #[test]
    fn reciprocal_cancels() {
        let (x, _, _) = xyz();

        assert!((&x * x.recip()).is_one());
    }

    #[test]
    fn numeric_folding() {
        let e = Expr::num(2.0).powi(3) + Expr::num(0.0).cos();

        assert_eq!(e.as_num(), Some(9.0));
    }

    #[test]
    fn integer_power_of_product_distributes() {
        let (x, y, _) = xyz();

        let e = (2.0 * &x * &y).powi(2);

        assert_eq!(e, 4.0 * x.powi(2) * y.powi(2));
    }

    #[test]
    fn ordering_is_independent_of_construction_order() {
        let (x, y, z) = xyz();

        let a = Expr::sum([x.sin(), &y * &z, x.clone()]);
        let b = Expr::sum([x.clone(), &z * &y, x.sin()]);

        assert_eq!(a, b);
    }

    #[test]
    fn contains_and_free_symbols() {
        let s = symbols("x y z");
        let (x, y, _) = xyz();

        let e = (&x * &y).sin() + 1.0;

        assert!(e.contains(&s[0]));
        assert!(!e.contains(&s[2]));
        assert_eq!(e.free_symbols().into_iter().collect::<Vec<_>>(), &s[..2]);
    }

    #[test]
    fn size_counts_nodes() {
        let (x, y, _) = xyz();

        assert_eq!(x.size(), 1);
        assert_eq!((&x + &y).size(), 3);
    }
}

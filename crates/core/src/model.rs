use std::collections::HashSet;

use ctrlprop_symbolic::{Expr, ParseError, Symbol, parse, symbols};
use thiserror::Error;

use crate::ParameterBinding;

/// A control model `ẋ = F(x, u)` given symbolically.
///
/// Implementers supply their symbol vectors and right-hand side; everything
/// else in the crate works against this trait. The state, input and
/// parameter symbols must be distinct and pairwise disjoint.
pub trait ControlModel {
    /// State symbols, one per state equation.
    fn state_symbols(&self) -> Vec<Symbol>;

    /// Input symbols. Empty for an autonomous model.
    fn input_symbols(&self) -> Vec<Symbol>;

    fn parameter_symbols(&self) -> Vec<Symbol> {
        Vec::new()
    }

    /// Default values for the parameters.
    fn parameter_substitutions(&self) -> ParameterBinding {
        ParameterBinding::new()
    }

    /// The right-hand side, or `None` if the model has no usable symbolic form.
    fn rhs_symbolic(&self) -> Option<Vec<Expr>>;

    /// Number of state equations.
    fn dimension(&self) -> usize {
        self.state_symbols().len()
    }

    /// Rebinds the parameters to an ordered list of values.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::ParameterCount`] if `values` does not have one
    /// entry per parameter symbol.
    fn with_parameters(&self, values: &[f64]) -> Result<ParameterBinding, ModelError> {
        ParameterBinding::from_values(&self.parameter_symbols(), values)
    }
}

/// Errors in a model definition or its use.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error(
        "dimension mismatch: dimension {dimension}, {states} state symbols, {rhs} rhs entries"
    )]
    DimensionMismatch {
        dimension: usize,
        states: usize,
        rhs: usize,
    },

    #[error("symbol `{0}` is declared more than once")]
    DuplicateSymbol(Symbol),

    #[error("rhs refers to undeclared symbol `{0}`")]
    UnknownSymbol(Symbol),

    #[error("`{0}` is not a parameter")]
    UnknownParameter(Symbol),

    #[error("expected {expected} parameter values, found {found}")]
    ParameterCount { expected: usize, found: usize },

    #[error("rhs entry {index} does not parse: {source}")]
    Parse { index: usize, source: ParseError },
}

/// Checks that the model's dimension agrees with its states and `rhs`.
///
/// # Errors
///
/// Returns [`ModelError::DimensionMismatch`] if they disagree.
pub fn check_dimensions(model: &dyn ControlModel, rhs: &[Expr]) -> Result<(), ModelError> {
    let dimension = model.dimension();
    let states = model.state_symbols().len();
    if rhs.len() == dimension && states == dimension {
        Ok(())
    } else {
        Err(ModelError::DimensionMismatch {
            dimension,
            states,
            rhs: rhs.len(),
        })
    }
}

/// A model defined directly by its symbols and right-hand side.
///
/// ```
/// use ctrlprop_core::{ControlModel, SymbolicModel};
///
/// let pendulum = SymbolicModel::builder()
///     .states("x1 x2")
///     .inputs("u")
///     .parameter("g", 9.81)
///     .parameter("l", 0.5)
///     .rhs(["x2", "-g/l*sin(x1) + u"])
///     .build()
///     .unwrap();
///
/// assert_eq!(pendulum.dimension(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct SymbolicModel {
    states: Vec<Symbol>,
    inputs: Vec<Symbol>,
    parameters: Vec<Symbol>,
    rhs: Vec<Expr>,
    binding: ParameterBinding,
}

impl SymbolicModel {
    #[must_use]
    pub fn builder() -> SymbolicModelBuilder {
        SymbolicModelBuilder::default()
    }
}

impl ControlModel for SymbolicModel {
    fn state_symbols(&self) -> Vec<Symbol> {
        self.states.clone()
    }

    fn input_symbols(&self) -> Vec<Symbol> {
        self.inputs.clone()
    }

    fn parameter_symbols(&self) -> Vec<Symbol> {
        self.parameters.clone()
    }

    fn parameter_substitutions(&self) -> ParameterBinding {
        self.binding.clone()
    }

    fn rhs_symbolic(&self) -> Option<Vec<Expr>> {
        Some(self.rhs.clone())
    }
}

#[derive(Debug, Clone)]
enum RhsSource {
    Text(Vec<String>),
    Exprs(Vec<Expr>),
}

/// Builder for [`SymbolicModel`].
#[derive(Debug, Clone, Default)]
pub struct SymbolicModelBuilder {
    states: Vec<Symbol>,
    inputs: Vec<Symbol>,
    parameters: Vec<(Symbol, Expr)>,
    rhs: Option<RhsSource>,
}

impl SymbolicModelBuilder {
    /// Sets the state symbols from whitespace or comma separated names.
    #[must_use]
    pub fn states(mut self, names: &str) -> Self {
        self.states = symbols(names);
        self
    }

    #[must_use]
    pub fn state_symbols(mut self, states: Vec<Symbol>) -> Self {
        self.states = states;
        self
    }

    /// Sets the input symbols from whitespace or comma separated names.
    #[must_use]
    pub fn inputs(mut self, names: &str) -> Self {
        self.inputs = symbols(names);
        self
    }

    #[must_use]
    pub fn input_symbols(mut self, inputs: Vec<Symbol>) -> Self {
        self.inputs = inputs;
        self
    }

    /// Declares a parameter with its default value.
    #[must_use]
    pub fn parameter(mut self, name: &str, value: impl Into<Expr>) -> Self {
        self.parameters.push((Symbol::new(name), value.into()));
        self
    }

    /// Sets the right-hand side from text, one entry per state.
    #[must_use]
    pub fn rhs<I, S>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rhs = Some(RhsSource::Text(entries.into_iter().map(Into::into).collect()));
        self
    }

    #[must_use]
    pub fn rhs_exprs(mut self, entries: Vec<Expr>) -> Self {
        self.rhs = Some(RhsSource::Exprs(entries));
        self
    }

    /// Validates the definition and builds the model.
    ///
    /// # Errors
    ///
    /// Returns a [`ModelError`] if an entry fails to parse, a symbol is
    /// declared twice, the right-hand side mentions an undeclared symbol, or
    /// its length differs from the number of states.
    pub fn build(self) -> Result<SymbolicModel, ModelError> {
        let rhs = match self.rhs {
            None => Vec::new(),
            Some(RhsSource::Exprs(exprs)) => exprs,
            Some(RhsSource::Text(entries)) => entries
                .iter()
                .enumerate()
                .map(|(index, text)| parse(text).map_err(|source| ModelError::Parse { index, source }))
                .collect::<Result<_, _>>()?,
        };

        let parameters: Vec<Symbol> = self.parameters.iter().map(|(s, _)| s.clone()).collect();

        let mut declared = HashSet::new();
        for symbol in self.states.iter().chain(&self.inputs).chain(&parameters) {
            if !declared.insert(symbol.clone()) {
                return Err(ModelError::DuplicateSymbol(symbol.clone()));
            }
        }

        if rhs.len() != self.states.len() {
            return Err(ModelError::DimensionMismatch {
                dimension: self.states.len(),
                states: self.states.len(),
                rhs: rhs.len(),
            });
        }

        for entry in &rhs {
            if let Some(unknown) = entry.free_symbols().into_iter().find(|s| !declared.contains(s)) {
                return Err(ModelError::UnknownSymbol(unknown));
            }
        }

        Ok(SymbolicModel {
            states: self.states,
            inputs: self.inputs,
            parameters,
            rhs,
            binding: ParameterBinding::from_pairs(self.parameters),
        })
    }
}

//! Vector fields, distributions and the two bracket constructions.
//!
//! The accessibility construction starts from the columns of the input matrix
//! and repeatedly brackets the drift with the most recently appended column,
//! stopping as soon as the span is full. Only that last column is bracketed,
//! never the whole current span, so for some multi-input systems the result
//! under-approximates the accessibility algebra.
//!
//! The linearization construction stacks the blocks
//! `G, ad_{-f} G, …, ad_{-f}^{n-1} G`, where each block brackets the previous
//! block column by column with the negated drift.

use ctrlprop_symbolic::{Expr, ExprError, SymMatrix, Symbol, lie_bracket};
use tracing::debug;

use crate::{AffineSystem, CancelToken, CheckError, Oracle};

/// A vector field, one component per state.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorField(Vec<Expr>);

impl VectorField {
    #[must_use]
    pub fn new(components: Vec<Expr>) -> Self {
        Self(components)
    }

    #[must_use]
    pub fn components(&self) -> &[Expr] {
        &self.0
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.0.len()
    }

    /// Size of the largest component, in nodes.
    #[must_use]
    pub fn max_size(&self) -> usize {
        self.0.iter().map(Expr::size).max().unwrap_or(0)
    }

    /// The Lie bracket `[self, other]`.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::DimensionMismatch`] if the fields do not have one
    /// component per state.
    pub fn bracket(&self, other: &VectorField, states: &[Symbol]) -> Result<VectorField, ExprError> {
        lie_bracket(&self.0, &other.0, states).map(VectorField)
    }

    #[must_use]
    pub fn negated(&self) -> VectorField {
        VectorField(self.0.iter().map(|e| -e).collect())
    }
}

/// An ordered list of vector fields sharing one dimension.
#[derive(Debug, Clone, PartialEq)]
pub struct Distribution {
    dimension: usize,
    fields: Vec<VectorField>,
}

impl Distribution {
    /// An empty distribution in `dimension` states.
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fields: Vec::new(),
        }
    }

    /// The columns of `matrix` as a distribution.
    #[must_use]
    pub fn from_matrix(matrix: &SymMatrix) -> Self {
        Self {
            dimension: matrix.nrows(),
            fields: matrix.columns().map(|c| VectorField::new(c.to_vec())).collect(),
        }
    }

    /// # Errors
    ///
    /// Returns [`ExprError::DimensionMismatch`] if a field has the wrong dimension.
    pub fn from_fields(dimension: usize, fields: Vec<VectorField>) -> Result<Self, ExprError> {
        let mut distribution = Self::new(dimension);
        for field in fields {
            distribution.push(field)?;
        }
        Ok(distribution)
    }

    /// Appends a field.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::DimensionMismatch`] if the field has the wrong dimension.
    pub fn push(&mut self, field: VectorField) -> Result<(), ExprError> {
        if field.dimension() != self.dimension {
            return Err(ExprError::DimensionMismatch {
                expected: self.dimension,
                found: field.dimension(),
            });
        }
        self.fields.push(field);
        Ok(())
    }

    #[must_use]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn fields(&self) -> &[VectorField] {
        &self.fields
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&VectorField> {
        self.fields.last()
    }

    /// The `dimension × len` matrix with one column per field.
    #[must_use]
    pub fn to_matrix(&self) -> SymMatrix {
        let columns: Vec<&[Expr]> = self.fields.iter().map(VectorField::components).collect();
        // Every field was checked against `dimension` on the way in.
        SymMatrix::from_columns(self.dimension, &columns)
            .unwrap_or_else(|_| SymMatrix::zeros(self.dimension, 0))
    }
}

/// Result of the accessibility construction.
#[derive(Debug, Clone)]
pub struct AccessibilityReport {
    pub distribution: Distribution,

    /// Generic rank of the final distribution.
    pub rank: usize,

    /// Whether the rank reached the state dimension.
    pub full_rank: bool,

    /// Number of brackets appended.
    pub brackets: usize,
}

/// Builds the accessibility distribution of `system`.
///
/// # Errors
///
/// Returns a [`CheckError`] if a bracket exceeds `max_nodes`, `cancel` is
/// raised, or a rank cannot be decided.
pub fn accessibility_distribution(
    system: &AffineSystem,
    oracle: &dyn Oracle,
    max_nodes: usize,
    cancel: &CancelToken,
) -> Result<AccessibilityReport, CheckError> {
    let n = system.dimension();
    let drift = VectorField::new(system.drift().to_vec());

    let mut distribution = Distribution::from_matrix(system.input_matrix());
    let mut rank = oracle.generic_rank(&distribution.to_matrix(), cancel)?;
    debug!(rank, n, "initial input distribution");

    let mut brackets = 0;
    for step in 1..n {
        if rank == n {
            break;
        }
        let Some(last) = distribution.last() else {
            break;
        };
        checkpoint(cancel)?;

        let bracket = drift.bracket(last, system.states())?;
        limit_size(&bracket, max_nodes)?;
        distribution.push(bracket)?;
        brackets += 1;

        rank = oracle.generic_rank(&distribution.to_matrix(), cancel)?;
        debug!(step, rank, n, "accessibility bracket appended");
    }

    Ok(AccessibilityReport {
        distribution,
        rank,
        full_rank: rank == n,
        brackets,
    })
}

/// Result of the linearization construction.
#[derive(Debug, Clone)]
pub struct LinearizationDistributions {
    /// All `n` blocks.
    pub delta_n: Distribution,

    /// The first `n - 1` blocks.
    pub delta_n_minus_1: Distribution,
}

/// Builds the linearization distributions of `system`.
///
/// # Errors
///
/// Returns a [`CheckError`] if a bracket exceeds `max_nodes` or `cancel` is
/// raised.
pub fn linearization_distributions(
    system: &AffineSystem,
    max_nodes: usize,
    cancel: &CancelToken,
) -> Result<LinearizationDistributions, CheckError> {
    let n = system.dimension();
    let minus_drift = VectorField::new(system.drift().to_vec()).negated();

    let mut block = Distribution::from_matrix(system.input_matrix());
    let mut delta_n = Distribution::new(n);
    let mut delta_n_minus_1 = Distribution::new(n);

    for order in 0..n {
        for field in block.fields() {
            if order + 1 < n {
                delta_n_minus_1.push(field.clone())?;
            }
            delta_n.push(field.clone())?;
        }
        if order + 1 == n {
            break;
        }

        checkpoint(cancel)?;
        let mut next = Distribution::new(n);
        for field in block.fields() {
            let bracket = minus_drift.bracket(field, system.states())?;
            limit_size(&bracket, max_nodes)?;
            next.push(bracket)?;
        }
        debug!(order = order + 1, "linearization block built");
        block = next;
    }

    Ok(LinearizationDistributions {
        delta_n,
        delta_n_minus_1,
    })
}

fn checkpoint(cancel: &CancelToken) -> Result<(), CheckError> {
    if cancel.is_cancelled() {
        Err(CheckError::Cancelled)
    } else {
        Ok(())
    }
}

fn limit_size(field: &VectorField, limit: usize) -> Result<(), CheckError> {
    let size = field.max_size();
    if size > limit {
        Err(CheckError::ExpressionTooLarge { size, limit })
    } else {
        Ok(())
    }
}

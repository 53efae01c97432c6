//! Structural property checks for nonlinear control models.
//!
//! A model `ẋ = F(x, u)` is described through the [`ControlModel`] trait. The
//! crate decides two properties of such models:
//!
//! - [`LocalStrongAccessibility`] — the accessibility distribution built from
//!   the input fields and drift brackets reaches full rank
//! - [`ExactInputStateLinearization`] — the distribution
//!   `[G, ad_{-f} G, …, ad_{-f}^{n-1} G]` has full rank and its first `n - 1`
//!   blocks are involutive
//!
//! The pieces those checks are made of are public as well:
//!
//! - [`decompose`] — splits a right-hand side into drift and input matrix
//! - [`accessibility_distribution`], [`linearization_distributions`] — the
//!   bracket constructions
//! - [`Oracle`] and [`SampledOracle`] — generic rank, involutivity and zero
//!   decisions
//! - [`TimeoutGuard`] — bounded waiting with cooperative cancellation

mod affine;
mod binding;
mod config;
mod distribution;
mod error;
mod model;
mod oracle;
mod property;
mod timeout;

#[cfg(test)]
mod tests;

pub use affine::{AffineError, AffineSystem, decompose};
pub use binding::ParameterBinding;
pub use config::{CheckConfig, ConfigError, OracleConfig};
pub use distribution::{
    AccessibilityReport, Distribution, LinearizationDistributions, VectorField,
    accessibility_distribution, linearization_distributions,
};
pub use error::CheckError;
pub use model::{ControlModel, ModelError, SymbolicModel, SymbolicModelBuilder, check_dimensions};
pub use oracle::{Involutivity, Oracle, RankError, SampledOracle};
pub use property::{
    CheckOutcome, ExactInputStateLinearization, LocalStrongAccessibility, MSG_ACCESSIBLE,
    MSG_LINEARIZABLE, MSG_NO_INPUT, MSG_NOT_ACCESSIBLE, MSG_NOT_AFFINE, MSG_NOT_LINEARIZABLE,
    MSG_NOT_USEABLE, MSG_TIMEOUT, Property, VerificationResult,
};
pub use timeout::{CancelToken, GuardError, TimeoutGuard};

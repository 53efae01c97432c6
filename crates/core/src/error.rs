use ctrlprop_symbolic::ExprError;
use thiserror::Error;

use crate::{AffineError, RankError};

/// Errors raised while computing a property verdict.
///
/// Every variant ends up as a `null` verdict carrying the error text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CheckError {
    #[error("expression size limit exceeded ({size} > {limit} nodes)")]
    ExpressionTooLarge { size: usize, limit: usize },

    #[error("computation cancelled")]
    Cancelled,

    #[error(transparent)]
    Rank(#[from] RankError),

    #[error(transparent)]
    Affine(#[from] AffineError),

    #[error(transparent)]
    Expr(#[from] ExprError),
}

//! A small symbolic expression engine for analyzing control models.
//!
//! The crate covers what Lie-algebraic structural checks need and no more:
//!
//! - [`Symbol`] and [`Expr`] — named variables and immutable, canonicalized
//!   expression trees over them
//! - differentiation ([`Expr::diff`]), substitution ([`Expr::subs`]),
//!   expansion ([`Expr::expand`], [`Expr::expand_within`]) and numeric
//!   evaluation ([`Expr::eval`])
//! - [`parse`] — expressions from text such as `"-g/l*sin(x1) + u/(m*l^2)"`
//! - [`SymMatrix`] and [`jacobian`] — column-major symbolic matrices
//! - [`lie_bracket`] — the Lie bracket of two vector fields
//! - [`numeric_rank`] — rank of a numeric matrix with full pivoting

mod diff;
mod display;
mod error;
mod eval;
mod expand;
mod expr;
mod lie;
mod matrix;
mod parse;
mod rank;
mod subs;
mod symbol;

pub use error::{ExprError, ParseError};
pub use eval::Evaluator;
pub use expr::{Expr, Func, Node};
pub use lie::lie_bracket;
pub use matrix::{SymMatrix, jacobian};
pub use parse::parse;
pub use rank::numeric_rank;
pub use subs::Substitution;
pub use symbol::{Symbol, symbols};

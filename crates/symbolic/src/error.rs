use thiserror::Error;

use crate::Symbol;

/// Errors that can occur when evaluating or combining expressions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    /// A symbol had no value during numeric evaluation.
    #[error("symbol `{0}` has no value")]
    Unbound(Symbol),

    /// Vectors or matrices with incompatible shapes were combined.
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// An expansion would produce more terms than allowed.
    #[error("expression size limit exceeded ({size} > {limit} terms)")]
    TooLarge { size: usize, limit: usize },
}

/// Errors that can occur when parsing an expression from text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("unexpected end of input")]
    UnexpectedEnd,

    #[error("unexpected character `{ch}` at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("unexpected `{found}` at position {position}")]
    UnexpectedToken { found: String, position: usize },

    #[error("invalid number `{text}` at position {position}")]
    InvalidNumber { text: String, position: usize },

    #[error("unknown function `{name}` at position {position}")]
    UnknownFunction { name: String, position: usize },
}

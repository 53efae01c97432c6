//! Lie brackets of vector fields.
//!
//! A vector field is a slice of expressions, one per coordinate in `vars`.

use crate::{Expr, ExprError, Symbol, jacobian};

/// The Lie bracket `[f, g] = (∂g/∂x) f - (∂f/∂x) g`.
///
/// # Errors
///
/// Returns [`ExprError::DimensionMismatch`] if `f` or `g` does not have one
/// component per variable.
pub fn lie_bracket(f: &[Expr], g: &[Expr], vars: &[Symbol]) -> Result<Vec<Expr>, ExprError> {
    check_len(f, vars)?;
    check_len(g, vars)?;

    let jg_f = jacobian(g, vars).mul_vector(f)?;
    let jf_g = jacobian(f, vars).mul_vector(g)?;

    Ok(jg_f.iter().zip(&jf_g).map(|(a, b)| a - b).collect())
}

fn check_len(field: &[Expr], vars: &[Symbol]) -> Result<(), ExprError> {
    if field.len() == vars.len() {
        Ok(())
    } else {
        Err(ExprError::DimensionMismatch {
            expected: vars.len(),
            found: field.len(),
        })
    }
}

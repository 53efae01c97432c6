use std::{
    collections::{BTreeSet, HashMap, HashSet},
    ops::Index,
};

use ndarray::Array2;

use crate::{Evaluator, Expr, ExprError, Substitution, Symbol, diff::Differentiator};

/// A dense matrix of expressions, stored column by column.
///
/// Columns are the natural unit here: a distribution is a list of vector
/// fields and becomes a matrix by placing them side by side.
#[derive(Debug, Clone, PartialEq)]
pub struct SymMatrix {
    nrows: usize,
    ncols: usize,
    data: Vec<Expr>,
}

impl SymMatrix {
    /// Creates an `nrows × ncols` matrix of zeros.
    #[must_use]
    pub fn zeros(nrows: usize, ncols: usize) -> Self {
        Self {
            nrows,
            ncols,
            data: vec![Expr::zero(); nrows * ncols],
        }
    }

    /// Builds a matrix from columns of length `nrows`.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::DimensionMismatch`] if a column has the wrong length.
    pub fn from_columns<C: AsRef<[Expr]>>(nrows: usize, columns: &[C]) -> Result<Self, ExprError> {
        let mut data = Vec::with_capacity(nrows * columns.len());
        for column in columns {
            let column = column.as_ref();
            if column.len() != nrows {
                return Err(ExprError::DimensionMismatch {
                    expected: nrows,
                    found: column.len(),
                });
            }
            data.extend_from_slice(column);
        }
        Ok(Self {
            nrows,
            ncols: columns.len(),
            data,
        })
    }

    /// Builds a matrix from rows of length `ncols`.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::DimensionMismatch`] if a row has the wrong length.
    pub fn from_rows<R: AsRef<[Expr]>>(ncols: usize, rows: &[R]) -> Result<Self, ExprError> {
        for row in rows {
            let len = row.as_ref().len();
            if len != ncols {
                return Err(ExprError::DimensionMismatch {
                    expected: ncols,
                    found: len,
                });
            }
        }
        let nrows = rows.len();
        let data = (0..ncols)
            .flat_map(|j| rows.iter().map(move |row| row.as_ref()[j].clone()))
            .collect();
        Ok(Self { nrows, ncols, data })
    }

    /// A single-column matrix.
    #[must_use]
    pub fn column_vector(entries: Vec<Expr>) -> Self {
        Self {
            nrows: entries.len(),
            ncols: 1,
            data: entries,
        }
    }

    #[must_use]
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    #[must_use]
    pub fn ncols(&self) -> usize {
        self.ncols
    }

    #[must_use]
    pub fn get(&self, row: usize, col: usize) -> Option<&Expr> {
        (row < self.nrows && col < self.ncols).then(|| &self.data[col * self.nrows + row])
    }

    /// Returns column `col`.
    ///
    /// # Panics
    ///
    /// Panics if `col` is out of bounds.
    #[must_use]
    pub fn column(&self, col: usize) -> &[Expr] {
        assert!(col < self.ncols, "column {col} out of bounds");
        &self.data[col * self.nrows..(col + 1) * self.nrows]
    }

    pub fn columns(&self) -> impl Iterator<Item = &[Expr]> {
        (0..self.ncols).map(move |j| &self.data[j * self.nrows..(j + 1) * self.nrows])
    }

    /// All entries, column by column.
    pub fn iter(&self) -> impl Iterator<Item = &Expr> {
        self.data.iter()
    }

    /// Places `other` to the right of `self`.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::DimensionMismatch`] if the row counts differ.
    pub fn hstack(&self, other: &SymMatrix) -> Result<SymMatrix, ExprError> {
        if self.nrows != other.nrows {
            return Err(ExprError::DimensionMismatch {
                expected: self.nrows,
                found: other.nrows,
            });
        }
        let mut data = self.data.clone();
        data.extend_from_slice(&other.data);
        Ok(Self {
            nrows: self.nrows,
            ncols: self.ncols + other.ncols,
            data,
        })
    }

    /// Applies `f` to every entry.
    #[must_use]
    pub fn map(&self, f: impl FnMut(&Expr) -> Expr) -> SymMatrix {
        Self {
            nrows: self.nrows,
            ncols: self.ncols,
            data: self.data.iter().map(f).collect(),
        }
    }

    #[must_use]
    pub fn subs(&self, substitution: &Substitution) -> SymMatrix {
        self.map(|e| e.subs(substitution))
    }

    /// Entry-wise `self - other`.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::DimensionMismatch`] if the shapes differ.
    pub fn difference(&self, other: &SymMatrix) -> Result<SymMatrix, ExprError> {
        if (self.nrows, self.ncols) != (other.nrows, other.ncols) {
            return Err(ExprError::DimensionMismatch {
                expected: self.data.len(),
                found: other.data.len(),
            });
        }
        let data = self.data.iter().zip(&other.data).map(|(a, b)| a - b).collect();
        Ok(Self {
            nrows: self.nrows,
            ncols: self.ncols,
            data,
        })
    }

    /// Matrix-vector product.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::DimensionMismatch`] if `v` does not have `ncols` entries.
    pub fn mul_vector(&self, v: &[Expr]) -> Result<Vec<Expr>, ExprError> {
        if v.len() != self.ncols {
            return Err(ExprError::DimensionMismatch {
                expected: self.ncols,
                found: v.len(),
            });
        }
        let result = (0..self.nrows)
            .map(|i| Expr::sum((0..self.ncols).map(|j| &self.data[j * self.nrows + i] * &v[j])))
            .collect();
        Ok(result)
    }

    /// Size of the largest entry, in nodes.
    #[must_use]
    pub fn max_entry_size(&self) -> usize {
        self.data.iter().map(Expr::size).max().unwrap_or(0)
    }

    #[must_use]
    pub fn free_symbols(&self) -> BTreeSet<Symbol> {
        let mut symbols = BTreeSet::new();
        let mut seen = HashSet::new();
        for entry in &self.data {
            entry.collect_symbols(&mut symbols, &mut seen);
        }
        symbols
    }

    /// Evaluates every entry at one point.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::Unbound`] if an entry mentions a symbol without a value.
    pub fn evaluate(&self, values: &HashMap<Symbol, f64>) -> Result<Array2<f64>, ExprError> {
        let mut evaluator = Evaluator::new(values);
        let mut out = Array2::zeros((self.nrows, self.ncols));
        for (j, column) in self.columns().enumerate() {
            for (i, entry) in column.iter().enumerate() {
                out[(i, j)] = evaluator.eval(entry)?;
            }
        }
        Ok(out)
    }
}

impl Index<(usize, usize)> for SymMatrix {
    type Output = Expr;

    fn index(&self, (row, col): (usize, usize)) -> &Expr {
        assert!(
            row < self.nrows && col < self.ncols,
            "index ({row}, {col}) out of bounds for {}x{} matrix",
            self.nrows,
            self.ncols
        );
        &self.data[col * self.nrows + row]
    }
}

/// The Jacobian `∂exprs/∂vars`, one row per expression and one column per variable.
#[must_use]
pub fn jacobian(exprs: &[Expr], vars: &[Symbol]) -> SymMatrix {
    let nrows = exprs.len();
    let mut data = Vec::with_capacity(nrows * vars.len());
    for var in vars {
        let mut differentiator = Differentiator::new(var);
        data.extend(exprs.iter().map(|e| differentiator.diff(e)));
    }
    SymMatrix {
        nrows,
        ncols: vars.len(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use crate::symbols;

    use super::*;

    #[test]
    fn storage_is_column_major() {
        let s = symbols("a b c d");
        let e: Vec<Expr> = s.iter().map(Expr::sym).collect();

        let m = SymMatrix::from_rows(2, &[[e[0].clone(), e[1].clone()], [e[2].clone(), e[3].clone()]])
            .unwrap();

        assert_eq!(m[(0, 1)], e[1]);
        assert_eq!(m.column(0), &[e[0].clone(), e[2].clone()]);
        assert_eq!(m.columns().count(), 2);
        assert!(m.get(2, 0).is_none());
    }

    #[test]
    fn rejects_ragged_columns() {
        let x = Expr::sym(&Symbol::new("x"));

        let result = SymMatrix::from_columns(2, &[vec![x.clone(), x.clone()], vec![x]]);

        assert_eq!(
            result,
            Err(ExprError::DimensionMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn jacobian_of_pendulum() {
        let s = symbols("x1 x2");
        let x1 = Expr::sym(&s[0]);
        let x2 = Expr::sym(&s[1]);

        let f = vec![x2.clone(), -x1.sin() - 0.5 * &x2];
        let j = jacobian(&f, &s);

        assert_eq!(j[(0, 0)], Expr::zero());
        assert_eq!(j[(0, 1)], Expr::one());
        assert_eq!(j[(1, 0)], -x1.cos());
        assert_eq!(j[(1, 1)], Expr::num(-0.5));
    }

    #[test]
    fn evaluates_to_ndarray() {
        let s = symbols("x y");
        let x = Expr::sym(&s[0]);
        let y = Expr::sym(&s[1]);

        let m = SymMatrix::from_columns(2, &[vec![x.clone(), &x * &y], vec![Expr::one(), y.powi(2)]])
            .unwrap();
        let values = HashMap::from([(s[0].clone(), 2.0), (s[1].clone(), 3.0)]);
        let a = m.evaluate(&values).unwrap();

        assert_relative_eq!(a[(0, 0)], 2.0);
        assert_relative_eq!(a[(1, 0)], 6.0);
        assert_relative_eq!(a[(0, 1)], 1.0);
        assert_relative_eq!(a[(1, 1)], 9.0);
    }

    #[test]
    fn matrix_vector_product() {
        let s = symbols("u1 u2");
        let u: Vec<Expr> = s.iter().map(Expr::sym).collect();

        let g = SymMatrix::from_columns(2, &[vec![Expr::one(), Expr::zero()], vec![Expr::zero(), Expr::num(2.0)]])
            .unwrap();

        assert_eq!(g.mul_vector(&u).unwrap(), vec![u[0].clone(), 2.0 * &u[1]]);
    }
}

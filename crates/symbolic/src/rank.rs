use ndarray::Array2;

/// Numeric rank by Gaussian elimination with full pivoting.
///
/// A pivot counts when its magnitude exceeds
/// `rel_tol * max|a_ij| * max(nrows, ncols)`. A zero matrix, or one with no
/// rows or columns, has rank zero. Non-finite entries are the caller's concern;
/// a `NaN` pivot never counts.
#[must_use]
pub fn numeric_rank(matrix: &Array2<f64>, rel_tol: f64) -> usize {
    let (nrows, ncols) = matrix.dim();
    if nrows == 0 || ncols == 0 {
        return 0;
    }

    let mut a = matrix.clone();
    let scale = a.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return 0;
    }
    #[allow(clippy::cast_precision_loss)]
    let threshold = rel_tol * scale * nrows.max(ncols) as f64;

    let mut rank = 0;
    while rank < nrows.min(ncols) {
        let (mut pivot_row, mut pivot_col, mut pivot_abs) = (rank, rank, 0.0);
        for i in rank..nrows {
            for j in rank..ncols {
                let v = a[(i, j)].abs();
                if v > pivot_abs {
                    (pivot_row, pivot_col, pivot_abs) = (i, j, v);
                }
            }
        }
        if pivot_abs <= threshold {
            break;
        }

        swap_rows(&mut a, rank, pivot_row);
        swap_cols(&mut a, rank, pivot_col);

        let pivot = a[(rank, rank)];
        for i in rank + 1..nrows {
            let factor = a[(i, rank)] / pivot;
            if factor == 0.0 {
                continue;
            }
            for j in rank..ncols {
                a[(i, j)] -= factor * a[(rank, j)];
            }
        }
        rank += 1;
    }
    rank
}

fn swap_rows(a: &mut Array2<f64>, r1: usize, r2: usize) {
    if r1 != r2 {
        for j in 0..a.ncols() {
            a.swap((r1, j), (r2, j));
        }
    }
}

fn swap_cols(a: &mut Array2<f64>, c1: usize, c2: usize) {
    if c1 != c2 {
        for i in 0..a.nrows() {
            a.swap((i, c1), (i, c2));
        }
    }
}

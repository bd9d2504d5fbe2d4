//! Direct solution of the KKT system.
//!
//! The assembled KKT matrix is symmetric indefinite, so Cholesky does not
//! apply. We factorize with faer's sparse LU (symbolic analysis, then numeric
//! factorization with partial pivoting) and treat a failed factorization, any
//! non-finite entry in the solution, or a residual far above round-off as a
//! singular system.

use super::ops::mat_vec;
use faer::prelude::SpSolver;
use faer::sparse::linalg::solvers::{Lu, SymbolicLu};
use faer::sparse::SparseColMat;
use faer::Mat;
use sprs::CsMat;
use thiserror::Error;

/// Relative residual above which a solve is rejected as numerically singular.
const RESIDUAL_TOLERANCE: f64 = 1e-6;

/// Errors from the sparse linear solve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinearSolveError {
    #[error("Matrix is not square: {0}x{1}")]
    NotSquare(usize, usize),

    #[error("Right-hand side has length {actual}, expected {expected}")]
    RhsLength { expected: usize, actual: usize },

    #[error("Singular matrix: {0}")]
    Singular(String),
}

/// Solve `a · x = b`.
pub fn spsolve(a: &CsMat<f64>, b: &[f64]) -> Result<Vec<f64>, LinearSolveError> {
    let (rows, cols) = a.shape();
    if rows != cols {
        return Err(LinearSolveError::NotSquare(rows, cols));
    }
    if b.len() != rows {
        return Err(LinearSolveError::RhsLength {
            expected: rows,
            actual: b.len(),
        });
    }
    let n = rows;
    if n == 0 {
        return Ok(vec![]);
    }

    // Duplicates were already summed when `a` was built from triplets
    let triplets: Vec<(usize, usize, f64)> =
        a.iter().map(|(&value, (i, j))| (i, j, value)).collect();
    let mat = SparseColMat::<usize, f64>::try_new_from_triplets(n, n, &triplets)
        .map_err(|e| {
            LinearSolveError::Singular(format!("invalid sparsity pattern: {e:?}"))
        })?;

    let mut rhs = Mat::<f64>::zeros(n, 1);
    for (i, &value) in b.iter().enumerate() {
        rhs.write(i, 0, value);
    }

    let symbolic = SymbolicLu::try_new(mat.symbolic())
        .map_err(|e| {
            LinearSolveError::Singular(format!("symbolic factorization failed: {e:?}"))
        })?;
    let lu = Lu::try_new_with_symbolic(symbolic, mat.as_ref())
        .map_err(|e| {
            LinearSolveError::Singular(format!("LU factorization failed: {e:?}"))
        })?;
    let solution = lu.solve(rhs.as_ref());
    let x: Vec<f64> = (0..n).map(|i| solution.read(i, 0)).collect();

    // A zero pivot shows up as inf/NaN in the back substitution
    if let Some(i) = x.iter().position(|v| !v.is_finite()) {
        return Err(LinearSolveError::Singular(format!(
            "non-finite solution entry at index {i}"
        )));
    }

    let residual = relative_residual(a, &x, b);
    if !(residual <= RESIDUAL_TOLERANCE) {
        return Err(LinearSolveError::Singular(format!(
            "relative residual {residual:.3e} exceeds {RESIDUAL_TOLERANCE:.0e}"
        )));
    }

    Ok(x)
}

/// `‖a·x − b‖∞ / (‖a‖∞·‖x‖∞ + ‖b‖∞)`, zero for an all-zero system.
fn relative_residual(a: &CsMat<f64>, x: &[f64], b: &[f64]) -> f64 {
    let ax = mat_vec(a, x);
    let r = ax
        .iter()
        .zip(b)
        .fold(0.0_f64, |acc, (axi, bi)| acc.max((axi - bi).abs()));

    let mut row_sums = vec![0.0; a.rows()];
    for (&value, (i, _)) in a.iter() {
        row_sums[i] += value.abs();
    }
    let a_norm = row_sums.iter().fold(0.0_f64, |acc, v| acc.max(*v));
    let x_norm = x.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
    let b_norm = b.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));

    let scale = a_norm * x_norm + b_norm;
    if scale == 0.0 {
        0.0
    } else {
        r / scale
    }
}

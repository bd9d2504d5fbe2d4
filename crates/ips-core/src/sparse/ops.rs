//! Pure data-transform helpers over `CsMat<f64>`.
//!
//! Every function takes immutable inputs and returns a new matrix or vector.
//! Shapes are validated by the caller (the solver checks every evaluation
//! bundle before it reaches these helpers).

use sprs::{CsMat, TriMat};

/// Build a sparse square diagonal matrix from a dense vector.
///
/// Used for `diag(1/z)` and `diag(mu)`; explicit zeros on the diagonal are
/// kept so the sparsity pattern does not depend on the values.
pub fn diags(v: &[f64]) -> CsMat<f64> {
    let n = v.len();
    let mut triplets = TriMat::with_capacity((n, n), n);
    for (i, &value) in v.iter().enumerate() {
        triplets.add_triplet(i, i, value);
    }
    triplets.to_csc()
}

/// Sum of same-shape sparse matrices.
///
/// # Panics
///
/// Panics if a matrix does not match `shape`.
pub fn sum(shape: (usize, usize), matrices: &[&CsMat<f64>]) -> CsMat<f64> {
    let capacity = matrices.iter().map(|m| m.nnz()).sum();
    let mut triplets = TriMat::with_capacity(shape, capacity);
    for m in matrices {
        assert_eq!(m.shape(), shape, "sparse sum: shape mismatch");
        for (&value, (i, j)) in m.iter() {
            triplets.add_triplet(i, j, value);
        }
    }
    triplets.to_csc()
}

/// Sparse matrix product `a · b`.
///
/// # Panics
///
/// Panics if `a.cols() != b.rows()`.
pub fn mul(a: &CsMat<f64>, b: &CsMat<f64>) -> CsMat<f64> {
    assert_eq!(a.cols(), b.rows(), "sparse product: inner dimension mismatch");
    let a = a.to_csc();
    let b = b.to_csc();
    &a * &b
}

/// Owned transpose in CSC storage.
pub fn transpose(a: &CsMat<f64>) -> CsMat<f64> {
    a.transpose_view().to_owned().to_csc()
}

/// Matrix-vector product `a · x`.
pub fn mat_vec(a: &CsMat<f64>, x: &[f64]) -> Vec<f64> {
    debug_assert_eq!(a.cols(), x.len());
    let mut y = vec![0.0; a.rows()];
    for (&value, (i, j)) in a.iter() {
        y[i] += value * x[j];
    }
    y
}

/// Transposed matrix-vector product `aᵀ · x`, without materializing `aᵀ`.
pub fn mat_t_vec(a: &CsMat<f64>, x: &[f64]) -> Vec<f64> {
    debug_assert_eq!(a.rows(), x.len());
    let mut y = vec![0.0; a.cols()];
    for (&value, (i, j)) in a.iter() {
        y[j] += value * x[i];
    }
    y
}

/// Dense row-major copy, for diagnostics and comparisons.
pub fn to_dense(a: &CsMat<f64>) -> Vec<Vec<f64>> {
    let mut dense = vec![vec![0.0; a.cols()]; a.rows()];
    for (&value, (i, j)) in a.iter() {
        dense[i][j] += value;
    }
    dense
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> CsMat<f64> {
        // [1 0 2]
        // [0 3 0]
        let mut t = TriMat::new((2, 3));
        t.add_triplet(0, 0, 1.0);
        t.add_triplet(0, 2, 2.0);
        t.add_triplet(1, 1, 3.0);
        t.to_csr()
    }

    #[test]
    fn diags_places_values_on_diagonal() {
        let d = diags(&[1.0, 0.5, 4.0]);
        assert_eq!(d.shape(), (3, 3));
        assert_eq!(d.nnz(), 3);
        assert_eq!(d.get(1, 1), Some(&0.5));
        assert_eq!(d.get(0, 1), None);
    }

    #[test]
    fn diags_of_empty_vector_is_empty_matrix() {
        let d = diags(&[]);
        assert_eq!(d.shape(), (0, 0));
        assert_eq!(d.nnz(), 0);
    }

    #[test]
    fn mat_vec_and_transpose_product_agree_with_dense() {
        let a = sample();
        assert_eq!(mat_vec(&a, &[1.0, 1.0, 1.0]), vec![3.0, 3.0]);
        assert_eq!(mat_t_vec(&a, &[1.0, 2.0]), vec![1.0, 6.0, 2.0]);

        let at = transpose(&a);
        assert_eq!(at.shape(), (3, 2));
        assert_eq!(mat_vec(&at, &[1.0, 2.0]), vec![1.0, 6.0, 2.0]);
    }

    #[test]
    fn sum_accumulates_overlapping_entries() {
        let a = sample();
        let s = sum((2, 3), &[&a, &a]);
        assert_eq!(to_dense(&s), vec![vec![2.0, 0.0, 4.0], vec![0.0, 6.0, 0.0]]);
    }

    #[test]
    fn product_with_diagonal_scales_columns() {
        let a = sample();
        let d = diags(&[1.0, 10.0, 100.0]);
        let p = mul(&a, &d);
        assert_eq!(
            to_dense(&p),
            vec![vec![1.0, 0.0, 200.0], vec![0.0, 30.0, 0.0]]
        );
    }
}

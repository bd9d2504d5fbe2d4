//! Saddle-point (KKT) matrix assembly.

use crate::error::{IpsError, IpsResult};
use sprs::{CsMat, TriMat};

/// Pack the reduced Hessian and the equality Jacobian into the KKT matrix
///
/// ```text
/// J = [ M     Gx ]      M:   n_x  × n_x
///     [ Gxᵀ   0  ]      Gx:  n_x  × n_eq
///                       Gxᵀ: n_eq × n_x
/// ```
///
/// The result is `(n_x + n_eq)` square, in CSC storage. The lower-right block
/// is structurally empty. With no equality constraints (`n_eq == 0`) the
/// result is `M` itself.
pub fn pack_3_by_4(m: &CsMat<f64>, gx: &CsMat<f64>, gxt: &CsMat<f64>) -> IpsResult<CsMat<f64>> {
    let n_x = m.rows();
    if m.cols() != n_x {
        return Err(IpsError::DimensionMismatch {
            component: "M",
            expected: (n_x, n_x),
            actual: m.shape(),
        });
    }
    let n_eq = gx.cols();
    if gx.rows() != n_x {
        return Err(IpsError::DimensionMismatch {
            component: "Gx",
            expected: (n_x, n_eq),
            actual: gx.shape(),
        });
    }
    if gxt.shape() != (n_eq, n_x) {
        return Err(IpsError::DimensionMismatch {
            component: "Gx^T",
            expected: (n_eq, n_x),
            actual: gxt.shape(),
        });
    }

    let n = n_x + n_eq;
    let mut triplets = TriMat::with_capacity((n, n), m.nnz() + gx.nnz() + gxt.nnz());

    // Upper-left: M
    for (&value, (i, j)) in m.iter() {
        triplets.add_triplet(i, j, value);
    }
    // Upper-right: Gx
    for (&value, (i, j)) in gx.iter() {
        triplets.add_triplet(i, n_x + j, value);
    }
    // Lower-left: Gxᵀ
    for (&value, (i, j)) in gxt.iter() {
        triplets.add_triplet(n_x + i, j, value);
    }

    Ok(triplets.to_csc())
}

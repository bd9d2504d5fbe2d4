//! # Sparse Linear Algebra for the Interior Point Solver
//!
//! The KKT systems built by the solver inherit the sparsity of the problem
//! Jacobians: for a power network the equality Jacobian has a handful of
//! entries per bus, so a 10,000-bus OPF produces a KKT matrix well below 0.1%
//! density. All matrices are `sprs::CsMat<f64>` built through triplet (COO)
//! accumulation, which sums duplicate entries on conversion.
//!
//! ## Module Organization
//!
//! - [`ops`]: diagonal construction, sums, products, transposes, mat-vec
//! - [`kkt`]: saddle-point block packing (`pack_3_by_4`)
//! - [`solve`]: LU-based solution of the assembled KKT system
//!
//! ## Block Layout
//!
//! ```text
//!            n_x        n_eq
//!        ┌──────────┬─────────┐
//!   n_x  │    M     │   Gx    │
//!        ├──────────┼─────────┤
//!   n_eq │   Gxᵀ    │    0    │
//!        └──────────┴─────────┘
//! ```

pub mod kkt;
pub mod ops;
pub mod solve;

pub use kkt::pack_3_by_4;
pub use ops::{diags, mat_t_vec, mat_vec, mul, sum, to_dense, transpose};
pub use solve::{spsolve, LinearSolveError};

//! # ips-core: Primal-Dual Interior Point Solver
//!
//! Newton-step interior point method for sparse nonlinear programs
//!
//! ```text
//! minimize f(x)   subject to   G(x) = 0,   H(x) ≤ 0
//! ```
//!
//! as used for AC optimal power flow. The problem is supplied through an
//! [`IpsEvaluator`] that returns the objective, the constraint residuals and
//! their sparse first and second derivatives at each iterate.
//!
//! ## Modules
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`solver`] | Iteration loop, [`InteriorPointSolver`], [`IterationObserver`] |
//! | [`evaluator`] | [`EvaluationBundle`], [`IpsEvaluator`], [`ProblemDims`] |
//! | [`step`] | Fraction-to-boundary step length and error measure |
//! | [`sparse`] | Sparse helpers, KKT block assembly, linear solve |
//! | [`derivatives`] | Finite-difference derivative checking |
//! | [`qp`] | [`QuadraticProgram`] evaluator for linearly constrained QPs |
//! | [`options`] | [`IpsOptions`] |
//! | [`solution`] | [`IpsSolution`], [`IpsStatus`], [`IpsSummary`] |
//!
//! ## Example
//!
//! ```
//! use ips_core::{InteriorPointSolver, QuadraticProgram};
//! use sprs::TriMat;
//!
//! // min x0² + x1²  s.t.  x0 + x1 = 1,  x ≥ 0
//! let mut p = TriMat::new((2, 2));
//! p.add_triplet(0, 0, 2.0);
//! p.add_triplet(1, 1, 2.0);
//! let mut a = TriMat::new((1, 2));
//! a.add_triplet(0, 0, 1.0);
//! a.add_triplet(0, 1, 1.0);
//!
//! let qp = QuadraticProgram::new(p.to_csc(), vec![0.0, 0.0])?
//!     .with_equalities(a.to_csr(), vec![1.0])?
//!     .with_bounds(&[0.0, 0.0], &[f64::INFINITY, f64::INFINITY])?;
//!
//! let solution = InteriorPointSolver::new()
//!     .with_max_iterations(50)
//!     .solve(&[0.5, 0.5], qp.dims(), &qp)?;
//!
//! assert!(solution.converged);
//! assert!((solution.x[0] - 0.5).abs() < 1e-4);
//! # Ok::<(), ips_core::IpsError>(())
//! ```

pub mod derivatives;
pub mod error;
pub mod evaluator;
pub mod options;
pub mod qp;
pub mod solution;
pub mod solver;
pub mod sparse;
pub mod step;

pub use derivatives::finite_difference_bundle;
pub use error::{IpsError, IpsResult};
pub use evaluator::{EvaluationBundle, IpsEvaluator, ProblemDims};
pub use options::IpsOptions;
pub use qp::QuadraticProgram;
pub use solution::{IpsSolution, IpsStatus, IpsSummary, INITIAL_ERROR};
pub use solver::{interior_point_solver, InteriorPointSolver, IterationObserver, IterationRecord};
pub use step::{calc_error, split, step_calculation, FRACTION_TO_BOUNDARY};

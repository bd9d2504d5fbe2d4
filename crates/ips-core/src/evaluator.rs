//! Problem evaluation interface.
//!
//! The solver never sees the problem itself, only an [`IpsEvaluator`] that
//! returns an [`EvaluationBundle`] at a given primal-dual point:
//!
//! ```text
//! (x, μ, λ)  ──evaluate──►  f, G, H, ∇f, Gx, Hx, ∇²f, Σλᵢ∇²Gᵢ, Σμᵢ∇²Hᵢ
//! ```
//!
//! Jacobians follow the "variables by constraints" convention: `Gx` is
//! `n_x × n_eq` and `Hx` is `n_x × n_ineq`, i.e. column `i` is `∇Gᵢ`.

use crate::error::{IpsError, IpsResult};
use crate::sparse::ops::to_dense;
use serde::{Deserialize, Serialize};
use sprs::CsMat;
use std::collections::BTreeMap;

/// Number of variables, equality constraints and inequality constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProblemDims {
    pub n_x: usize,
    pub n_eq: usize,
    pub n_ineq: usize,
}

impl ProblemDims {
    pub fn new(n_x: usize, n_eq: usize, n_ineq: usize) -> Self {
        Self { n_x, n_eq, n_ineq }
    }

    /// Size of the KKT system solved each iteration.
    pub fn kkt_size(&self) -> usize {
        self.n_x + self.n_eq
    }
}

/// Objective, constraint residuals and their derivatives at one point.
///
/// A bundle is an immutable snapshot; the solver owns it only for the
/// iteration that requested it (and returns the last one in the solution).
///
/// `extra` carries formulation-specific results (branch flows, bus
/// injections, ...) that the solver never reads but hands back with the
/// final bundle. Formulations without such data use the default `()`.
#[derive(Debug, Clone, PartialEq)]
pub struct EvaluationBundle<X = ()> {
    /// Objective function value
    pub f: f64,
    /// Equality residuals, length `n_eq`
    pub g: Vec<f64>,
    /// Inequality residuals, length `n_ineq`
    pub h: Vec<f64>,
    /// Objective gradient, length `n_x`
    pub fx: Vec<f64>,
    /// Equality Jacobian, `n_x × n_eq`
    pub gx: CsMat<f64>,
    /// Inequality Jacobian, `n_x × n_ineq`
    pub hx: CsMat<f64>,
    /// Objective Hessian, `n_x × n_x`
    pub fxx: CsMat<f64>,
    /// `Σ λᵢ ∇²Gᵢ`, `n_x × n_x`
    pub gxx: CsMat<f64>,
    /// `Σ μᵢ ∇²Hᵢ`, `n_x × n_x`
    pub hxx: CsMat<f64>,
    /// Pass-through payload, untouched by the solver
    pub extra: X,
}

impl<X> EvaluationBundle<X> {
    /// Component names, in bundle order.
    pub fn headers() -> [&'static str; 9] {
        ["f", "G", "H", "fx", "Gx", "Hx", "fxx", "Gxx", "Hxx"]
    }

    /// Replace the pass-through payload.
    pub fn with_extra<Y>(self, extra: Y) -> EvaluationBundle<Y> {
        EvaluationBundle {
            f: self.f,
            g: self.g,
            h: self.h,
            fx: self.fx,
            gx: self.gx,
            hx: self.hx,
            fxx: self.fxx,
            gxx: self.gxx,
            hxx: self.hxx,
            extra,
        }
    }

    /// Check every component against the problem dimensions.
    pub fn validate(&self, dims: &ProblemDims) -> IpsResult<()> {
        let ProblemDims { n_x, n_eq, n_ineq } = *dims;

        check_len("G", self.g.len(), n_eq)?;
        check_len("H", self.h.len(), n_ineq)?;
        check_len("fx", self.fx.len(), n_x)?;
        check_shape("Gx", &self.gx, (n_x, n_eq))?;
        check_shape("Hx", &self.hx, (n_x, n_ineq))?;
        check_shape("fxx", &self.fxx, (n_x, n_x))?;
        check_shape("Gxx", &self.gxx, (n_x, n_x))?;
        check_shape("Hxx", &self.hxx, (n_x, n_x))?;
        Ok(())
    }

    /// Name of the first component holding a NaN or infinite value.
    pub fn first_non_finite(&self) -> Option<&'static str> {
        let components: [(&'static str, &[f64]); 9] = [
            ("f", std::slice::from_ref(&self.f)),
            ("G", &self.g),
            ("H", &self.h),
            ("fx", &self.fx),
            ("Gx", self.gx.data()),
            ("Hx", self.hx.data()),
            ("fxx", self.fxx.data()),
            ("Gxx", self.gxx.data()),
            ("Hxx", self.hxx.data()),
        ];
        components
            .into_iter()
            .find(|(_, values)| values.iter().any(|v| !v.is_finite()))
            .map(|(name, _)| name)
    }

    /// Compare against another bundle, typically a finite-difference one.
    ///
    /// Components are compared with `allclose` semantics
    /// (`|a − b| ≤ 10·h + 1e-5·|b|`); every component that fails is returned
    /// with its largest absolute difference. An empty map means the bundles
    /// agree.
    pub fn compare<Y>(&self, other: &EvaluationBundle<Y>, h: f64) -> BTreeMap<&'static str, f64> {
        let atol = h * 10.0;
        let mut errors = BTreeMap::new();

        let vectors: [(&'static str, &[f64], &[f64]); 4] = [
            ("f", std::slice::from_ref(&self.f), std::slice::from_ref(&other.f)),
            ("G", &self.g, &other.g),
            ("H", &self.h, &other.h),
            ("fx", &self.fx, &other.fx),
        ];
        for (name, a, b) in vectors {
            if let Some(diff) = not_close(a, b, atol) {
                errors.insert(name, diff);
            }
        }

        let matrices = [
            ("Gx", &self.gx, &other.gx),
            ("Hx", &self.hx, &other.hx),
            ("fxx", &self.fxx, &other.fxx),
            ("Gxx", &self.gxx, &other.gxx),
            ("Hxx", &self.hxx, &other.hxx),
        ];
        for (name, a, b) in matrices {
            let diff = if a.shape() != b.shape() {
                Some(f64::INFINITY)
            } else {
                let a: Vec<f64> = to_dense(a).into_iter().flatten().collect();
                let b: Vec<f64> = to_dense(b).into_iter().flatten().collect();
                not_close(&a, &b, atol)
            };
            if let Some(diff) = diff {
                errors.insert(name, diff);
            }
        }

        errors
    }
}

/// Max absolute difference when `a` and `b` are not allclose, else `None`.
fn not_close(a: &[f64], b: &[f64], atol: f64) -> Option<f64> {
    const RTOL: f64 = 1e-5;
    if a.len() != b.len() {
        return Some(f64::INFINITY);
    }
    let ok = a
        .iter()
        .zip(b)
        .all(|(x, y)| (x - y).abs() <= atol + RTOL * y.abs());
    if ok {
        return None;
    }
    Some(
        a.iter()
            .zip(b)
            .fold(0.0_f64, |acc, (x, y)| acc.max((x - y).abs())),
    )
}

fn check_len(component: &'static str, actual: usize, expected: usize) -> IpsResult<()> {
    if actual != expected {
        return Err(IpsError::DimensionMismatch {
            component,
            expected: (expected, 1),
            actual: (actual, 1),
        });
    }
    Ok(())
}

fn check_shape(
    component: &'static str,
    m: &CsMat<f64>,
    expected: (usize, usize),
) -> IpsResult<()> {
    if m.shape() != expected {
        return Err(IpsError::DimensionMismatch {
            component,
            expected,
            actual: m.shape(),
        });
    }
    Ok(())
}

/// Anything that can evaluate the problem at a primal-dual point.
///
/// Evaluation must be pure: identical `(x, mu, lam)` must produce identical
/// bundles. Problem data (admittances, cost curves, ...) is captured by the
/// implementor and is read-only for the duration of a solve.
///
/// Implemented for any `Fn(&[f64], &[f64], &[f64]) -> EvaluationBundle`, so a
/// closure capturing the problem data works directly.
pub trait IpsEvaluator {
    /// Payload carried in [`EvaluationBundle::extra`]
    type Extra;

    fn evaluate(&self, x: &[f64], mu: &[f64], lam: &[f64]) -> EvaluationBundle<Self::Extra>;
}

impl<F, X> IpsEvaluator for F
where
    F: Fn(&[f64], &[f64], &[f64]) -> EvaluationBundle<X>,
{
    type Extra = X;

    fn evaluate(&self, x: &[f64], mu: &[f64], lam: &[f64]) -> EvaluationBundle<X> {
        self(x, mu, lam)
    }
}

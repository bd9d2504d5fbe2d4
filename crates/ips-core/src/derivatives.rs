//! Finite-difference derivative checking.
//!
//! Analytical Jacobians and Hessians are the most common source of silent
//! convergence failures in a problem-formulation layer. This module rebuilds
//! every derivative in an [`EvaluationBundle`] by forward differences of the
//! evaluator itself, so the two can be checked with
//! [`EvaluationBundle::compare`]:
//!
//! ```text
//! fx[j]      ≈ (f(x + h·eⱼ) − f(x)) / h
//! Gx[j, i]   ≈ (Gᵢ(x + h·eⱼ) − Gᵢ(x)) / h
//! fxx[:, j]  ≈ (fx(x + h·eⱼ) − fx(x)) / h
//! Gxx[:, j]  ≈ (Gx(x + h·eⱼ)·λ − Gx(x)·λ) / h
//! Hxx[:, j]  ≈ (Hx(x + h·eⱼ)·μ − Hx(x)·μ) / h
//! ```
//!
//! The truncation error is `O(h)`, which is why `compare` uses `10·h` as its
//! absolute tolerance.

use crate::evaluator::{EvaluationBundle, IpsEvaluator};
use crate::sparse::ops::mat_vec;
use sprs::TriMat;

/// Build a bundle whose derivatives are forward differences of `evaluator`.
///
/// Values (`f`, `G`, `H`) and the `extra` payload are those of the base
/// point. Costs `n_x + 1` evaluations.
pub fn finite_difference_bundle<E>(
    evaluator: &E,
    x: &[f64],
    mu: &[f64],
    lam: &[f64],
    h: f64,
) -> EvaluationBundle<E::Extra>
where
    E: IpsEvaluator + ?Sized,
{
    let base = evaluator.evaluate(x, mu, lam);
    let n_x = x.len();
    let n_eq = base.g.len();
    let n_ineq = base.h.len();

    let base_gx_lam = mat_vec(&base.gx, lam);
    let base_hx_mu = mat_vec(&base.hx, mu);

    let mut fx = vec![0.0; n_x];
    let mut gx = TriMat::new((n_x, n_eq));
    let mut hx = TriMat::new((n_x, n_ineq));
    let mut fxx = TriMat::new((n_x, n_x));
    let mut gxx = TriMat::new((n_x, n_x));
    let mut hxx = TriMat::new((n_x, n_x));

    let mut xp = x.to_vec();
    for j in 0..n_x {
        xp[j] = x[j] + h;
        let pert = evaluator.evaluate(&xp, mu, lam);
        xp[j] = x[j];

        fx[j] = (pert.f - base.f) / h;
        push_column(&mut gx, j, &pert.g, &base.g, h, Axis::Row);
        push_column(&mut hx, j, &pert.h, &base.h, h, Axis::Row);
        push_column(&mut fxx, j, &pert.fx, &base.fx, h, Axis::Col);
        push_column(
            &mut gxx,
            j,
            &mat_vec(&pert.gx, lam),
            &base_gx_lam,
            h,
            Axis::Col,
        );
        push_column(
            &mut hxx,
            j,
            &mat_vec(&pert.hx, mu),
            &base_hx_mu,
            h,
            Axis::Col,
        );
    }

    EvaluationBundle {
        f: base.f,
        g: base.g,
        h: base.h,
        fx,
        gx: gx.to_csc(),
        hx: hx.to_csc(),
        fxx: fxx.to_csc(),
        gxx: gxx.to_csc(),
        hxx: hxx.to_csc(),
        extra: base.extra,
    }
}

/// Where the derivative with respect to `x[j]` lands in the output matrix.
#[derive(Clone, Copy)]
enum Axis {
    /// Row `j` (Jacobians, variables by constraints)
    Row,
    /// Column `j` (Hessians)
    Col,
}

fn push_column(
    triplets: &mut TriMat<f64>,
    j: usize,
    perturbed: &[f64],
    base: &[f64],
    h: f64,
    axis: Axis,
) {
    for (i, (p, b)) in perturbed.iter().zip(base).enumerate() {
        let d = (p - b) / h;
        if d != 0.0 {
            match axis {
                Axis::Row => triplets.add_triplet(j, i, d),
                Axis::Col => triplets.add_triplet(i, j, d),
            }
        }
    }
}

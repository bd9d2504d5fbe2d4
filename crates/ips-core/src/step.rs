//! Step-length and convergence helpers.
//!
//! ## Fraction-to-Boundary Rule
//!
//! Slacks `z` and inequality multipliers `mu` must stay strictly inside the
//! positive orthant. For a Newton increment `dV` the largest admissible step is
//!
//! ```text
//! α_max = min(1, min_{i: dV_i < 0} −V_i / dV_i)
//! α     = min(τ · α_max, 1)        τ = 0.9999995
//! ```
//!
//! so `V + α·dV > 0` whenever `V > 0`.

/// Safety factor applied to the ratio test.
pub const FRACTION_TO_BOUNDARY: f64 = 0.9999995;

/// Maximum step along `dv` that keeps `v` strictly positive.
///
/// Components with `dv[i] >= 0` never restrict the step, so an empty or
/// all-non-negative increment gives the unscaled bound 1.0.
pub fn step_calculation(v: &[f64], dv: &[f64]) -> f64 {
    debug_assert_eq!(v.len(), dv.len());
    let alpha = v
        .iter()
        .zip(dv)
        .filter(|&(_, &d)| d < 0.0)
        .fold(1.0_f64, |alpha, (&vi, &di)| alpha.min(-vi / di));

    (FRACTION_TO_BOUNDARY * alpha).min(1.0)
}

/// Split a vector at `n`: `(sol[..n], sol[n..])`.
pub fn split(sol: &[f64], n: usize) -> (&[f64], &[f64]) {
    sol.split_at(n)
}

/// Max-norm of all Newton increments, the solver's convergence measure.
pub fn calc_error(dx: &[f64], dz: &[f64], dmu: &[f64], dlam: &[f64]) -> f64 {
    [dx, dz, dmu, dlam]
        .iter()
        .flat_map(|arr| arr.iter())
        .fold(0.0_f64, |err, v| err.max(v.abs()))
}

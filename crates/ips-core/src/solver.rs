//! # Primal-Dual Interior Point Solver
//!
//! Newton-step interior point method for nonlinear programs of the form
//!
//! ```text
//! minimize    f(x)
//! subject to  G(x)  = 0        (n_eq equalities, multipliers λ)
//!             H(x) ≤ 0         (n_ineq inequalities, multipliers μ, slacks z)
//! ```
//!
//! following Wang, Murillo-Sánchez, Zimmerman & Thomas (2007). Inequalities
//! are turned into equalities with slacks, `H(x) + z = 0, z > 0`, and the
//! barrier subproblem is solved by one Newton step per barrier update.
//!
//! ## One Iteration
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. Evaluate f, G, H and derivatives at (x, μ, λ)                        │
//! │                                                                          │
//! │  2. Reduced Hessian                                                      │
//! │       M = fxx + Gxx + Hxx + Hx · Z⁻¹ · diag(μ) · Hxᵀ                     │
//! │                                                                          │
//! │  3. Residual                                                             │
//! │       N = fx + Hx·μ + Hx·Z⁻¹·(γ·e + μ⊙H) + Gx·λ                          │
//! │                                                                          │
//! │  4. KKT solve                                                            │
//! │       [ M    Gx ] [ Δx ]     [ N ]                                       │
//! │       [ Gxᵀ  0  ] [ Δλ ] = − [ G ]                                       │
//! │                                                                          │
//! │  5. Slack/multiplier recovery                                            │
//! │       Δz = −H − z − Hxᵀ·Δx                                               │
//! │       Δμ = −μ + Z⁻¹·(γ·e − μ⊙Δz)                                         │
//! │                                                                          │
//! │  6. Fraction-to-boundary steps αp = step(z, Δz), αd = step(μ, Δμ)        │
//! │                                                                          │
//! │  7. x += αp·Δx, z += αp·Δz, λ += αd·Δλ, μ += αd·Δμ                       │
//! │                                                                          │
//! │  8. γ = max(0.1 · μᵀz / n_ineq, tol)                                     │
//! │                                                                          │
//! │  9. error = ‖(Δx, Δz, Δμ, Δλ)‖∞,  converged ⇔ error ≤ γ                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Termination
//!
//! The loop stops when converged or after `max_iterations`. Hitting the limit
//! is reported through `converged == false`, not as an error. A singular KKT
//! matrix aborts the solve with [`IpsError::SingularKkt`], since continuing
//! from a corrupted step would break the positivity of `z` and `μ`.
//!
//! ## Reference
//!
//! - **Wang, Murillo-Sánchez, Zimmerman & Thomas (2007)**: "On Computational
//!   Issues of Market-Based Optimal Power Flow"
//!   IEEE Trans. Power Systems, 22(3), 1185-1193
//!   DOI: [10.1109/TPWRS.2007.901301](https://doi.org/10.1109/TPWRS.2007.901301)

use crate::error::{IpsError, IpsResult};
use crate::evaluator::{EvaluationBundle, IpsEvaluator, ProblemDims};
use crate::options::IpsOptions;
use crate::solution::{IpsSolution, INITIAL_ERROR};
use crate::sparse::{diags, mat_t_vec, mat_vec, mul, pack_3_by_4, spsolve, sum, transpose};
use crate::step::{calc_error, split, step_calculation};
use sprs::{CsMat, TriMat};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};
use web_time::Instant;

/// Barrier reduction factor applied to the average complementarity.
const CENTERING: f64 = 0.1;

// ============================================================================
// ITERATION OBSERVER
// ============================================================================

/// Snapshot handed to an [`IterationObserver`] after every update.
#[derive(Debug, Clone, Copy)]
pub struct IterationRecord<'a> {
    /// 1-based iteration number, the same numbering used by the per-iteration
    /// log lines and by [`IpsError::SingularKkt`] / [`IpsError::NonFiniteIterate`]
    pub iteration: usize,
    pub error: f64,
    pub gamma: f64,
    /// Primal step length
    pub alpha_p: f64,
    /// Dual step length
    pub alpha_d: f64,
    pub x: &'a [f64],
    pub z: &'a [f64],
    pub mu: &'a [f64],
    pub lam: &'a [f64],
}

/// Callback invoked at every iteration boundary.
pub trait IterationObserver {
    fn observe(&mut self, record: &IterationRecord<'_>);
}

impl<F> IterationObserver for F
where
    F: FnMut(&IterationRecord<'_>),
{
    fn observe(&mut self, record: &IterationRecord<'_>) {
        self(record)
    }
}


// ============================================================================
// SOLVER STATE
// ============================================================================

/// Primal-dual iterate, owned by a single solve.
struct IpsState {
    x: Vec<f64>,
    lam: Vec<f64>,
    mu: Vec<f64>,
    z: Vec<f64>,
    gamma: f64,
    error: f64,
    /// diag(1/z)
    z_inv: CsMat<f64>,
    /// diag(μ)
    mu_diag: CsMat<f64>,
}

impl IpsState {
    /// Multipliers and slacks start at 1, the barrier parameter at 1.
    fn new(x0: &[f64], dims: &ProblemDims) -> Self {
        let mut state = Self {
            x: x0.to_vec(),
            lam: vec![1.0; dims.n_eq],
            mu: vec![1.0; dims.n_ineq],
            z: vec![1.0; dims.n_ineq],
            gamma: 1.0,
            error: INITIAL_ERROR,
            z_inv: diags(&[]),
            mu_diag: diags(&[]),
        };
        state.refresh_diagonals();
        state
    }

    fn refresh_diagonals(&mut self) {
        let z_inv: Vec<f64> = self.z.iter().map(|z| 1.0 / z).collect();
        self.z_inv = diags(&z_inv);
        self.mu_diag = diags(&self.mu);
    }

    /// Complementarity μᵀz.
    fn complementarity(&self) -> f64 {
        self.mu.iter().zip(&self.z).map(|(m, z)| m * z).sum()
    }

    fn apply(&mut self, step: &NewtonStep, alpha_p: f64, alpha_d: f64, tol: f64) {
        axpy(&mut self.x, alpha_p, &step.dx);
        axpy(&mut self.z, alpha_p, &step.dz);
        axpy(&mut self.lam, alpha_d, &step.dlam);
        axpy(&mut self.mu, alpha_d, &step.dmu);

        let n_ineq = self.z.len();
        self.gamma = if n_ineq > 0 {
            (CENTERING * self.complementarity() / n_ineq as f64).max(tol)
        } else {
            // No inequalities: nothing to center, the floor drives convergence
            tol
        };

        self.error = calc_error(&step.dx, &step.dz, &step.dmu, &step.dlam);
        self.refresh_diagonals();
    }

    /// z > 0, μ ≥ 0 and everything finite.
    fn check_interior(&self, iteration: usize) -> IpsResult<()> {
        let fail = |message: String| IpsError::NonFiniteIterate { iteration, message };

        if let Some(i) = self.x.iter().position(|v| !v.is_finite()) {
            return Err(fail(format!("x[{i}] = {}", self.x[i])));
        }
        if let Some(i) = self.lam.iter().position(|v| !v.is_finite()) {
            return Err(fail(format!("lam[{i}] = {}", self.lam[i])));
        }
        if let Some(i) = self.z.iter().position(|v| !(v.is_finite() && *v > 0.0)) {
            return Err(fail(format!("slack z[{i}] = {} left the interior", self.z[i])));
        }
        if let Some(i) = self.mu.iter().position(|v| !(v.is_finite() && *v >= 0.0)) {
            return Err(fail(format!("multiplier mu[{i}] = {} is negative", self.mu[i])));
        }
        Ok(())
    }
}

fn axpy(y: &mut [f64], alpha: f64, x: &[f64]) {
    for (yi, xi) in y.iter_mut().zip(x) {
        *yi += alpha * xi;
    }
}

/// Newton increments of one iteration.
struct NewtonStep {
    dx: Vec<f64>,
    dlam: Vec<f64>,
    dz: Vec<f64>,
    dmu: Vec<f64>,
}

/// Assemble and solve the KKT system at the current iterate.
fn newton_step<X>(
    state: &IpsState,
    bundle: &EvaluationBundle<X>,
    dims: &ProblemDims,
    iteration: usize,
) -> IpsResult<NewtonStep> {
    let ProblemDims { n_x, n_ineq, .. } = *dims;

    // ========================================================================
    // REDUCED HESSIAN: M = fxx + Gxx + Hxx + Hx·Z⁻¹·diag(μ)·Hxᵀ
    // ========================================================================

    let hx_zinv = if n_ineq > 0 {
        mul(&bundle.hx, &state.z_inv)
    } else {
        bundle.hx.clone()
    };
    let barrier = if n_ineq > 0 {
        mul(&mul(&hx_zinv, &state.mu_diag), &transpose(&bundle.hx))
    } else {
        TriMat::new((n_x, n_x)).to_csc()
    };
    let m = sum(
        (n_x, n_x),
        &[&bundle.fxx, &bundle.gxx, &bundle.hxx, &barrier],
    );
    let j = pack_3_by_4(&m, &bundle.gx, &transpose(&bundle.gx))?;
    debug_assert_eq!(j.rows(), dims.kkt_size());

    // ========================================================================
    // RESIDUAL: r = −[fx + Hx·μ + Hx·Z⁻¹·(γ·e + μ⊙H) + Gx·λ ; G]
    // ========================================================================

    let hx_mu = mat_vec(&bundle.hx, &state.mu);
    let centered: Vec<f64> = state
        .mu
        .iter()
        .zip(&bundle.h)
        .map(|(mu, h)| state.gamma + mu * h)
        .collect();
    let hx_zinv_centered = mat_vec(&hx_zinv, &centered);
    let gx_lam = mat_vec(&bundle.gx, &state.lam);

    let mut r: Vec<f64> = (0..n_x)
        .map(|i| -(bundle.fx[i] + hx_mu[i] + hx_zinv_centered[i] + gx_lam[i]))
        .collect();
    r.extend(bundle.g.iter().map(|g| -g));

    let sol = spsolve(&j, &r).map_err(|e| IpsError::SingularKkt {
        iteration,
        message: e.to_string(),
    })?;
    let (dx, dlam) = split(&sol, n_x);

    // ========================================================================
    // SLACK AND MULTIPLIER INCREMENTS
    // ========================================================================

    let hxt_dx = mat_t_vec(&bundle.hx, dx);
    let dz: Vec<f64> = (0..n_ineq)
        .map(|i| -bundle.h[i] - state.z[i] - hxt_dx[i])
        .collect();
    let rhs: Vec<f64> = state
        .mu
        .iter()
        .zip(&dz)
        .map(|(mu, dz)| state.gamma - mu * dz)
        .collect();
    let dmu: Vec<f64> = mat_vec(&state.z_inv, &rhs)
        .iter()
        .zip(&state.mu)
        .map(|(v, mu)| v - mu)
        .collect();

    Ok(NewtonStep {
        dx: dx.to_vec(),
        dlam: dlam.to_vec(),
        dz,
        dmu,
    })
}

// ============================================================================
// DRIVER
// ============================================================================

/// Interior point solver front-end.
///
/// ```ignore
/// use ips_core::{InteriorPointSolver, ProblemDims};
///
/// let solution = InteriorPointSolver::new()
///     .with_max_iterations(50)
///     .with_tolerance(1e-8)
///     .solve(&x0, ProblemDims::new(n_x, n_eq, n_ineq), &evaluator)?;
///
/// if solution.converged {
///     println!("f* = {:.6}", solution.objective());
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct InteriorPointSolver {
    options: IpsOptions,
    cancel: Option<Arc<AtomicBool>>,
}

impl InteriorPointSolver {
    /// Create a solver with default options (100 iterations, tol 1e-6, silent)
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all options at once
    pub fn with_options(mut self, options: IpsOptions) -> Self {
        self.options = options;
        self
    }

    /// Set maximum iterations
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.options.max_iterations = max_iter;
        self
    }

    /// Set convergence tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.options.tolerance = tol;
        self
    }

    /// Set verbosity level (0-3)
    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.options.verbose = verbose;
        self
    }

    /// Cooperative cancellation flag, checked between iterations.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn options(&self) -> &IpsOptions {
        &self.options
    }

    /// Solve from `x0`.
    pub fn solve<E>(
        &self,
        x0: &[f64],
        dims: ProblemDims,
        evaluator: &E,
    ) -> IpsResult<IpsSolution<E::Extra>>
    where
        E: IpsEvaluator + ?Sized,
    {
        self.solve_observed(x0, dims, evaluator, &mut |_: &IterationRecord<'_>| {})
    }

    /// Solve from `x0`, reporting every iteration to `observer`.
    pub fn solve_observed<E, O>(
        &self,
        x0: &[f64],
        dims: ProblemDims,
        evaluator: &E,
        observer: &mut O,
    ) -> IpsResult<IpsSolution<E::Extra>>
    where
        E: IpsEvaluator + ?Sized,
        O: IterationObserver + ?Sized,
    {
        let start = Instant::now();
        let opts = &self.options;
        opts.validate()?;
        validate_initial_point(x0, &dims)?;

        let tol = opts.tolerance;
        let max_iter = opts.max_iterations;
        let verbose = opts.verbose;

        let mut state = IpsState::new(x0, &dims);
        let mut error_evolution = Vec::with_capacity(max_iter + 1);
        error_evolution.push(state.error);

        let mut converged = state.error <= state.gamma;
        let mut iter_counter = 0;
        let mut last_bundle = None;

        while !converged && iter_counter < max_iter {
            let iteration = iter_counter + 1;
            if self.is_cancelled() {
                if verbose > 0 {
                    warn!(iterations = iter_counter, "IPS cancelled");
                }
                return Err(IpsError::Cancelled {
                    iterations: iter_counter,
                });
            }

            let bundle = evaluator.evaluate(&state.x, &state.mu, &state.lam);
            bundle.validate(&dims)?;
            if let Some(component) = bundle.first_non_finite() {
                return Err(IpsError::NonFiniteIterate {
                    iteration,
                    message: format!("evaluator returned non-finite {component}"),
                });
            }

            let step = newton_step(&state, &bundle, &dims, iteration)?;
            let alpha_p = step_calculation(&state.z, &step.dz);
            let alpha_d = step_calculation(&state.mu, &step.dmu);

            state.apply(&step, alpha_p, alpha_d, tol);
            state.check_interior(iteration)?;

            converged = state.error <= state.gamma;

            if verbose > 1 {
                info!(
                    iteration,
                    gamma = state.gamma,
                    error = state.error,
                    alpha_p,
                    alpha_d,
                    "IPS iteration"
                );
                if verbose > 2 {
                    log_variables(&state, &step);
                }
            }

            iter_counter = iteration;
            error_evolution.push(state.error);

            observer.observe(&IterationRecord {
                iteration,
                error: state.error,
                gamma: state.gamma,
                alpha_p,
                alpha_d,
                x: &state.x,
                z: &state.z,
                mu: &state.mu,
                lam: &state.lam,
            });

            last_bundle = Some(bundle);
        }

        // With no iterations the record still carries the bundle at x0
        let bundle = match last_bundle {
            Some(bundle) => bundle,
            None => {
                let bundle = evaluator.evaluate(&state.x, &state.mu, &state.lam);
                bundle.validate(&dims)?;
                bundle
            }
        };

        let solve_time_ms = start.elapsed().as_millis();

        if verbose > 0 {
            if !converged {
                warn!(
                    iterations = iter_counter,
                    error = state.error,
                    gamma = state.gamma,
                    "IPS did not converge"
                );
            }
            info!(
                converged,
                iterations = iter_counter,
                objective = bundle.f,
                error = state.error,
                solve_time_ms = solve_time_ms as u64,
                "IPS solution: x = {:?}, lam = {:?}",
                state.x,
                state.lam
            );
        }

        Ok(IpsSolution {
            x: state.x,
            error: state.error,
            gamma: state.gamma,
            lam: state.lam,
            mu: state.mu,
            z: state.z,
            bundle,
            converged,
            iterations: iter_counter,
            error_evolution,
            solve_time_ms,
        })
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }
}

/// Per-variable dump for the highest verbosity level.
fn log_variables(state: &IpsState, step: &NewtonStep) {
    for (i, (x, dx)) in state.x.iter().zip(&step.dx).enumerate() {
        info!(i, x, dx, "x");
    }
    for (i, (lam, dlam)) in state.lam.iter().zip(&step.dlam).enumerate() {
        info!(i, lam, dlam, "eq");
    }
    for (i, ((mu, z), (dmu, dz))) in state
        .mu
        .iter()
        .zip(&state.z)
        .zip(step.dmu.iter().zip(&step.dz))
        .enumerate()
    {
        info!(i, mu, z, dmu, dz, "ineq");
    }
}

fn validate_initial_point(x0: &[f64], dims: &ProblemDims) -> IpsResult<()> {
    if x0.len() != dims.n_x {
        return Err(IpsError::DimensionMismatch {
            component: "x0",
            expected: (dims.n_x, 1),
            actual: (x0.len(), 1),
        });
    }
    if let Some(i) = x0.iter().position(|v| !v.is_finite()) {
        return Err(IpsError::InvalidInitialPoint(format!(
            "x0[{i}] = {} is not finite",
            x0[i]
        )));
    }
    Ok(())
}

/// Solve `min f(x) s.t. G(x) = 0, H(x) ≤ 0` from `x0`.
///
/// Extra problem data travels inside `evaluator` (a closure capture or a
/// struct implementing [`IpsEvaluator`]).
pub fn interior_point_solver<E>(
    x0: &[f64],
    n_x: usize,
    n_eq: usize,
    n_ineq: usize,
    evaluator: &E,
    options: &IpsOptions,
) -> IpsResult<IpsSolution<E::Extra>>
where
    E: IpsEvaluator + ?Sized,
{
    InteriorPointSolver::new()
        .with_options(options.clone())
        .solve(x0, ProblemDims::new(n_x, n_eq, n_ineq), evaluator)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty(rows: usize, cols: usize) -> CsMat<f64> {
        TriMat::new((rows, cols)).to_csc()
    }

    /// min (x − 3)², no constraints
    fn parabola(x: &[f64], _mu: &[f64], _lam: &[f64]) -> EvaluationBundle {
        let mut fxx = TriMat::new((1, 1));
        fxx.add_triplet(0, 0, 2.0);
        EvaluationBundle {
            f: (x[0] - 3.0).powi(2),
            g: vec![],
            h: vec![],
            fx: vec![2.0 * (x[0] - 3.0)],
            gx: empty(1, 0),
            hx: empty(1, 0),
            fxx: fxx.to_csc(),
            gxx: empty(1, 1),
            hxx: empty(1, 1),
            extra: (),
        }
    }

    #[test]
    fn initial_state_is_all_ones() {
        let state = IpsState::new(&[0.0, 0.0], &ProblemDims::new(2, 1, 3));
        assert_eq!(state.lam, vec![1.0]);
        assert_eq!(state.mu, vec![1.0; 3]);
        assert_eq!(state.z, vec![1.0; 3]);
        assert_eq!(state.gamma, 1.0);
        assert_eq!(state.error, INITIAL_ERROR);
        assert_eq!(state.z_inv.shape(), (3, 3));
        assert_eq!(state.complementarity(), 3.0);
    }

    #[test]
    fn gamma_without_inequalities_is_the_tolerance() {
        let mut state = IpsState::new(&[1.0], &ProblemDims::new(1, 0, 0));
        let step = NewtonStep {
            dx: vec![0.5],
            dlam: vec![],
            dz: vec![],
            dmu: vec![],
        };
        state.apply(&step, 1.0, 1.0, 1e-6);
        assert_eq!(state.gamma, 1e-6);
        assert_eq!(state.error, 0.5);
        assert_eq!(state.x, vec![1.5]);
    }

    #[test]
    fn unconstrained_quadratic_takes_one_newton_step() {
        let sol = InteriorPointSolver::new()
            .solve(&[0.0], ProblemDims::new(1, 0, 0), &parabola)
            .unwrap();
        assert!(sol.converged);
        assert!((sol.x[0] - 3.0).abs() < 1e-5);
        assert_eq!(sol.error_trace()[0], INITIAL_ERROR);
    }

    #[test]
    fn zero_iterations_still_reports_a_bundle() {
        let sol = InteriorPointSolver::new()
            .with_max_iterations(0)
            .solve(&[1.0], ProblemDims::new(1, 0, 0), &parabola)
            .unwrap();
        assert!(!sol.converged);
        assert_eq!(sol.iterations, 0);
        assert_eq!(sol.error_evolution, vec![INITIAL_ERROR]);
        assert_eq!(sol.objective(), 4.0);
    }

    #[test]
    fn wrong_initial_point_length_is_rejected() {
        let err = InteriorPointSolver::new()
            .solve(&[0.0, 0.0], ProblemDims::new(1, 0, 0), &parabola)
            .unwrap_err();
        assert!(matches!(
            err,
            IpsError::DimensionMismatch {
                component: "x0",
                ..
            }
        ));

        let err = InteriorPointSolver::new()
            .solve(&[f64::NAN], ProblemDims::new(1, 0, 0), &parabola)
            .unwrap_err();
        assert!(matches!(err, IpsError::InvalidInitialPoint(_)));
    }
}

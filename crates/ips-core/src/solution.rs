//! Solution record returned by the interior point solver.

use crate::evaluator::EvaluationBundle;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Initial value of the error, meaning "not evaluated yet".
pub const INITIAL_ERROR: f64 = 1e20;

/// How the iteration loop terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IpsStatus {
    /// Step error fell below the barrier parameter.
    Converged,
    /// Iteration limit reached first.
    MaxIterations,
}

impl IpsStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, IpsStatus::Converged)
    }
}

impl fmt::Display for IpsStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpsStatus::Converged => write!(f, "converged"),
            IpsStatus::MaxIterations => write!(f, "max_iterations"),
        }
    }
}

/// Final state of an interior point solve.
///
/// `X` is the evaluator's pass-through payload, see [`EvaluationBundle::extra`].
#[derive(Debug, Clone)]
pub struct IpsSolution<X = ()> {
    /// Primal variables
    pub x: Vec<f64>,
    /// Max-norm of the last Newton increments
    pub error: f64,
    /// Final barrier parameter
    pub gamma: f64,
    /// Equality multipliers
    pub lam: Vec<f64>,
    /// Inequality multipliers
    pub mu: Vec<f64>,
    /// Inequality slacks
    pub z: Vec<f64>,
    /// Last evaluation bundle (at the start of the final iteration)
    pub bundle: EvaluationBundle<X>,
    /// Did the solver converge?
    pub converged: bool,
    /// Number of Newton iterations performed
    pub iterations: usize,
    /// `error_evolution[k]` is the error after iteration `k`; entry 0 is [`INITIAL_ERROR`]
    pub error_evolution: Vec<f64>,
    /// Wall-clock solve time in milliseconds
    pub solve_time_ms: u128,
}

impl<X> IpsSolution<X> {
    pub fn status(&self) -> IpsStatus {
        if self.converged {
            IpsStatus::Converged
        } else {
            IpsStatus::MaxIterations
        }
    }

    /// Objective value from the last evaluation bundle.
    pub fn objective(&self) -> f64 {
        self.bundle.f
    }

    /// Error values of the iterations actually performed.
    pub fn error_trace(&self) -> &[f64] {
        let n = (self.iterations + 1).min(self.error_evolution.len());
        &self.error_evolution[..n]
    }

    /// Serializable digest for reporting.
    pub fn summary(&self) -> IpsSummary {
        IpsSummary {
            status: self.status(),
            converged: self.converged,
            iterations: self.iterations,
            objective: self.objective(),
            error: self.error,
            gamma: self.gamma,
            x: self.x.clone(),
            lam: self.lam.clone(),
            mu: self.mu.clone(),
            error_evolution: self.error_trace().to_vec(),
            solve_time_ms: self.solve_time_ms,
        }
    }
}

/// Serializable solver outcome without the sparse derivative matrices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpsSummary {
    pub status: IpsStatus,
    pub converged: bool,
    pub iterations: usize,
    pub objective: f64,
    pub error: f64,
    pub gamma: f64,
    pub x: Vec<f64>,
    pub lam: Vec<f64>,
    pub mu: Vec<f64>,
    pub error_evolution: Vec<f64>,
    pub solve_time_ms: u128,
}

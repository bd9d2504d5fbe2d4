//! Solver configuration.

use crate::error::{IpsError, IpsResult};
use serde::{Deserialize, Serialize};

/// Tuning parameters for the interior point solver.
///
/// Deserializes from partial documents: missing fields take their defaults.
///
/// ```
/// use ips_core::IpsOptions;
///
/// let opts = IpsOptions::default().with_tolerance(1e-8).with_verbose(1);
/// assert_eq!(opts.max_iterations, 100);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IpsOptions {
    /// Maximum Newton iterations before giving up (non-convergence is not an error)
    pub max_iterations: usize,
    /// Convergence tolerance; also the floor of the barrier parameter
    pub tolerance: f64,
    /// Diagnostic output level: 0 silent, 1 summary, 2 per iteration, 3 per variable
    pub verbose: u8,
}

impl Default for IpsOptions {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            tolerance: 1e-6,
            verbose: 0,
        }
    }
}

impl IpsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum iterations
    pub fn with_max_iterations(mut self, max_iter: usize) -> Self {
        self.max_iterations = max_iter;
        self
    }

    /// Set convergence tolerance
    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Set verbosity level
    pub fn with_verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    /// Reject tolerances that would make the barrier floor meaningless.
    pub fn validate(&self) -> IpsResult<()> {
        if !self.tolerance.is_finite() || self.tolerance <= 0.0 {
            return Err(IpsError::InvalidOptions(format!(
                "tolerance must be positive and finite, got {}",
                self.tolerance
            )));
        }
        Ok(())
    }
}

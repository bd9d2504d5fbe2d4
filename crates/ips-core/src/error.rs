//! Error types for the interior point solver.
//!
//! Running out of iterations is *not* an error: the solver returns a solution
//! with `converged == false` and the caller decides whether to retry. The
//! variants below are the conditions under which no usable solution exists.

use thiserror::Error;

/// Errors that abort an interior point solve.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IpsError {
    /// The KKT matrix could not be factorized (singular or numerically degenerate).
    ///
    /// `iteration` is 1-based, matching [`IterationRecord::iteration`](crate::IterationRecord).
    #[error("Singular KKT matrix at iteration {iteration}: {message}")]
    SingularKkt { iteration: usize, message: String },

    /// A matrix or vector handed to the solver has the wrong shape.
    #[error("Dimension mismatch in {component}: expected {expected:?}, got {actual:?}")]
    DimensionMismatch {
        component: &'static str,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// The iterate left the interior or picked up NaN/inf values (1-based `iteration`).
    #[error("Non-finite or infeasible iterate at iteration {iteration}: {message}")]
    NonFiniteIterate { iteration: usize, message: String },

    /// The initial point is unusable (wrong length, NaN/inf entries).
    #[error("Invalid initial point: {0}")]
    InvalidInitialPoint(String),

    /// The problem data is inconsistent (e.g. an empty bound interval).
    #[error("Invalid problem definition: {0}")]
    InvalidProblem(String),

    /// Solver options failed validation.
    #[error("Invalid solver options: {0}")]
    InvalidOptions(String),

    /// The cancellation flag was raised between iterations.
    #[error("Solve cancelled after {iterations} iterations")]
    Cancelled { iterations: usize },
}

impl IpsError {
    /// True for failures caused by the numerics of the problem rather than by
    /// the caller's inputs.
    pub fn is_numerical(&self) -> bool {
        matches!(
            self,
            IpsError::SingularKkt { .. } | IpsError::NonFiniteIterate { .. }
        )
    }
}

/// Result type alias for solver operations.
pub type IpsResult<T> = Result<T, IpsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singular_kkt_is_numerical() {
        let err = IpsError::SingularKkt {
            iteration: 3,
            message: "zero pivot".into(),
        };
        assert!(err.is_numerical());
        assert_eq!(
            err.to_string(),
            "Singular KKT matrix at iteration 3: zero pivot"
        );
    }

    #[test]
    fn contract_violations_are_not_numerical() {
        let err = IpsError::DimensionMismatch {
            component: "Gx",
            expected: (2, 1),
            actual: (1, 2),
        };
        assert!(!err.is_numerical());
        assert!(err.to_string().contains("Gx"));
        assert!(!IpsError::Cancelled { iterations: 4 }.is_numerical());
        assert!(!IpsError::InvalidProblem("xmin > xmax".into()).is_numerical());
    }
}

//! Error paths, cancellation, logging and reporting of the solver.

use ips_core::{
    EvaluationBundle, InteriorPointSolver, IpsError, IpsEvaluator, IpsStatus, IterationRecord,
    ProblemDims, QuadraticProgram,
};
use sprs::{CsMat, TriMat};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

fn empty(rows: usize, cols: usize) -> CsMat<f64> {
    TriMat::new((rows, cols)).to_csc()
}

/// min x1² + x2²  s.t.  x1 + x2 = 1,  x ≥ 0
fn simplex_qp() -> QuadraticProgram {
    let mut p = TriMat::new((2, 2));
    p.add_triplet(0, 0, 2.0);
    p.add_triplet(1, 1, 2.0);
    let mut a = TriMat::new((1, 2));
    a.add_triplet(0, 0, 1.0);
    a.add_triplet(0, 1, 1.0);
    QuadraticProgram::new(p.to_csc(), vec![0.0, 0.0])
        .unwrap()
        .with_equalities(a.to_csr(), vec![1.0])
        .unwrap()
        .with_bounds(&[0.0, 0.0], &[f64::INFINITY, f64::INFINITY])
        .unwrap()
}

/// Linear objective with no curvature: the KKT matrix is all zeros.
fn flat(x: &[f64], _mu: &[f64], _lam: &[f64]) -> EvaluationBundle {
    EvaluationBundle {
        f: x[0],
        g: vec![],
        h: vec![],
        fx: vec![1.0],
        gx: empty(1, 0),
        hx: empty(1, 0),
        fxx: empty(1, 1),
        gxx: empty(1, 1),
        hxx: empty(1, 1),
        extra: (),
    }
}

#[test]
fn singular_kkt_matrix_aborts_the_solve() {
    let err = InteriorPointSolver::new()
        .solve(&[0.0], ProblemDims::new(1, 0, 0), &flat)
        .unwrap_err();

    assert!(
        matches!(err, IpsError::SingularKkt { iteration: 1, .. }),
        "got {err:?}"
    );
    assert!(err.is_numerical());
}

#[test]
fn misshapen_bundle_is_reported_by_component() {
    let evaluator = |x: &[f64], mu: &[f64], lam: &[f64]| {
        let mut bundle = flat(x, mu, lam);
        bundle.fx = vec![1.0, 2.0];
        bundle
    };
    let err = InteriorPointSolver::new()
        .solve(&[0.0], ProblemDims::new(1, 0, 0), &evaluator)
        .unwrap_err();

    assert_eq!(
        err,
        IpsError::DimensionMismatch {
            component: "fx",
            expected: (1, 1),
            actual: (2, 1),
        }
    );
}

#[test]
fn non_finite_evaluation_is_rejected() {
    let evaluator = |x: &[f64], mu: &[f64], lam: &[f64]| {
        let mut bundle = flat(x, mu, lam);
        bundle.f = f64::NAN;
        bundle
    };
    let err = InteriorPointSolver::new()
        .solve(&[0.0], ProblemDims::new(1, 0, 0), &evaluator)
        .unwrap_err();

    match err {
        IpsError::NonFiniteIterate { iteration, message } => {
            assert_eq!(iteration, 1);
            assert!(message.contains('f'), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn failure_iteration_matches_observer_numbering() {
    // Overestimated curvature halves each step for two iterations, then the
    // Hessian vanishes
    let calls = std::cell::Cell::new(0);
    let evaluator = |x: &[f64], mu: &[f64], lam: &[f64]| {
        calls.set(calls.get() + 1);
        let mut bundle = flat(x, mu, lam);
        if calls.get() <= 2 {
            let mut fxx = TriMat::new((1, 1));
            fxx.add_triplet(0, 0, 4.0);
            bundle.fxx = fxx.to_csc();
            bundle.fx = vec![2.0 * (x[0] - 3.0)];
        }
        bundle
    };

    let mut seen = Vec::new();
    let err = InteriorPointSolver::new()
        .with_tolerance(1e-12)
        .solve_observed(
            &[0.0],
            ProblemDims::new(1, 0, 0),
            &evaluator,
            &mut |record: &IterationRecord<'_>| seen.push(record.iteration),
        )
        .unwrap_err();

    assert_eq!(seen, vec![1, 2]);
    assert!(
        matches!(err, IpsError::SingularKkt { iteration: 3, .. }),
        "got {err:?}"
    );
}

#[test]
fn formulation_payload_is_returned_with_the_final_bundle() {
    let qp = simplex_qp();
    // Tag every evaluation with the point it was taken at
    let tagged = |x: &[f64], mu: &[f64], lam: &[f64]| {
        qp.evaluate(x, mu, lam).with_extra(x.to_vec())
    };

    let sol = InteriorPointSolver::new()
        .with_max_iterations(50)
        .solve(&[0.5, 0.5], qp.dims(), &tagged)
        .unwrap();

    assert!(sol.converged);
    assert_eq!(sol.bundle.extra.len(), 2);
    assert!((sol.bundle.extra[0] - 0.5).abs() < 1e-4);
    assert_eq!(sol.bundle.f, qp.evaluate(&sol.bundle.extra, &sol.mu, &sol.lam).f);
}

#[test]
fn invalid_tolerance_is_rejected_before_evaluating() {
    let qp = simplex_qp();
    let err = InteriorPointSolver::new()
        .with_tolerance(0.0)
        .solve(&[0.5, 0.5], qp.dims(), &qp)
        .unwrap_err();
    assert!(matches!(err, IpsError::InvalidOptions(_)));
}

#[test]
fn evaluation_is_deterministic() {
    let qp = simplex_qp();
    let (x, mu, lam) = ([0.3, 0.7], [0.5, 0.25], [1.5]);
    let first = qp.evaluate(&x, &mu, &lam);
    let second = qp.evaluate(&x, &mu, &lam);
    assert_eq!(first, second);
    assert_eq!(first.f.to_bits(), second.f.to_bits());
}

#[test]
fn cancellation_before_the_first_iteration() {
    let qp = simplex_qp();
    let flag = Arc::new(AtomicBool::new(true));
    let err = InteriorPointSolver::new()
        .with_cancel_flag(flag)
        .solve(&[0.5, 0.5], qp.dims(), &qp)
        .unwrap_err();
    assert_eq!(err, IpsError::Cancelled { iterations: 0 });
}

#[test]
fn cancellation_from_an_observer() {
    let qp = simplex_qp();
    let flag = Arc::new(AtomicBool::new(false));
    let solver = InteriorPointSolver::new()
        .with_tolerance(1e-10)
        .with_cancel_flag(Arc::clone(&flag));

    let mut stop_after_two = |record: &IterationRecord<'_>| {
        if record.iteration == 2 {
            flag.store(true, Ordering::Relaxed);
        }
    };
    let err = solver
        .solve_observed(&[0.5, 0.5], qp.dims(), &qp, &mut stop_after_two)
        .unwrap_err();
    assert_eq!(err, IpsError::Cancelled { iterations: 2 });
    assert!(!err.is_numerical());
}

#[test]
fn verbose_logging_does_not_change_the_result() {
    let qp = simplex_qp();
    let quiet = InteriorPointSolver::new()
        .solve(&[0.5, 0.5], qp.dims(), &qp)
        .unwrap();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new("info"))
        .with_test_writer()
        .finish();
    let loud = tracing::subscriber::with_default(subscriber, || {
        InteriorPointSolver::new()
            .with_verbose(3)
            .solve(&[0.5, 0.5], qp.dims(), &qp)
            .unwrap()
    });

    assert_eq!(quiet.iterations, loud.iterations);
    assert_eq!(quiet.x, loud.x);
    assert_eq!(quiet.mu, loud.mu);
    assert_eq!(quiet.lam, loud.lam);
    assert_eq!(quiet.error_evolution, loud.error_evolution);
}

#[test]
fn summary_serializes_to_json() {
    let qp = simplex_qp();
    let sol = InteriorPointSolver::new()
        .solve(&[0.5, 0.5], qp.dims(), &qp)
        .unwrap();
    let summary = sol.summary();
    assert_eq!(summary.status, IpsStatus::Converged);

    let json = serde_json::to_value(&summary).unwrap();
    assert_eq!(json["status"], "converged");
    assert_eq!(json["iterations"], sol.iterations);
    assert_eq!(
        json["error_evolution"].as_array().unwrap().len(),
        sol.iterations + 1
    );
    assert!(json.get("bundle").is_none());
}

//! Quadratic program formulation.
//!
//! ```text
//! minimize    ½·xᵀPx + cᵀx
//! subject to  A·x  = b
//!             C·x ≤ d
//!             xmin ≤ x ≤ xmax
//! ```
//!
//! Finite bounds become extra inequality rows (`xmin − x ≤ 0`,
//! `x − xmax ≤ 0`), so the solver only ever sees `G(x) = 0, H(x) ≤ 0`.
//! All derivatives are constant and are built once.

use crate::error::{IpsError, IpsResult};
use crate::evaluator::{EvaluationBundle, IpsEvaluator, ProblemDims};
use crate::sparse::ops::{mat_vec, transpose};
use sprs::{CsMat, TriMat};

/// Convex (or not) quadratic program with linear constraints.
#[derive(Debug, Clone)]
pub struct QuadraticProgram {
    /// Symmetric Hessian, n × n
    p: CsMat<f64>,
    c: Vec<f64>,
    /// Equality rows, m_eq × n
    a: CsMat<f64>,
    b: Vec<f64>,
    /// Inequality rows, m_in × n
    cmat: CsMat<f64>,
    d: Vec<f64>,
    /// (variable, bound) pairs with finite lower bounds
    lower: Vec<(usize, f64)>,
    /// (variable, bound) pairs with finite upper bounds
    upper: Vec<(usize, f64)>,
}

impl QuadraticProgram {
    /// Unconstrained `½·xᵀPx + cᵀx`. `p` must be square and symmetric.
    pub fn new(p: CsMat<f64>, c: Vec<f64>) -> IpsResult<Self> {
        let n = c.len();
        check("P", p.shape(), (n, n))?;
        Ok(Self {
            p,
            c,
            a: TriMat::new((0, n)).to_csc(),
            b: vec![],
            cmat: TriMat::new((0, n)).to_csc(),
            d: vec![],
            lower: vec![],
            upper: vec![],
        })
    }

    /// Add `A·x = b`.
    pub fn with_equalities(mut self, a: CsMat<f64>, b: Vec<f64>) -> IpsResult<Self> {
        check("A", a.shape(), (b.len(), self.n()))?;
        self.a = a;
        self.b = b;
        Ok(self)
    }

    /// Add `C·x ≤ d`.
    pub fn with_inequalities(mut self, cmat: CsMat<f64>, d: Vec<f64>) -> IpsResult<Self> {
        check("C", cmat.shape(), (d.len(), self.n()))?;
        self.cmat = cmat;
        self.d = d;
        Ok(self)
    }

    /// Add variable bounds; infinite entries mean "unbounded".
    pub fn with_bounds(mut self, xmin: &[f64], xmax: &[f64]) -> IpsResult<Self> {
        let n = self.n();
        check("xmin", (xmin.len(), 1), (n, 1))?;
        check("xmax", (xmax.len(), 1), (n, 1))?;
        if let Some(i) = (0..n).find(|&i| xmin[i] > xmax[i]) {
            return Err(IpsError::InvalidProblem(format!(
                "empty bound interval for x[{i}]: [{}, {}]",
                xmin[i], xmax[i]
            )));
        }
        self.lower = finite_entries(xmin);
        self.upper = finite_entries(xmax);
        Ok(self)
    }

    /// Number of variables.
    pub fn n(&self) -> usize {
        self.c.len()
    }

    pub fn dims(&self) -> ProblemDims {
        ProblemDims::new(
            self.n(),
            self.b.len(),
            self.d.len() + self.lower.len() + self.upper.len(),
        )
    }

    /// Objective value at `x`.
    pub fn objective(&self, x: &[f64]) -> f64 {
        let px = mat_vec(&self.p, x);
        x.iter()
            .zip(&px)
            .zip(&self.c)
            .map(|((xi, pxi), ci)| 0.5 * xi * pxi + ci * xi)
            .sum()
    }

    /// `n × n_ineq` inequality Jacobian: `Cᵀ` then `−eᵢ` and `+eᵢ` columns.
    fn inequality_jacobian(&self) -> CsMat<f64> {
        let n = self.n();
        let m_in = self.d.len();
        let dims = self.dims();
        let mut triplets = TriMat::new((n, dims.n_ineq));
        for (&value, (row, col)) in self.cmat.iter() {
            triplets.add_triplet(col, row, value);
        }
        for (k, &(i, _)) in self.lower.iter().enumerate() {
            triplets.add_triplet(i, m_in + k, -1.0);
        }
        let offset = m_in + self.lower.len();
        for (k, &(i, _)) in self.upper.iter().enumerate() {
            triplets.add_triplet(i, offset + k, 1.0);
        }
        triplets.to_csc()
    }
}

impl IpsEvaluator for QuadraticProgram {
    type Extra = ();

    fn evaluate(&self, x: &[f64], _mu: &[f64], _lam: &[f64]) -> EvaluationBundle {
        let n = self.n();

        let px = mat_vec(&self.p, x);
        let fx: Vec<f64> = px.iter().zip(&self.c).map(|(p, c)| p + c).collect();

        let g: Vec<f64> = mat_vec(&self.a, x)
            .iter()
            .zip(&self.b)
            .map(|(ax, b)| ax - b)
            .collect();

        let mut h: Vec<f64> = mat_vec(&self.cmat, x)
            .iter()
            .zip(&self.d)
            .map(|(cx, d)| cx - d)
            .collect();
        h.extend(self.lower.iter().map(|&(i, lo)| lo - x[i]));
        h.extend(self.upper.iter().map(|&(i, hi)| x[i] - hi));

        EvaluationBundle {
            f: self.objective(x),
            g,
            h,
            fx,
            gx: transpose(&self.a),
            hx: self.inequality_jacobian(),
            fxx: self.p.clone(),
            gxx: TriMat::new((n, n)).to_csc(),
            hxx: TriMat::new((n, n)).to_csc(),
            extra: (),
        }
    }
}

fn finite_entries(v: &[f64]) -> Vec<(usize, f64)> {
    v.iter()
        .enumerate()
        .filter(|(_, b)| b.is_finite())
        .map(|(i, &b)| (i, b))
        .collect()
}

fn check(component: &'static str, actual: (usize, usize), expected: (usize, usize)) -> IpsResult<()> {
    if actual != expected {
        return Err(IpsError::DimensionMismatch {
            component,
            expected,
            actual,
        });
    }
    Ok(())
}

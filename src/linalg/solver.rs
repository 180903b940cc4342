//! Linear solvers for the assembled Newton system.
//!
//! The residual assembly only needs "solve A·x = b"; the solver is a
//! pluggable collaborator behind [`LinearSolver`].

use faer::{Mat, linalg::solvers::Solve};
use serde::{Deserialize, Serialize};

use super::{BlockCsrMatrix, BlockVector, LinearSystemError};
use crate::types::JacBlock;

/// Residual above which a direct solve is reported as singular.
const SINGULAR_TOL: f64 = 1e-8;

/// Outcome of a successful solve.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LinearSolveStats {
    /// Iterations performed (1 for direct solvers)
    pub iterations: usize,
    /// Final residual norm relative to ‖b‖
    pub residual: f64,
}

/// Black-box linear solver.
pub trait LinearSolver: Send + Sync {
    /// Solve `matrix · sol = rhs`; `sol` holds the initial guess on entry.
    fn solve(
        &self,
        matrix: &BlockCsrMatrix,
        rhs: &BlockVector,
        sol: &mut BlockVector,
    ) -> Result<LinearSolveStats, LinearSystemError>;

    /// Name for logging.
    fn name(&self) -> &'static str;
}

fn check_dims(matrix: &BlockCsrMatrix, rhs: &BlockVector, sol: &BlockVector) -> Result<usize, LinearSystemError> {
    let size = matrix.n_block_rows() * matrix.n_var();
    for len in [rhs.len(), sol.len()] {
        if len != size {
            return Err(LinearSystemError::DimensionMismatch {
                expected: size,
                found: len,
            });
        }
    }
    Ok(size)
}

// =============================================================================
// Direct solver
// =============================================================================

/// Full-pivot LU on a dense copy. Meant for small systems and tests.
#[derive(Clone, Copy, Debug, Default)]
pub struct DenseLuSolver;

impl LinearSolver for DenseLuSolver {
    fn solve(
        &self,
        matrix: &BlockCsrMatrix,
        rhs: &BlockVector,
        sol: &mut BlockVector,
    ) -> Result<LinearSolveStats, LinearSystemError> {
        let size = check_dims(matrix, rhs, sol)?;
        let n_var = matrix.n_var();

        let dense = matrix.to_dense();
        let lu = dense.as_ref().full_piv_lu();
        let b = Mat::from_fn(size, 1, |r, _| rhs.as_slice()[r]);
        let x = lu.solve(&b);

        for (r, out) in sol.as_mut_slice().iter_mut().enumerate() {
            let value = x[(r, 0)];
            if !value.is_finite() {
                return Err(LinearSystemError::Singular { block_row: r / n_var });
            }
            *out = value;
        }

        let mut ax = vec![0.0; size];
        matrix.matvec(sol.as_slice(), &mut ax);
        let bnorm = rhs.norm();
        let diff: Vec<f64> = ax.iter().zip(rhs.as_slice()).map(|(a, b)| a - b).collect();
        let rnorm = norm(&diff);
        let residual = if bnorm > 0.0 { rnorm / bnorm } else { rnorm };

        if residual > SINGULAR_TOL {
            let worst = diff
                .iter()
                .enumerate()
                .fold((0, 0.0), |acc, (r, d)| if d.abs() > acc.1 { (r, d.abs()) } else { acc })
                .0;
            return Err(LinearSystemError::Singular {
                block_row: worst / n_var,
            });
        }

        Ok(LinearSolveStats {
            iterations: 1,
            residual,
        })
    }

    fn name(&self) -> &'static str {
        "dense_lu"
    }
}

// =============================================================================
// Iterative solver
// =============================================================================

/// Right-preconditioned BiCGSTAB with a block-Jacobi preconditioner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BiCgStabSolver {
    /// Relative residual tolerance
    pub tolerance: f64,
    /// Iteration limit
    pub max_iterations: usize,
}

impl Default for BiCgStabSolver {
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 500,
        }
    }
}

/// Inverse of a dense `nVar × nVar` block.
///
/// `block_row` only labels the error.
pub fn invert_block(block: &JacBlock, block_row: usize) -> Result<JacBlock, LinearSystemError> {
    let n = block.size();
    let a = Mat::from_fn(n, n, |r, c| block[(r, c)]);
    let identity = Mat::from_fn(n, n, |r, c| if r == c { 1.0 } else { 0.0 });
    let inv = a.as_ref().full_piv_lu().solve(&identity);

    // A·A⁻¹ must reproduce the identity
    let mut out = JacBlock::zeros(n);
    for r in 0..n {
        for c in 0..n {
            let product: f64 = (0..n).map(|k| block[(r, k)] * inv[(k, c)]).sum();
            let target = if r == c { 1.0 } else { 0.0 };
            if !product.is_finite() || (product - target).abs() > SINGULAR_TOL {
                return Err(LinearSystemError::Singular { block_row });
            }
            out[(r, c)] = inv[(r, c)];
        }
    }
    Ok(out)
}

/// Inverted diagonal blocks, row-major.
struct BlockJacobi {
    n_var: usize,
    inverses: Vec<f64>,
}

impl BlockJacobi {
    fn new(matrix: &BlockCsrMatrix) -> Result<Self, LinearSystemError> {
        let n = matrix.n_var();
        let mut inverses = Vec::with_capacity(matrix.n_block_rows() * n * n);
        for row in 0..matrix.n_block_rows() {
            let inv = invert_block(&matrix.get_block(row, row)?, row)?;
            inverses.extend(inv.to_row_major());
        }
        Ok(Self { n_var: n, inverses })
    }

    fn apply(&self, x: &[f64], y: &mut [f64]) {
        let n = self.n_var;
        let nn = n * n;
        for (row, (xs, ys)) in x.chunks_exact(n).zip(y.chunks_exact_mut(n)).enumerate() {
            let inv = &self.inverses[row * nn..(row + 1) * nn];
            for r in 0..n {
                ys[r] = (0..n).map(|c| inv[r * n + c] * xs[c]).sum();
            }
        }
    }
}

#[inline]
fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[inline]
fn norm(a: &[f64]) -> f64 {
    dot(a, a).sqrt()
}

impl LinearSolver for BiCgStabSolver {
    fn solve(
        &self,
        matrix: &BlockCsrMatrix,
        rhs: &BlockVector,
        sol: &mut BlockVector,
    ) -> Result<LinearSolveStats, LinearSystemError> {
        let size = check_dims(matrix, rhs, sol)?;
        let b = rhs.as_slice();
        let bnorm = norm(b);
        if bnorm == 0.0 {
            sol.set_zero();
            return Ok(LinearSolveStats {
                iterations: 0,
                residual: 0.0,
            });
        }

        let precond = BlockJacobi::new(matrix)?;
        let x = sol.as_mut_slice();

        let mut r = vec![0.0; size];
        matrix.matvec(x, &mut r);
        for (ri, bi) in r.iter_mut().zip(b) {
            *ri = bi - *ri;
        }
        let r_hat = r.clone();

        let mut p = vec![0.0; size];
        let mut v = vec![0.0; size];
        let mut p_hat = vec![0.0; size];
        let mut s = vec![0.0; size];
        let mut s_hat = vec![0.0; size];
        let mut t = vec![0.0; size];

        let (mut rho, mut alpha, mut omega) = (1.0, 1.0, 1.0);
        let mut residual = norm(&r) / bnorm;
        if residual <= self.tolerance {
            return Ok(LinearSolveStats {
                iterations: 0,
                residual,
            });
        }

        for iter in 1..=self.max_iterations {
            let rho_new = dot(&r_hat, &r);
            if rho_new == 0.0 {
                break;
            }
            let beta = (rho_new / rho) * (alpha / omega);
            for k in 0..size {
                p[k] = r[k] + beta * (p[k] - omega * v[k]);
            }
            precond.apply(&p, &mut p_hat);
            matrix.matvec(&p_hat, &mut v);

            let denom = dot(&r_hat, &v);
            if denom == 0.0 {
                break;
            }
            alpha = rho_new / denom;
            for k in 0..size {
                s[k] = r[k] - alpha * v[k];
            }

            residual = norm(&s) / bnorm;
            if residual <= self.tolerance {
                for k in 0..size {
                    x[k] += alpha * p_hat[k];
                }
                return Ok(LinearSolveStats {
                    iterations: iter,
                    residual,
                });
            }

            precond.apply(&s, &mut s_hat);
            matrix.matvec(&s_hat, &mut t);
            let tt = dot(&t, &t);
            omega = if tt > 0.0 { dot(&t, &s) / tt } else { 0.0 };

            for k in 0..size {
                x[k] += alpha * p_hat[k] + omega * s_hat[k];
                r[k] = s[k] - omega * t[k];
            }

            residual = norm(&r) / bnorm;
            if residual <= self.tolerance {
                return Ok(LinearSolveStats {
                    iterations: iter,
                    residual,
                });
            }
            if omega == 0.0 {
                break;
            }
            rho = rho_new;
        }

        Err(LinearSystemError::NotConverged {
            iterations: self.max_iterations,
            residual,
        })
    }

    fn name(&self) -> &'static str {
        "bicgstab"
    }
}

//! Block-sparse linear algebra for the implicit update.
//!
//! - [`BlockCsrMatrix`]: Jacobian storage with a mesh-derived pattern
//! - [`BlockVector`]: residual and increment storage
//! - [`LinearSolver`]: black-box "solve A·x = b" with a direct and an
//!   iterative implementation

mod block_matrix;
mod block_vector;
mod solver;

use thiserror::Error;

pub use block_matrix::BlockCsrMatrix;
pub use block_vector::BlockVector;
pub use solver::{BiCgStabSolver, DenseLuSolver, LinearSolveStats, LinearSolver, invert_block};

/// Errors from matrix access and linear solves.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LinearSystemError {
    /// Block outside the sparsity pattern
    #[error("block ({row}, {col}) is not in the sparsity pattern")]
    MissingEntry { row: usize, col: usize },

    /// Singular (block) matrix
    #[error("singular matrix at block row {block_row}")]
    Singular { block_row: usize },

    /// Iterative solver stopped without reaching the tolerance
    #[error("linear solver did not converge after {iterations} iterations (residual {residual:.3e})")]
    NotConverged { iterations: usize, residual: f64 },

    /// Vector length does not match the matrix
    #[error("dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },
}

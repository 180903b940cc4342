//! Crate-level error type.
//!
//! Degenerate geometry (coincident points, tiny normal components) and the
//! axisymmetric axis are handled by defined fallbacks inside the operators and
//! never surface here. What does surface is inconsistent input and failures of
//! the external collaborators (linear solver, restart files, configuration).

use thiserror::Error;

use crate::config::ConfigError;
use crate::io::RestartError;
use crate::linalg::LinearSystemError;

/// Error type for solver setup and iteration.
#[derive(Debug, Error)]
pub enum SolverError {
    /// Spatial dimension outside {2, 3}.
    #[error("Unsupported spatial dimension: {0} (expected 2 or 3)")]
    UnsupportedDimension(usize),

    /// A per-point array does not have the expected length.
    #[error("Length mismatch for {what}: expected {expected}, found {found}")]
    LengthMismatch {
        /// Which array
        what: &'static str,
        /// Expected length
        expected: usize,
        /// Actual length
        found: usize,
    },

    /// An edge or boundary vertex references a point that does not exist.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// A boundary marker in the mesh has no configuration entry.
    #[error("No boundary condition configured for marker '{0}'")]
    UnconfiguredMarker(String),

    /// A feature was requested that is incompatible with the setup.
    #[error("Unsupported setup: {0}")]
    Unsupported(String),

    /// The residual became non-finite.
    #[error("Residual diverged at iteration {iteration}")]
    Diverged {
        /// Iteration at which the residual stopped being finite
        iteration: usize,
    },

    /// Configuration problem.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Linear system assembly or solve failure.
    #[error(transparent)]
    LinearSystem(#[from] LinearSystemError),

    /// Restart file problem.
    #[error(transparent)]
    Restart(#[from] RestartError),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, SolverError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SolverError::LengthMismatch {
            what: "volumes",
            expected: 4,
            found: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("volumes"));
        assert!(msg.contains('4'));
    }

    #[test]
    fn test_from_linear_system_error() {
        let err: SolverError = LinearSystemError::Singular { block_row: 2 }.into();
        assert!(matches!(err, SolverError::LinearSystem(_)));
    }
}

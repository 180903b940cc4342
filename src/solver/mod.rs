//! Flow solver components.
//!
//! # Submodules
//!
//! - [`flow_state`]: Primitive variables, gradients and solution history
//! - [`assembler`]: Edge, source and boundary residual assembly
//! - [`diagnostics`]: Residual norms and convergence history

pub mod assembler;
pub mod diagnostics;
pub mod flow_state;

pub use assembler::{ResidualAssembler, SchemeSetup};
pub use diagnostics::{ConvergenceHistory, ResidualNorms};
pub use flow_state::FlowState;

//! Strongly-typed domain types for safer APIs.
//!
//! Index newtypes for mesh entities plus the small fixed-size blocks
//! (residual vector, Jacobian block, gradient) that flow between the edge
//! operators and the global containers.

mod blocks;
mod indices;

pub use blocks::{GradientBlock, JacBlock, MAX_DIM, MAX_VAR, VarBlock};
pub use indices::{MarkerIndex, PointIndex};

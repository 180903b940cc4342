//! Edge operators.
//!
//! Each operator turns the two endpoint states of a dual-mesh edge into a
//! local residual and Jacobian blocks:
//! - Convective: [`UpwindFds`], [`CenteredJst`], [`CenteredLax`]
//! - Viscous: [`AvgGrad`], [`AvgGradCorrected`]
//!
//! # Operator Trait
//!
//! The [`EdgeOperator`] trait is the seam between the schemes and the
//! assembler. [`StandardEdgeOperator`] is the closed enum selected from
//! configuration and dispatched by `match` in the edge loop.

mod centered_jst;
mod centered_lax;
mod mean_state;
pub mod traits;
mod upwind_fds;
mod viscous;

pub use centered_jst::CenteredJst;
pub use centered_lax::CenteredLax;
pub use upwind_fds::UpwindFds;
pub use viscous::{AvgGrad, AvgGradCorrected};

pub use traits::{
    DissipationCoefficients, DissipationInputs, EdgeContext, EdgeOperator, EdgeOperatorKind,
    EdgeResidual, OperatorConfig, StandardEdgeOperator,
};

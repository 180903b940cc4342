//! Time integration.
//!
//! - [`time_step`]: local and global step selection
//! - [`euler`]: explicit and implicit pseudo-time updates
//! - [`dual_time`]: physical time derivative of dual time stepping
//! - [`marching`]: iteration drivers

pub mod dual_time;
pub mod euler;
pub mod marching;
pub mod time_step;

pub use dual_time::DualTime;
pub use euler::{ExplicitEuler, ImplicitEuler, PseudoTimeIntegrator};
pub use marching::{MarchingControl, run_steady, run_unsteady};
pub use time_step::{LocalTimeStep, TimeConfig, TimeMarching, TimeStepKind};

use crate::equations::{FluidModel, incompressible::preconditioner};
use crate::solver::FlowState;
use crate::types::JacBlock;

/// Γ of one point for a given β².
///
/// `β² = ∞` gives the conservative time-derivative matrix
/// `∂(ρ, ρu, ρ·Cp·T)/∂(p, u, T)`.
pub(crate) fn point_matrix(
    state: &FlowState,
    point: usize,
    variable_density: bool,
    beta2: f64,
    out: &mut JacBlock,
) {
    let layout = state.layout();
    let v = state.primitive(point);
    let temperature = v[layout.temperature()];
    let d_rho_d_t = if variable_density && temperature > 0.0 {
        state.fluid().evaluate(temperature).d_rho_d_t
    } else {
        0.0
    };
    preconditioner(
        v[layout.density()],
        layout.velocity_slice(v),
        beta2,
        v[layout.cp()],
        temperature,
        d_rho_d_t,
        out,
    );
}

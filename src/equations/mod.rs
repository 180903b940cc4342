//! Governing equations of incompressible flow.
//!
//! - [`fluid_model`]: temperature → density / heat capacity maps
//! - [`primitive`]: layout of the per-point primitive vector
//! - [`incompressible`]: projected flux, preconditioner and Jacobian kernels
//!   shared by every edge operator
//! - [`transport`]: viscosity and thermal conductivity

pub mod fluid_model;
pub mod incompressible;
pub mod primitive;
pub mod transport;

pub use fluid_model::{ConstantDensity, FluidModel, FluidState, IncIdealGas, StandardFluidModel};
pub use incompressible::{EPS, STANDARD_GRAVITY, ViscousProperties};
pub use primitive::{PrimitiveBuilder, PrimitiveLayout};
pub use transport::{ConductivityModel, TransportModel};

//! Point source terms.
//!
//! - [`BodyForce`]: prescribed body force with hydrostatic reference density
//! - [`Boussinesq`]: buoyancy linear in the temperature deviation
//! - [`Axisymmetric`]: 1/r terms of the meridional-plane equations
//!
//! [`StandardSource`] is the closed enum resolved at setup.

mod axisymmetric;
mod body_force;
mod boussinesq;
pub mod traits;

pub use axisymmetric::{AXIS_TOLERANCE, Axisymmetric};
pub use body_force::BodyForce;
pub use boussinesq::Boussinesq;
pub use traits::{PointSource, SourceContext, SourceResidual, StandardSource};

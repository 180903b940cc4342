//! Mesh-level operators feeding the edge loop.
//!
//! This module provides:
//! - Point gradients (Green–Gauss, weighted least squares)
//! - Undivided Laplacian and pressure sensor for centered dissipation
//! - Inviscid and viscous spectral radii for stretching and time steps

mod dissipation;
mod gradient;
mod spectral_radius;

pub use dissipation::{pressure_sensor, undivided_laplacian};
pub use gradient::{GradientMethod, compute_gradients, green_gauss, least_squares};
pub use spectral_radius::{inviscid_spectral_radius, viscous_spectral_radius};

//! Shared preliminaries of the convective operators.

use crate::equations::PrimitiveLayout;
use crate::types::MAX_DIM;

/// Quantities of one endpoint state read by the convective operators.
#[derive(Clone, Copy, Debug)]
pub(crate) struct PointState {
    pub pressure: f64,
    pub velocity: [f64; MAX_DIM],
    pub temperature: f64,
    pub density: f64,
    pub beta2: f64,
    pub cp: f64,
    pub enthalpy: f64,
    pub d_rho_d_t: f64,
}

impl PointState {
    #[inline]
    pub fn from_primitive(layout: PrimitiveLayout, v: &[f64], variable_density: bool) -> Self {
        let mut velocity = [0.0; MAX_DIM];
        velocity[..layout.n_dim()].copy_from_slice(layout.velocity_slice(v));
        let temperature = v[layout.temperature()];
        let density = v[layout.density()];
        let cp = v[layout.cp()];
        Self {
            pressure: v[layout.pressure()],
            velocity,
            temperature,
            density,
            beta2: v[layout.beta2()],
            cp,
            enthalpy: cp * temperature,
            d_rho_d_t: if variable_density {
                -density / temperature
            } else {
                0.0
            },
        }
    }

    #[inline]
    pub fn projected_velocity(&self, normal: &[f64]) -> f64 {
        self.velocity.iter().zip(normal).map(|(u, n)| u * n).sum()
    }
}

/// Arithmetic mean of two endpoint states.
#[derive(Clone, Copy, Debug)]
pub(crate) struct MeanState {
    pub pressure: f64,
    pub velocity: [f64; MAX_DIM],
    pub temperature: f64,
    pub density: f64,
    pub beta2: f64,
    pub cp: f64,
    pub enthalpy: f64,
    pub d_rho_d_t: f64,
}

impl MeanState {
    #[inline]
    pub fn new(a: &PointState, b: &PointState, variable_density: bool) -> Self {
        let mut velocity = [0.0; MAX_DIM];
        for (d, v) in velocity.iter_mut().enumerate() {
            *v = 0.5 * (a.velocity[d] + b.velocity[d]);
        }
        let density = 0.5 * (a.density + b.density);
        let temperature = 0.5 * (a.temperature + b.temperature);
        Self {
            pressure: 0.5 * (a.pressure + b.pressure),
            velocity,
            temperature,
            density,
            beta2: 0.5 * (a.beta2 + b.beta2),
            cp: 0.5 * (a.cp + b.cp),
            enthalpy: 0.5 * (a.enthalpy + b.enthalpy),
            d_rho_d_t: if variable_density {
                -density / temperature
            } else {
                0.0
            },
        }
    }

    #[inline]
    pub fn projected_velocity(&self, normal: &[f64]) -> f64 {
        self.velocity.iter().zip(normal).map(|(u, n)| u * n).sum()
    }
}

/// Stretching factor and mean spectral radius of the centered schemes.
///
/// `Local_Λ = |u·n| + sqrt(β²·A²)` per side, `MeanΛ` their average and
/// `SF = 4 Φ_i Φ_j / (Φ_i + Φ_j)` with `Φ = (λ / (4 MeanΛ))^0.3`.
/// Non-positive point spectral radii give `SF = 1`.
#[inline]
pub(crate) fn stretching(
    a: &PointState,
    b: &PointState,
    normal: &[f64],
    area: f64,
    lambda: (f64, f64),
) -> (f64, f64) {
    const PARAM_P: f64 = 0.3;

    let local_i = a.projected_velocity(normal).abs() + (a.beta2 * area * area).sqrt();
    let local_j = b.projected_velocity(normal).abs() + (b.beta2 * area * area).sqrt();
    let mean_lambda = 0.5 * (local_i + local_j);

    let (lambda_i, lambda_j) = lambda;
    if lambda_i <= 0.0 || lambda_j <= 0.0 || mean_lambda <= 0.0 {
        return (1.0, mean_lambda);
    }
    let phi_i = (lambda_i / (4.0 * mean_lambda)).powf(PARAM_P);
    let phi_j = (lambda_j / (4.0 * mean_lambda)).powf(PARAM_P);
    (4.0 * phi_i * phi_j / (phi_i + phi_j), mean_lambda)
}

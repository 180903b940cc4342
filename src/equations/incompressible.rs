//! Flux and Jacobian kernels of the preconditioned incompressible system.
//!
//! All kernels work on primitive variables (p, u, T) with an area-weighted
//! normal `n` unless stated otherwise. With `U = u·n` and `h = Cp·T`:
//!
//! ```text
//! F·n = [ ρU,  ρu_k U + p n_k,  ρ h U ]
//! ```
//!
//! The artificial-compressibility preconditioner Γ relates time derivatives
//! of the primitive variables to the conservative residual:
//!
//! ```text
//!       | 1/β²         0     0                 |
//! Γ  =  | u/β²         ρI    u ∂ρ/∂T           |
//!       | Cp T/β²      0     Cp (∂ρ/∂T T + ρ)  |
//! ```
//!
//! (the continuity row also carries ∂ρ/∂T in its temperature column).
//!
//! The viscous kernels follow the Stokes hypothesis with the full stress
//! tensor `τ = μ (∇u + ∇uᵀ) − ⅔ μ (∇·u) I − ⅔ ρ k I`.

use crate::types::{GradientBlock, JacBlock, MAX_DIM, VarBlock};

/// Threshold used for near-zero geometric quantities.
pub const EPS: f64 = 1e-16;

/// Standard gravity (m/s²).
pub const STANDARD_GRAVITY: f64 = 9.80665;

const TWO3: f64 = 2.0 / 3.0;

/// Face area and unit normal of an area-weighted normal.
///
/// When `clamp` is set, unit-normal components with magnitude below [`EPS`]
/// are replaced by `EPS`.
#[inline]
pub fn area_and_unit_normal(normal: &[f64], clamp: bool) -> (f64, [f64; MAX_DIM]) {
    let area = normal.iter().map(|n| n * n).sum::<f64>().sqrt();
    let mut unit = [0.0; MAX_DIM];
    if area > 0.0 {
        for (u, n) in unit.iter_mut().zip(normal) {
            *u = n / area;
            if clamp && u.abs() < EPS {
                *u = EPS;
            }
        }
    }
    (area, unit)
}

/// Projected inviscid flux `F·n`.
///
/// # Arguments
/// * `density` - ρ
/// * `velocity` - velocity components (length nDim)
/// * `pressure` - p
/// * `enthalpy` - h = Cp·T
/// * `normal` - area-weighted normal
/// * `out` - flux, length nDim + 2
#[inline]
pub fn inviscid_proj_flux(
    density: f64,
    velocity: &[f64],
    pressure: f64,
    enthalpy: f64,
    normal: &[f64],
    out: &mut VarBlock,
) {
    let n_dim = velocity.len();
    let proj_vel: f64 = velocity.iter().zip(normal).map(|(u, n)| u * n).sum();
    let mass = density * proj_vel;

    out[0] = mass;
    for k in 0..n_dim {
        out[1 + k] = mass * velocity[k] + pressure * normal[k];
    }
    out[n_dim + 1] = mass * enthalpy;
}

/// Jacobian of [`inviscid_proj_flux`] with respect to (p, u, T), times `scale`.
///
/// `d_rho_d_t` carries the density dependence on temperature (zero for
/// constant density).
#[inline]
#[allow(clippy::too_many_arguments)]
pub fn inviscid_proj_jac(
    density: f64,
    velocity: &[f64],
    cp: f64,
    temperature: f64,
    d_rho_d_t: f64,
    normal: &[f64],
    scale: f64,
    out: &mut JacBlock,
) {
    let n_dim = velocity.len();
    let t_row = n_dim + 1;
    let proj_vel: f64 = velocity.iter().zip(normal).map(|(u, n)| u * n).sum();

    out.set_zero();

    // Continuity
    for l in 0..n_dim {
        out[(0, 1 + l)] = scale * density * normal[l];
    }
    out[(0, t_row)] = scale * d_rho_d_t * proj_vel;

    // Momentum
    for k in 0..n_dim {
        out[(1 + k, 0)] = scale * normal[k];
        for l in 0..n_dim {
            let delta = if k == l { proj_vel } else { 0.0 };
            out[(1 + k, 1 + l)] = scale * density * (velocity[k] * normal[l] + delta);
        }
        out[(1 + k, t_row)] = scale * d_rho_d_t * velocity[k] * proj_vel;
    }

    // Energy
    for l in 0..n_dim {
        out[(t_row, 1 + l)] = scale * cp * density * temperature * normal[l];
    }
    out[(t_row, t_row)] = scale * cp * (d_rho_d_t * temperature + density) * proj_vel;
}

/// Artificial-compressibility preconditioner Γ.
#[inline]
pub fn preconditioner(
    density: f64,
    velocity: &[f64],
    beta2: f64,
    cp: f64,
    temperature: f64,
    d_rho_d_t: f64,
    out: &mut JacBlock,
) {
    let n_dim = velocity.len();
    let t_row = n_dim + 1;

    out.set_zero();

    out[(0, 0)] = 1.0 / beta2;
    out[(0, t_row)] = d_rho_d_t;

    for k in 0..n_dim {
        out[(1 + k, 0)] = velocity[k] / beta2;
        out[(1 + k, 1 + k)] = density;
        out[(1 + k, t_row)] = velocity[k] * d_rho_d_t;
    }

    out[(t_row, 0)] = cp * temperature / beta2;
    out[(t_row, t_row)] = cp * (d_rho_d_t * temperature + density);
}

/// Time-derivative transformation `∂(ρ, ρu, ρ·Cp·T)/∂(p, u, T)`.
///
/// This is Γ in the limit β² → ∞ and is used for the physical time
/// derivative of dual time stepping.
#[inline]
pub fn time_derivative_matrix(
    density: f64,
    velocity: &[f64],
    cp: f64,
    temperature: f64,
    d_rho_d_t: f64,
    out: &mut JacBlock,
) {
    preconditioner(density, velocity, f64::INFINITY, cp, temperature, d_rho_d_t, out);
}

/// Eigenvalue magnitudes of the preconditioned system.
///
/// Returns `(|U|, |U − c|, |U + c|)` where `U` is the velocity projected on
/// the area-weighted normal and `c = sqrt(β²·A²)`.
#[inline]
pub fn preconditioned_eigenvalues(proj_vel: f64, sound_speed: f64) -> (f64, f64, f64) {
    (
        proj_vel.abs(),
        (proj_vel - sound_speed).abs(),
        (proj_vel + sound_speed).abs(),
    )
}

/// Absolute preconditioned Jacobian `P·|Λ|·P⁻¹`.
///
/// The convective (`|U|`) eigenvalue acts on the tangential velocity
/// components and on temperature; the acoustic pair `|U ∓ c|` couples
/// pressure with the normal velocity through `β·ρ`.
///
/// # Arguments
/// * `density` - mean ρ
/// * `eigenvalues` - `(|U|, |U − c|, |U + c|)`
/// * `beta2` - mean β²
/// * `unit_normal` - unit face normal
/// * `out` - result, size nDim + 2
#[inline]
pub fn preconditioned_abs_jac(
    density: f64,
    eigenvalues: (f64, f64, f64),
    beta2: f64,
    unit_normal: &[f64],
    out: &mut JacBlock,
) {
    let n_dim = unit_normal.len();
    let t_row = n_dim + 1;
    let (l0, lm, lp) = eigenvalues;
    let beta = beta2.sqrt();
    let sum = 0.5 * (lp + lm);
    let diff = 0.5 * (lp - lm);

    out.set_zero();

    out[(0, 0)] = sum;
    for k in 0..n_dim {
        out[(0, 1 + k)] = beta * density * diff * unit_normal[k];
        out[(1 + k, 0)] = diff * unit_normal[k] / (beta * density);
        for l in 0..n_dim {
            let nn = unit_normal[k] * unit_normal[l];
            let delta = if k == l { 1.0 } else { 0.0 };
            out[(1 + k, 1 + l)] = l0 * (delta - nn) + sum * nn;
        }
    }
    out[(t_row, t_row)] = l0;
}

/// Transport properties entering the viscous flux.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ViscousProperties {
    /// Laminar viscosity
    pub laminar_viscosity: f64,
    /// Eddy viscosity
    pub eddy_viscosity: f64,
    /// Turbulent kinetic energy
    pub turb_ke: f64,
    /// Thermal conductivity
    pub conductivity: f64,
}

impl ViscousProperties {
    /// μ + μₜ.
    #[inline]
    pub fn total_viscosity(&self) -> f64 {
        self.laminar_viscosity + self.eddy_viscosity
    }
}

/// Stress tensor `τ[i][j]` from the velocity gradients (rows `1..=nDim` of `grad`).
#[inline]
pub fn stress_tensor(
    n_dim: usize,
    grad: &GradientBlock,
    density: f64,
    props: &ViscousProperties,
) -> [[f64; MAX_DIM]; MAX_DIM] {
    let mu = props.total_viscosity();
    let div_vel: f64 = (0..n_dim).map(|d| grad[1 + d][d]).sum();
    let mut tau = [[0.0; MAX_DIM]; MAX_DIM];
    for i in 0..n_dim {
        for j in 0..n_dim {
            tau[i][j] = mu * (grad[1 + j][i] + grad[1 + i][j]);
        }
        tau[i][i] -= TWO3 * (mu * div_vel + density * props.turb_ke);
    }
    tau
}

/// Projected viscous flux `F_v·n` evaluated from mean gradients.
///
/// Row 0 (continuity) is zero; momentum rows are `τ·n`; the energy row is
/// `k ∇T·n`.
#[inline]
pub fn viscous_proj_flux(
    n_dim: usize,
    density: f64,
    grad: &GradientBlock,
    normal: &[f64],
    props: &ViscousProperties,
    out: &mut VarBlock,
) {
    let tau = stress_tensor(n_dim, grad, density, props);
    let t_row = n_dim + 1;

    out.set_zero();
    for k in 0..n_dim {
        out[1 + k] = (0..n_dim).map(|d| tau[d][k] * normal[d]).sum();
    }
    out[t_row] = props.conductivity * (0..n_dim).map(|d| grad[t_row][d] * normal[d]).sum::<f64>();
}

/// Thin-shear-layer Jacobians of the viscous momentum flux.
///
/// Fills the momentum block of `jac_i` and sets `jac_j = −jac_i`. The energy
/// row is left for the caller.
pub fn viscous_proj_jacs(
    props: &ViscousProperties,
    dist: f64,
    unit_normal: &[f64],
    area: f64,
    jac_i: &mut JacBlock,
    jac_j: &mut JacBlock,
) {
    let n_dim = unit_normal.len();
    let factor = props.total_viscosity() / dist * area;
    let theta: f64 = unit_normal.iter().map(|n| n * n).sum();

    jac_i.set_zero();
    jac_j.set_zero();

    for k in 0..n_dim {
        for l in 0..n_dim {
            let delta = if k == l { theta } else { 0.0 };
            let value = -factor * (delta + unit_normal[k] * unit_normal[l] / 3.0);
            jac_i[(1 + k, 1 + l)] = value;
            jac_j[(1 + k, 1 + l)] = -value;
        }
    }
}

//! Local and global time step selection.
//!
//! Per point, from the integrated spectral radii Λ of the assembler:
//!
//! ```text
//! dt_inv  = CFL · Vol / Λ_inv
//! dt_visc = CFL · 0.25 · Vol² / Λ_visc
//! ```
//!
//! The selected value is clamped to `max_dt`. Time-accurate runs use the
//! global minimum (or the fixed unsteady step) everywhere, and explicit dual
//! time stepping limits the pseudo step to `2/3 · Δt_phys`.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::mesh::DualMesh;
use crate::parallel::HaloExchange;

/// Viscous stability constant.
const K_VISCOUS: f64 = 0.25;

/// Which spectral radius limits the local step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeStepKind {
    /// `min(dt_inv, dt_visc)`
    #[default]
    Minimum,
    /// `dt_inv` only
    Convective,
    /// `dt_visc` only
    Viscous,
}

/// Outer time marching strategy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeMarching {
    /// Pseudo-time marching to a steady state with local steps
    #[default]
    Steady,
    /// Time-accurate marching with one global step
    TimeStepping,
    /// Dual time stepping, first-order backward difference
    DualTime1st,
    /// Dual time stepping, second-order backward difference
    DualTime2nd,
}

impl TimeMarching {
    /// True for the dual time variants.
    pub fn is_dual_time(self) -> bool {
        matches!(self, Self::DualTime1st | Self::DualTime2nd)
    }

    /// True for any unsteady variant.
    pub fn is_unsteady(self) -> bool {
        self != Self::Steady
    }
}

/// Time stepping parameters.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeConfig {
    /// Courant number
    #[serde(default = "default_cfl")]
    pub cfl: f64,
    /// Upper bound on any local step
    #[serde(default = "default_max_dt")]
    pub max_dt: f64,
    /// Limiting radius
    #[serde(default)]
    pub kind: TimeStepKind,
    /// Marching strategy
    #[serde(default)]
    pub marching: TimeMarching,
    /// Physical step for unsteady runs; zero selects the CFL-based global step
    #[serde(default)]
    pub unsteady_dt: f64,
}

fn default_cfl() -> f64 {
    10.0
}

fn default_max_dt() -> f64 {
    1e6
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            cfl: default_cfl(),
            max_dt: default_max_dt(),
            kind: TimeStepKind::default(),
            marching: TimeMarching::default(),
            unsteady_dt: 0.0,
        }
    }
}

/// Per-point time steps.
#[derive(Clone, Debug, Default)]
pub struct LocalTimeStep {
    dt: Vec<f64>,
    min_dt: f64,
    max_dt: f64,
}

impl LocalTimeStep {
    /// Zeroed steps for `n_point` points.
    pub fn new(n_point: usize) -> Self {
        Self {
            dt: vec![0.0; n_point],
            min_dt: 0.0,
            max_dt: 0.0,
        }
    }

    /// Step of every point.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.dt
    }

    /// Step of one point.
    #[inline]
    pub fn get(&self, point: usize) -> f64 {
        self.dt[point]
    }

    /// Smallest owned step of the last update.
    pub fn min(&self) -> f64 {
        self.min_dt
    }

    /// Largest owned step of the last update.
    pub fn max(&self) -> f64 {
        self.max_dt
    }

    /// Recompute the steps.
    ///
    /// # Arguments
    /// * `mesh` - Dual mesh (volumes, ownership)
    /// * `lambda_inv` - Integrated inviscid spectral radius per point
    /// * `lambda_visc` - Integrated viscous spectral radius, `None` when inviscid
    /// * `config` - CFL, clamp and marching strategy
    /// * `implicit` - Whether the pseudo-time update is implicit
    /// * `halo` - Collectives for the global minimum
    pub fn compute(
        &mut self,
        mesh: &DualMesh,
        lambda_inv: &[f64],
        lambda_visc: Option<&[f64]>,
        config: &TimeConfig,
        implicit: bool,
        halo: &dyn HaloExchange,
    ) {
        self.dt.resize(mesh.n_point(), 0.0);

        let mut degenerate = 0usize;
        for p in 0..mesh.n_point() {
            let vol = mesh.volume(p);
            if vol <= 0.0 {
                self.dt[p] = 0.0;
                degenerate += 1;
                continue;
            }

            let dt_inv = if lambda_inv[p] > 0.0 {
                config.cfl * vol / lambda_inv[p]
            } else {
                config.max_dt
            };
            let dt_visc = match lambda_visc {
                Some(l) if l[p] > 0.0 => config.cfl * K_VISCOUS * vol * vol / l[p],
                _ => config.max_dt,
            };
            let dt = match config.kind {
                TimeStepKind::Minimum => dt_inv.min(dt_visc),
                TimeStepKind::Convective => dt_inv,
                TimeStepKind::Viscous => dt_visc,
            };
            self.dt[p] = dt.min(config.max_dt);
        }
        if degenerate > 0 {
            warn!(points = degenerate, "zero-volume points, local time step set to zero");
        }

        let (local_min, local_max) = (0..mesh.n_point())
            .filter(|&p| mesh.is_domain(p) && mesh.volume(p) > 0.0)
            .map(|p| self.dt[p])
            .fold((f64::INFINITY, 0.0_f64), |(lo, hi), dt| (lo.min(dt), hi.max(dt)));
        self.min_dt = halo.min_reduce(local_min);
        self.max_dt = halo.max_reduce(local_max);
        if !self.min_dt.is_finite() {
            self.min_dt = 0.0;
        }

        match config.marching {
            TimeMarching::Steady => {}
            TimeMarching::TimeStepping => {
                let global = if config.unsteady_dt > 0.0 {
                    config.unsteady_dt
                } else {
                    self.min_dt
                };
                for (p, dt) in self.dt.iter_mut().enumerate() {
                    if mesh.volume(p) > 0.0 {
                        *dt = global;
                    }
                }
                self.min_dt = global;
                self.max_dt = global;
            }
            TimeMarching::DualTime1st | TimeMarching::DualTime2nd => {
                if !implicit && config.unsteady_dt > 0.0 {
                    let limit = 2.0 / 3.0 * config.unsteady_dt;
                    for dt in &mut self.dt {
                        *dt = dt.min(limit);
                    }
                    self.min_dt = self.min_dt.min(limit);
                    self.max_dt = self.max_dt.min(limit);
                }
            }
        }

        debug!(min_dt = self.min_dt, max_dt = self.max_dt, "local time step");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parallel::SerialHalo;

    const TOL: f64 = 1e-12;

    fn mesh() -> DualMesh {
        DualMesh::periodic_rectangle(4, 4, 1.0, 1.0).unwrap()
    }

    #[test]
    fn test_convective_and_viscous_steps() {
        let mesh = mesh();
        let vol = mesh.volume(0);
        let lambda_inv = vec![2.0; 16];
        let lambda_visc = vec![1e-3; 16];
        let config = TimeConfig {
            cfl: 0.5,
            ..TimeConfig::default()
        };

        let mut dt = LocalTimeStep::new(16);
        dt.compute(&mesh, &lambda_inv, Some(&lambda_visc), &config, true, &SerialHalo);
        let dt_inv = 0.5 * vol / 2.0;
        let dt_visc = 0.5 * 0.25 * vol * vol / 1e-3;
        assert!((dt.get(3) - dt_inv.min(dt_visc)).abs() < TOL);

        let viscous = TimeConfig {
            kind: TimeStepKind::Viscous,
            ..config
        };
        dt.compute(&mesh, &lambda_inv, Some(&lambda_visc), &viscous, true, &SerialHalo);
        assert!((dt.get(3) - dt_visc).abs() < TOL);
    }

    #[test]
    fn test_clamped_to_max_dt() {
        let mesh = mesh();
        let config = TimeConfig {
            cfl: 1e9,
            max_dt: 0.1,
            ..TimeConfig::default()
        };
        let mut dt = LocalTimeStep::new(16);
        dt.compute(&mesh, &[1.0; 16], None, &config, true, &SerialHalo);
        assert!(dt.as_slice().iter().all(|&d| d == 0.1));
    }

    #[test]
    fn test_time_accurate_uses_global_minimum() {
        let mesh = mesh();
        let mut lambda = vec![1.0; 16];
        lambda[5] = 10.0;
        let config = TimeConfig {
            cfl: 1.0,
            marching: TimeMarching::TimeStepping,
            ..TimeConfig::default()
        };
        let mut dt = LocalTimeStep::new(16);
        dt.compute(&mesh, &lambda, None, &config, false, &SerialHalo);
        let expected = mesh.volume(5) / 10.0;
        assert!(dt.as_slice().iter().all(|&d| (d - expected).abs() < TOL));
        assert!((dt.min() - dt.max()).abs() < TOL);
    }

    #[test]
    fn test_explicit_dual_time_limit() {
        let mesh = mesh();
        let config = TimeConfig {
            cfl: 100.0,
            marching: TimeMarching::DualTime2nd,
            unsteady_dt: 0.03,
            ..TimeConfig::default()
        };
        let mut dt = LocalTimeStep::new(16);
        dt.compute(&mesh, &[1e-3; 16], None, &config, false, &SerialHalo);
        assert!(dt.as_slice().iter().all(|&d| (d - 0.02).abs() < TOL));

        dt.compute(&mesh, &[1e-3; 16], None, &config, true, &SerialHalo);
        assert!(dt.get(0) > 0.02);
    }
}

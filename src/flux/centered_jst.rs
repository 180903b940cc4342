//! Jameson–Schmidt–Turkel centered scheme.
//!
//! The central flux at the mean state plus blended second/fourth-order
//! artificial dissipation:
//!
//! ```text
//! R = F(V̄)·n + Γ̄ (ε₂ (V_i − V_j) − ε₄ (L_i − L_j)) · SF · Λ̄
//! ```
//!
//! with `L` the undivided Laplacian of the solved variables, `ε₂` driven by
//! the pressure sensor and `ε₄ = max(0, κ⁽⁴⁾ − ε₂)`. Both coefficients are
//! scaled by the neighbor-count factors `sc₂ = 3(N_i + N_j)/(N_i N_j)` and
//! `sc₄ = sc₂²/4`.
//!
//! The Jacobians freeze the dissipation coefficients and linearize the
//! Laplacian through its diagonal contribution `(N + 1)`.

use super::mean_state::{MeanState, PointState, stretching};
use super::traits::{EdgeContext, EdgeOperator, EdgeResidual, OperatorConfig};
use crate::equations::incompressible::{
    area_and_unit_normal, inviscid_proj_flux, inviscid_proj_jac, preconditioner,
};
use crate::types::{JacBlock, VarBlock};

/// JST operator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CenteredJst {
    config: OperatorConfig,
    kappa_2nd: f64,
    kappa_4th: f64,
}

impl CenteredJst {
    /// Create the operator with second- and fourth-order coefficients.
    pub fn new(config: OperatorConfig, kappa_2nd: f64, kappa_4th: f64) -> Self {
        Self {
            config,
            kappa_2nd,
            kappa_4th,
        }
    }
}

impl EdgeOperator for CenteredJst {
    fn compute(&self, ctx: &EdgeContext<'_>, out: &mut EdgeResidual) {
        let cfg = &self.config;
        let layout = cfg.layout();
        let n_dim = cfg.n_dim;
        let n_var = cfg.n_var();
        let normal = &ctx.normal[..n_dim];
        let diss = &ctx.dissipation;

        out.reset();

        let (area, _) = area_and_unit_normal(normal, false);
        let si = PointState::from_primitive(layout, ctx.v_i, cfg.variable_density);
        let sj = PointState::from_primitive(layout, ctx.v_j, cfg.variable_density);
        let mean = MeanState::new(&si, &sj, cfg.variable_density);

        let mut flux = VarBlock::zeros(n_var);
        inviscid_proj_flux(
            mean.density,
            &mean.velocity[..n_dim],
            mean.pressure,
            mean.enthalpy,
            normal,
            &mut flux,
        );

        if cfg.implicit {
            inviscid_proj_jac(
                mean.density,
                &mean.velocity[..n_dim],
                mean.cp,
                mean.temperature,
                mean.d_rho_d_t,
                normal,
                0.5,
                &mut out.jac_i,
            );
            out.jac_j = out.jac_i;
        }

        let mut precon = JacBlock::zeros(n_var);
        preconditioner(
            mean.density,
            &mean.velocity[..n_dim],
            mean.beta2,
            mean.cp,
            mean.temperature,
            mean.d_rho_d_t,
            &mut precon,
        );

        let (sf, mean_lambda) = stretching(&si, &sj, normal, area, diss.lambda);

        let (n_i, n_j) = (diss.neighbors.0.max(1) as f64, diss.neighbors.1.max(1) as f64);
        let sc2 = 3.0 * (n_i + n_j) / (n_i * n_j);
        let sc4 = 0.25 * sc2 * sc2;

        let eps_2 = self.kappa_2nd * 0.5 * (diss.sensor.0 + diss.sensor.1) * sc2;
        let eps_4 = (self.kappa_4th - eps_2).max(0.0) * sc4;

        // ε₂ ΔV − ε₄ ΔL
        let mut blend = VarBlock::zeros(n_var);
        for k in 0..n_var {
            let diff_v = ctx.v_i[k] - ctx.v_j[k];
            let lapl_i = diss.und_lapl.0.map_or(0.0, |l| l[k]);
            let lapl_j = diss.und_lapl.1.map_or(0.0, |l| l[k]);
            blend[k] = (eps_2 * diff_v - eps_4 * (lapl_i - lapl_j)) * sf * mean_lambda;
        }
        let damping = precon.matvec(&blend);

        for k in 0..n_var {
            out.residual[k] = flux[k] + damping[k];
        }

        if cfg.implicit {
            let cte_i = (eps_2 + eps_4 * (n_i + 1.0)) * sf * mean_lambda;
            let cte_j = (eps_2 + eps_4 * (n_j + 1.0)) * sf * mean_lambda;
            out.jac_i.axpy(cte_i, &precon);
            out.jac_j.axpy(-cte_j, &precon);
        }

        if !cfg.energy {
            out.decouple_energy(cfg.energy_index());
        }
    }

    fn name(&self) -> &'static str {
        "centered_jst"
    }

    fn config(&self) -> &OperatorConfig {
        &self.config
    }

    fn needs_laplacian(&self) -> bool {
        true
    }

    fn needs_spectral_radius(&self) -> bool {
        true
    }
}

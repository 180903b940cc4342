//! Lax–Friedrichs centered scheme.
//!
//! Central flux at the mean state plus first-order scalar dissipation
//! `Γ̄ ε₀ (V_i − V_j) SF Λ̄` with `ε₀ = κ · 3(N_i + N_j)/(N_i N_j) · nDim/3`.

use super::mean_state::{MeanState, PointState, stretching};
use super::traits::{EdgeContext, EdgeOperator, EdgeResidual, OperatorConfig};
use crate::equations::incompressible::{
    area_and_unit_normal, inviscid_proj_flux, inviscid_proj_jac, preconditioner,
};
use crate::types::{JacBlock, VarBlock};

/// Lax operator.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CenteredLax {
    config: OperatorConfig,
    kappa: f64,
}

impl CenteredLax {
    /// Create the operator with first-order coefficient `kappa`.
    pub fn new(config: OperatorConfig, kappa: f64) -> Self {
        Self { config, kappa }
    }
}

impl EdgeOperator for CenteredLax {
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
        let sc0 = 3.0 * (n_i + n_j) / (n_i * n_j);
        let eps_0 = self.kappa * sc0 * n_dim as f64 / 3.0;
        let cte = eps_0 * sf * mean_lambda;

        let mut diff_v = VarBlock::zeros(n_var);
        for k in 0..n_var {
            diff_v[k] = cte * (ctx.v_i[k] - ctx.v_j[k]);
        }
        let damping = precon.matvec(&diff_v);

        for k in 0..n_var {
            out.residual[k] = flux[k] + damping[k];
        }

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
            out.jac_i.axpy(cte, &precon);
            out.jac_j.axpy(-cte, &precon);
        }

        if !cfg.energy {
            out.decouple_energy(cfg.energy_index());
        }
    }

    fn name(&self) -> &'static str {
        "centered_lax"
    }

    fn config(&self) -> &OperatorConfig {
        &self.config
    }

    fn needs_spectral_radius(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equations::{PrimitiveBuilder, PrimitiveLayout};

    fn state(p: f64, u: f64) -> Vec<f64> {
        PrimitiveBuilder::new(PrimitiveLayout::new(2).unwrap())
            .pressure(p)
            .velocity(&[u, 0.0])
            .temperature(1.0)
            .density(1.0)
            .beta2(4.0)
            .heat_capacity(1.0, 1.0)
            .build()
    }

    #[test]
    fn test_pressure_dissipation() {
        // At rest with p_i − p_j = 1: ε₀ = 0.15·6·2/3 = 0.6, Λ̄ = 2, Γ₀₀ = 1/4
        let vi = state(2.0, 0.0);
        let vj = state(1.0, 0.0);
        let op = CenteredLax::new(OperatorConfig::new(2), 0.15);
        let mut out = EdgeResidual::new(4);
        op.compute(&EdgeContext::new(&[1.0, 0.0], &vi, &vj), &mut out);
        assert!((out.residual[0] - 0.6 * 2.0 * 0.25).abs() < 1e-12);
        assert!((out.residual[1] - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_jacobian_blocks_differ_by_dissipation() {
        let v = state(1.0, 1.0);
        let op = CenteredLax::new(OperatorConfig::new(2), 0.15);
        let mut out = EdgeResidual::new(4);
        op.compute(&EdgeContext::new(&[1.0, 0.0], &v, &v), &mut out);
        // Λ̄ = 1 + 2 = 3; Ji − Jj = 2 ε₀ Λ̄ Γ
        let cte = 0.6 * 3.0;
        assert!((out.jac_i[(0, 0)] - out.jac_j[(0, 0)] - 2.0 * cte * 0.25).abs() < 1e-12);
    }
}

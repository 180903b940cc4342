//! Boussinesq buoyancy source.
//!
//! Momentum rows: `R_k = Vol·ρ·β_T·(T − T₀)·g_k / F_ref` with gravity
//! `g = (0, …, −g₀)` along the last axis. The Jacobian carries the exact
//! temperature derivative of the momentum rows.

use super::traits::{PointSource, SourceContext, SourceResidual};
use crate::equations::STANDARD_GRAVITY;
use crate::flux::OperatorConfig;
use crate::types::MAX_DIM;

/// Boussinesq buoyancy source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Boussinesq {
    config: OperatorConfig,
    thermal_expansion: f64,
    reference_temperature: f64,
    force_ref: f64,
    gravity: [f64; MAX_DIM],
}

impl Boussinesq {
    /// Create the source with standard gravity along the last axis.
    pub fn new(
        config: OperatorConfig,
        thermal_expansion: f64,
        reference_temperature: f64,
        force_ref: f64,
    ) -> Self {
        let mut gravity = [0.0; MAX_DIM];
        gravity[config.n_dim - 1] = -STANDARD_GRAVITY;
        Self {
            config,
            thermal_expansion,
            reference_temperature,
            force_ref,
            gravity,
        }
    }
}

impl PointSource for Boussinesq {
    fn compute(&self, ctx: &SourceContext<'_>, out: &mut SourceResidual) {
        let cfg = &self.config;
        let layout = cfg.layout();
        out.reset();

        let density = ctx.v[layout.density()];
        let temperature = ctx.v[layout.temperature()];
        let factor = ctx.volume * density * self.thermal_expansion / self.force_ref;
        let t_col = cfg.energy_index();

        for k in 0..cfg.n_dim {
            out.residual[1 + k] = factor * (temperature - self.reference_temperature) * self.gravity[k];
            if cfg.implicit {
                out.jacobian[(1 + k, t_col)] = factor * self.gravity[k];
            }
        }

        if !cfg.energy {
            out.decouple_energy(t_col);
        }
    }

    fn name(&self) -> &'static str {
        "boussinesq"
    }

    fn config(&self) -> &OperatorConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equations::{PrimitiveBuilder, PrimitiveLayout};

    const TOL: f64 = 1e-12;

    fn state(t: f64) -> Vec<f64> {
        PrimitiveBuilder::new(PrimitiveLayout::new(3).unwrap())
            .density(1.0)
            .temperature(t)
            .build()
    }

    #[test]
    fn test_hot_fluid_rises() {
        let src = Boussinesq::new(OperatorConfig::new(3), 3.4e-3, 300.0, 1.0);
        let mut out = SourceResidual::new(5);
        src.compute(&SourceContext::new(&state(310.0), &[0.0; 3], 2.0), &mut out);
        let expected = 2.0 * 3.4e-3 * 10.0 * -STANDARD_GRAVITY;
        assert!((out.residual[3] - expected).abs() < TOL);
        assert!(out.residual[1].abs() < TOL);
        assert!(out.residual[2].abs() < TOL);
        assert!((out.jacobian[(3, 4)] - 2.0 * 3.4e-3 * -STANDARD_GRAVITY).abs() < TOL);
    }

    #[test]
    fn test_reference_temperature_is_neutral() {
        let src = Boussinesq::new(OperatorConfig::new(3), 3.4e-3, 300.0, 1.0);
        let mut out = SourceResidual::new(5);
        src.compute(&SourceContext::new(&state(300.0), &[0.0; 3], 2.0), &mut out);
        assert!(out.residual.norm() < TOL);
    }
}

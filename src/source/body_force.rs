//! Body force source.
//!
//! Momentum rows: `R_k = −Vol·(ρ − ρ₀)·F_k / F_ref`. The reference density
//! ρ₀ removes the hydrostatic part of the pressure and is only nonzero when
//! density varies; with constant density the full weight `ρF` is applied.
//! Continuity and energy rows are zero, as is the Jacobian.

use super::traits::{PointSource, SourceContext, SourceResidual};
use crate::flux::OperatorConfig;
use crate::types::MAX_DIM;

/// Body force source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyForce {
    config: OperatorConfig,
    force: [f64; MAX_DIM],
    reference_density: f64,
    force_ref: f64,
}

impl BodyForce {
    /// Create the source.
    ///
    /// # Arguments
    /// * `config` - Operator flags
    /// * `force` - Body force per unit mass (length nDim)
    /// * `freestream_density` - Used as ρ₀ under variable density only
    /// * `force_ref` - Nondimensionalization of forces
    pub fn new(config: OperatorConfig, force: &[f64], freestream_density: f64, force_ref: f64) -> Self {
        let mut f = [0.0; MAX_DIM];
        for (dst, src) in f.iter_mut().zip(force) {
            *dst = *src;
        }
        Self {
            config,
            force: f,
            reference_density: if config.variable_density {
                freestream_density
            } else {
                0.0
            },
            force_ref,
        }
    }

    /// ρ₀ subtracted from the local density.
    pub fn reference_density(&self) -> f64 {
        self.reference_density
    }
}

impl PointSource for BodyForce {
    fn compute(&self, ctx: &SourceContext<'_>, out: &mut SourceResidual) {
        let layout = self.config.layout();
        out.reset();

        let delta_rho = ctx.v[layout.density()] - self.reference_density;
        for k in 0..self.config.n_dim {
            out.residual[1 + k] = -ctx.volume * delta_rho * self.force[k] / self.force_ref;
        }
    }

    fn name(&self) -> &'static str {
        "body_force"
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

    #[test]
    fn test_constant_density_uses_full_weight() {
        let v = PrimitiveBuilder::new(PrimitiveLayout::new(2).unwrap())
            .density(2.0)
            .temperature(300.0)
            .build();
        let src = BodyForce::new(OperatorConfig::new(2), &[0.0, -9.81], 1.2, 1.0);
        assert_eq!(src.reference_density(), 0.0);
        let mut out = SourceResidual::new(4);
        src.compute(&SourceContext::new(&v, &[0.0, 0.0], 0.5), &mut out);
        assert!(out.residual[0].abs() < TOL);
        assert!(out.residual[1].abs() < TOL);
        assert!((out.residual[2] - 0.5 * 2.0 * 9.81).abs() < TOL);
        assert!(out.residual[3].abs() < TOL);
        assert_eq!(out.jacobian.max_abs(), 0.0);
    }

    #[test]
    fn test_variable_density_removes_hydrostatic_part() {
        let v = PrimitiveBuilder::new(PrimitiveLayout::new(2).unwrap())
            .density(1.2)
            .temperature(300.0)
            .build();
        let config = OperatorConfig::new(2).with_variable_density(true);
        let src = BodyForce::new(config, &[0.0, -9.81], 1.2, 1.0);
        let mut out = SourceResidual::new(4);
        src.compute(&SourceContext::new(&v, &[0.0, 0.0], 1.0), &mut out);
        assert!(out.residual.norm() < TOL);
    }
}

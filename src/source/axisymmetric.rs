//! Axisymmetric source terms for 2D meridional-plane computations.
//!
//! With `y` the radial coordinate and `y⁻¹ = 1/y`, the inviscid part is
//!
//! ```text
//! R = y⁻¹·Vol·[ρv, ρuv, ρv², ρhv]
//! ```
//!
//! with its exact Jacobian. The viscous part subtracts the hoop-stress and
//! radial heat-flux corrections built from the full stress tensor and the
//! gradient of the auxiliary scalar `μ_tot·v/y`.
//!
//! Points on (or numerically on) the axis contribute nothing.

use super::traits::{PointSource, SourceContext, SourceResidual};
use crate::equations::ViscousProperties;
use crate::equations::incompressible::stress_tensor;
use crate::error::{Result, SolverError};
use crate::flux::OperatorConfig;
use tracing::debug;

/// Radial distance below which a point is treated as lying on the axis.
pub const AXIS_TOLERANCE: f64 = 1e-10;

const TWO3: f64 = 2.0 / 3.0;

/// Axisymmetric source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Axisymmetric {
    config: OperatorConfig,
    viscous: bool,
}

impl Axisymmetric {
    /// Create the source; only valid in two dimensions.
    pub fn new(config: OperatorConfig, viscous: bool) -> Result<Self> {
        Self::check_dimension(config.n_dim)?;
        Ok(Self { config, viscous })
    }

    pub(crate) fn check_dimension(n_dim: usize) -> Result<()> {
        if n_dim == 2 {
            Ok(())
        } else {
            Err(SolverError::Unsupported(format!(
                "axisymmetric source requires a 2D mesh, got nDim = {n_dim}"
            )))
        }
    }
}

impl PointSource for Axisymmetric {
    fn compute(&self, ctx: &SourceContext<'_>, out: &mut SourceResidual) {
        let cfg = &self.config;
        let layout = cfg.layout();
        out.reset();

        let radius = ctx.coord[1];
        if radius <= AXIS_TOLERANCE {
            return;
        }
        let yinv = 1.0 / radius;
        let v = ctx.v;

        let rho = v[layout.density()];
        let (u_x, u_y) = (v[layout.velocity(0)], v[layout.velocity(1)]);
        let cp = v[layout.cp()];
        let enthalpy = if cfg.energy {
            cp * v[layout.temperature()]
        } else {
            0.0
        };
        let d_rho_d_t = if cfg.variable_density {
            -rho / v[layout.temperature()]
        } else {
            0.0
        };

        let scale = yinv * ctx.volume;
        out.residual[0] = scale * rho * u_y;
        out.residual[1] = scale * rho * u_x * u_y;
        out.residual[2] = scale * rho * u_y * u_y;
        out.residual[3] = scale * rho * enthalpy * u_y;

        if cfg.implicit {
            let s = scale * rho;
            let j = &mut out.jacobian;
            j[(0, 2)] = s;
            j[(1, 1)] = s * u_y;
            j[(1, 2)] = s * u_x;
            j[(2, 2)] = s * 2.0 * u_y;
            j[(3, 2)] = s * enthalpy;
            j[(3, 3)] = s * cp * u_y;

            // density dependence on temperature
            j[(0, 3)] += scale * d_rho_d_t * u_y;
            j[(1, 3)] += scale * d_rho_d_t * u_x * u_y;
            j[(2, 3)] += scale * d_rho_d_t * u_y * u_y;
            j[(3, 3)] += scale * d_rho_d_t * enthalpy * u_y;
        }

        if self.viscous {
            match (ctx.gradient, ctx.aux_gradient) {
                (Some(grad), Some(aux)) => {
                    let props = ViscousProperties {
                        laminar_viscosity: v[layout.laminar_viscosity()],
                        eddy_viscosity: v[layout.eddy_viscosity()],
                        turb_ke: 0.0,
                        conductivity: v[layout.conductivity()],
                    };
                    let mu = props.total_viscosity();
                    let tau = stress_tensor(2, grad, rho, &props);
                    let vol = ctx.volume;

                    out.residual[1] -= vol * (yinv * tau[0][1] - TWO3 * aux[0]);
                    out.residual[2] -= vol
                        * (yinv * 2.0 * mu * grad[2][1]
                            - yinv * yinv * 2.0 * mu * u_y
                            - TWO3 * aux[1]);
                    out.residual[3] -= vol * yinv * props.conductivity * grad[3][1];
                }
                _ => debug!(
                    radius,
                    "axisymmetric viscous terms skipped: point gradients not supplied"
                ),
            }
        }

        if !cfg.energy {
            out.decouple_energy(cfg.energy_index());
        }
    }

    fn name(&self) -> &'static str {
        "axisymmetric"
    }

    fn config(&self) -> &OperatorConfig {
        &self.config
    }

    fn needs_gradients(&self) -> bool {
        self.viscous
    }

    fn needs_aux_gradient(&self) -> bool {
        self.viscous
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::equations::{PrimitiveBuilder, PrimitiveLayout};
    use crate::types::{GradientBlock, MAX_DIM, MAX_VAR};

    const TOL: f64 = 1e-12;

    fn state() -> Vec<f64> {
        PrimitiveBuilder::new(PrimitiveLayout::new(2).unwrap())
            .pressure(1.0)
            .velocity(&[2.0, 3.0])
            .temperature(300.0)
            .density(1.5)
            .viscosity(0.1, 0.0)
            .conductivity(0.5)
            .heat_capacity(2.0, 2.0)
            .build()
    }

    #[test]
    fn test_rejects_3d() {
        assert!(Axisymmetric::new(OperatorConfig::new(3), false).is_err());
    }

    #[test]
    fn test_inviscid_terms() {
        let src = Axisymmetric::new(OperatorConfig::new(2), false).unwrap();
        let mut out = SourceResidual::new(4);
        src.compute(&SourceContext::new(&state(), &[0.0, 2.0], 4.0), &mut out);
        // y⁻¹·Vol = 2
        assert!((out.residual[0] - 2.0 * 1.5 * 3.0).abs() < TOL);
        assert!((out.residual[1] - 2.0 * 1.5 * 6.0).abs() < TOL);
        assert!((out.residual[2] - 2.0 * 1.5 * 9.0).abs() < TOL);
        assert!((out.residual[3] - 2.0 * 1.5 * 600.0 * 3.0).abs() < 1e-9);
        assert!((out.jacobian[(2, 2)] - 2.0 * 1.5 * 6.0).abs() < TOL);
    }

    fn residual_at(src: &Axisymmetric, v: &[f64], coord: &[f64], vol: f64) -> SourceResidual {
        let mut out = SourceResidual::new(4);
        src.compute(&SourceContext::new(v, coord, vol), &mut out);
        out
    }

    #[test]
    fn test_inviscid_jacobian_matches_finite_differences() {
        let layout = PrimitiveLayout::new(2).unwrap();
        let coord = [0.4, 0.7];
        for variable_density in [false, true] {
            let config = OperatorConfig::new(2).with_variable_density(variable_density);
            let src = Axisymmetric::new(config, false).unwrap();
            let base = state();
            let jac = residual_at(&src, &base, &coord, 0.3).jacobian;

            for col in 0..4 {
                let h = 1e-6 * base[col].abs().max(1.0);
                let perturbed = |sign: f64| {
                    let mut v = base.clone();
                    v[col] += sign * h;
                    // Density follows temperature at fixed thermodynamic pressure
                    if variable_density && col == layout.temperature() {
                        v[layout.density()] = base[layout.density()] * base[col] / v[col];
                    }
                    residual_at(&src, &v, &coord, 0.3).residual
                };
                let (plus, minus) = (perturbed(1.0), perturbed(-1.0));
                for row in 0..4 {
                    let fd = (plus[row] - minus[row]) / (2.0 * h);
                    let scale = fd.abs().max(jac[(row, col)].abs()).max(1.0);
                    assert!(
                        (fd - jac[(row, col)]).abs() / scale < 1e-6,
                        "variable_density={variable_density} ({row},{col}): fd {fd} vs {}",
                        jac[(row, col)]
                    );
                }
            }
        }
    }

    #[test]
    fn test_viscous_source_requests_gradients() {
        let viscous = Axisymmetric::new(OperatorConfig::new(2), true).unwrap();
        let inviscid = Axisymmetric::new(OperatorConfig::new(2), false).unwrap();
        assert!(viscous.needs_gradients() && viscous.needs_aux_gradient());
        assert!(!inviscid.needs_gradients() && !inviscid.needs_aux_gradient());

        // Without gradients only the inviscid part is applied
        let v = state();
        let with_viscous = residual_at(&viscous, &v, &[0.0, 2.0], 1.0);
        let without = residual_at(&inviscid, &v, &[0.0, 2.0], 1.0);
        for k in 0..4 {
            assert_eq!(with_viscous.residual[k], without.residual[k]);
        }
    }

    #[test]
    fn test_axis_point_contributes_nothing() {
        let src = Axisymmetric::new(OperatorConfig::new(2), true).unwrap();
        let grad: GradientBlock = [[1.0; MAX_DIM]; MAX_VAR];
        let aux = [1.0, 1.0];
        let v = state();
        let ctx = SourceContext::new(&v, &[0.3, 1e-12], 1.0)
            .with_gradient(&grad)
            .with_aux_gradient(&aux);
        let mut out = SourceResidual::new(4);
        src.compute(&ctx, &mut out);
        assert_eq!(out.residual.norm(), 0.0);
        assert_eq!(out.jacobian.max_abs(), 0.0);
    }

    #[test]
    fn test_viscous_radial_heat_flux() {
        let src = Axisymmetric::new(OperatorConfig::new(2), true).unwrap();
        let mut grad: GradientBlock = [[0.0; MAX_DIM]; MAX_VAR];
        grad[3][1] = 4.0;
        let aux = [0.0, 0.0];
        let v = PrimitiveBuilder::new(PrimitiveLayout::new(2).unwrap())
            .temperature(300.0)
            .density(1.0)
            .viscosity(0.1, 0.0)
            .conductivity(0.5)
            .heat_capacity(1.0, 1.0)
            .build();
        let ctx = SourceContext::new(&v, &[0.0, 2.0], 1.0)
            .with_gradient(&grad)
            .with_aux_gradient(&aux);
        let mut out = SourceResidual::new(4);
        src.compute(&ctx, &mut out);
        assert!((out.residual[3] + 0.5 * 0.5 * 4.0).abs() < TOL);
    }
}

//! Physical time derivative for dual time stepping.
//!
//! The unsteady residual of each owned point is augmented with
//!
//! ```text
//! BDF1:  M · (V^{n+1} − V^n) · Vol/Δt
//! BDF2:  M · (3/2 V^{n+1} − 2 V^n + 1/2 V^{n−1}) · Vol/Δt
//! ```
//!
//! with `M = ∂(ρ, ρu, ρ·Cp·T)/∂(p, u, T)` at the current state, and the
//! leading coefficient times `M·Vol/Δt` on the Jacobian diagonal.

use super::{TimeMarching, point_matrix};
use crate::error::{Result, SolverError};
use crate::mesh::DualMesh;
use crate::solver::{FlowState, ResidualAssembler};
use crate::types::{JacBlock, VarBlock};

/// Backward-difference time derivative.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DualTime {
    coefficients: [f64; 3],
    physical_dt: f64,
}

impl DualTime {
    /// Time derivative for a dual time marching strategy.
    pub fn new(marching: TimeMarching, physical_dt: f64) -> Result<Self> {
        let coefficients = match marching {
            TimeMarching::DualTime1st => [1.0, -1.0, 0.0],
            TimeMarching::DualTime2nd => [1.5, -2.0, 0.5],
            other => {
                return Err(SolverError::Unsupported(format!(
                    "{other:?} has no dual time derivative"
                )));
            }
        };
        if !(physical_dt > 0.0) {
            return Err(SolverError::Unsupported(format!(
                "dual time stepping needs a positive physical step, got {physical_dt}"
            )));
        }
        Ok(Self {
            coefficients,
            physical_dt,
        })
    }

    /// Physical time step.
    pub fn physical_dt(&self) -> f64 {
        self.physical_dt
    }

    /// Coefficients of `V^{n+1}`, `V^n` and `V^{n−1}`.
    pub fn coefficients(&self) -> [f64; 3] {
        self.coefficients
    }

    /// Add the time derivative to the residual and Jacobian of `assembler`.
    ///
    /// Call after [`ResidualAssembler::compute_residual`]; rows pinned by
    /// strong boundary conditions are left untouched.
    pub fn add_time_residual(
        &self,
        mesh: &DualMesh,
        state: &FlowState,
        assembler: &mut ResidualAssembler,
    ) -> Result<()> {
        let config = *assembler.config();
        let n_var = config.n_var();
        let t = config.energy_index();
        let [c0, c1, c2] = self.coefficients;

        let mut pinned = vec![false; mesh.n_point() * n_var];
        for &(p, k) in assembler.dirichlet_rows() {
            pinned[p * n_var + k] = true;
        }

        let mut m = JacBlock::zeros(n_var);
        let mut difference = VarBlock::zeros(n_var);
        let (mut jacobian, residual) = assembler.system_mut();

        for p in (0..mesh.n_point()).filter(|&p| mesh.is_domain(p)) {
            let scale = mesh.volume(p) / self.physical_dt;
            point_matrix(state, p, config.variable_density, f64::INFINITY, &mut m);
            if !config.energy {
                m.zero_row(t);
                m.zero_col(t);
            }
            let (v, vn, vn1) = (
                state.solution(p),
                state.solution_time_n(p),
                state.solution_time_n1(p),
            );
            for k in 0..n_var {
                difference[k] = c0 * v[k] + c1 * vn[k] + c2 * vn1[k];
            }
            let rate = m.matvec(&difference);
            let mut block = m;
            block.scale(c0 * scale);
            for k in (0..n_var).filter(|&k| pinned[p * n_var + k]) {
                block.zero_row(k);
            }

            let r = residual.block_mut(p);
            for k in (0..n_var).filter(|&k| !pinned[p * n_var + k]) {
                r[k] += scale * rate[k];
            }
            if let Some(jac) = jacobian.as_deref_mut() {
                jac.add_block(p, p, &block)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::BoundarySet;
    use crate::equations::{ConstantDensity, PrimitiveLayout, TransportModel};
    use crate::flux::OperatorConfig;
    use crate::parallel::SerialHalo;
    use crate::solver::SchemeSetup;

    const TOL: f64 = 1e-10;

    #[test]
    fn test_rejects_non_dual_marching() {
        assert!(DualTime::new(TimeMarching::Steady, 0.1).is_err());
        assert!(DualTime::new(TimeMarching::DualTime1st, 0.0).is_err());
        assert_eq!(
            DualTime::new(TimeMarching::DualTime2nd, 0.1).unwrap().coefficients(),
            [1.5, -2.0, 0.5]
        );
    }

    #[test]
    fn test_uniform_flow_time_residual() {
        let mesh = DualMesh::periodic_rectangle(3, 3, 1.0, 1.0).unwrap();
        let layout = PrimitiveLayout::new(2).unwrap();
        let mut state = FlowState::new(
            layout,
            9,
            ConstantDensity::new(2.0, 1000.0).into(),
            TransportModel::inviscid(),
        );
        state.set_uniform(&[0.0, 1.0, 0.0, 300.0]);
        state.update_primitives();
        state.set_solution_time_n();
        state.set_solution_time_n1();

        // accelerate u by 0.5 over one step
        state.set_uniform(&[0.0, 1.5, 0.0, 300.0]);
        let mut assembler = ResidualAssembler::new(
            &mesh,
            OperatorConfig::new(2),
            &SchemeSetup::default(),
            Vec::new(),
            BoundarySet::default(),
        )
        .unwrap();
        assembler.compute_residual(&mesh, &mut state, &SerialHalo).unwrap();
        let steady = assembler.residual().clone();

        let dual = DualTime::new(TimeMarching::DualTime1st, 0.1).unwrap();
        dual.add_time_residual(&mesh, &state, &mut assembler).unwrap();

        let vol = mesh.volume(0);
        for p in 0..9 {
            let r = assembler.residual().block(p);
            let s = steady.block(p);
            // ρ·Δu·Vol/Δt in x-momentum, nothing elsewhere
            assert!((r[1] - s[1] - 2.0 * 0.5 * vol / 0.1).abs() < TOL);
            assert!((r[0] - s[0]).abs() < TOL);
            assert!((r[2] - s[2]).abs() < TOL);
            assert!((r[3] - s[3]).abs() < TOL);
        }
        let diag = assembler.jacobian().unwrap().get_block(0, 0).unwrap();
        let steady_diag = {
            let mut a = ResidualAssembler::new(
                &mesh,
                OperatorConfig::new(2),
                &SchemeSetup::default(),
                Vec::new(),
                BoundarySet::default(),
            )
            .unwrap();
            a.compute_residual(&mesh, &mut state, &SerialHalo).unwrap();
            a.jacobian().unwrap().get_block(0, 0).unwrap()
        };
        assert!((diag[(1, 1)] - steady_diag[(1, 1)] - 2.0 * vol / 0.1).abs() < TOL);
    }
}

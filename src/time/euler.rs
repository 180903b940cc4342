//! Pseudo-time Euler updates of the primitive unknowns.
//!
//! Explicit: `ΔV = −(dt/Vol) · Γ⁻¹ · R`.
//!
//! Implicit: `(J + Vol/dt · Γ) · ΔV = −R`, solved by a [`LinearSolver`].
//! Points with a zero step get an identity diagonal and a zero right-hand
//! side. Rows pinned by strong boundary conditions are re-imposed after the
//! time term is added.

use tracing::debug;

use super::{LocalTimeStep, point_matrix};
use crate::error::{Result, SolverError};
use crate::linalg::{BiCgStabSolver, BlockVector, LinearSolver, invert_block};
use crate::mesh::DualMesh;
use crate::parallel::HaloExchange;
use crate::solver::{FlowState, ResidualAssembler, ResidualNorms};
use crate::types::JacBlock;

/// One pseudo-time update from an assembled residual.
pub trait PseudoTimeIntegrator: Send + Sync {
    /// Update `state` from the residual (and Jacobian) held by `assembler`.
    ///
    /// Returns the norms of the residual the update was computed from.
    fn update(
        &self,
        mesh: &DualMesh,
        state: &mut FlowState,
        assembler: &mut ResidualAssembler,
        dt: &LocalTimeStep,
        halo: &dyn HaloExchange,
    ) -> Result<ResidualNorms>;

    /// Name for logging.
    fn name(&self) -> &'static str;

    /// Whether the update needs the assembled Jacobian.
    fn is_implicit(&self) -> bool;
}

// =============================================================================
// Explicit Euler
// =============================================================================

/// Forward Euler with the artificial-compressibility preconditioner.
#[derive(Clone, Copy, Debug, Default)]
pub struct ExplicitEuler;

impl PseudoTimeIntegrator for ExplicitEuler {
    fn update(
        &self,
        mesh: &DualMesh,
        state: &mut FlowState,
        assembler: &mut ResidualAssembler,
        dt: &LocalTimeStep,
        halo: &dyn HaloExchange,
    ) -> Result<ResidualNorms> {
        let norms = assembler.residual_norms(mesh, halo);
        let config = *assembler.config();
        let n_var = config.n_var();
        let t = config.energy_index();

        let mut gamma = JacBlock::zeros(n_var);
        let mut delta = vec![0.0; n_var];
        let mut pinned = vec![false; mesh.n_point() * n_var];
        for &(p, k) in assembler.dirichlet_rows() {
            pinned[p * n_var + k] = true;
        }

        for p in (0..mesh.n_point()).filter(|&p| mesh.is_domain(p)) {
            let (vol, dt) = (mesh.volume(p), dt.get(p));
            if vol <= 0.0 || dt <= 0.0 {
                continue;
            }
            point_matrix(state, p, config.variable_density, state.beta2(), &mut gamma);
            let inv = invert_block(&gamma, p)?;
            let r = assembler.residual().block(p);
            for (k, d) in delta.iter_mut().enumerate() {
                let ginv_r: f64 = (0..n_var).map(|l| inv[(k, l)] * r[l]).sum();
                *d = if pinned[p * n_var + k] { 0.0 } else { -dt / vol * ginv_r };
            }
            if !config.energy {
                delta[t] = 0.0;
            }
            state.add_to_solution(p, &delta);
        }
        state.exchange_solution(halo);

        debug!(rms_p = norms.rms[0], "explicit update");
        Ok(norms)
    }

    fn name(&self) -> &'static str {
        "explicit_euler"
    }

    fn is_implicit(&self) -> bool {
        false
    }
}

// =============================================================================
// Implicit Euler
// =============================================================================

/// Backward Euler with one linear solve per iteration.
pub struct ImplicitEuler {
    solver: Box<dyn LinearSolver>,
}

impl Default for ImplicitEuler {
    fn default() -> Self {
        Self::new(Box::new(BiCgStabSolver::default()))
    }
}

impl ImplicitEuler {
    /// Implicit Euler with the given linear solver.
    pub fn new(solver: Box<dyn LinearSolver>) -> Self {
        Self { solver }
    }

    /// Linear solver.
    pub fn solver(&self) -> &dyn LinearSolver {
        self.solver.as_ref()
    }
}

impl PseudoTimeIntegrator for ImplicitEuler {
    fn update(
        &self,
        mesh: &DualMesh,
        state: &mut FlowState,
        assembler: &mut ResidualAssembler,
        dt: &LocalTimeStep,
        halo: &dyn HaloExchange,
    ) -> Result<ResidualNorms> {
        let norms = assembler.residual_norms(mesh, halo);
        let config = *assembler.config();
        let n_var = config.n_var();
        let t = config.energy_index();
        let n_point = mesh.n_point();
        let dirichlet = assembler.dirichlet_rows().to_vec();

        let (jacobian, residual) = assembler.system_mut();
        let jacobian = jacobian.ok_or_else(|| {
            SolverError::Unsupported("implicit update on an assembler without Jacobian".into())
        })?;

        let mut gamma = JacBlock::zeros(n_var);
        let mut rhs = BlockVector::zeros(n_point, n_var);
        for p in 0..n_point {
            if !mesh.is_domain(p) {
                for k in 0..n_var {
                    jacobian.delete_row(p, k);
                }
                continue;
            }
            let (vol, dt) = (mesh.volume(p), dt.get(p));
            if vol > 0.0 && dt > 0.0 {
                point_matrix(state, p, config.variable_density, state.beta2(), &mut gamma);
                jacobian.add_block_to_diag(p, vol / dt, &gamma);
                for (b, r) in rhs.block_mut(p).iter_mut().zip(residual.block(p)) {
                    *b = -r;
                }
            } else {
                jacobian.set_val_to_diag(p, 1.0);
            }
            if !config.energy {
                jacobian.delete_row(p, t);
                rhs.set_component_zero(p, t);
            }
        }
        for &(p, k) in &dirichlet {
            jacobian.delete_row(p, k);
            rhs.set_component_zero(p, k);
        }

        let mut increment = BlockVector::zeros(n_point, n_var);
        let stats = self.solver.solve(jacobian, &rhs, &mut increment)?;
        debug!(
            solver = self.solver.name(),
            iterations = stats.iterations,
            residual = stats.residual,
            "linear solve"
        );

        for p in (0..n_point).filter(|&p| mesh.is_domain(p)) {
            state.add_to_solution(p, increment.block(p));
        }
        state.exchange_solution(halo);
        Ok(norms)
    }

    fn name(&self) -> &'static str {
        "implicit_euler"
    }

    fn is_implicit(&self) -> bool {
        true
    }
}

//! Iteration drivers.
//!
//! [`run_steady`] marches in pseudo time with local steps until the residual
//! has dropped far enough. [`run_unsteady`] advances physical time, either
//! with one global explicit/implicit step per iteration (time stepping) or
//! with inner pseudo-time iterations per physical step (dual time).

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{DualTime, LocalTimeStep, PseudoTimeIntegrator, TimeConfig, TimeMarching};
use crate::error::{Result, SolverError};
use crate::mesh::DualMesh;
use crate::parallel::HaloExchange;
use crate::solver::{ConvergenceHistory, FlowState, ResidualAssembler, ResidualNorms};

/// Iteration limits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarchingControl {
    /// Pseudo-time iterations (steady) or inner iterations per physical step
    pub max_iterations: usize,
    /// Orders of magnitude every RMS residual must drop
    pub orders: f64,
    /// Physical steps of an unsteady run
    pub physical_steps: usize,
    /// Log every this many iterations
    pub log_every: usize,
}

impl Default for MarchingControl {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            orders: 6.0,
            physical_steps: 1,
            log_every: 50,
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn pseudo_step(
    mesh: &DualMesh,
    state: &mut FlowState,
    assembler: &mut ResidualAssembler,
    integrator: &dyn PseudoTimeIntegrator,
    dual: Option<&DualTime>,
    dt: &mut LocalTimeStep,
    time: &TimeConfig,
    halo: &dyn HaloExchange,
) -> Result<ResidualNorms> {
    assembler.compute_residual(mesh, state, halo)?;
    if let Some(dual) = dual {
        dual.add_time_residual(mesh, state, assembler)?;
    }
    let lambda_visc = assembler.viscous().map(|_| assembler.lambda_viscous());
    dt.compute(
        mesh,
        assembler.lambda_inviscid(),
        lambda_visc,
        time,
        integrator.is_implicit(),
        halo,
    );
    integrator.update(mesh, state, assembler, dt, halo)
}

/// March to a steady state.
///
/// Stops after `control.max_iterations` or once every RMS residual has
/// dropped `control.orders` orders of magnitude.
pub fn run_steady(
    mesh: &DualMesh,
    state: &mut FlowState,
    assembler: &mut ResidualAssembler,
    integrator: &dyn PseudoTimeIntegrator,
    time: &TimeConfig,
    control: &MarchingControl,
    halo: &dyn HaloExchange,
) -> Result<ConvergenceHistory> {
    let mut dt = LocalTimeStep::new(mesh.n_point());
    let mut history = ConvergenceHistory::new();

    info!(
        integrator = integrator.name(),
        cfl = time.cfl,
        max_iterations = control.max_iterations,
        "steady run"
    );
    for iteration in 0..control.max_iterations {
        let norms = pseudo_step(mesh, state, assembler, integrator, None, &mut dt, time, halo)?;
        if !norms.is_finite() {
            return Err(SolverError::Diverged { iteration });
        }
        history.record(iteration, &norms);

        if control.log_every > 0 && iteration % control.log_every == 0 {
            info!(iteration, rms = ?norms.rms, min_dt = dt.min(), "pseudo-time iteration");
        } else {
            debug!(iteration, rms = ?norms.rms, "pseudo-time iteration");
        }
        if history.has_converged(control.orders) {
            info!(iteration, "converged");
            break;
        }
    }
    if !history.has_converged(control.orders) {
        warn!(iterations = history.len(), "iteration limit reached before convergence");
    }
    Ok(history)
}

/// Advance `control.physical_steps` physical time steps.
///
/// Returns the history of the last physical step.
pub fn run_unsteady(
    mesh: &DualMesh,
    state: &mut FlowState,
    assembler: &mut ResidualAssembler,
    integrator: &dyn PseudoTimeIntegrator,
    time: &TimeConfig,
    control: &MarchingControl,
    halo: &dyn HaloExchange,
) -> Result<ConvergenceHistory> {
    let dual = match time.marching {
        TimeMarching::Steady => {
            return Err(SolverError::Unsupported(
                "unsteady run with steady time marching".into(),
            ));
        }
        TimeMarching::TimeStepping => None,
        marching => Some(DualTime::new(marching, time.unsteady_dt)?),
    };

    let mut dt = LocalTimeStep::new(mesh.n_point());
    let mut history = ConvergenceHistory::new();
    let mut physical_time = 0.0;

    state.set_solution_time_n();
    state.set_solution_time_n1();

    for step in 0..control.physical_steps {
        history = ConvergenceHistory::new();
        let inner = if dual.is_some() { control.max_iterations } else { 1 };
        for iteration in 0..inner {
            let norms = pseudo_step(mesh, state, assembler, integrator, dual.as_ref(), &mut dt, time, halo)?;
            if !norms.is_finite() {
                return Err(SolverError::Diverged { iteration });
            }
            history.record(iteration, &norms);
            if dual.is_some() && history.has_converged(control.orders) {
                break;
            }
        }

        physical_time += dual.as_ref().map_or(dt.min(), |d| d.physical_dt());
        state.set_solution_time_n1();
        state.set_solution_time_n();
        info!(step, time = physical_time, inner = history.len(), "physical time step");
    }
    Ok(history)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::{BoundarySet, MarkerConfig, MarkerKind};
    use crate::equations::{ConstantDensity, PrimitiveLayout, TransportModel};
    use crate::flux::{EdgeOperatorKind, OperatorConfig};
    use crate::linalg::DenseLuSolver;
    use crate::parallel::SerialHalo;
    use crate::solver::SchemeSetup;
    use crate::time::{ExplicitEuler, ImplicitEuler};

    /// Heat conduction between two isothermal walls in fluid at rest.
    fn conduction() -> (DualMesh, FlowState, ResidualAssembler) {
        let mesh = DualMesh::structured_rectangle(4, 2, 1.0, 0.5).unwrap();
        let layout = PrimitiveLayout::new(2).unwrap();
        let mut state = FlowState::new(
            layout,
            mesh.n_point(),
            ConstantDensity::new(1.0, 1.0).into(),
            TransportModel::new(1.0, Default::default()),
        );
        state.set_uniform(&[0.0, 0.0, 0.0, 300.0]);
        let markers = vec![
            MarkerConfig::new("left", MarkerKind::IsothermalWall { temperature: 400.0 }),
            MarkerConfig::new("right", MarkerKind::IsothermalWall { temperature: 300.0 }),
            MarkerConfig::new("bottom", MarkerKind::Symmetry),
            MarkerConfig::new("top", MarkerKind::Symmetry),
        ];
        let boundaries = BoundarySet::new(&mesh, &markers, None).unwrap();
        let scheme = SchemeSetup {
            viscous: Some(EdgeOperatorKind::ViscousAvgGradCorrected),
            ..SchemeSetup::default()
        };
        let assembler =
            ResidualAssembler::new(&mesh, OperatorConfig::new(2), &scheme, Vec::new(), boundaries).unwrap();
        (mesh, state, assembler)
    }

    #[test]
    fn test_implicit_steady_conduction_is_linear() {
        let (mesh, mut state, mut assembler) = conduction();
        let time = TimeConfig {
            cfl: 1e3,
            ..TimeConfig::default()
        };
        let control = MarchingControl {
            max_iterations: 200,
            orders: 8.0,
            ..MarchingControl::default()
        };
        let integrator = ImplicitEuler::new(Box::new(DenseLuSolver));
        let history = run_steady(&mesh, &mut state, &mut assembler, &integrator, &time, &control, &SerialHalo)
            .unwrap();
        assert!(history.orders_dropped(3) > 6.0);

        for p in 0..mesh.n_point() {
            let x = mesh.coord(p)[0];
            let t = state.solution(p)[3];
            assert!((t - (400.0 - 100.0 * x)).abs() < 1e-3, "x = {x}: T = {t}");
        }
    }

    #[test]
    fn test_unsteady_requires_unsteady_marching() {
        let (mesh, mut state, mut assembler) = conduction();
        let result = run_unsteady(
            &mesh,
            &mut state,
            &mut assembler,
            &ExplicitEuler,
            &TimeConfig::default(),
            &MarchingControl::default(),
            &SerialHalo,
        );
        assert!(matches!(result, Err(SolverError::Unsupported(_))));
    }

    #[test]
    fn test_dual_time_steps_keep_walls() {
        let (mesh, mut state, mut assembler) = conduction();
        let time = TimeConfig {
            cfl: 100.0,
            marching: TimeMarching::DualTime2nd,
            unsteady_dt: 0.01,
            ..TimeConfig::default()
        };
        let control = MarchingControl {
            max_iterations: 20,
            physical_steps: 3,
            ..MarchingControl::default()
        };
        let integrator = ImplicitEuler::new(Box::new(DenseLuSolver));
        run_unsteady(&mesh, &mut state, &mut assembler, &integrator, &time, &control, &SerialHalo).unwrap();

        let left = mesh.marker(mesh.marker_index("left").unwrap());
        for vertex in &left.vertices {
            assert_eq!(state.solution(vertex.point)[3], 400.0);
        }
        // heat has diffused into the first interior column only partially
        let interior = mesh
            .marker(mesh.marker_index("bottom").unwrap())
            .vertices
            .iter()
            .find(|v| (mesh.coord(v.point)[0] - 0.25).abs() < 1e-12)
            .map(|v| v.point)
            .unwrap();
        let t = state.solution(interior)[3];
        assert!(t > 300.0 && t < 400.0);
    }
}

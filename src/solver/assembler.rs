//! Residual and Jacobian assembly.
//!
//! One nonlinear iteration runs
//!
//! ```text
//! preprocess → convective pass → viscous pass → source pass → boundaries
//! ```
//!
//! Edge passes visit every edge once, in the order of a greedy edge coloring.
//! For edge `(i, j)` with local result `(R, J_i, J_j)`:
//!
//! | | residual | (i,i) | (i,j) | (j,i) | (j,j) |
//! |---|---|---|---|---|---|
//! | convective | `+R` at i, `−R` at j | `+J_i` | `+J_j` | `−J_i` | `−J_j` |
//! | viscous | `−R` at i, `+R` at j | `−J_i` | `−J_j` | `+J_i` | `+J_j` |
//!
//! With the `parallel` feature each color is evaluated concurrently and then
//! scattered serially, so both builds produce identical bits.

use tracing::{debug, info, warn};

use crate::adjoint::AdjointTape;
use crate::boundary::{BoundaryContext, BoundarySet, HeatFluxReport};
use crate::error::{Result, SolverError};
use crate::flux::{
    AvgGrad, DissipationCoefficients, DissipationInputs, EdgeContext, EdgeOperator, EdgeOperatorKind,
    EdgeResidual, OperatorConfig, StandardEdgeOperator, UpwindFds,
};
use crate::linalg::{BlockCsrMatrix, BlockVector};
use crate::mesh::{DualMesh, EdgeColoring};
use crate::operators::{
    GradientMethod, inviscid_spectral_radius, pressure_sensor, undivided_laplacian,
    viscous_spectral_radius,
};
use crate::parallel::HaloExchange;
use crate::solver::{FlowState, ResidualNorms};
use crate::source::{PointSource, SourceContext, SourceResidual, StandardSource};

/// Scheme selection for an assembler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchemeSetup {
    /// Convective operator
    pub convective: EdgeOperatorKind,
    /// Viscous operator, `None` for inviscid runs
    pub viscous: Option<EdgeOperatorKind>,
    /// Centered-scheme dissipation coefficients
    pub dissipation: DissipationCoefficients,
    /// Gradient reconstruction
    pub gradient_method: GradientMethod,
}

impl Default for SchemeSetup {
    fn default() -> Self {
        Self {
            convective: EdgeOperatorKind::Upwind,
            viscous: None,
            dissipation: DissipationCoefficients::default(),
            gradient_method: GradientMethod::GreenGauss,
        }
    }
}

/// Per-point data the edge operators read.
struct EdgeInputs<'a> {
    mesh: &'a DualMesh,
    state: &'a FlowState,
    und_lapl: Option<&'a [f64]>,
    sensor: &'a [f64],
    lambda: &'a [f64],
    n_var: usize,
}

impl<'a> EdgeInputs<'a> {
    fn convective(&self, e: usize) -> EdgeContext<'a> {
        let n_dim = self.mesh.n_dim();
        let edge = self.mesh.edge(e);
        let (i, j) = (edge.i, edge.j);
        let n = self.n_var;
        let dissipation = DissipationInputs {
            und_lapl: match self.und_lapl {
                Some(l) => (Some(&l[i * n..(i + 1) * n]), Some(&l[j * n..(j + 1) * n])),
                None => (None, None),
            },
            sensor: (self.sensor[i], self.sensor[j]),
            lambda: (self.lambda[i], self.lambda[j]),
            neighbors: (self.mesh.n_neighbors(i), self.mesh.n_neighbors(j)),
        };
        EdgeContext::new(
            &edge.normal[..n_dim],
            self.state.primitive(i),
            self.state.primitive(j),
        )
        .with_edge_vector(&edge.edge_vector[..n_dim])
        .with_dissipation(dissipation)
    }

    fn viscous(&self, e: usize) -> EdgeContext<'a> {
        let n_dim = self.mesh.n_dim();
        let edge = self.mesh.edge(e);
        EdgeContext::new(
            &edge.normal[..n_dim],
            self.state.primitive(edge.i),
            self.state.primitive(edge.j),
        )
        .with_edge_vector(&edge.edge_vector[..n_dim])
        .with_gradients(self.state.gradient(edge.i), self.state.gradient(edge.j))
    }
}

/// Which pass an edge loop is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Pass {
    Convective,
    Viscous,
}

impl Pass {
    /// Sign of the contribution at the first endpoint.
    fn sign(self) -> f64 {
        match self {
            Self::Convective => 1.0,
            Self::Viscous => -1.0,
        }
    }
}

fn scatter(
    residual: &mut BlockVector,
    jacobian: Option<&mut BlockCsrMatrix>,
    i: usize,
    j: usize,
    out: &EdgeResidual,
    sign: f64,
) -> Result<()> {
    for (k, r) in out.residual.as_slice().iter().enumerate() {
        residual.block_mut(i)[k] += sign * r;
        residual.block_mut(j)[k] -= sign * r;
    }
    if let Some(jac) = jacobian {
        jac.axpy_block(i, i, sign, &out.jac_i)?;
        jac.axpy_block(i, j, sign, &out.jac_j)?;
        jac.axpy_block(j, i, -sign, &out.jac_i)?;
        jac.axpy_block(j, j, -sign, &out.jac_j)?;
    }
    Ok(())
}

#[cfg(not(feature = "parallel"))]
fn edge_pass(
    op: &StandardEdgeOperator,
    inputs: &EdgeInputs<'_>,
    coloring: &EdgeColoring,
    pass: Pass,
    residual: &mut BlockVector,
    mut jacobian: Option<&mut BlockCsrMatrix>,
) -> Result<()> {
    let mut out = EdgeResidual::new(inputs.n_var);
    for color in coloring.iter() {
        for &e in color {
            let ctx = match pass {
                Pass::Convective => inputs.convective(e),
                Pass::Viscous => inputs.viscous(e),
            };
            op.compute(&ctx, &mut out);
            let edge = inputs.mesh.edge(e);
            scatter(residual, jacobian.as_deref_mut(), edge.i, edge.j, &out, pass.sign())?;
        }
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn edge_pass(
    op: &StandardEdgeOperator,
    inputs: &EdgeInputs<'_>,
    coloring: &EdgeColoring,
    pass: Pass,
    residual: &mut BlockVector,
    mut jacobian: Option<&mut BlockCsrMatrix>,
) -> Result<()> {
    use rayon::prelude::*;

    for color in coloring.iter() {
        let results: Vec<EdgeResidual> = color
            .par_iter()
            .map(|&e| {
                let ctx = match pass {
                    Pass::Convective => inputs.convective(e),
                    Pass::Viscous => inputs.viscous(e),
                };
                let mut out = EdgeResidual::new(inputs.n_var);
                op.compute(&ctx, &mut out);
                out
            })
            .collect();

        for (&e, out) in color.iter().zip(&results) {
            let edge = inputs.mesh.edge(e);
            scatter(residual, jacobian.as_deref_mut(), edge.i, edge.j, out, pass.sign())?;
        }
    }
    Ok(())
}

/// Assembles the residual and Jacobian of the incompressible equations.
pub struct ResidualAssembler {
    config: OperatorConfig,
    convective: StandardEdgeOperator,
    boundary_convective: UpwindFds,
    viscous: Option<StandardEdgeOperator>,
    boundary_viscous: Option<AvgGrad>,
    sources: Vec<StandardSource>,
    boundaries: BoundarySet,
    gradient_method: GradientMethod,
    coloring: EdgeColoring,

    residual: BlockVector,
    jacobian: Option<BlockCsrMatrix>,
    und_lapl: Vec<f64>,
    sensor: Vec<f64>,
    lambda_inv: Vec<f64>,
    lambda_visc: Vec<f64>,
    dirichlet: Vec<(usize, usize)>,
    non_physical: usize,
}

impl ResidualAssembler {
    /// Build the operators and allocate residual and Jacobian storage.
    ///
    /// The Jacobian is only allocated for implicit runs.
    pub fn new(
        mesh: &DualMesh,
        config: OperatorConfig,
        scheme: &SchemeSetup,
        sources: Vec<StandardSource>,
        boundaries: BoundarySet,
    ) -> Result<Self> {
        if mesh.n_dim() != config.n_dim {
            return Err(SolverError::Unsupported(format!(
                "operators built for nDim = {} on a {}D mesh",
                config.n_dim,
                mesh.n_dim()
            )));
        }
        if !scheme.convective.is_convective() {
            return Err(SolverError::Unsupported(format!(
                "{:?} is not a convective scheme",
                scheme.convective
            )));
        }
        if let Some(kind) = scheme.viscous.filter(|k| !k.is_viscous()) {
            return Err(SolverError::Unsupported(format!("{kind:?} is not a viscous scheme")));
        }
        for source in &sources {
            source.check_dimension(config.n_dim)?;
        }

        let convective = StandardEdgeOperator::from_kind(scheme.convective, config, &scheme.dissipation);
        let viscous = scheme
            .viscous
            .map(|kind| StandardEdgeOperator::from_kind(kind, config, &scheme.dissipation));

        let n_point = mesh.n_point();
        let n_var = config.n_var();
        let coloring = EdgeColoring::greedy(mesh);

        info!(
            convective = convective.name(),
            viscous = viscous.as_ref().map_or("none", |v| v.name()),
            sources = sources.len(),
            markers = boundaries.len(),
            n_dim = config.n_dim,
            n_point,
            n_edge = mesh.n_edge(),
            n_colors = coloring.n_colors(),
            implicit = config.implicit,
            "residual assembler ready"
        );
        if viscous.is_some() && boundaries.has_outlet() {
            warn!("outlet markers carry no viscous boundary contribution");
        }

        Ok(Self {
            config,
            convective,
            boundary_convective: UpwindFds::new(config),
            boundary_viscous: viscous.map(|_| AvgGrad::new(config)),
            viscous,
            sources,
            boundaries,
            gradient_method: scheme.gradient_method,
            coloring,
            residual: BlockVector::zeros(n_point, n_var),
            jacobian: config
                .implicit
                .then(|| BlockCsrMatrix::from_mesh(mesh, n_var)),
            und_lapl: vec![0.0; n_point * n_var],
            sensor: vec![0.0; n_point],
            lambda_inv: vec![0.0; n_point],
            lambda_visc: vec![0.0; n_point],
            dirichlet: Vec::new(),
            non_physical: 0,
        })
    }

    /// Scheme flags.
    #[inline]
    pub fn config(&self) -> &OperatorConfig {
        &self.config
    }

    /// Convective operator.
    pub fn convective(&self) -> &StandardEdgeOperator {
        &self.convective
    }

    /// Viscous operator.
    pub fn viscous(&self) -> Option<&StandardEdgeOperator> {
        self.viscous.as_ref()
    }

    /// Source terms.
    pub fn sources(&self) -> &[StandardSource] {
        &self.sources
    }

    /// Boundary conditions.
    pub fn boundaries(&self) -> &BoundarySet {
        &self.boundaries
    }

    /// Assembled residual.
    #[inline]
    pub fn residual(&self) -> &BlockVector {
        &self.residual
    }

    /// Assembled Jacobian, for implicit runs.
    #[inline]
    pub fn jacobian(&self) -> Option<&BlockCsrMatrix> {
        self.jacobian.as_ref()
    }

    /// Jacobian and residual for in-place modification by time integrators.
    pub fn system_mut(&mut self) -> (Option<&mut BlockCsrMatrix>, &mut BlockVector) {
        (self.jacobian.as_mut(), &mut self.residual)
    }

    /// Integrated inviscid spectral radius per point.
    pub fn lambda_inviscid(&self) -> &[f64] {
        &self.lambda_inv
    }

    /// Integrated viscous spectral radius per point (zero when inviscid).
    pub fn lambda_viscous(&self) -> &[f64] {
        &self.lambda_visc
    }

    /// Undivided Laplacian of the unknowns, stride `nVar`.
    pub fn undivided_laplacian(&self) -> &[f64] {
        &self.und_lapl
    }

    /// Pressure sensor per point.
    pub fn pressure_sensor(&self) -> &[f64] {
        &self.sensor
    }

    /// `(point, variable)` rows pinned by strong boundary conditions.
    pub fn dirichlet_rows(&self) -> &[(usize, usize)] {
        &self.dirichlet
    }

    /// Points skipped by the last property update.
    pub fn non_physical_points(&self) -> usize {
        self.non_physical
    }

    fn needs_gradients(&self) -> bool {
        self.viscous.is_some() || self.sources.iter().any(|s| s.needs_gradients())
    }

    /// Refresh properties, gradients, dissipation sensors and spectral radii.
    pub fn preprocess(&mut self, mesh: &DualMesh, state: &mut FlowState, halo: &dyn HaloExchange) {
        let layout = state.layout();
        let n_var = self.config.n_var();

        self.non_physical = state.update_primitives();
        if self.non_physical > 0 {
            warn!(points = self.non_physical, "non-physical temperature, properties kept");
        }

        if self.needs_gradients() {
            state.compute_gradients(mesh, self.gradient_method);
            if self.sources.iter().any(|s| s.needs_aux_gradient()) {
                state.compute_aux_gradient(mesh, self.gradient_method);
            }
            state.exchange(halo);
        }

        if self.convective.needs_laplacian() {
            undivided_laplacian(mesh, n_var, |p, k| state.primitive(p)[k], &mut self.und_lapl);
            pressure_sensor(mesh, |p| state.primitive(p)[layout.pressure()], &mut self.sensor);
            halo.exchange(&mut self.und_lapl, n_var);
            halo.exchange(&mut self.sensor, 1);
        }

        inviscid_spectral_radius(mesh, layout, state.primitives(), &mut self.lambda_inv);
        halo.exchange(&mut self.lambda_inv, 1);
        if self.viscous.is_some() {
            viscous_spectral_radius(
                mesh,
                layout,
                state.primitives(),
                self.config.energy,
                &mut self.lambda_visc,
            );
            halo.exchange(&mut self.lambda_visc, 1);
        }
    }

    /// Assemble residual and (implicit) Jacobian for the current state.
    ///
    /// Wall conditions overwrite the wall velocity and temperature in `state`.
    pub fn compute_residual(
        &mut self,
        mesh: &DualMesh,
        state: &mut FlowState,
        halo: &dyn HaloExchange,
    ) -> Result<()> {
        self.preprocess(mesh, state, halo);

        self.residual.set_zero();
        if let Some(jac) = self.jacobian.as_mut() {
            jac.set_zero();
        }
        self.dirichlet.clear();

        {
            let inputs = EdgeInputs {
                mesh,
                state,
                und_lapl: self.convective.needs_laplacian().then_some(self.und_lapl.as_slice()),
                sensor: &self.sensor,
                lambda: &self.lambda_inv,
                n_var: self.config.n_var(),
            };
            edge_pass(
                &self.convective,
                &inputs,
                &self.coloring,
                Pass::Convective,
                &mut self.residual,
                self.jacobian.as_mut(),
            )?;
            if let Some(viscous) = &self.viscous {
                edge_pass(
                    viscous,
                    &inputs,
                    &self.coloring,
                    Pass::Viscous,
                    &mut self.residual,
                    self.jacobian.as_mut(),
                )?;
            }
        }

        self.source_pass(mesh, state)?;

        let mut ctx = BoundaryContext {
            mesh,
            state,
            residual: &mut self.residual,
            jacobian: self.jacobian.as_mut(),
            convective: &self.boundary_convective,
            viscous: self.boundary_viscous.as_ref().map(|v| v as &dyn EdgeOperator),
            config: self.config,
            dirichlet: &mut self.dirichlet,
        };
        self.boundaries.apply(&mut ctx)?;

        if !self.residual.as_slice().iter().all(|r| r.is_finite()) {
            warn!("non-finite residual after assembly");
        }
        debug!(norm = self.residual.norm(), "residual assembled");
        Ok(())
    }

    fn source_pass(&mut self, mesh: &DualMesh, state: &FlowState) -> Result<()> {
        if self.sources.is_empty() {
            return Ok(());
        }
        let mut out = SourceResidual::new(self.config.n_var());
        for p in (0..mesh.n_point()).filter(|&p| mesh.is_domain(p)) {
            let ctx = SourceContext::new(state.primitive(p), mesh.coord(p), mesh.volume(p))
                .with_gradient(state.gradient(p))
                .with_aux_gradient(state.aux_gradient(p));
            for source in &self.sources {
                source.compute(&ctx, &mut out);
                self.residual.add_block(p, &out.residual);
                if let Some(jac) = self.jacobian.as_mut() {
                    jac.add_block(p, p, &out.jacobian)?;
                }
            }
        }
        Ok(())
    }

    /// RMS and maximum residual over the owned points.
    pub fn residual_norms(&self, mesh: &DualMesh, halo: &dyn HaloExchange) -> ResidualNorms {
        ResidualNorms::from_residual(mesh, &self.residual, halo)
    }

    /// Wall heat fluxes with totals reduced over all partitions.
    pub fn heat_fluxes(&self, mesh: &DualMesh, state: &FlowState, halo: &dyn HaloExchange) -> HeatFluxReport {
        let mut report = self.boundaries.heat_fluxes(mesh, state);
        report.total_heat_flux = halo.sum_reduce(report.total_heat_flux);
        report.max_heat_flux = halo.max_reduce(report.max_heat_flux);
        report
    }

    /// Mark the flow state as the differentiation input.
    pub fn register_inputs(&self, state: &mut FlowState, tape: &mut dyn AdjointTape) {
        tape.register_input(state.primitives_mut());
    }

    /// Mark the residual as the differentiation output.
    pub fn register_outputs(&mut self, tape: &mut dyn AdjointTape) {
        tape.register_output(self.residual.as_mut_slice());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adjoint::{RecordingTape, Registration};
    use crate::equations::{ConstantDensity, PrimitiveLayout, TransportModel};
    use crate::parallel::SerialHalo;

    const TOL: f64 = 1e-10;

    fn periodic_state(mesh: &DualMesh, viscosity: f64) -> FlowState {
        let layout = PrimitiveLayout::new(2).unwrap();
        let mut state = FlowState::new(
            layout,
            mesh.n_point(),
            ConstantDensity::new(1.0, 1000.0).into(),
            TransportModel::new(viscosity, Default::default()),
        );
        for p in 0..mesh.n_point() {
            let x = mesh.coord(p);
            let (s, c) = (x[0].sin(), x[1].cos());
            state.set_solution(p, &[1.0 + 0.1 * s, 1.0 + 0.2 * c, 0.3 * s * c, 300.0 + s]);
        }
        state
    }

    #[test]
    fn test_periodic_residual_sums_to_zero() {
        let mesh = DualMesh::periodic_rectangle(5, 4, 2.0, 1.5).unwrap();
        for (convective, viscous) in [
            (EdgeOperatorKind::Upwind, None),
            (EdgeOperatorKind::CenteredJst, None),
            (EdgeOperatorKind::CenteredLax, Some(EdgeOperatorKind::ViscousAvgGradCorrected)),
        ] {
            let mut state = periodic_state(&mesh, 0.01);
            let scheme = SchemeSetup {
                convective,
                viscous,
                ..SchemeSetup::default()
            };
            let mut assembler = ResidualAssembler::new(
                &mesh,
                OperatorConfig::new(2),
                &scheme,
                Vec::new(),
                BoundarySet::default(),
            )
            .unwrap();
            assembler.compute_residual(&mesh, &mut state, &SerialHalo).unwrap();

            let residual = assembler.residual();
            assert!(residual.norm() > 0.0);
            for k in 0..4 {
                let total: f64 = (0..mesh.n_point()).map(|p| residual.block(p)[k]).sum();
                assert!(total.abs() < TOL, "{convective:?}: var {k} sums to {total}");
            }
        }
    }

    #[test]
    fn test_rejects_misplaced_kinds() {
        let mesh = DualMesh::periodic_rectangle(3, 3, 1.0, 1.0).unwrap();
        let scheme = SchemeSetup {
            convective: EdgeOperatorKind::ViscousAvgGrad,
            ..SchemeSetup::default()
        };
        let result = ResidualAssembler::new(
            &mesh,
            OperatorConfig::new(2),
            &scheme,
            Vec::new(),
            BoundarySet::default(),
        );
        assert!(matches!(result, Err(SolverError::Unsupported(_))));
    }

    #[test]
    fn test_explicit_has_no_jacobian() {
        let mesh = DualMesh::periodic_rectangle(3, 3, 1.0, 1.0).unwrap();
        let assembler = ResidualAssembler::new(
            &mesh,
            OperatorConfig::new(2).with_implicit(false),
            &SchemeSetup::default(),
            Vec::new(),
            BoundarySet::default(),
        )
        .unwrap();
        assert!(assembler.jacobian().is_none());
    }

    #[test]
    fn test_adjoint_registration() {
        let mesh = DualMesh::periodic_rectangle(3, 3, 1.0, 1.0).unwrap();
        let mut state = periodic_state(&mesh, 0.0);
        let mut assembler = ResidualAssembler::new(
            &mesh,
            OperatorConfig::new(2),
            &SchemeSetup::default(),
            Vec::new(),
            BoundarySet::default(),
        )
        .unwrap();
        let mut tape = RecordingTape::new();
        assembler.register_inputs(&mut state, &mut tape);
        assembler.compute_residual(&mesh, &mut state, &SerialHalo).unwrap();
        assembler.register_outputs(&mut tape);
        assert_eq!(
            tape.events(),
            &[Registration::Input(9 * 11), Registration::Output(9 * 4)]
        );
    }
}

//! Boundary condition routines.
//!
//! Each condition acts on the vertices of one marker after the edge and
//! source passes. Weak conditions add boundary-face fluxes to the residual
//! and Jacobian; strong conditions overwrite rows (Dirichlet). Only owned
//! points are touched.
//!
//! Sign conventions follow the interior passes: vertex normals point out of
//! the domain, convective boundary fluxes are added, viscous boundary fluxes
//! are subtracted.

use std::sync::Arc;

use tracing::trace;

use super::conjugate::ConjugateHeatProvider;
use super::heat_flux::MarkerHeatFlux;
use super::markers::ChtMode;
use crate::error::Result;
use crate::flux::{EdgeContext, EdgeOperator, EdgeResidual, OperatorConfig};
use crate::linalg::{BlockCsrMatrix, BlockVector};
use crate::mesh::{DualMesh, Marker, Vertex};
use crate::solver::FlowState;
use crate::types::{JacBlock, MarkerIndex, VarBlock};

/// Everything a boundary routine may read or modify.
pub struct BoundaryContext<'a> {
    /// Geometry
    pub mesh: &'a DualMesh,
    /// Flow state (walls overwrite velocity and temperature)
    pub state: &'a mut FlowState,
    /// Global residual
    pub residual: &'a mut BlockVector,
    /// Global Jacobian, present for implicit runs
    pub jacobian: Option<&'a mut BlockCsrMatrix>,
    /// Convective operator for boundary faces
    pub convective: &'a dyn EdgeOperator,
    /// Viscous operator, present for viscous runs
    pub viscous: Option<&'a dyn EdgeOperator>,
    /// Scheme flags
    pub config: OperatorConfig,
    /// `(point, variable)` rows pinned by strong conditions
    pub dirichlet: &'a mut Vec<(usize, usize)>,
}

impl BoundaryContext<'_> {
    /// Zero velocity, zero momentum residuals and delete momentum rows.
    fn no_slip(&mut self, point: usize) {
        let layout = self.state.layout();
        for d in 0..layout.n_dim() {
            self.state.set_variable(point, layout.velocity(d), 0.0);
            self.residual.set_component_zero(point, 1 + d);
            if let Some(jac) = self.jacobian.as_deref_mut() {
                jac.delete_row(point, 1 + d);
            }
            self.dirichlet.push((point, 1 + d));
        }
    }

    /// Pin the temperature of a point.
    fn fix_temperature(&mut self, point: usize, temperature: f64) {
        let t = self.config.energy_index();
        self.state.set_variable(point, t, temperature);
        self.residual.set_component_zero(point, t);
        if let Some(jac) = self.jacobian.as_deref_mut() {
            jac.delete_row(point, t);
        }
        self.dirichlet.push((point, t));
    }

    /// Add the energy residual `value` and its diagonal derivative.
    fn add_energy(&mut self, point: usize, value: f64, derivative: f64) {
        let t = self.config.energy_index();
        self.residual.block_mut(point)[t] += value;
        if derivative != 0.0 {
            if let Some(jac) = self.jacobian.as_deref_mut() {
                let mut block = JacBlock::zeros(self.config.n_var());
                block[(t, t)] = derivative;
                jac.add_block_to_diag(point, 1.0, &block);
            }
        }
    }

    /// Convective (and optionally viscous) flux through a boundary face
    /// towards `ghost`.
    fn ghost_flux(&mut self, vertex: &Vertex, ghost: &[f64], with_viscous: bool) -> Result<()> {
        let n_dim = self.config.n_dim;
        let point = vertex.point;
        let v_domain = self.state.primitive(point).to_vec();
        let normal = &vertex.normal[..n_dim];
        let mut out = EdgeResidual::new(self.config.n_var());

        self.convective
            .compute(&EdgeContext::new(normal, &v_domain, ghost), &mut out);
        self.residual.add_block(point, &out.residual);
        if let Some(jac) = self.jacobian.as_deref_mut() {
            jac.add_block(point, point, &out.jac_i)?;
        }

        if let Some(viscous) = self.viscous.filter(|_| with_viscous) {
            let grad = *self.state.gradient(point);
            let ctx = EdgeContext::new(normal, &v_domain, ghost)
                .with_coords(self.mesh.coord(point), self.mesh.coord(vertex.normal_neighbor))
                .with_gradients(&grad, &grad);
            viscous.compute(&ctx, &mut out);
            self.residual.subtract_block(point, &out.residual);
            if let Some(jac) = self.jacobian.as_deref_mut() {
                jac.subtract_block(point, point, &out.jac_i)?;
            }
        }
        Ok(())
    }
}

/// A boundary condition attached to one marker.
pub trait BoundaryCondition: Send + Sync {
    /// Apply the condition on the owned vertices of `marker`.
    fn apply(&self, ctx: &mut BoundaryContext<'_>, marker: MarkerIndex) -> Result<()>;

    /// Name for logging.
    fn name(&self) -> &'static str;

    /// Strong conditions overwrite rows and run after all weak ones.
    fn is_strong(&self) -> bool {
        false
    }

    /// Pressure outlets have no viscous boundary term.
    fn is_outlet(&self) -> bool {
        false
    }

    /// Integrated wall heat flux, for walls.
    fn heat_flux(&self, _mesh: &DualMesh, _state: &FlowState, _marker: MarkerIndex) -> Option<MarkerHeatFlux> {
        None
    }
}

/// Owned vertices of a marker with their position in the vertex list.
fn owned<'m>(mesh: &'m DualMesh, marker: &'m Marker) -> impl Iterator<Item = (usize, &'m Vertex)> {
    marker
        .vertices
        .iter()
        .enumerate()
        .filter(move |(_, v)| mesh.is_domain(v.point))
}

/// `Σ k·(T_wall − T_nn)/d·A` over the owned vertices of a marker.
fn conduction<F>(mesh: &DualMesh, state: &FlowState, marker: &Marker, wall_temperature: F) -> f64
where
    F: Fn(usize, &Vertex) -> f64,
{
    let layout = state.layout();
    let n_dim = mesh.n_dim();
    owned(mesh, marker)
        .map(|(k, vertex)| {
            let (p, nn) = (vertex.point, vertex.normal_neighbor);
            let dist2: f64 = (0..n_dim)
                .map(|d| (mesh.coord(nn)[d] - mesh.coord(p)[d]).powi(2))
                .sum();
            if dist2 == 0.0 {
                return 0.0;
            }
            let conductivity = state.primitive(p)[layout.conductivity()];
            let t_nn = state.primitive(nn)[layout.temperature()];
            conductivity * (wall_temperature(k, vertex) - t_nn) / dist2.sqrt() * vertex.area()
        })
        .sum()
}

// =============================================================================
// Walls
// =============================================================================

/// No-slip wall with prescribed heat flux.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HeatFluxWall {
    /// Heat flux into the fluid (W/m²), already divided by the marker area
    /// when the configured value was an integrated total
    pub heat_flux: f64,
}

impl BoundaryCondition for HeatFluxWall {
    fn apply(&self, ctx: &mut BoundaryContext<'_>, marker: MarkerIndex) -> Result<()> {
        let mesh = ctx.mesh;
        for (_, vertex) in owned(mesh, mesh.marker(marker)) {
            ctx.no_slip(vertex.point);
            if ctx.config.energy {
                ctx.add_energy(vertex.point, -self.heat_flux * vertex.area(), 0.0);
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "heat_flux_wall"
    }

    fn is_strong(&self) -> bool {
        true
    }

    fn heat_flux(&self, mesh: &DualMesh, state: &FlowState, marker: MarkerIndex) -> Option<MarkerHeatFlux> {
        let m = mesh.marker(marker);
        let t = state.layout().temperature();
        let heat_flux = conduction(mesh, state, m, |_, v| state.primitive(v.point)[t]);

        let (weighted, area) = owned(mesh, m).fold((0.0, 0.0), |(w, a), (_, v)| {
            (w + state.primitive(v.point)[t] * v.area(), a + v.area())
        });
        Some(MarkerHeatFlux {
            tag: m.tag.clone(),
            heat_flux,
            average_temperature: (area > 0.0).then(|| weighted / area),
            area,
        })
    }
}

/// No-slip wall at fixed temperature.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IsothermalWall {
    /// Wall temperature
    pub temperature: f64,
}

impl BoundaryCondition for IsothermalWall {
    fn apply(&self, ctx: &mut BoundaryContext<'_>, marker: MarkerIndex) -> Result<()> {
        let mesh = ctx.mesh;
        for (_, vertex) in owned(mesh, mesh.marker(marker)) {
            ctx.no_slip(vertex.point);
            if ctx.config.energy {
                ctx.fix_temperature(vertex.point, self.temperature);
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "isothermal_wall"
    }

    fn is_strong(&self) -> bool {
        true
    }

    fn heat_flux(&self, mesh: &DualMesh, state: &FlowState, marker: MarkerIndex) -> Option<MarkerHeatFlux> {
        let m = mesh.marker(marker);
        Some(MarkerHeatFlux {
            tag: m.tag.clone(),
            heat_flux: conduction(mesh, state, m, |_, _| self.temperature),
            average_temperature: None,
            area: owned(mesh, m).map(|(_, v)| v.area()).sum(),
        })
    }
}

/// Wall coupled to an external solid solver.
#[derive(Clone)]
pub struct ChtInterface {
    mode: ChtMode,
    provider: Arc<dyn ConjugateHeatProvider>,
}

impl ChtInterface {
    /// Create the interface.
    pub fn new(mode: ChtMode, provider: Arc<dyn ConjugateHeatProvider>) -> Self {
        Self { mode, provider }
    }
}

impl BoundaryCondition for ChtInterface {
    fn apply(&self, ctx: &mut BoundaryContext<'_>, marker: MarkerIndex) -> Result<()> {
        let mesh = ctx.mesh;
        let t = ctx.config.energy_index();
        for (k, vertex) in owned(mesh, mesh.marker(marker)) {
            let point = vertex.point;
            ctx.no_slip(point);
            if !ctx.config.energy {
                continue;
            }
            match self.mode {
                ChtMode::Temperature => {
                    ctx.fix_temperature(point, self.provider.wall_temperature(marker, k));
                }
                ChtMode::HeatFlux => {
                    let g = self.provider.conductance(marker, k);
                    let t_conj = self.provider.neighbor_temperature(marker, k);
                    let t_i = ctx.state.primitive(point)[t];
                    let area = vertex.area();
                    ctx.add_energy(point, g * (t_i - t_conj) * area, g * area);
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "cht_interface"
    }

    fn is_strong(&self) -> bool {
        true
    }

    fn heat_flux(&self, mesh: &DualMesh, state: &FlowState, marker: MarkerIndex) -> Option<MarkerHeatFlux> {
        let m = mesh.marker(marker);
        let t = state.layout().temperature();
        Some(MarkerHeatFlux {
            tag: m.tag.clone(),
            heat_flux: conduction(mesh, state, m, |_, v| state.primitive(v.point)[t]),
            average_temperature: None,
            area: owned(mesh, m).map(|(_, v)| v.area()).sum(),
        })
    }
}

// =============================================================================
// Open boundaries
// =============================================================================

/// Velocity inlet: prescribed velocity and temperature, pressure from the
/// domain.
#[derive(Clone, Debug, PartialEq)]
pub struct Inlet {
    velocity: Vec<f64>,
    temperature: f64,
}

impl Inlet {
    /// Velocity `magnitude · direction / |direction|`.
    pub fn new(magnitude: f64, direction: &[f64], temperature: f64) -> Self {
        let norm = direction.iter().map(|d| d * d).sum::<f64>().sqrt();
        let velocity = if norm > 0.0 {
            direction.iter().map(|d| magnitude * d / norm).collect()
        } else {
            vec![0.0; direction.len()]
        };
        Self {
            velocity,
            temperature,
        }
    }

    /// Inflow velocity vector.
    pub fn velocity(&self) -> &[f64] {
        &self.velocity
    }
}

impl BoundaryCondition for Inlet {
    fn apply(&self, ctx: &mut BoundaryContext<'_>, marker: MarkerIndex) -> Result<()> {
        let mesh = ctx.mesh;
        let layout = ctx.state.layout();
        for (_, vertex) in owned(mesh, mesh.marker(marker)) {
            let pressure = ctx.state.primitive(vertex.point)[layout.pressure()];
            let ghost = ctx.state.ghost_state(pressure, &self.velocity, self.temperature);
            ctx.ghost_flux(vertex, &ghost, true)?;
        }
        trace!(marker = %marker, "inlet applied");
        Ok(())
    }

    fn name(&self) -> &'static str {
        "inlet"
    }
}

/// Pressure outlet: back pressure imposed, velocity and temperature from the
/// domain.
///
/// The viscous boundary term is not included.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Outlet {
    /// Back pressure
    pub pressure: f64,
}

impl BoundaryCondition for Outlet {
    fn apply(&self, ctx: &mut BoundaryContext<'_>, marker: MarkerIndex) -> Result<()> {
        let mesh = ctx.mesh;
        let layout = ctx.state.layout();
        for (_, vertex) in owned(mesh, mesh.marker(marker)) {
            let v = ctx.state.primitive(vertex.point);
            let velocity = layout.velocity_slice(v).to_vec();
            let temperature = v[layout.temperature()];
            let ghost = ctx.state.ghost_state(self.pressure, &velocity, temperature);
            ctx.ghost_flux(vertex, &ghost, false)?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "outlet"
    }

    fn is_outlet(&self) -> bool {
        true
    }
}

/// Slip wall: only the pressure force acts on the boundary face.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Symmetry;

impl BoundaryCondition for Symmetry {
    fn apply(&self, ctx: &mut BoundaryContext<'_>, marker: MarkerIndex) -> Result<()> {
        let mesh = ctx.mesh;
        let n_dim = ctx.config.n_dim;
        let n_var = ctx.config.n_var();
        let p_idx = ctx.state.layout().pressure();

        let mut residual = VarBlock::zeros(n_var);
        let mut jacobian = JacBlock::zeros(n_var);
        for (_, vertex) in owned(mesh, mesh.marker(marker)) {
            let pressure = ctx.state.primitive(vertex.point)[p_idx];
            residual.set_zero();
            for d in 0..n_dim {
                residual[1 + d] = pressure * vertex.normal[d];
                jacobian[(1 + d, 0)] = vertex.normal[d];
            }
            ctx.residual.add_block(vertex.point, &residual);
            if let Some(jac) = ctx.jacobian.as_deref_mut() {
                jac.add_block(vertex.point, vertex.point, &jacobian)?;
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "symmetry"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::boundary::UniformConjugate;
    use crate::equations::{ConstantDensity, PrimitiveLayout, TransportModel};
    use crate::flux::UpwindFds;

    const TOL: f64 = 1e-12;

    struct Fixture {
        mesh: DualMesh,
        state: FlowState,
        residual: BlockVector,
        jacobian: BlockCsrMatrix,
        upwind: UpwindFds,
        config: OperatorConfig,
        dirichlet: Vec<(usize, usize)>,
    }

    impl Fixture {
        fn new() -> Self {
            let mesh = DualMesh::structured_rectangle(2, 2, 1.0, 1.0).unwrap();
            let layout = PrimitiveLayout::new(2).unwrap();
            let mut state = FlowState::new(
                layout,
                mesh.n_point(),
                ConstantDensity::new(1.0, 1000.0).into(),
                TransportModel::new(1e-3, Default::default()),
            );
            state.set_uniform(&[2.0, 1.0, 0.5, 300.0]);
            state.update_primitives();
            let config = OperatorConfig::new(2);
            let mut residual = BlockVector::zeros(mesh.n_point(), 4);
            for x in residual.as_mut_slice() {
                *x = 1.0;
            }
            let mut jacobian = BlockCsrMatrix::from_mesh(&mesh, 4);
            for p in 0..mesh.n_point() {
                jacobian.add_val_to_diag(p, 5.0);
            }
            Self {
                jacobian,
                residual,
                state,
                upwind: UpwindFds::new(config),
                config,
                mesh,
                dirichlet: Vec::new(),
            }
        }

        fn apply(&mut self, bc: &dyn BoundaryCondition, tag: &str) {
            let marker = self.mesh.marker_index(tag).unwrap();
            let mut ctx = BoundaryContext {
                mesh: &self.mesh,
                state: &mut self.state,
                residual: &mut self.residual,
                jacobian: Some(&mut self.jacobian),
                convective: &self.upwind,
                viscous: None,
                config: self.config,
                dirichlet: &mut self.dirichlet,
            };
            bc.apply(&mut ctx, marker).unwrap();
        }
    }

    #[test]
    fn test_isothermal_wall_is_dirichlet() {
        let mut fx = Fixture::new();
        fx.apply(&IsothermalWall { temperature: 350.0 }, "bottom");
        for p in 0..3 {
            let v = fx.state.solution(p);
            assert_eq!(&v[1..], &[0.0, 0.0, 350.0]);
            assert_eq!(&fx.residual.block(p)[1..], &[0.0, 0.0, 0.0]);
            let diag = fx.jacobian.get_block(p, p).unwrap();
            assert_eq!(diag[(3, 3)], 1.0);
            assert_eq!(diag[(0, 0)], 5.0);
        }
        // interior point untouched
        assert_eq!(fx.residual.block(4), &[1.0; 4]);
        assert!(fx.dirichlet.contains(&(0, 3)));
        assert!(fx.dirichlet.contains(&(2, 1)));
    }

    #[test]
    fn test_heat_flux_wall_adds_flux() {
        let mut fx = Fixture::new();
        fx.apply(&HeatFluxWall { heat_flux: 100.0 }, "top");
        let marker = fx.mesh.marker(fx.mesh.marker_index("top").unwrap());
        for vertex in &marker.vertices {
            let r = fx.residual.block(vertex.point);
            assert!((r[3] - (1.0 - 100.0 * vertex.area())).abs() < TOL);
            assert_eq!(r[1], 0.0);
        }
    }

    #[test]
    fn test_symmetry_pressure_force() {
        let mut fx = Fixture::new();
        fx.apply(&Symmetry, "right");
        let marker = fx.mesh.marker(fx.mesh.marker_index("right").unwrap());
        for vertex in &marker.vertices {
            let r = fx.residual.block(vertex.point);
            let expected = 1.0 + 2.0 * vertex.normal[0];
            assert!((r[1] - expected).abs() < TOL);
            let diag = fx.jacobian.get_block(vertex.point, vertex.point).unwrap();
            assert!((diag[(1, 0)] - vertex.normal[0]).abs() < TOL);
        }
    }

    #[test]
    fn test_cht_heat_flux_mode() {
        let mut fx = Fixture::new();
        let provider = Arc::new(UniformConjugate::new(290.0, 10.0));
        fx.apply(&ChtInterface::new(ChtMode::HeatFlux, provider), "bottom");
        let marker = fx.mesh.marker(fx.mesh.marker_index("bottom").unwrap());
        for vertex in &marker.vertices {
            let area = vertex.area();
            let r = fx.residual.block(vertex.point);
            assert!((r[3] - (1.0 + 10.0 * 10.0 * area)).abs() < TOL);
            let diag = fx.jacobian.get_block(vertex.point, vertex.point).unwrap();
            assert!((diag[(3, 3)] - (5.0 + 10.0 * area)).abs() < TOL);
        }
    }

    #[test]
    fn test_inlet_matching_state_has_only_physical_flux() {
        let mut fx = Fixture::new();
        fx.residual.set_zero();
        // ghost equals the domain state: upwind flux reduces to F(V)·n
        fx.apply(&Inlet::new(5.0_f64.sqrt() / 2.0, &[1.0, 0.5], 300.0), "left");
        let marker = fx.mesh.marker(fx.mesh.marker_index("left").unwrap());
        for vertex in &marker.vertices {
            let r = fx.residual.block(vertex.point);
            // ρ u·n with n = (−A, 0)
            let mass = 1.0 * 1.0 * vertex.normal[0];
            assert!((r[0] - mass).abs() < 1e-10);
        }
    }
}

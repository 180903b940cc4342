//! Boundary conditions for the incompressible flow solver.
//!
//! # Available conditions
//!
//! | Kind | Momentum | Energy |
//! |------|----------|--------|
//! | `HeatFluxWall` | no-slip (strong) | `−q·A` added to the residual |
//! | `IsothermalWall` | no-slip (strong) | T pinned (strong) |
//! | `Inlet` | ghost-state flux | ghost-state flux |
//! | `Outlet` | ghost-state flux, back pressure | ghost-state flux |
//! | `Symmetry` | pressure force `p·n` | none |
//! | `ChtInterface` | no-slip (strong) | T pinned or `G·(T − T_solid)·A` |
//!
//! Weak conditions run before strong ones, so a point shared by an inlet and
//! a wall ends up with the wall's Dirichlet rows.

mod conditions;
mod conjugate;
mod heat_flux;
mod markers;

use std::sync::Arc;

use tracing::debug;

pub use conditions::{
    BoundaryCondition, BoundaryContext, ChtInterface, HeatFluxWall, Inlet, IsothermalWall, Outlet,
    Symmetry,
};
pub use conjugate::{ConjugateHeatProvider, UniformConjugate};
pub use heat_flux::{HeatFluxReport, MarkerHeatFlux};
pub use markers::{ChtMode, MarkerConfig, MarkerKind};

use crate::error::{Result, SolverError};
use crate::mesh::DualMesh;
use crate::solver::FlowState;
use crate::types::MarkerIndex;

/// A configured condition bound to a mesh marker.
pub struct BoundaryEntry {
    /// Mesh marker
    pub marker: MarkerIndex,
    /// Include in heat flux totals
    pub monitored: bool,
    /// Condition
    pub condition: Box<dyn BoundaryCondition>,
}

/// The boundary conditions of every mesh marker.
#[derive(Default)]
pub struct BoundarySet {
    entries: Vec<BoundaryEntry>,
}

impl BoundarySet {
    /// Bind marker configurations to the mesh markers by tag.
    ///
    /// Every mesh marker must be configured. CHT interfaces need a
    /// `conjugate` provider.
    pub fn new(
        mesh: &DualMesh,
        configs: &[MarkerConfig],
        conjugate: Option<Arc<dyn ConjugateHeatProvider>>,
    ) -> Result<Self> {
        let mut entries = Vec::with_capacity(mesh.markers().len());
        for (index, marker) in mesh.markers().iter().enumerate() {
            let config = configs
                .iter()
                .find(|c| c.tag == marker.tag)
                .ok_or_else(|| SolverError::UnconfiguredMarker(marker.tag.clone()))?;
            config.validate(mesh.n_dim())?;

            let condition: Box<dyn BoundaryCondition> = match &config.kind {
                MarkerKind::HeatFluxWall {
                    heat_flux,
                    integrated,
                } => {
                    let area = marker.area();
                    let heat_flux = if *integrated && area > 0.0 {
                        heat_flux / area
                    } else {
                        *heat_flux
                    };
                    Box::new(HeatFluxWall { heat_flux })
                }
                MarkerKind::IsothermalWall { temperature } => Box::new(IsothermalWall {
                    temperature: *temperature,
                }),
                MarkerKind::Inlet {
                    velocity_magnitude,
                    flow_direction,
                    temperature,
                } => Box::new(Inlet::new(*velocity_magnitude, flow_direction, *temperature)),
                MarkerKind::Outlet { pressure } => Box::new(Outlet {
                    pressure: *pressure,
                }),
                MarkerKind::Symmetry => Box::new(Symmetry),
                MarkerKind::ChtInterface { mode } => {
                    let provider = conjugate.clone().ok_or_else(|| {
                        SolverError::Unsupported(format!(
                            "CHT marker '{}' needs a conjugate heat provider",
                            marker.tag
                        ))
                    })?;
                    Box::new(ChtInterface::new(*mode, provider))
                }
            };

            debug!(marker = %marker.tag, condition = condition.name(), "boundary bound");
            entries.push(BoundaryEntry {
                marker: MarkerIndex::new(index),
                monitored: config.monitored,
                condition,
            });
        }
        Ok(Self { entries })
    }

    /// Number of bound markers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when the mesh has no markers.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bound conditions.
    pub fn iter(&self) -> impl Iterator<Item = &BoundaryEntry> {
        self.entries.iter()
    }

    /// True if any marker is a pressure outlet.
    pub fn has_outlet(&self) -> bool {
        self.entries.iter().any(|e| e.condition.is_outlet())
    }

    /// Apply weak conditions, then strong ones.
    pub fn apply(&self, ctx: &mut BoundaryContext<'_>) -> Result<()> {
        for strong in [false, true] {
            for entry in self.entries.iter().filter(|e| e.condition.is_strong() == strong) {
                entry.condition.apply(ctx, entry.marker)?;
            }
        }
        Ok(())
    }

    /// Wall heat fluxes and monitored totals.
    pub fn heat_fluxes(&self, mesh: &DualMesh, state: &FlowState) -> HeatFluxReport {
        let mut report = HeatFluxReport::default();
        for entry in &self.entries {
            if let Some(flux) = entry.condition.heat_flux(mesh, state, entry.marker) {
                report.push(flux, entry.monitored);
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walls() -> Vec<MarkerConfig> {
        vec![
            MarkerConfig::new("left", MarkerKind::IsothermalWall { temperature: 310.0 }).monitored(),
            MarkerConfig::new("right", MarkerKind::IsothermalWall { temperature: 290.0 }).monitored(),
            MarkerConfig::new(
                "bottom",
                MarkerKind::HeatFluxWall {
                    heat_flux: 0.0,
                    integrated: false,
                },
            ),
            MarkerConfig::new(
                "top",
                MarkerKind::HeatFluxWall {
                    heat_flux: 0.0,
                    integrated: false,
                },
            ),
        ]
    }

    #[test]
    fn test_unconfigured_marker() {
        let mesh = DualMesh::structured_rectangle(2, 2, 1.0, 1.0).unwrap();
        let all = walls();
        assert!(matches!(
            BoundarySet::new(&mesh, &all[..3], None),
            Err(SolverError::UnconfiguredMarker(tag)) if tag == "top"
        ));
    }

    #[test]
    fn test_cht_requires_provider() {
        let mesh = DualMesh::structured_rectangle(2, 2, 1.0, 1.0).unwrap();
        let mut configs = walls();
        configs[0].kind = MarkerKind::ChtInterface {
            mode: ChtMode::HeatFlux,
        };
        assert!(BoundarySet::new(&mesh, &configs, None).is_err());
        let provider: Arc<dyn ConjugateHeatProvider> = Arc::new(UniformConjugate::new(300.0, 5.0));
        let set = BoundarySet::new(&mesh, &configs, Some(provider)).unwrap();
        assert_eq!(set.len(), 4);
        assert!(!set.has_outlet());
    }

    #[test]
    fn test_strong_conditions_run_last() {
        let mesh = DualMesh::structured_rectangle(2, 2, 1.0, 1.0).unwrap();
        let mut configs = walls();
        configs[0].kind = MarkerKind::Inlet {
            velocity_magnitude: 1.0,
            flow_direction: vec![1.0, 0.0],
            temperature: 300.0,
        };
        let set = BoundarySet::new(&mesh, &configs, None).unwrap();
        let order: Vec<bool> = set.iter().map(|e| e.condition.is_strong()).collect();
        assert_eq!(order, vec![false, true, true, true]);
    }
}

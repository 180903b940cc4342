//! Coupling data from an external solid-domain solver.

use crate::types::MarkerIndex;

/// Per-vertex data supplied by a coupled conjugate heat transfer solver.
///
/// `vertex` indexes the marker's vertex list.
pub trait ConjugateHeatProvider: Send + Sync {
    /// Interface temperature seen by the solid.
    fn wall_temperature(&self, marker: MarkerIndex, vertex: usize) -> f64;

    /// Heat transfer conductance `G` (W/(m²·K)).
    fn conductance(&self, marker: MarkerIndex, vertex: usize) -> f64;

    /// Solid temperature at the normal neighbor of the vertex.
    fn neighbor_temperature(&self, marker: MarkerIndex, vertex: usize) -> f64;
}

/// Spatially uniform coupling data.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct UniformConjugate {
    /// Interface temperature
    pub wall_temperature: f64,
    /// Conductance
    pub conductance: f64,
    /// Solid temperature next to the interface
    pub neighbor_temperature: f64,
}

impl UniformConjugate {
    /// Uniform solid at one temperature.
    pub fn new(temperature: f64, conductance: f64) -> Self {
        Self {
            wall_temperature: temperature,
            conductance,
            neighbor_temperature: temperature,
        }
    }
}

impl ConjugateHeatProvider for UniformConjugate {
    fn wall_temperature(&self, _marker: MarkerIndex, _vertex: usize) -> f64 {
        self.wall_temperature
    }

    fn conductance(&self, _marker: MarkerIndex, _vertex: usize) -> f64 {
        self.conductance
    }

    fn neighbor_temperature(&self, _marker: MarkerIndex, _vertex: usize) -> f64 {
        self.neighbor_temperature
    }
}

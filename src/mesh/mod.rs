//! Mesh representation.
//!
//! The residual assembly reads a median-dual mesh:
//! - Points with coordinates, dual volumes and neighbor lists
//! - Edges with area-weighted face normals
//! - Boundary markers with outward vertex normals
//! - Structured generators and an edge coloring for parallel loops

mod coloring;
mod dual_mesh;
mod generators;

pub use coloring::EdgeColoring;
pub use dual_mesh::{DualMesh, Edge, Marker, Vertex};

//! Median-dual mesh consumed by the residual assembly.
//!
//! The mesh stores:
//! - Point coordinates and dual-cell volumes
//! - Edges `(i, j)` with the area-weighted dual-face normal oriented from
//!   `i` to `j` and the vector from `i` to `j`
//! - Boundary markers holding vertices with an outward area-weighted normal
//!   and the nearest interior neighbor along that normal
//! - Per-point neighbor lists, ownership (`domain`) and physical-boundary flags
//!
//! Periodic edges carry the wrapped edge vector instead of the raw
//! coordinate difference.

use crate::error::{Result, SolverError};
use crate::types::{MAX_DIM, MarkerIndex, PointIndex};

/// Dual-mesh edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    /// First endpoint
    pub i: usize,
    /// Second endpoint
    pub j: usize,
    /// Area-weighted face normal, oriented from `i` to `j`
    pub normal: [f64; MAX_DIM],
    /// Vector from `i` to `j`
    pub edge_vector: [f64; MAX_DIM],
    periodic: bool,
}

impl Edge {
    /// Edge whose vector is taken from the point coordinates.
    pub fn new(i: usize, j: usize, normal: &[f64]) -> Self {
        Self {
            i,
            j,
            normal: pad(normal),
            edge_vector: [0.0; MAX_DIM],
            periodic: false,
        }
    }

    /// Edge across a periodic boundary with an explicit (wrapped) vector.
    pub fn periodic(i: usize, j: usize, normal: &[f64], edge_vector: &[f64]) -> Self {
        Self {
            i,
            j,
            normal: pad(normal),
            edge_vector: pad(edge_vector),
            periodic: true,
        }
    }

    /// True for edges built with [`Edge::periodic`].
    pub fn is_periodic(&self) -> bool {
        self.periodic
    }
}

/// Boundary vertex of a marker.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    /// Mesh point
    pub point: usize,
    /// Outward area-weighted normal
    pub normal: [f64; MAX_DIM],
    /// Interior point used for wall-normal derivatives
    pub normal_neighbor: usize,
}

impl Vertex {
    /// Create a boundary vertex.
    pub fn new(point: usize, normal: &[f64], normal_neighbor: usize) -> Self {
        Self {
            point,
            normal: pad(normal),
            normal_neighbor,
        }
    }

    /// Area of the boundary face.
    pub fn area(&self) -> f64 {
        self.normal.iter().map(|n| n * n).sum::<f64>().sqrt()
    }
}

/// Named set of boundary vertices.
#[derive(Clone, Debug, PartialEq)]
pub struct Marker {
    /// Marker tag
    pub tag: String,
    /// Boundary vertices
    pub vertices: Vec<Vertex>,
}

impl Marker {
    /// Create a marker.
    pub fn new(tag: impl Into<String>, vertices: Vec<Vertex>) -> Self {
        Self {
            tag: tag.into(),
            vertices,
        }
    }

    /// Total boundary area.
    pub fn area(&self) -> f64 {
        self.vertices.iter().map(Vertex::area).sum()
    }
}

fn pad(values: &[f64]) -> [f64; MAX_DIM] {
    let mut out = [0.0; MAX_DIM];
    for (dst, src) in out.iter_mut().zip(values) {
        *dst = *src;
    }
    out
}

/// Median-dual mesh.
#[derive(Clone, Debug)]
pub struct DualMesh {
    n_dim: usize,
    coords: Vec<[f64; MAX_DIM]>,
    volumes: Vec<f64>,
    edges: Vec<Edge>,
    markers: Vec<Marker>,
    neighbors: Vec<Vec<usize>>,
    domain: Vec<bool>,
    physical_boundary: Vec<bool>,
    global_index: Vec<usize>,
}

impl DualMesh {
    /// Build and validate a mesh where every point is owned.
    ///
    /// # Errors
    /// [`SolverError::UnsupportedDimension`] for `n_dim` other than 2 or 3 and
    /// [`SolverError::InvalidMesh`] for inconsistent connectivity.
    pub fn new(
        n_dim: usize,
        coords: Vec<[f64; MAX_DIM]>,
        volumes: Vec<f64>,
        mut edges: Vec<Edge>,
        markers: Vec<Marker>,
    ) -> Result<Self> {
        if n_dim != 2 && n_dim != 3 {
            return Err(SolverError::UnsupportedDimension(n_dim));
        }
        let n_point = coords.len();
        if volumes.len() != n_point {
            return Err(SolverError::LengthMismatch {
                what: "dual volumes",
                expected: n_point,
                found: volumes.len(),
            });
        }

        let mut neighbors = vec![Vec::new(); n_point];
        for (e, edge) in edges.iter_mut().enumerate() {
            if edge.i >= n_point || edge.j >= n_point {
                return Err(SolverError::InvalidMesh(format!(
                    "edge {e} references point ({}, {}) but the mesh has {n_point} points",
                    edge.i, edge.j
                )));
            }
            if edge.i == edge.j {
                return Err(SolverError::InvalidMesh(format!(
                    "edge {e} connects point {} to itself",
                    edge.i
                )));
            }
            if neighbors[edge.i].contains(&edge.j) {
                return Err(SolverError::InvalidMesh(format!(
                    "edge {e} duplicates an earlier edge between points {} and {}",
                    edge.i, edge.j
                )));
            }
            if !edge.periodic {
                for d in 0..n_dim {
                    edge.edge_vector[d] = coords[edge.j][d] - coords[edge.i][d];
                }
            }
            neighbors[edge.i].push(edge.j);
            neighbors[edge.j].push(edge.i);
        }

        let mut physical_boundary = vec![false; n_point];
        for marker in &markers {
            for vertex in &marker.vertices {
                if vertex.point >= n_point || vertex.normal_neighbor >= n_point {
                    return Err(SolverError::InvalidMesh(format!(
                        "marker '{}' references point {} (normal neighbor {}) out of range",
                        marker.tag, vertex.point, vertex.normal_neighbor
                    )));
                }
                physical_boundary[vertex.point] = true;
            }
        }

        Ok(Self {
            n_dim,
            coords,
            volumes,
            edges,
            markers,
            neighbors,
            domain: vec![true; n_point],
            physical_boundary,
            global_index: (0..n_point).collect(),
        })
    }

    /// Mark halo points and set global indices of a partitioned mesh.
    pub fn with_partition(mut self, domain: Vec<bool>, global_index: Vec<usize>) -> Result<Self> {
        let n_point = self.n_point();
        for (what, len) in [("domain flags", domain.len()), ("global indices", global_index.len())] {
            if len != n_point {
                return Err(SolverError::LengthMismatch {
                    what,
                    expected: n_point,
                    found: len,
                });
            }
        }
        self.domain = domain;
        self.global_index = global_index;
        Ok(self)
    }

    /// Spatial dimension.
    #[inline]
    pub fn n_dim(&self) -> usize {
        self.n_dim
    }

    /// Number of points including halos.
    #[inline]
    pub fn n_point(&self) -> usize {
        self.coords.len()
    }

    /// Number of owned points.
    pub fn n_point_domain(&self) -> usize {
        self.domain.iter().filter(|&&d| d).count()
    }

    /// Number of edges.
    #[inline]
    pub fn n_edge(&self) -> usize {
        self.edges.len()
    }

    /// Point coordinates (`n_dim` entries).
    #[inline]
    pub fn coord(&self, point: usize) -> &[f64] {
        &self.coords[point][..self.n_dim]
    }

    /// Dual-cell volume.
    #[inline]
    pub fn volume(&self, point: usize) -> f64 {
        self.volumes[point]
    }

    /// All edges.
    #[inline]
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// One edge.
    #[inline]
    pub fn edge(&self, edge: usize) -> &Edge {
        &self.edges[edge]
    }

    /// All markers.
    #[inline]
    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// One marker.
    #[inline]
    pub fn marker(&self, marker: MarkerIndex) -> &Marker {
        &self.markers[marker.get()]
    }

    /// Marker with the given tag.
    pub fn marker_index(&self, tag: &str) -> Option<MarkerIndex> {
        self.markers
            .iter()
            .position(|m| m.tag == tag)
            .map(MarkerIndex::new)
    }

    /// Neighbors of a point.
    #[inline]
    pub fn neighbors(&self, point: usize) -> &[usize] {
        &self.neighbors[point]
    }

    /// Number of neighbors of a point.
    #[inline]
    pub fn n_neighbors(&self, point: usize) -> usize {
        self.neighbors[point].len()
    }

    /// Whether the point is owned by this partition.
    #[inline]
    pub fn is_domain(&self, point: usize) -> bool {
        self.domain[point]
    }

    /// Whether the point lies on a physical boundary marker.
    #[inline]
    pub fn is_physical_boundary(&self, point: usize) -> bool {
        self.physical_boundary[point]
    }

    /// Global index of a point.
    #[inline]
    pub fn global_index(&self, point: PointIndex) -> usize {
        self.global_index[point.get()]
    }

    /// Local point with the given global index.
    pub fn local_index(&self, global: usize) -> Option<PointIndex> {
        self.global_index
            .iter()
            .position(|&g| g == global)
            .map(PointIndex::new)
    }

    /// Sum of signed face normals around each point (zero for closed cells).
    ///
    /// Used to check that the dual cells close.
    pub fn closure_defect(&self) -> Vec<[f64; MAX_DIM]> {
        let mut defect = vec![[0.0; MAX_DIM]; self.n_point()];
        for edge in &self.edges {
            for d in 0..self.n_dim {
                defect[edge.i][d] += edge.normal[d];
                defect[edge.j][d] -= edge.normal[d];
            }
        }
        for marker in &self.markers {
            for vertex in &marker.vertices {
                for d in 0..self.n_dim {
                    defect[vertex.point][d] += vertex.normal[d];
                }
            }
        }
        defect
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_points() -> (Vec<[f64; MAX_DIM]>, Vec<f64>) {
        (vec![[0.0; 3], [1.0, 0.0, 0.0]], vec![0.5, 0.5])
    }

    #[test]
    fn test_edge_vector_from_coords() {
        let (coords, volumes) = two_points();
        let mesh = DualMesh::new(2, coords, volumes, vec![Edge::new(0, 1, &[1.0, 0.0])], vec![]).unwrap();
        assert_eq!(mesh.edge(0).edge_vector[0], 1.0);
        assert_eq!(mesh.neighbors(0), &[1]);
        assert_eq!(mesh.n_neighbors(1), 1);
    }

    #[test]
    fn test_periodic_edge_keeps_vector() {
        let (coords, volumes) = two_points();
        let edge = Edge::periodic(1, 0, &[1.0, 0.0], &[1.0, 0.0]);
        let mesh = DualMesh::new(2, coords, volumes, vec![edge], vec![]).unwrap();
        assert_eq!(mesh.edge(0).edge_vector[0], 1.0);
        assert!(mesh.edge(0).is_periodic());
    }

    #[test]
    fn test_rejects_bad_edge() {
        let (coords, volumes) = two_points();
        let err = DualMesh::new(2, coords, volumes, vec![Edge::new(0, 5, &[1.0, 0.0])], vec![]);
        assert!(matches!(err, Err(SolverError::InvalidMesh(_))));
    }

    #[test]
    fn test_rejects_self_edge() {
        let (coords, volumes) = two_points();
        let err = DualMesh::new(2, coords, volumes, vec![Edge::new(1, 1, &[1.0, 0.0])], vec![]);
        assert!(matches!(err, Err(SolverError::InvalidMesh(_))));
    }

    #[test]
    fn test_rejects_duplicate_edge() {
        for (i, j) in [(0, 1), (1, 0)] {
            let (coords, volumes) = two_points();
            let edges = vec![Edge::new(0, 1, &[1.0, 0.0]), Edge::new(i, j, &[1.0, 0.0])];
            let err = DualMesh::new(2, coords, volumes, edges, vec![]);
            assert!(matches!(err, Err(SolverError::InvalidMesh(_))), "({i}, {j})");
        }
    }

    #[test]
    fn test_rejects_bad_marker() {
        let (coords, volumes) = two_points();
        let marker = Marker::new("wall", vec![Vertex::new(7, &[0.0, -1.0], 0)]);
        let err = DualMesh::new(2, coords, volumes, vec![], vec![marker]);
        assert!(matches!(err, Err(SolverError::InvalidMesh(_))));
    }

    #[test]
    fn test_rejects_volume_mismatch() {
        let (coords, _) = two_points();
        assert!(DualMesh::new(2, coords, vec![1.0], vec![], vec![]).is_err());
    }

    #[test]
    fn test_partition() {
        let (coords, volumes) = two_points();
        let mesh = DualMesh::new(2, coords, volumes, vec![], vec![])
            .unwrap()
            .with_partition(vec![true, false], vec![10, 11])
            .unwrap();
        assert_eq!(mesh.n_point_domain(), 1);
        assert!(!mesh.is_domain(1));
        assert_eq!(mesh.global_index(PointIndex::new(1)), 11);
        assert_eq!(mesh.local_index(10), Some(PointIndex::new(0)));
    }
}

//! Structured median-dual meshes for tests, demos and benchmarks.
//!
//! Point ordering: `p = b * n_x + a` for column `a` and row `b`.

use super::dual_mesh::{DualMesh, Edge, Marker, Vertex};
use crate::error::{Result, SolverError};
use crate::types::MAX_DIM;

impl DualMesh {
    /// Median dual of a Cartesian grid on `[0, lx] × [0, ly]`.
    ///
    /// `nx × ny` cells give `(nx + 1)(ny + 1)` points. Boundary points carry
    /// half (edge) or quarter (corner) volumes. Markers `left`, `right`,
    /// `bottom` and `top` hold outward normals; corner points belong to two
    /// markers with half-length faces each.
    ///
    /// # Arguments
    /// * `nx`, `ny` - number of cells in x and y
    /// * `lx`, `ly` - domain extent
    pub fn structured_rectangle(nx: usize, ny: usize, lx: f64, ly: f64) -> Result<Self> {
        if nx == 0 || ny == 0 {
            return Err(SolverError::InvalidMesh(
                "need at least one cell in each direction".into(),
            ));
        }
        if !(lx > 0.0 && ly > 0.0) {
            return Err(SolverError::InvalidMesh(format!(
                "invalid domain extent {lx} x {ly}"
            )));
        }

        let dx = lx / nx as f64;
        let dy = ly / ny as f64;
        let (npx, npy) = (nx + 1, ny + 1);
        let id = |a: usize, b: usize| b * npx + a;

        // Half the face length on the domain boundary
        let face_y = |b: usize| if b == 0 || b == ny { 0.5 * dy } else { dy };
        let face_x = |a: usize| if a == 0 || a == nx { 0.5 * dx } else { dx };

        let mut coords = Vec::with_capacity(npx * npy);
        let mut volumes = Vec::with_capacity(npx * npy);
        for b in 0..npy {
            for a in 0..npx {
                coords.push([a as f64 * dx, b as f64 * dy, 0.0]);
                volumes.push(face_x(a) * face_y(b));
            }
        }

        let mut edges = Vec::new();
        for b in 0..npy {
            for a in 0..npx {
                if a < nx {
                    edges.push(Edge::new(id(a, b), id(a + 1, b), &[face_y(b), 0.0]));
                }
                if b < ny {
                    edges.push(Edge::new(id(a, b), id(a, b + 1), &[0.0, face_x(a)]));
                }
            }
        }

        let left = (0..npy)
            .map(|b| Vertex::new(id(0, b), &[-face_y(b), 0.0], id(1, b)))
            .collect();
        let right = (0..npy)
            .map(|b| Vertex::new(id(nx, b), &[face_y(b), 0.0], id(nx - 1, b)))
            .collect();
        let bottom = (0..npx)
            .map(|a| Vertex::new(id(a, 0), &[0.0, -face_x(a)], id(a, 1)))
            .collect();
        let top = (0..npx)
            .map(|a| Vertex::new(id(a, ny), &[0.0, face_x(a)], id(a, ny - 1)))
            .collect();

        let markers = vec![
            Marker::new("left", left),
            Marker::new("right", right),
            Marker::new("bottom", bottom),
            Marker::new("top", top),
        ];

        DualMesh::new(2, coords, volumes, edges, markers)
    }

    /// Doubly periodic Cartesian mesh of `nx × ny` points.
    ///
    /// Every point has four neighbors and volume `dx·dy`; edges crossing the
    /// period carry wrapped edge vectors. There are no markers.
    pub fn periodic_rectangle(nx: usize, ny: usize, lx: f64, ly: f64) -> Result<Self> {
        if nx < 3 || ny < 3 {
            return Err(SolverError::InvalidMesh(
                "periodic mesh needs at least 3 points in each direction".into(),
            ));
        }
        if !(lx > 0.0 && ly > 0.0) {
            return Err(SolverError::InvalidMesh(format!(
                "invalid domain extent {lx} x {ly}"
            )));
        }

        let dx = lx / nx as f64;
        let dy = ly / ny as f64;
        let id = |a: usize, b: usize| b * nx + a;

        let mut coords: Vec<[f64; MAX_DIM]> = Vec::with_capacity(nx * ny);
        for b in 0..ny {
            for a in 0..nx {
                coords.push([a as f64 * dx, b as f64 * dy, 0.0]);
            }
        }
        let volumes = vec![dx * dy; nx * ny];

        let mut edges = Vec::with_capacity(2 * nx * ny);
        for b in 0..ny {
            for a in 0..nx {
                let east = id((a + 1) % nx, b);
                let north = id(a, (b + 1) % ny);
                if a + 1 == nx {
                    edges.push(Edge::periodic(id(a, b), east, &[dy, 0.0], &[dx, 0.0]));
                } else {
                    edges.push(Edge::new(id(a, b), east, &[dy, 0.0]));
                }
                if b + 1 == ny {
                    edges.push(Edge::periodic(id(a, b), north, &[0.0, dx], &[0.0, dy]));
                } else {
                    edges.push(Edge::new(id(a, b), north, &[0.0, dx]));
                }
            }
        }

        DualMesh::new(2, coords, volumes, edges, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-12;

    #[test]
    fn test_rectangle_counts_and_volume() {
        let mesh = DualMesh::structured_rectangle(4, 3, 2.0, 1.5).unwrap();
        assert_eq!(mesh.n_point(), 20);
        assert_eq!(mesh.n_edge(), 4 * 4 + 5 * 3);
        let total: f64 = (0..mesh.n_point()).map(|p| mesh.volume(p)).sum();
        assert!((total - 3.0).abs() < TOL);
    }

    #[test]
    fn test_rectangle_cells_close() {
        let mesh = DualMesh::structured_rectangle(5, 4, 1.0, 1.0).unwrap();
        for d in mesh.closure_defect() {
            assert!(d.iter().all(|x| x.abs() < TOL));
        }
    }

    #[test]
    fn test_rectangle_markers() {
        let mesh = DualMesh::structured_rectangle(2, 2, 1.0, 1.0).unwrap();
        let left = mesh.marker(mesh.marker_index("left").unwrap());
        assert_eq!(left.vertices.len(), 3);
        assert!((left.area() - 1.0).abs() < TOL);
        assert!(mesh.is_physical_boundary(0));
        assert!(!mesh.is_physical_boundary(4));
        assert_eq!(left.vertices[1].normal_neighbor, 4);
    }

    #[test]
    fn test_periodic_cells_close() {
        let mesh = DualMesh::periodic_rectangle(4, 3, 1.0, 1.0).unwrap();
        assert_eq!(mesh.n_edge(), 24);
        for p in 0..mesh.n_point() {
            assert_eq!(mesh.n_neighbors(p), 4);
        }
        for d in mesh.closure_defect() {
            assert!(d.iter().all(|x| x.abs() < TOL));
        }
        // wrapped edge vector
        let wrap = mesh.edges().iter().find(|e| e.is_periodic()).unwrap();
        assert!(wrap.edge_vector[0] > 0.0 || wrap.edge_vector[1] > 0.0);
    }

    #[test]
    fn test_periodic_rejects_small() {
        assert!(DualMesh::periodic_rectangle(2, 5, 1.0, 1.0).is_err());
    }
}

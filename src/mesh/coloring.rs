//! Edge coloring for race-free parallel edge loops.
//!
//! No two edges of one color share an endpoint, so all edges of a color can
//! be evaluated concurrently and scattered without conflicts.

use super::dual_mesh::DualMesh;

/// Partition of the edges into conflict-free colors.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EdgeColoring {
    colors: Vec<Vec<usize>>,
}

impl EdgeColoring {
    /// Greedy first-fit coloring in edge order.
    ///
    /// Edge lists within a color are ascending.
    pub fn greedy(mesh: &DualMesh) -> Self {
        let mut point_colors: Vec<Vec<usize>> = vec![Vec::new(); mesh.n_point()];
        let mut colors: Vec<Vec<usize>> = Vec::new();

        for (e, edge) in mesh.edges().iter().enumerate() {
            let taken_i = &point_colors[edge.i];
            let taken_j = &point_colors[edge.j];
            let color = (0..)
                .find(|c| !taken_i.contains(c) && !taken_j.contains(c))
                .unwrap_or(colors.len());
            if color == colors.len() {
                colors.push(Vec::new());
            }
            colors[color].push(e);
            point_colors[edge.i].push(color);
            point_colors[edge.j].push(color);
        }

        Self { colors }
    }

    /// Number of colors.
    pub fn n_colors(&self) -> usize {
        self.colors.len()
    }

    /// Edges of one color.
    pub fn color(&self, c: usize) -> &[usize] {
        &self.colors[c]
    }

    /// Iterate over colors.
    pub fn iter(&self) -> impl Iterator<Item = &[usize]> {
        self.colors.iter().map(Vec::as_slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_colors_are_conflict_free() {
        let mesh = DualMesh::structured_rectangle(6, 5, 1.0, 1.0).unwrap();
        let coloring = EdgeColoring::greedy(&mesh);
        let mut seen = 0;
        for color in coloring.iter() {
            let mut touched = vec![false; mesh.n_point()];
            for &e in color {
                let edge = mesh.edge(e);
                assert!(!touched[edge.i] && !touched[edge.j]);
                touched[edge.i] = true;
                touched[edge.j] = true;
            }
            seen += color.len();
        }
        assert_eq!(seen, mesh.n_edge());
        // first-fit bound: 2·max_degree − 1
        assert!(coloring.n_colors() <= 7);
    }
}

//! Point gradients on the median-dual mesh.
//!
//! Two reconstructions are available:
//! - Green–Gauss: `∇V_i = (1/Vol_i) Σ_faces V_f n_f` with face values from
//!   edge averages and the point value on boundary faces
//! - Weighted least squares: minimizes `Σ_j w_ij (∇V_i·r_ij − ΔV_ij)²`
//!   with `w_ij = 1/|r_ij|²`; singular normal equations give zero gradient
//!
//! Both loop over edges, so periodic meshes use the stored (wrapped) edge
//! vectors.

use faer::{Mat, linalg::solvers::Solve};
use serde::{Deserialize, Serialize};

use crate::mesh::DualMesh;
use crate::types::{GradientBlock, MAX_DIM, MAX_VAR};

/// Gradient reconstruction method.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GradientMethod {
    /// Green–Gauss
    #[default]
    GreenGauss,
    /// Inverse-distance-squared weighted least squares
    WeightedLeastSquares,
}

/// Compute gradients of `n_var` point values.
///
/// # Arguments
/// * `mesh` - Dual mesh
/// * `method` - Reconstruction
/// * `n_var` - Number of variables (≤ [`MAX_VAR`])
/// * `value` - `value(point, var)`
/// * `out` - One block per point
pub fn compute_gradients<F>(
    mesh: &DualMesh,
    method: GradientMethod,
    n_var: usize,
    value: F,
    out: &mut [GradientBlock],
) where
    F: Fn(usize, usize) -> f64,
{
    match method {
        GradientMethod::GreenGauss => green_gauss(mesh, n_var, value, out),
        GradientMethod::WeightedLeastSquares => least_squares(mesh, n_var, value, out),
    }
}

/// Green–Gauss gradients.
pub fn green_gauss<F>(mesh: &DualMesh, n_var: usize, value: F, out: &mut [GradientBlock])
where
    F: Fn(usize, usize) -> f64,
{
    let n_dim = mesh.n_dim();
    for g in out.iter_mut() {
        *g = [[0.0; MAX_DIM]; MAX_VAR];
    }

    for edge in mesh.edges() {
        for k in 0..n_var {
            let face = 0.5 * (value(edge.i, k) + value(edge.j, k));
            for d in 0..n_dim {
                let flux = face * edge.normal[d];
                out[edge.i][k][d] += flux;
                out[edge.j][k][d] -= flux;
            }
        }
    }

    for marker in mesh.markers() {
        for vertex in &marker.vertices {
            let p = vertex.point;
            for k in 0..n_var {
                let v = value(p, k);
                for d in 0..n_dim {
                    out[p][k][d] += v * vertex.normal[d];
                }
            }
        }
    }

    for (p, g) in out.iter_mut().enumerate() {
        let vol = mesh.volume(p);
        if vol > 0.0 {
            for row in g.iter_mut().take(n_var) {
                for x in row.iter_mut().take(n_dim) {
                    *x /= vol;
                }
            }
        } else {
            *g = [[0.0; MAX_DIM]; MAX_VAR];
        }
    }
}

/// Weighted least-squares gradients.
pub fn least_squares<F>(mesh: &DualMesh, n_var: usize, value: F, out: &mut [GradientBlock])
where
    F: Fn(usize, usize) -> f64,
{
    let n_dim = mesh.n_dim();
    let n_point = mesh.n_point();

    let mut normal_mat = vec![[[0.0; MAX_DIM]; MAX_DIM]; n_point];
    let mut rhs: Vec<GradientBlock> = vec![[[0.0; MAX_DIM]; MAX_VAR]; n_point];

    for edge in mesh.edges() {
        let r = &edge.edge_vector;
        let dist2: f64 = r[..n_dim].iter().map(|x| x * x).sum();
        if dist2 == 0.0 {
            continue;
        }
        let w = 1.0 / dist2;
        for a in 0..n_dim {
            for b in 0..n_dim {
                let m = w * r[a] * r[b];
                normal_mat[edge.i][a][b] += m;
                normal_mat[edge.j][a][b] += m;
            }
        }
        for k in 0..n_var {
            let dv = value(edge.j, k) - value(edge.i, k);
            for d in 0..n_dim {
                // r_ji = −r_ij and ΔV_ji = −ΔV_ij: same contribution at j
                rhs[edge.i][k][d] += w * r[d] * dv;
                rhs[edge.j][k][d] += w * r[d] * dv;
            }
        }
    }

    for p in 0..n_point {
        out[p] = [[0.0; MAX_DIM]; MAX_VAR];
        let m = &normal_mat[p];
        let scale = (0..n_dim).map(|d| m[d][d]).fold(0.0, f64::max);
        if scale <= 0.0 || determinant(m, n_dim).abs() <= 1e-12 * scale.powi(n_dim as i32) {
            continue;
        }

        let a = Mat::from_fn(n_dim, n_dim, |r, c| m[r][c]);
        let b = Mat::from_fn(n_dim, n_var, |r, c| rhs[p][c][r]);
        let sol = a.as_ref().full_piv_lu().solve(&b);
        for k in 0..n_var {
            for d in 0..n_dim {
                out[p][k][d] = sol[(d, k)];
            }
        }
    }
}

fn determinant(m: &[[f64; MAX_DIM]; MAX_DIM], n_dim: usize) -> f64 {
    if n_dim == 2 {
        m[0][0] * m[1][1] - m[0][1] * m[1][0]
    } else {
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    }
}

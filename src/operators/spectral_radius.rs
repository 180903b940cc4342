//! Integrated spectral radii per dual cell.
//!
//! Inviscid: `λ = Σ_faces |ū·n| + sqrt(β̄²)·A`.
//! Viscous: `λ_v = Σ_faces ((4/3)μ̄_tot + k̄/c̄_v)·A²/ρ̄`.
//!
//! Interior faces use the edge-mean state and contribute to both ends;
//! boundary faces use the point state.

use crate::equations::PrimitiveLayout;
use crate::mesh::DualMesh;

/// Inverse-time-scale of one face.
#[inline]
fn inviscid_face(layout: PrimitiveLayout, v_i: &[f64], v_j: &[f64], normal: &[f64]) -> f64 {
    let area = normal.iter().map(|n| n * n).sum::<f64>().sqrt();
    let mean_proj: f64 = (0..layout.n_dim())
        .map(|d| 0.5 * (v_i[layout.velocity(d)] + v_j[layout.velocity(d)]) * normal[d])
        .sum();
    let mean_beta2 = 0.5 * (v_i[layout.beta2()] + v_j[layout.beta2()]);
    mean_proj.abs() + mean_beta2.sqrt() * area
}

#[inline]
fn viscous_face(
    layout: PrimitiveLayout,
    v_i: &[f64],
    v_j: &[f64],
    normal: &[f64],
    energy: bool,
) -> f64 {
    let area2: f64 = normal.iter().map(|n| n * n).sum();
    let mean = |idx: usize| 0.5 * (v_i[idx] + v_j[idx]);
    let mu = mean(layout.laminar_viscosity()) + mean(layout.eddy_viscosity());
    let mut lambda = 4.0 / 3.0 * mu;
    if energy {
        let cv = mean(layout.cv());
        if cv > 0.0 {
            lambda += mean(layout.conductivity()) / cv;
        }
    }
    let rho = mean(layout.density());
    if rho > 0.0 { lambda * area2 / rho } else { 0.0 }
}

/// Inviscid spectral radius of every point.
///
/// `primitive` is point-major with stride `layout.n_prim()`.
pub fn inviscid_spectral_radius(
    mesh: &DualMesh,
    layout: PrimitiveLayout,
    primitive: &[f64],
    out: &mut [f64],
) {
    let n_dim = mesh.n_dim();
    let stride = layout.n_prim();
    let v = |p: usize| &primitive[p * stride..(p + 1) * stride];

    out.fill(0.0);
    for edge in mesh.edges() {
        let lambda = inviscid_face(layout, v(edge.i), v(edge.j), &edge.normal[..n_dim]);
        out[edge.i] += lambda;
        out[edge.j] += lambda;
    }
    for marker in mesh.markers() {
        for vertex in &marker.vertices {
            let vp = v(vertex.point);
            out[vertex.point] += inviscid_face(layout, vp, vp, &vertex.normal[..n_dim]);
        }
    }
}

/// Viscous spectral radius of every point.
pub fn viscous_spectral_radius(
    mesh: &DualMesh,
    layout: PrimitiveLayout,
    primitive: &[f64],
    energy: bool,
    out: &mut [f64],
) {
    let n_dim = mesh.n_dim();
    let stride = layout.n_prim();
    let v = |p: usize| &primitive[p * stride..(p + 1) * stride];

    out.fill(0.0);
    for edge in mesh.edges() {
        let lambda = viscous_face(layout, v(edge.i), v(edge.j), &edge.normal[..n_dim], energy);
        out[edge.i] += lambda;
        out[edge.j] += lambda;
    }
    for marker in mesh.markers() {
        for vertex in &marker.vertices {
            let vp = v(vertex.point);
            out[vertex.point] += viscous_face(layout, vp, vp, &vertex.normal[..n_dim], energy);
        }
    }
}

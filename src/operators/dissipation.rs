//! Inputs of the centered-scheme artificial dissipation.
//!
//! For edge `(i, j)` a point accumulates the difference toward its partner
//! when it is interior, or when both endpoints lie on a physical boundary.
//! Along a boundary edge whose other end is interior, only the interior
//! point is updated. Halo points never accumulate.

use crate::mesh::DualMesh;

#[inline]
fn updates(mesh: &DualMesh, i: usize, j: usize) -> (bool, bool) {
    let bi = mesh.is_physical_boundary(i);
    let bj = mesh.is_physical_boundary(j);
    (
        mesh.is_domain(i) && (!bi || bj),
        mesh.is_domain(j) && (!bj || bi),
    )
}

/// Undivided Laplacian `Σ_j (V_j − V_i)` of `n_var` variables.
///
/// `out` is laid out point-major with stride `n_var`.
pub fn undivided_laplacian<F>(mesh: &DualMesh, n_var: usize, value: F, out: &mut [f64])
where
    F: Fn(usize, usize) -> f64,
{
    out.fill(0.0);
    for edge in mesh.edges() {
        let (i, j) = (edge.i, edge.j);
        let (upd_i, upd_j) = updates(mesh, i, j);
        for k in 0..n_var {
            let diff = value(i, k) - value(j, k);
            if upd_i {
                out[i * n_var + k] -= diff;
            }
            if upd_j {
                out[j * n_var + k] += diff;
            }
        }
    }
}

/// Pressure sensor `|Σ_j (p_j − p_i)| / Σ_j (p_i + p_j)`.
///
/// Points with a zero denominator get a zero sensor.
pub fn pressure_sensor<F>(mesh: &DualMesh, pressure: F, out: &mut [f64])
where
    F: Fn(usize) -> f64,
{
    let n_point = mesh.n_point();
    let mut numerator = vec![0.0; n_point];
    let mut denominator = vec![0.0; n_point];

    for edge in mesh.edges() {
        let (i, j) = (edge.i, edge.j);
        let (p_i, p_j) = (pressure(i), pressure(j));
        let (upd_i, upd_j) = updates(mesh, i, j);
        if upd_i {
            numerator[i] += p_j - p_i;
            denominator[i] += p_i + p_j;
        }
        if upd_j {
            numerator[j] += p_i - p_j;
            denominator[j] += p_i + p_j;
        }
    }

    for (s, (num, den)) in out.iter_mut().zip(numerator.iter().zip(&denominator)) {
        *s = if *den != 0.0 { num.abs() / den } else { 0.0 };
    }
}

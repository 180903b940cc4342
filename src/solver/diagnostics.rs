//! Residual norms and convergence history.
//!
//! Norms are reduced over owned points only, in point order, so the result
//! does not depend on edge ordering or thread count.

use serde::{Deserialize, Serialize};

use crate::linalg::BlockVector;
use crate::mesh::DualMesh;
use crate::parallel::HaloExchange;
use crate::types::PointIndex;

/// RMS and maximum residual per variable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ResidualNorms {
    /// Root-mean-square residual per variable
    pub rms: Vec<f64>,
    /// Maximum absolute residual per variable
    pub max: Vec<f64>,
    /// Global index of the point holding the maximum
    pub max_point: Vec<usize>,
}

impl ResidualNorms {
    /// Zeroed norms for `n_var` variables.
    pub fn new(n_var: usize) -> Self {
        Self {
            rms: vec![0.0; n_var],
            max: vec![0.0; n_var],
            max_point: vec![0; n_var],
        }
    }

    /// Number of variables.
    pub fn n_var(&self) -> usize {
        self.rms.len()
    }

    /// Accumulate one residual entry. Call [`finalize`](Self::finalize) after
    /// the last entry.
    #[inline]
    pub fn add(&mut self, var: usize, value: f64, global_point: usize) {
        self.rms[var] += value * value;
        if value.abs() > self.max[var] {
            self.max[var] = value.abs();
            self.max_point[var] = global_point;
        }
    }

    /// Turn accumulated squares into RMS values over `n_point` points.
    pub fn finalize(&mut self, n_point: usize, halo: &dyn HaloExchange) {
        let total = halo.sum_reduce(n_point as f64).max(1.0);
        for (rms, max) in self.rms.iter_mut().zip(&mut self.max) {
            *rms = (halo.sum_reduce(*rms) / total).sqrt();
            *max = halo.max_reduce(*max);
        }
    }

    /// Norms of an assembled residual over the owned points.
    pub fn from_residual(mesh: &DualMesh, residual: &BlockVector, halo: &dyn HaloExchange) -> Self {
        let mut norms = Self::new(residual.n_var());
        for p in (0..mesh.n_point()).filter(|&p| mesh.is_domain(p)) {
            let global = mesh.global_index(PointIndex::new(p));
            for (k, &r) in residual.block(p).iter().enumerate() {
                norms.add(k, r, global);
            }
        }
        norms.finalize(mesh.n_point_domain(), halo);
        norms
    }

    /// `log10` of the RMS of one variable, `-inf` for an exact zero.
    pub fn log_rms(&self, var: usize) -> f64 {
        self.rms[var].log10()
    }

    /// True when every RMS value is finite.
    pub fn is_finite(&self) -> bool {
        self.rms.iter().all(|r| r.is_finite())
    }
}

/// History of RMS residuals over iterations.
#[derive(Clone, Debug, Default)]
pub struct ConvergenceHistory {
    iterations: Vec<usize>,
    rms: Vec<Vec<f64>>,
}

impl ConvergenceHistory {
    /// Empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the norms of one iteration.
    pub fn record(&mut self, iteration: usize, norms: &ResidualNorms) {
        self.iterations.push(iteration);
        self.rms.push(norms.rms.clone());
    }

    /// Number of recorded iterations.
    pub fn len(&self) -> usize {
        self.iterations.len()
    }

    /// True before the first record.
    pub fn is_empty(&self) -> bool {
        self.iterations.is_empty()
    }

    /// Orders of magnitude the RMS of `var` dropped since the first record.
    pub fn orders_dropped(&self, var: usize) -> f64 {
        match (self.rms.first(), self.rms.last()) {
            (Some(first), Some(last)) if first[var] > 0.0 && last[var] > 0.0 => {
                (first[var] / last[var]).log10()
            }
            (Some(first), Some(last)) if first[var] > 0.0 && last[var] == 0.0 => f64::INFINITY,
            _ => 0.0,
        }
    }

    /// True when every variable dropped at least `orders` orders of magnitude.
    pub fn has_converged(&self, orders: f64) -> bool {
        match self.rms.first() {
            Some(first) => (0..first.len()).all(|k| self.orders_dropped(k) >= orders),
            None => false,
        }
    }
}

//! Halo exchange primitives.

use crate::mesh::DualMesh;

/// Identity of this partition.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartitionContext {
    /// Rank of this partition
    pub rank: usize,
    /// Number of partitions
    pub size: usize,
}

impl PartitionContext {
    /// Single-partition context.
    pub const fn serial() -> Self {
        Self { rank: 0, size: 1 }
    }

    /// True on rank 0.
    pub fn is_root(&self) -> bool {
        self.rank == 0
    }
}

impl Default for PartitionContext {
    fn default() -> Self {
        Self::serial()
    }
}

/// Blocking exchange of per-point data and scalar collectives.
///
/// `exchange` overwrites the halo entries of `values` (stride `block`) with
/// the owners' values. All calls are synchronous barriers.
pub trait HaloExchange: Send + Sync {
    /// Partition identity.
    fn context(&self) -> PartitionContext;

    /// Refresh halo points of a point-major array.
    fn exchange(&self, values: &mut [f64], block: usize);

    /// Global minimum.
    fn min_reduce(&self, value: f64) -> f64;

    /// Global maximum.
    fn max_reduce(&self, value: f64) -> f64;

    /// Global sum.
    fn sum_reduce(&self, value: f64) -> f64;
}

/// Single-process run: every point is owned.
#[derive(Clone, Copy, Debug, Default)]
pub struct SerialHalo;

impl HaloExchange for SerialHalo {
    fn context(&self) -> PartitionContext {
        PartitionContext::serial()
    }

    fn exchange(&self, _values: &mut [f64], _block: usize) {}

    fn min_reduce(&self, value: f64) -> f64 {
        value
    }

    fn max_reduce(&self, value: f64) -> f64 {
        value
    }

    fn sum_reduce(&self, value: f64) -> f64 {
        value
    }
}

/// Halo copies resolved inside one address space.
///
/// Each halo point is paired with the local point that owns the same global
/// index, as happens on a periodic mesh stored with duplicated points.
#[derive(Clone, Debug, Default)]
pub struct LocalHalo {
    pairs: Vec<(usize, usize)>,
}

impl LocalHalo {
    /// Pair halo points with owned points sharing their global index.
    pub fn from_mesh(mesh: &DualMesh) -> Self {
        use crate::types::PointIndex;

        let pairs = (0..mesh.n_point())
            .filter(|&p| !mesh.is_domain(p))
            .filter_map(|halo| {
                let global = mesh.global_index(PointIndex::new(halo));
                (0..mesh.n_point())
                    .find(|&q| mesh.is_domain(q) && mesh.global_index(PointIndex::new(q)) == global)
                    .map(|owner| (halo, owner))
            })
            .collect();
        Self { pairs }
    }

    /// Explicit `(halo, owner)` pairs.
    pub fn from_pairs(pairs: Vec<(usize, usize)>) -> Self {
        Self { pairs }
    }

    /// Number of halo points.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// True without halo points.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl HaloExchange for LocalHalo {
    fn context(&self) -> PartitionContext {
        PartitionContext::serial()
    }

    fn exchange(&self, values: &mut [f64], block: usize) {
        for &(halo, owner) in &self.pairs {
            values.copy_within(owner * block..(owner + 1) * block, halo * block);
        }
    }

    fn min_reduce(&self, value: f64) -> f64 {
        value
    }

    fn max_reduce(&self, value: f64) -> f64 {
        value
    }

    fn sum_reduce(&self, value: f64) -> f64 {
        value
    }
}

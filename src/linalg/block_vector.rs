//! Point-blocked vector.

use crate::types::VarBlock;

/// Vector of `n_block` blocks of `n_var` entries each.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockVector {
    n_var: usize,
    data: Vec<f64>,
}

impl BlockVector {
    /// Zero vector.
    pub fn zeros(n_block: usize, n_var: usize) -> Self {
        Self {
            n_var,
            data: vec![0.0; n_block * n_var],
        }
    }

    /// Wrap point-major data.
    pub fn from_vec(n_var: usize, data: Vec<f64>) -> Self {
        debug_assert!(n_var > 0 && data.len() % n_var == 0);
        Self { n_var, data }
    }

    /// Number of blocks.
    #[inline]
    pub fn n_block(&self) -> usize {
        self.data.len() / self.n_var
    }

    /// Block size.
    #[inline]
    pub fn n_var(&self) -> usize {
        self.n_var
    }

    /// Total length.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True when empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// One block.
    #[inline]
    pub fn block(&self, i: usize) -> &[f64] {
        &self.data[i * self.n_var..(i + 1) * self.n_var]
    }

    /// One block, mutable.
    #[inline]
    pub fn block_mut(&mut self, i: usize) -> &mut [f64] {
        &mut self.data[i * self.n_var..(i + 1) * self.n_var]
    }

    /// `x_i += b`.
    #[inline]
    pub fn add_block(&mut self, i: usize, b: &VarBlock) {
        for (x, v) in self.block_mut(i).iter_mut().zip(b.as_slice()) {
            *x += v;
        }
    }

    /// `x_i −= b`.
    #[inline]
    pub fn subtract_block(&mut self, i: usize, b: &VarBlock) {
        for (x, v) in self.block_mut(i).iter_mut().zip(b.as_slice()) {
            *x -= v;
        }
    }

    /// Zero one block.
    #[inline]
    pub fn set_block_zero(&mut self, i: usize) {
        self.block_mut(i).fill(0.0);
    }

    /// Zero one entry of a block.
    #[inline]
    pub fn set_component_zero(&mut self, i: usize, k: usize) {
        self.data[i * self.n_var + k] = 0.0;
    }

    /// Zero everything.
    pub fn set_zero(&mut self) {
        self.data.fill(0.0);
    }

    /// Euclidean norm.
    pub fn norm(&self) -> f64 {
        self.dot(self).sqrt()
    }

    /// Inner product.
    pub fn dot(&self, other: &Self) -> f64 {
        self.data.iter().zip(&other.data).map(|(a, b)| a * b).sum()
    }

    /// Flat data.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data
    }

    /// Flat data, mutable.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_ops() {
        let mut v = BlockVector::zeros(3, 2);
        let b = VarBlock::from_slice(&[1.0, 2.0]);
        v.add_block(1, &b);
        v.add_block(1, &b);
        v.subtract_block(2, &b);
        assert_eq!(v.block(1), &[2.0, 4.0]);
        assert_eq!(v.block(2), &[-1.0, -2.0]);
        v.set_component_zero(1, 0);
        assert_eq!(v.block(1), &[0.0, 4.0]);
        assert!((v.norm() - 21.0_f64.sqrt()).abs() < 1e-14);
        v.set_block_zero(2);
        assert_eq!(v.n_block(), 3);
        assert_eq!(v.norm(), 4.0);
    }
}

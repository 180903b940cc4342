//! Fixed-capacity dense blocks for per-edge and per-point work.
//!
//! The solved unknowns are (p, u, v, [w], T), so a block never exceeds
//! `MAX_VAR = 5` rows. Blocks live on the stack and carry their active size,
//! which keeps every edge operator allocation-free and safe to call from
//! several threads at once.

use std::ops::{AddAssign, Index, IndexMut, SubAssign};

/// Maximum spatial dimension.
pub const MAX_DIM: usize = 3;

/// Maximum number of solved variables per point (3D: p, u, v, w, T).
pub const MAX_VAR: usize = MAX_DIM + 2;

/// Per-point gradient of the solved variables: `grad[var][dim]`.
pub type GradientBlock = [[f64; MAX_DIM]; MAX_VAR];

// =============================================================================
// VarBlock
// =============================================================================

/// Residual-sized vector with `n` active entries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VarBlock {
    n: usize,
    data: [f64; MAX_VAR],
}

impl VarBlock {
    /// Zero vector with `n` active entries.
    #[inline]
    pub fn zeros(n: usize) -> Self {
        debug_assert!(n <= MAX_VAR);
        Self {
            n,
            data: [0.0; MAX_VAR],
        }
    }

    /// Build from a slice (length becomes the active size).
    #[inline]
    pub fn from_slice(values: &[f64]) -> Self {
        let mut out = Self::zeros(values.len());
        out.data[..values.len()].copy_from_slice(values);
        out
    }

    /// Number of active entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.n
    }

    /// True when no entry is active.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Active entries.
    #[inline]
    pub fn as_slice(&self) -> &[f64] {
        &self.data[..self.n]
    }

    /// Active entries, mutable.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [f64] {
        &mut self.data[..self.n]
    }

    /// Reset all entries to zero.
    #[inline]
    pub fn set_zero(&mut self) {
        self.data = [0.0; MAX_VAR];
    }

    /// Multiply every entry by `c`.
    #[inline]
    pub fn scale(&mut self, c: f64) {
        for v in self.as_mut_slice() {
            *v *= c;
        }
    }

    /// Euclidean norm of the active entries.
    pub fn norm(&self) -> f64 {
        self.as_slice().iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    /// True when every active entry is finite.
    pub fn is_finite(&self) -> bool {
        self.as_slice().iter().all(|v| v.is_finite())
    }
}

impl Index<usize> for VarBlock {
    type Output = f64;
    #[inline]
    fn index(&self, i: usize) -> &f64 {
        debug_assert!(i < self.n);
        &self.data[i]
    }
}

impl IndexMut<usize> for VarBlock {
    #[inline]
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        debug_assert!(i < self.n);
        &mut self.data[i]
    }
}

impl AddAssign<&VarBlock> for VarBlock {
    fn add_assign(&mut self, rhs: &VarBlock) {
        for i in 0..self.n {
            self.data[i] += rhs.data[i];
        }
    }
}

impl SubAssign<&VarBlock> for VarBlock {
    fn sub_assign(&mut self, rhs: &VarBlock) {
        for i in 0..self.n {
            self.data[i] -= rhs.data[i];
        }
    }
}

// =============================================================================
// JacBlock
// =============================================================================

/// Square Jacobian block with `n × n` active entries, indexed as `m[(row, col)]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct JacBlock {
    n: usize,
    data: [[f64; MAX_VAR]; MAX_VAR],
}

impl JacBlock {
    /// Zero block of size `n × n`.
    #[inline]
    pub fn zeros(n: usize) -> Self {
        debug_assert!(n <= MAX_VAR);
        Self {
            n,
            data: [[0.0; MAX_VAR]; MAX_VAR],
        }
    }

    /// Identity block of size `n × n`.
    pub fn identity(n: usize) -> Self {
        let mut out = Self::zeros(n);
        for i in 0..n {
            out.data[i][i] = 1.0;
        }
        out
    }

    /// Active size.
    #[inline]
    pub fn size(&self) -> usize {
        self.n
    }

    /// Reset every entry to zero.
    #[inline]
    pub fn set_zero(&mut self) {
        self.data = [[0.0; MAX_VAR]; MAX_VAR];
    }

    /// Multiply every entry by `c`.
    pub fn scale(&mut self, c: f64) {
        for row in self.data.iter_mut().take(self.n) {
            for v in row.iter_mut().take(self.n) {
                *v *= c;
            }
        }
    }

    /// Zero one row.
    #[inline]
    pub fn zero_row(&mut self, row: usize) {
        self.data[row] = [0.0; MAX_VAR];
    }

    /// Zero one column.
    #[inline]
    pub fn zero_col(&mut self, col: usize) {
        for row in self.data.iter_mut() {
            row[col] = 0.0;
        }
    }

    /// Matrix product `self · rhs`.
    pub fn matmul(&self, rhs: &JacBlock) -> JacBlock {
        let n = self.n;
        let mut out = JacBlock::zeros(n);
        for i in 0..n {
            for k in 0..n {
                let a = self.data[i][k];
                if a == 0.0 {
                    continue;
                }
                for j in 0..n {
                    out.data[i][j] += a * rhs.data[k][j];
                }
            }
        }
        out
    }

    /// Matrix-vector product `self · v`.
    pub fn matvec(&self, v: &VarBlock) -> VarBlock {
        let n = self.n;
        let mut out = VarBlock::zeros(n);
        for i in 0..n {
            let mut acc = 0.0;
            for j in 0..n {
                acc += self.data[i][j] * v.data[j];
            }
            out.data[i] = acc;
        }
        out
    }

    /// Add `c · rhs` entrywise.
    pub fn axpy(&mut self, c: f64, rhs: &JacBlock) {
        for i in 0..self.n {
            for j in 0..self.n {
                self.data[i][j] += c * rhs.data[i][j];
            }
        }
    }

    /// Row-major copy of the active entries.
    pub fn to_row_major(&self) -> Vec<f64> {
        let n = self.n;
        let mut out = Vec::with_capacity(n * n);
        for row in self.data.iter().take(n) {
            out.extend_from_slice(&row[..n]);
        }
        out
    }

    /// Largest absolute entry.
    pub fn max_abs(&self) -> f64 {
        let mut m: f64 = 0.0;
        for row in self.data.iter().take(self.n) {
            for v in row.iter().take(self.n) {
                m = m.max(v.abs());
            }
        }
        m
    }

    /// True when every active entry is finite.
    pub fn is_finite(&self) -> bool {
        self.data
            .iter()
            .take(self.n)
            .all(|row| row[..self.n].iter().all(|v| v.is_finite()))
    }
}

impl Index<(usize, usize)> for JacBlock {
    type Output = f64;
    #[inline]
    fn index(&self, (i, j): (usize, usize)) -> &f64 {
        debug_assert!(i < self.n && j < self.n);
        &self.data[i][j]
    }
}

impl IndexMut<(usize, usize)> for JacBlock {
    #[inline]
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut f64 {
        debug_assert!(i < self.n && j < self.n);
        &mut self.data[i][j]
    }
}

impl AddAssign<&JacBlock> for JacBlock {
    fn add_assign(&mut self, rhs: &JacBlock) {
        self.axpy(1.0, rhs);
    }
}

impl SubAssign<&JacBlock> for JacBlock {
    fn sub_assign(&mut self, rhs: &JacBlock) {
        self.axpy(-1.0, rhs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-14;

    #[test]
    fn test_matmul_identity() {
        let mut a = JacBlock::zeros(4);
        for i in 0..4 {
            for j in 0..4 {
                a[(i, j)] = (i * 4 + j) as f64;
            }
        }
        let b = a.matmul(&JacBlock::identity(4));
        assert_eq!(a, b);
    }

    #[test]
    fn test_matvec() {
        let mut a = JacBlock::zeros(2);
        a[(0, 0)] = 1.0;
        a[(0, 1)] = 2.0;
        a[(1, 0)] = 3.0;
        a[(1, 1)] = 4.0;
        let v = VarBlock::from_slice(&[1.0, 1.0]);
        let r = a.matvec(&v);
        assert!((r[0] - 3.0).abs() < TOL);
        assert!((r[1] - 7.0).abs() < TOL);
    }

    #[test]
    fn test_zero_row_and_col() {
        let mut a = JacBlock::identity(3);
        a[(1, 2)] = 5.0;
        a.zero_row(1);
        a.zero_col(0);
        assert_eq!(a[(1, 1)], 0.0);
        assert_eq!(a[(1, 2)], 0.0);
        assert_eq!(a[(0, 0)], 0.0);
        assert_eq!(a[(2, 2)], 1.0);
    }

    #[test]
    fn test_var_block_ops() {
        let mut a = VarBlock::from_slice(&[1.0, 2.0, 3.0]);
        let b = VarBlock::from_slice(&[1.0, 1.0, 1.0]);
        a -= &b;
        assert_eq!(a.as_slice(), &[0.0, 1.0, 2.0]);
        a.scale(2.0);
        assert_eq!(a.as_slice(), &[0.0, 2.0, 4.0]);
        assert!((a.norm() - 20.0_f64.sqrt()).abs() < TOL);
    }
}

//! Block compressed-sparse-row matrix.
//!
//! The sparsity pattern is fixed at construction from the mesh connectivity
//! (each point couples to itself and its edge neighbors). Blocks are dense
//! `n_var × n_var`, stored row-major and contiguous.

use faer::Mat;

use super::{BlockVector, LinearSystemError};
use crate::mesh::DualMesh;
use crate::types::JacBlock;

/// Block CSR matrix with a fixed pattern.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockCsrMatrix {
    n_var: usize,
    row_ptr: Vec<usize>,
    col_ind: Vec<usize>,
    diag_ptr: Vec<usize>,
    values: Vec<f64>,
}

impl BlockCsrMatrix {
    /// Pattern "self + neighbors" of every mesh point.
    pub fn from_mesh(mesh: &DualMesh, n_var: usize) -> Self {
        let n = mesh.n_point();
        let mut row_ptr = Vec::with_capacity(n + 1);
        let mut col_ind = Vec::new();
        let mut diag_ptr = Vec::with_capacity(n);
        row_ptr.push(0);

        for p in 0..n {
            let mut cols: Vec<usize> = mesh.neighbors(p).to_vec();
            cols.push(p);
            cols.sort_unstable();
            cols.dedup();
            let start = col_ind.len();
            // p is in cols by construction
            let offset = cols.binary_search(&p).unwrap_or(0);
            diag_ptr.push(start + offset);
            col_ind.extend(cols);
            row_ptr.push(col_ind.len());
        }

        let nnz = col_ind.len();
        Self {
            n_var,
            row_ptr,
            col_ind,
            diag_ptr,
            values: vec![0.0; nnz * n_var * n_var],
        }
    }

    /// Number of block rows.
    #[inline]
    pub fn n_block_rows(&self) -> usize {
        self.row_ptr.len() - 1
    }

    /// Block size.
    #[inline]
    pub fn n_var(&self) -> usize {
        self.n_var
    }

    /// Number of stored blocks.
    #[inline]
    pub fn n_blocks(&self) -> usize {
        self.col_ind.len()
    }

    /// Column indices of one block row.
    #[inline]
    pub fn row_columns(&self, row: usize) -> &[usize] {
        &self.col_ind[self.row_ptr[row]..self.row_ptr[row + 1]]
    }

    #[inline]
    fn find(&self, row: usize, col: usize) -> Result<usize, LinearSystemError> {
        if row == col {
            return Ok(self.diag_ptr[row]);
        }
        let start = self.row_ptr[row];
        self.row_columns(row)
            .binary_search(&col)
            .map(|k| start + k)
            .map_err(|_| LinearSystemError::MissingEntry { row, col })
    }

    #[inline]
    fn block_slice_mut(&mut self, k: usize) -> &mut [f64] {
        let nn = self.n_var * self.n_var;
        &mut self.values[k * nn..(k + 1) * nn]
    }

    #[inline]
    fn block_slice(&self, k: usize) -> &[f64] {
        let nn = self.n_var * self.n_var;
        &self.values[k * nn..(k + 1) * nn]
    }

    /// Zero every block.
    pub fn set_zero(&mut self) {
        self.values.fill(0.0);
    }

    /// `A(row, col) += block`.
    #[inline]
    pub fn add_block(&mut self, row: usize, col: usize, block: &JacBlock) -> Result<(), LinearSystemError> {
        self.axpy_block(row, col, 1.0, block)
    }

    /// `A(row, col) −= block`.
    #[inline]
    pub fn subtract_block(
        &mut self,
        row: usize,
        col: usize,
        block: &JacBlock,
    ) -> Result<(), LinearSystemError> {
        self.axpy_block(row, col, -1.0, block)
    }

    /// `A(row, col) += c·block`.
    pub fn axpy_block(
        &mut self,
        row: usize,
        col: usize,
        c: f64,
        block: &JacBlock,
    ) -> Result<(), LinearSystemError> {
        let k = self.find(row, col)?;
        let n = self.n_var;
        let dst = self.block_slice_mut(k);
        for r in 0..n {
            for s in 0..n {
                dst[r * n + s] += c * block[(r, s)];
            }
        }
        Ok(())
    }

    /// Copy of `A(row, col)`.
    pub fn get_block(&self, row: usize, col: usize) -> Result<JacBlock, LinearSystemError> {
        let k = self.find(row, col)?;
        let n = self.n_var;
        let src = self.block_slice(k);
        let mut out = JacBlock::zeros(n);
        for r in 0..n {
            for s in 0..n {
                out[(r, s)] = src[r * n + s];
            }
        }
        Ok(out)
    }

    /// Add `c·block` to the diagonal block of `row`.
    pub fn add_block_to_diag(&mut self, row: usize, c: f64, block: &JacBlock) {
        let k = self.diag_ptr[row];
        let n = self.n_var;
        let dst = self.block_slice_mut(k);
        for r in 0..n {
            for s in 0..n {
                dst[r * n + s] += c * block[(r, s)];
            }
        }
    }

    /// Add `val` to every diagonal entry of the diagonal block of `row`.
    pub fn add_val_to_diag(&mut self, row: usize, val: f64) {
        let k = self.diag_ptr[row];
        let n = self.n_var;
        let dst = self.block_slice_mut(k);
        for r in 0..n {
            dst[r * n + r] += val;
        }
    }

    /// Set every diagonal entry of the diagonal block of `row` to `val`.
    pub fn set_val_to_diag(&mut self, row: usize, val: f64) {
        let k = self.diag_ptr[row];
        let n = self.n_var;
        let dst = self.block_slice_mut(k);
        for r in 0..n {
            dst[r * n + r] = val;
        }
    }

    /// Turn scalar row `var` of block row `row` into an identity row.
    pub fn delete_row(&mut self, row: usize, var: usize) {
        let n = self.n_var;
        let diag = self.diag_ptr[row];
        for k in self.row_ptr[row]..self.row_ptr[row + 1] {
            let dst = self.block_slice_mut(k);
            for s in 0..n {
                dst[var * n + s] = 0.0;
            }
            if k == diag {
                dst[var * n + var] = 1.0;
            }
        }
    }

    /// `y = A x`.
    pub fn matvec(&self, x: &[f64], y: &mut [f64]) {
        let n = self.n_var;
        y.fill(0.0);
        for row in 0..self.n_block_rows() {
            for k in self.row_ptr[row]..self.row_ptr[row + 1] {
                let col = self.col_ind[k];
                let block = self.block_slice(k);
                let xs = &x[col * n..(col + 1) * n];
                for r in 0..n {
                    let mut sum = 0.0;
                    for s in 0..n {
                        sum += block[r * n + s] * xs[s];
                    }
                    y[row * n + r] += sum;
                }
            }
        }
    }

    /// `y = A x` on block vectors.
    pub fn multiply(&self, x: &BlockVector, y: &mut BlockVector) -> Result<(), LinearSystemError> {
        let expected = self.n_block_rows() * self.n_var;
        for len in [x.len(), y.len()] {
            if len != expected {
                return Err(LinearSystemError::DimensionMismatch {
                    expected,
                    found: len,
                });
            }
        }
        self.matvec(x.as_slice(), y.as_mut_slice());
        Ok(())
    }

    /// Dense copy.
    pub fn to_dense(&self) -> Mat<f64> {
        let n = self.n_var;
        let size = self.n_block_rows() * n;
        let mut dense = Mat::<f64>::zeros(size, size);
        for row in 0..self.n_block_rows() {
            for k in self.row_ptr[row]..self.row_ptr[row + 1] {
                let col = self.col_ind[k];
                let block = self.block_slice(k);
                for r in 0..n {
                    for s in 0..n {
                        dense[(row * n + r, col * n + s)] = block[r * n + s];
                    }
                }
            }
        }
        dense
    }
}

//! Compressed Sparse Row (CSR) dose-influence matrices.
//!
//! Layout follows `scipy.sparse.csr_matrix`: `data` and `indices` are parallel
//! arrays, `indptr` gives the offset of each row into them.

mod assemble;

pub use assemble::Placed;
pub(crate) use assemble::{assemble, sort_rows};

use crate::error::{ExportError, Result};

/// Format tag stored alongside the arrays.
pub const CSR_FORMAT: &str = "csr";

/// Column ordering required within each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOrder {
    /// No ordering constraint.
    Any,
    /// Column indices strictly ascending within every row.
    StrictlyAscending,
}

/// CSR matrix with `u32` offsets and `f64` values.
///
/// # Example Structure
/// For a 2x3 spot-major matrix:
/// ```text
/// spot 0: [4.0  0.0  0.0]
/// spot 1: [0.0  0.0  6.0]
/// ```
///
/// CSR representation:
/// - data: [4.0, 6.0]
/// - indices: [0, 2]
/// - indptr: [0, 1, 2]
/// - shape: (2, 3)
#[derive(Debug, Clone, PartialEq)]
pub struct CsrMatrix {
    /// Column index for each value
    pub indices: Vec<u32>,
    /// Offset of each row in `indices`/`data` (length = rows + 1)
    pub indptr: Vec<u32>,
    /// Non-zero values in row-major order
    pub data: Vec<f64>,
    /// Matrix dimensions (rows, cols)
    pub shape: (u32, u32),
}

impl CsrMatrix {
    /// Create a CSR matrix, checking the structural invariants.
    pub fn new(indices: Vec<u32>, indptr: Vec<u32>, data: Vec<f64>, shape: (u32, u32)) -> Result<Self> {
        let matrix = Self {
            indices,
            indptr,
            data,
            shape,
        };
        matrix.validate(RowOrder::Any)?;
        Ok(matrix)
    }

    /// Matrix with `rows` empty rows.
    pub fn empty(shape: (u32, u32)) -> Self {
        Self {
            indices: Vec::new(),
            indptr: vec![0; shape.0 as usize + 1],
            data: Vec::new(),
            shape,
        }
    }

    /// Number of stored elements.
    pub fn nnz(&self) -> usize {
        self.data.len()
    }

    pub fn rows(&self) -> u32 {
        self.shape.0
    }

    pub fn cols(&self) -> u32 {
        self.shape.1
    }

    /// Column indices and values of row `r`.
    ///
    /// # Panics
    /// Panics if `r >= rows`.
    pub fn row(&self, r: u32) -> (&[u32], &[f64]) {
        let start = self.indptr[r as usize] as usize;
        let end = self.indptr[r as usize + 1] as usize;
        (&self.indices[start..end], &self.data[start..end])
    }

    /// Number of stored elements in row `r`.
    pub fn row_len(&self, r: u32) -> usize {
        (self.indptr[r as usize + 1] - self.indptr[r as usize]) as usize
    }

    /// Value at `(r, c)`, if stored. Binary search when rows are sorted.
    pub fn get(&self, r: u32, c: u32) -> Option<f64> {
        let (indices, data) = self.row(r);
        match indices.binary_search(&c) {
            Ok(pos) => Some(data[pos]),
            Err(_) => indices.iter().position(|&i| i == c).map(|pos| data[pos]),
        }
    }

    /// True if every row has strictly ascending column indices.
    pub fn has_sorted_indices(&self) -> bool {
        self.indptr.windows(2).all(|w| {
            self.indices[w[0] as usize..w[1] as usize]
                .windows(2)
                .all(|pair| pair[0] < pair[1])
        })
    }

    /// Check every structural invariant downstream CSR readers rely on.
    pub fn validate(&self, order: RowOrder) -> Result<()> {
        let (rows, cols) = self.shape;

        if self.indptr.len() != rows as usize + 1 {
            return Err(ExportError::InvalidCsr(format!(
                "indptr has length {}, expected rows + 1 = {}",
                self.indptr.len(),
                rows as u64 + 1
            )));
        }
        if self.indptr[0] != 0 {
            return Err(ExportError::InvalidCsr(format!(
                "indptr starts at {}, expected 0",
                self.indptr[0]
            )));
        }
        if let Some(row) = self.indptr.windows(2).position(|w| w[0] > w[1]) {
            return Err(ExportError::InvalidCsr(format!(
                "indptr decreases at row {}",
                row
            )));
        }
        if self.indices.len() != self.data.len() {
            return Err(ExportError::InvalidCsr(format!(
                "indices has length {}, data has length {}",
                self.indices.len(),
                self.data.len()
            )));
        }
        let end = self.indptr[rows as usize] as usize;
        if end != self.data.len() {
            return Err(ExportError::InvalidCsr(format!(
                "indptr ends at {}, data has length {}",
                end,
                self.data.len()
            )));
        }
        if let Some(&col) = self.indices.iter().find(|&&c| c >= cols) {
            return Err(ExportError::InvalidCsr(format!(
                "column index {} outside [0, {})",
                col, cols
            )));
        }
        if order == RowOrder::StrictlyAscending && !self.has_sorted_indices() {
            return Err(ExportError::InvalidCsr(
                "column indices are not strictly ascending within a row".to_string(),
            ));
        }
        Ok(())
    }
}

//! Two-pass row bucketing into CSR arrays.
//!
//! Pass one counts entries per row and prefix-sums the counts into `indptr`.
//! Pass two drops every entry at its row's write cursor. Rows therefore keep
//! store-iteration order, and the only allocations are the final arrays plus
//! one cursor per row.

use crate::error::{ExportError, Result};

use super::CsrMatrix;

/// An entry routed to its CSR cell, value already transformed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placed {
    pub row: u32,
    pub col: u32,
    pub value: f64,
}

/// Build a CSR matrix from two identical passes over the placed entries.
///
/// `pass` is called twice and must yield the same sequence both times. Any
/// error aborts in the first pass, before the output arrays are allocated.
/// A cell outside `shape` is an [`ExportError::InvalidCsr`].
pub(crate) fn assemble<F, I>(shape: (u32, u32), mut pass: F) -> Result<CsrMatrix>
where
    F: FnMut() -> I,
    I: Iterator<Item = Result<Placed>>,
{
    let rows = shape.0 as usize;

    // Count, in u64 so the overflow check happens before narrowing
    let mut counts = vec![0u64; rows];
    for placed in pass() {
        let Placed { row, col, .. } = placed?;
        if row >= shape.0 || col >= shape.1 {
            return Err(ExportError::InvalidCsr(format!(
                "cell ({}, {}) outside shape ({}, {})",
                row, col, shape.0, shape.1
            )));
        }
        counts[row as usize] += 1;
    }

    let mut indptr = Vec::with_capacity(rows + 1);
    let mut offset = 0u64;
    indptr.push(0u32);
    for count in counts {
        offset += count;
        let narrowed = u32::try_from(offset).map_err(|_| ExportError::TooManyEntries(offset))?;
        indptr.push(narrowed);
    }

    let nnz = offset as usize;
    let mut indices = vec![0u32; nnz];
    let mut data = vec![0.0f64; nnz];
    let mut cursor: Vec<u32> = indptr[..rows].to_vec();

    // Fill
    for placed in pass() {
        let Placed { row, col, value } = placed?;
        let end = indptr.get(row as usize + 1).copied();
        let slot = match (cursor.get_mut(row as usize), end) {
            (Some(slot), Some(end)) if *slot < end => slot,
            _ => return Err(pass_mismatch()),
        };
        indices[*slot as usize] = col;
        data[*slot as usize] = value;
        *slot += 1;
    }

    Ok(CsrMatrix {
        indices,
        indptr,
        data,
        shape,
    })
}

fn pass_mismatch() -> ExportError {
    ExportError::InvalidCsr("second pass yielded entries the first pass did not count".to_string())
}

/// Stable-sort every row with more than one entry by column index.
///
/// Returns the number of rows that needed sorting.
pub(crate) fn sort_rows(csr: &mut CsrMatrix) -> usize {
    let mut scratch: Vec<(u32, f64)> = Vec::new();
    let mut sorted = 0;

    for window in csr.indptr.windows(2) {
        let (start, end) = (window[0] as usize, window[1] as usize);
        if end - start < 2 {
            continue;
        }

        scratch.clear();
        scratch.extend(
            csr.indices[start..end]
                .iter()
                .copied()
                .zip(csr.data[start..end].iter().copied()),
        );
        // sort_by_key is stable: equal columns keep insertion order
        scratch.sort_by_key(|&(col, _)| col);

        for (offset, &(col, value)) in scratch.iter().enumerate() {
            csr.indices[start + offset] = col;
            csr.data[start + offset] = value;
        }
        sorted += 1;
    }

    sorted
}

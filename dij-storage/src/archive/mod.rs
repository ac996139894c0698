//! Named-array archives for CSR matrices.
//!
//! The pipeline talks to archives through [`ArchiveWriter`]: one call per
//! named array, the first creating the archive and the rest appending to it.
//! [`NpzWriter`] is the NumPy `.npz` implementation that `scipy.sparse.load_npz`
//! reads back.

pub mod npy;
mod npz;

use std::path::Path;

use crate::csr::{CsrMatrix, CSR_FORMAT};
use crate::error::Result;

pub use npy::NpyOwned;
pub use npz::{load_csr, read_arrays, NpzWriter};

/// Array names of a CSR archive, in write order.
pub const CSR_ARRAY_NAMES: [&str; 5] = ["indices", "indptr", "shape", "data", "format"];

/// How a write treats an existing archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Create or truncate (`"w"`).
    Create,
    /// Add to an existing archive (`"a"`).
    Append,
}

impl WriteMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteMode::Create => "w",
            WriteMode::Append => "a",
        }
    }
}

/// Borrowed array handed to an archive writer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NpyArray<'a> {
    U32(&'a [u32]),
    F64(&'a [f64]),
    /// Scalar byte string
    Str(&'a str),
}

impl NpyArray<'_> {
    /// Element count as the archive records it (string length for `Str`).
    pub fn len(&self) -> usize {
        match self {
            NpyArray::U32(v) => v.len(),
            NpyArray::F64(v) => v.len(),
            NpyArray::Str(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Payload size in bytes.
    pub fn nbytes(&self) -> usize {
        match self {
            NpyArray::U32(v) => v.len() * 4,
            NpyArray::F64(v) => v.len() * 8,
            NpyArray::Str(s) => s.len(),
        }
    }
}

/// Sink for named arrays.
pub trait ArchiveWriter {
    /// Write `array` as member `name` of the archive at `archive`.
    fn write_array(
        &mut self,
        archive: &Path,
        name: &str,
        array: NpyArray<'_>,
        mode: WriteMode,
    ) -> Result<()>;
}

/// Write the five CSR arrays: one create followed by four appends, in the
/// order of [`CSR_ARRAY_NAMES`].
pub fn write_csr<W: ArchiveWriter + ?Sized>(
    writer: &mut W,
    archive: &Path,
    csr: &CsrMatrix,
) -> Result<()> {
    let shape = [csr.shape.0, csr.shape.1];
    let arrays = [
        NpyArray::U32(&csr.indices),
        NpyArray::U32(&csr.indptr),
        NpyArray::U32(&shape),
        NpyArray::F64(&csr.data),
        NpyArray::Str(CSR_FORMAT),
    ];

    for (i, (name, array)) in CSR_ARRAY_NAMES.iter().zip(arrays).enumerate() {
        let mode = if i == 0 {
            WriteMode::Create
        } else {
            WriteMode::Append
        };
        writer.write_array(archive, name, array, mode)?;
    }
    Ok(())
}

//! `.npz` container: a ZIP archive of `.npy` members.

use std::fs::{File, OpenOptions};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::csr::{CsrMatrix, CSR_FORMAT};
use crate::error::{ExportError, Result};

use super::npy::{self, NpyOwned};
use super::{ArchiveWriter, NpyArray, WriteMode};

/// Upper bound on a `.npy` header for these dtypes.
const NPY_HEADER_MAX: u64 = 128;

/// Writes arrays as stored (uncompressed) `<name>.npy` members.
#[derive(Debug, Clone, Copy, Default)]
pub struct NpzWriter;

impl ArchiveWriter for NpzWriter {
    fn write_array(
        &mut self,
        archive: &Path,
        name: &str,
        array: NpyArray<'_>,
        mode: WriteMode,
    ) -> Result<()> {
        let member = format!("{}.npy", name);

        let mut zip = match mode {
            WriteMode::Create => {
                let file = File::create(archive).map_err(|e| ExportError::io(archive, e))?;
                ZipWriter::new(file)
            }
            WriteMode::Append => {
                let file = OpenOptions::new()
                    .read(true)
                    .write(true)
                    .open(archive)
                    .map_err(|e| ExportError::io(archive, e))?;
                ZipWriter::new_append(file).map_err(|e| ExportError::archive(archive, e))?
            }
        };

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Stored)
            .large_file(array.nbytes() as u64 + NPY_HEADER_MAX >= u32::MAX as u64);

        zip.start_file(member, options)
            .map_err(|e| ExportError::archive(archive, e))?;
        npy::write_npy(&mut zip, array).map_err(|e| ExportError::io(archive, e))?;
        zip.finish().map_err(|e| ExportError::archive(archive, e))?;

        Ok(())
    }
}

/// Read every `.npy` member of an archive, in archive order.
///
/// Member names are returned without the `.npy` suffix.
pub fn read_arrays(archive: &Path) -> Result<Vec<(String, NpyOwned)>> {
    let file = File::open(archive).map_err(|e| ExportError::io(archive, e))?;
    let mut zip = ZipArchive::new(file).map_err(|e| ExportError::archive(archive, e))?;

    let mut arrays = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let member = zip
            .by_index(i)
            .map_err(|e| ExportError::archive(archive, e))?;
        let name = member.name().trim_end_matches(".npy").to_string();
        arrays.push((name, npy::read_npy(member)?));
    }
    Ok(arrays)
}

/// Load a CSR archive written by [`write_csr`](super::write_csr).
pub fn load_csr(archive: &Path) -> Result<CsrMatrix> {
    let mut indices = None;
    let mut indptr = None;
    let mut shape = None;
    let mut data = None;
    let mut format = None;

    for (name, array) in read_arrays(archive)? {
        match name.as_str() {
            "indices" => indices = Some(array.into_u32()?),
            "indptr" => indptr = Some(array.into_u32()?),
            "shape" => shape = Some(array.into_u32()?),
            "data" => data = Some(array.into_f64()?),
            "format" => format = Some(array.into_bytes()?),
            _ => {}
        }
    }

    let missing = |name: &str| {
        ExportError::InvalidInput(format!("{} has no '{}' array", archive.display(), name))
    };

    let format = format.ok_or_else(|| missing("format"))?;
    if format != CSR_FORMAT.as_bytes() {
        return Err(ExportError::InvalidInput(format!(
            "{} holds format '{}', expected '{}'",
            archive.display(),
            String::from_utf8_lossy(&format),
            CSR_FORMAT
        )));
    }

    let shape = shape.ok_or_else(|| missing("shape"))?;
    if shape.len() != 2 {
        return Err(ExportError::InvalidInput(format!(
            "shape has {} entries, expected 2",
            shape.len()
        )));
    }

    CsrMatrix::new(
        indices.ok_or_else(|| missing("indices"))?,
        indptr.ok_or_else(|| missing("indptr"))?,
        data.ok_or_else(|| missing("data"))?,
        (shape[0], shape[1]),
    )
}

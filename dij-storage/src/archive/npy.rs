//! NumPy `.npy` members of a CSR archive.
//!
//! Arrays are written little-endian (`<u4`, `<f8`); the format tag is a 0-d
//! byte string (`|S<n>`), the way `scipy.sparse.save_npz` stores it.

use std::io::{self, Read, Write};

use npyz::{DType, TypeStr, WriterBuilder};

use crate::error::{ExportError, Result};

use super::NpyArray;

/// Decoded `.npy` payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NpyOwned {
    U32(Vec<u32>),
    F64(Vec<f64>),
    /// 0-d fixed-width byte string (`|S<n>`)
    Bytes(Vec<u8>),
}

impl NpyOwned {
    pub fn into_u32(self) -> Result<Vec<u32>> {
        match self {
            NpyOwned::U32(v) => Ok(v),
            other => Err(ExportError::InvalidInput(format!(
                "expected <u4 array, got {}",
                other.descr_name()
            ))),
        }
    }

    pub fn into_f64(self) -> Result<Vec<f64>> {
        match self {
            NpyOwned::F64(v) => Ok(v),
            other => Err(ExportError::InvalidInput(format!(
                "expected <f8 array, got {}",
                other.descr_name()
            ))),
        }
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            NpyOwned::Bytes(v) => Ok(v),
            other => Err(ExportError::InvalidInput(format!(
                "expected byte string, got {}",
                other.descr_name()
            ))),
        }
    }

    fn descr_name(&self) -> &'static str {
        match self {
            NpyOwned::U32(_) => "<u4",
            NpyOwned::F64(_) => "<f8",
            NpyOwned::Bytes(_) => "|S",
        }
    }
}

/// The `descr` an array is written with.
pub fn descr(array: &NpyArray<'_>) -> String {
    match array {
        NpyArray::U32(_) => "<u4".to_string(),
        NpyArray::F64(_) => "<f8".to_string(),
        NpyArray::Str(text) => format!("|S{}", text.len()),
    }
}

fn dtype(descr: &str) -> io::Result<DType> {
    let type_str: TypeStr = descr.parse().map_err(|e| {
        io::Error::new(io::ErrorKind::InvalidInput, format!("descr {}: {}", descr, e))
    })?;
    Ok(DType::Plain(type_str))
}

/// Write `array` to `w` as one complete `.npy` stream.
pub fn write_npy<W: Write>(w: W, array: NpyArray<'_>) -> io::Result<()> {
    let dtype = dtype(&descr(&array))?;

    match array {
        NpyArray::U32(values) => {
            let mut writer = npyz::WriteOptions::<u32>::new()
                .dtype(dtype)
                .shape(&[values.len() as u64])
                .writer(w)
                .begin_nd()?;
            for v in values {
                writer.push(v)?;
            }
            writer.finish()
        }
        NpyArray::F64(values) => {
            let mut writer = npyz::WriteOptions::<f64>::new()
                .dtype(dtype)
                .shape(&[values.len() as u64])
                .writer(w)
                .begin_nd()?;
            for v in values {
                writer.push(v)?;
            }
            writer.finish()
        }
        NpyArray::Str(text) => {
            let mut writer = npyz::WriteOptions::<Vec<u8>>::new()
                .dtype(dtype)
                .shape(&[])
                .writer(w)
                .begin_nd()?;
            writer.push(&text.as_bytes().to_vec())?;
            writer.finish()
        }
    }
}

/// Read one `.npy` stream of a supported dtype.
pub fn read_npy<R: Read>(r: R) -> Result<NpyOwned> {
    let npy = npyz::NpyFile::new(r).map_err(invalid)?;
    let descr = match npy.dtype() {
        DType::Plain(type_str) => type_str.to_string(),
        other => {
            return Err(ExportError::InvalidInput(format!(
                "unsupported NPY dtype {:?}",
                other
            )))
        }
    };

    match descr.as_str() {
        "<u4" => Ok(NpyOwned::U32(npy.into_vec::<u32>().map_err(invalid)?)),
        "<f8" => Ok(NpyOwned::F64(npy.into_vec::<f64>().map_err(invalid)?)),
        d if d.starts_with("|S") => {
            let strings = npy.into_vec::<Vec<u8>>().map_err(invalid)?;
            Ok(NpyOwned::Bytes(strings.concat()))
        }
        other => Err(ExportError::InvalidInput(format!(
            "unsupported NPY descr {}",
            other
        ))),
    }
}

fn invalid(e: io::Error) -> ExportError {
    ExportError::InvalidInput(format!("malformed NPY data: {}", e))
}

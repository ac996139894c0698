//! Headerless native-endian array files.
//!
//! Readers must know the element type and count out of band; the files carry
//! nothing but the elements.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{ExportError, Result};

/// Fixed-width element stored in raw files.
pub trait RawElement: Copy {
    /// Element width in bytes.
    const WIDTH: usize;

    fn write_ne<W: Write>(&self, w: &mut W) -> std::io::Result<()>;

    /// Decode from exactly `WIDTH` bytes.
    fn from_ne_slice(bytes: &[u8]) -> Self;
}

macro_rules! raw_element {
    ($($ty:ty),*) => {
        $(
            impl RawElement for $ty {
                const WIDTH: usize = std::mem::size_of::<$ty>();

                #[inline]
                fn write_ne<W: Write>(&self, w: &mut W) -> std::io::Result<()> {
                    w.write_all(&self.to_ne_bytes())
                }

                #[inline]
                fn from_ne_slice(bytes: &[u8]) -> Self {
                    let mut buf = [0u8; std::mem::size_of::<$ty>()];
                    buf.copy_from_slice(bytes);
                    <$ty>::from_ne_bytes(buf)
                }
            }
        )*
    };
}

raw_element!(u32, i32, f64);

/// Write `values` to `path`, creating or truncating it.
pub fn write_raw<T: RawElement>(path: &Path, values: &[T]) -> Result<()> {
    let file = fs::File::create(path).map_err(|e| ExportError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    for v in values {
        v.write_ne(&mut writer).map_err(|e| ExportError::io(path, e))?;
    }
    writer.flush().map_err(|e| ExportError::io(path, e))
}

/// Read a whole raw file of `T` elements.
pub fn read_raw<T: RawElement>(path: &Path) -> Result<Vec<T>> {
    let bytes = fs::read(path).map_err(|e| ExportError::io(path, e))?;
    if bytes.len() % T::WIDTH != 0 {
        return Err(ExportError::InvalidInput(format!(
            "{} is {} bytes, not a multiple of the {}-byte element width",
            path.display(),
            bytes.len(),
            T::WIDTH
        )));
    }
    Ok(bytes.chunks_exact(T::WIDTH).map(T::from_ne_slice).collect())
}

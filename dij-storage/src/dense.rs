//! Dense dose volume writers: headerless raw, MetaImage `.mhd` + `.raw`, and
//! single-file `.mha`.
//!
//! All three write `f64` values in native byte order, x fastest. The MetaImage
//! headers declare little-endian data (`BinaryDataByteOrderMSB = False`).

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{ExportError, Result};
use crate::geometry::VolumeGeometry;
use crate::raw::{write_raw, RawElement};

/// Dense output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenseFormat {
    Raw,
    Mhd,
    Mha,
}

impl DenseFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            DenseFormat::Raw => "raw",
            DenseFormat::Mhd => "mhd",
            DenseFormat::Mha => "mha",
        }
    }
}

fn check_len(geometry: &VolumeGeometry, values: &[f64]) -> Result<()> {
    let volume_size = geometry.dims.volume_size()? as usize;
    if values.len() != volume_size {
        return Err(ExportError::InvalidInput(format!(
            "volume has {} values, grid {}x{}x{} needs {}",
            values.len(),
            geometry.dims.x,
            geometry.dims.y,
            geometry.dims.z,
            volume_size
        )));
    }
    Ok(())
}

fn scaled(values: &[f64], scale: f64) -> Vec<f64> {
    values.iter().map(|v| v * scale).collect()
}

fn triple(v: [f64; 3]) -> String {
    format!("{} {} {}", v[0], v[1], v[2])
}

/// Write `<dir>/<name>.raw` holding `values * scale`.
pub fn save_raw(values: &[f64], scale: f64, dir: &Path, name: &str) -> Result<PathBuf> {
    let path = dir.join(format!("{}.raw", name));
    write_raw(&path, &scaled(values, scale))?;
    info!(file = %path.display(), voxels = values.len(), "raw volume written");
    Ok(path)
}

/// MetaImage header for a detached `<name>.raw` data file.
pub fn mhd_header(geometry: &VolumeGeometry, name: &str) -> String {
    let d = geometry.dims;
    format!(
        "ObjectType = Image\n\
         NDims = 3\n\
         BinaryData = True\n\
         BinaryDataByteOrderMSB = False\n\
         CompressedData = False\n\
         TransformMatrix 1 0 0 0 1 0 0 0 1\n\
         Offset {}\n\
         CenterOfRotation 0 0 0\n\
         AnatomicOrientation = RAI\n\
         DimSize = {} {} {}\n\
         ElementType = MET_DOUBLE\n\
         ElementSpacing = {}\n\
         ElementDataFile = {}.raw\n",
        triple(geometry.origin),
        d.x,
        d.y,
        d.z,
        triple(geometry.spacing),
        name
    )
}

/// MetaImage header for inline data. `Origin` is the first voxel centre.
pub fn mha_header(geometry: &VolumeGeometry) -> String {
    let d = geometry.dims;
    format!(
        "ObjectType = Image\n\
         NDims = 3\n\
         BinaryData = True\n\
         BinaryDataByteOrderMSB = False\n\
         CompressedData = False\n\
         TransformMatrix = 1 0 0 0 1 0 0 0 1\n\
         Origin = {}\n\
         CenterOfRotation = 0 0 0\n\
         AnatomicOrientation = RAI\n\
         DimSize = {} {} {}\n\
         ElementType = MET_DOUBLE\n\
         HeaderSize = -1\n\
         ElementSpacing = {}\n\
         ElementDataFile = LOCAL\n",
        triple(geometry.first_voxel_center()),
        d.x,
        d.y,
        d.z,
        triple(geometry.spacing)
    )
}

/// Write `<dir>/<name>.mhd` and its `<dir>/<name>.raw` data file.
///
/// Returns the header path.
pub fn save_mhd(
    geometry: &VolumeGeometry,
    values: &[f64],
    scale: f64,
    dir: &Path,
    name: &str,
) -> Result<PathBuf> {
    check_len(geometry, values)?;

    let header_path = dir.join(format!("{}.mhd", name));
    std::fs::write(&header_path, mhd_header(geometry, name))
        .map_err(|e| ExportError::io(&header_path, e))?;

    let raw_path = dir.join(format!("{}.raw", name));
    write_raw(&raw_path, &scaled(values, scale))?;

    info!(file = %header_path.display(), voxels = values.len(), "mhd volume written");
    Ok(header_path)
}

/// Write `<dir>/<name>.mha`: header followed by the inline payload.
pub fn save_mha(
    geometry: &VolumeGeometry,
    values: &[f64],
    scale: f64,
    dir: &Path,
    name: &str,
) -> Result<PathBuf> {
    check_len(geometry, values)?;

    let path = dir.join(format!("{}.mha", name));
    let file = File::create(&path).map_err(|e| ExportError::io(&path, e))?;
    let mut w = BufWriter::new(file);

    w.write_all(mha_header(geometry).as_bytes())
        .map_err(|e| ExportError::io(&path, e))?;
    for v in values {
        (v * scale)
            .write_ne(&mut w)
            .map_err(|e| ExportError::io(&path, e))?;
    }
    w.flush().map_err(|e| ExportError::io(&path, e))?;

    info!(file = %path.display(), voxels = values.len(), "mha volume written");
    Ok(path)
}

/// Write `values` in `format`, returning the primary output path.
pub fn save_volume(
    format: DenseFormat,
    geometry: &VolumeGeometry,
    values: &[f64],
    scale: f64,
    dir: &Path,
    name: &str,
) -> Result<PathBuf> {
    match format {
        DenseFormat::Raw => {
            check_len(geometry, values)?;
            save_raw(values, scale, dir, name)
        }
        DenseFormat::Mhd => save_mhd(geometry, values, scale, dir, name),
        DenseFormat::Mha => save_mha(geometry, values, scale, dir, name),
    }
}

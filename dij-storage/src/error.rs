//! Error types for dose-influence export.
//!
//! Two classes of failure are kept apart:
//! - input errors (`is_fatal() == true`): the scoring data or the export
//!   parameters are inconsistent; the export aborts without writing anything
//!   further.
//! - I/O errors: a destination could not be opened or written. The flat dumper
//!   records these per file and keeps going; the CSR path propagates them.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while building or writing export artifacts.
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("voxel index {voxel} outside volume of {volume_size} voxels")]
    VoxelOutOfRange { voxel: u32, volume_size: u32 },

    #[error("spot index {spot} outside [0, {num_spots})")]
    SpotOutOfRange { spot: u32, num_spots: u32 },

    #[error("voxel {voxel} maps to masked index {index}, outside mask of size {mask_size}")]
    MaskIndexOutOfRange { voxel: u32, index: u32, mask_size: u32 },

    #[error("non-positive value {value} for voxel {voxel}, spot {spot} after scaling")]
    NonPositiveValue { voxel: u32, spot: u32, value: f64 },

    #[error("time scale has {len} entries, expected at least {num_spots}")]
    TimeScaleLength { len: usize, num_spots: u32 },

    #[error("time scale for spot {spot} is {factor}, expected a finite non-zero factor")]
    InvalidTimeScale { spot: u32, factor: f64 },

    #[error("volume {x}x{y}x{z} exceeds u32 voxel addressing")]
    VolumeTooLarge { x: u32, y: u32, z: u32 },

    #[error("capacity {capacity} exceeds the {available} supplied slots")]
    CapacityExceedsSlots { capacity: usize, available: usize },

    #[error("{0} entries exceed u32 CSR offsets")]
    TooManyEntries(u64),

    #[error("invalid CSR matrix: {0}")]
    InvalidCsr(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("archive error on {}: {source}", path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
}

impl ExportError {
    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Wrap a ZIP container error with the archive path.
    pub fn archive(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Archive {
            path: path.into(),
            source,
        }
    }

    /// True for errors caused by corrupt or inconsistent input data.
    ///
    /// Fatal errors abort an export. Non-fatal errors are destination I/O
    /// failures, which the flat dumper reports and continues past.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::Io { .. } | Self::Archive { .. })
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ExportError>;

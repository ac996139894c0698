//! DIJ Storage - Dose-influence matrix export from a scoring store.
//!
//! Turns the sparse `(voxel, spot, value)` slots accumulated by a scoring
//! engine into persisted matrices and volumes.
//!
//! # Outputs
//! - Spot-major CSR: one row per spot, one column per voxel
//! - Voxel-major masked CSR: one row per in-region voxel, spot columns sorted
//! - Time-normalised CSR: threshold removed, divided by per-spot delivery time
//! - Flat dump: three raw parallel arrays (`_key1`, `_key2`, `_value`)
//! - Dense volumes: `.raw`, `.mhd` + `.raw`, `.mha`
//!
//! CSR matrices are written as `.npz` archives readable by
//! `scipy.sparse.load_npz`.
//!
//! # Usage
//! ```ignore
//! use dij_storage::{export_csr, KeyValue, NpzWriter, ScoringStore, SpotMajor, VolumeDims};
//!
//! let store = ScoringStore::from_slots(&slots);
//! let layout = SpotMajor::new(VolumeDims::new(64, 64, 32), num_spots, 1.0)?;
//! let summary = export_csr(&layout, &store, &mut NpzWriter, out_dir, "dij")?;
//! ```

pub mod archive;
pub mod csr;
pub mod dense;
pub mod dump;
pub mod error;
pub mod export;
pub mod geometry;
pub mod mask;
pub mod raw;
pub mod store;

// Re-exports
pub use archive::{load_csr, write_csr, ArchiveWriter, NpyArray, NpzWriter, WriteMode, CSR_ARRAY_NAMES};
pub use csr::{CsrMatrix, Placed, RowOrder, CSR_FORMAT};
pub use dense::{save_mha, save_mhd, save_raw, save_volume, DenseFormat};
pub use dump::{dump_slots, dump_store, DumpReport, FlatDump};
pub use error::{ExportError, Result};
pub use export::{build_csr, export_csr, CsrLayout, ExportSummary, SpotMajor, TimeNormalized, ValueTransform, VoxelMajorMasked};
pub use geometry::{VolumeDims, VolumeGeometry};
pub use mask::{IndexMask, RegionMask};
pub use store::{KeyValue, ScoringSource, ScoringStore, SlotFilter, SparseEntry, EMPTY_KEY};

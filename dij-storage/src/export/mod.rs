//! Scoring store to CSR export.
//!
//! Each export variant is a [`CsrLayout`]: it fixes the slot filter, the
//! matrix shape, and how a live entry is routed to a `(row, col, value)`
//! cell. [`build_csr`] drives any layout through the two-pass assembler;
//! [`export_csr`] additionally writes the result through an
//! [`ArchiveWriter`].
//!
//! | variant            | rows            | cols          | filter         | transform            |
//! |--------------------|-----------------|---------------|----------------|----------------------|
//! | [`SpotMajor`]      | spot            | voxel         | live, positive | scale                |
//! | [`VoxelMajorMasked`] | masked voxel  | spot (sorted) | live, positive | scale, must be > 0   |
//! | [`TimeNormalized`] | spot            | voxel         | occupied       | threshold, time norm |

mod transform;

pub use transform::ValueTransform;

use std::cell::Cell;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::archive::{write_csr, ArchiveWriter};
use crate::csr::{self, CsrMatrix, Placed, RowOrder};
use crate::error::{ExportError, Result};
use crate::geometry::VolumeDims;
use crate::mask::RegionMask;
use crate::store::{ScoringSource, SlotFilter, SparseEntry};

/// Routing of scoring entries into a CSR matrix.
pub trait CsrLayout {
    /// Short variant name for diagnostics.
    fn label(&self) -> &'static str;

    /// Which slots the variant reads.
    fn filter(&self) -> SlotFilter;

    /// Output shape `(rows, cols)`.
    fn shape(&self) -> (u32, u32);

    /// Route one entry. `Ok(None)` drops it silently.
    fn place(&self, entry: &SparseEntry) -> Result<Option<Placed>>;

    /// Whether rows are sorted by column after assembly.
    fn sorted_rows(&self) -> bool {
        false
    }
}

fn check_spot(spot: u32, num_spots: u32) -> Result<()> {
    if spot >= num_spots {
        return Err(ExportError::SpotOutOfRange { spot, num_spots });
    }
    Ok(())
}

fn check_voxel(voxel: u32, volume_size: u32) -> Result<()> {
    if voxel >= volume_size {
        return Err(ExportError::VoxelOutOfRange { voxel, volume_size });
    }
    Ok(())
}

/// One row per spot, one column per voxel of the full grid.
#[derive(Debug, Clone, Copy)]
pub struct SpotMajor {
    volume_size: u32,
    num_spots: u32,
    scale: f64,
}

impl SpotMajor {
    pub fn new(dims: VolumeDims, num_spots: u32, scale: f64) -> Result<Self> {
        Ok(Self {
            volume_size: dims.volume_size()?,
            num_spots,
            scale,
        })
    }
}

impl CsrLayout for SpotMajor {
    fn label(&self) -> &'static str {
        "spot_major"
    }

    fn filter(&self) -> SlotFilter {
        SlotFilter::LivePositive
    }

    fn shape(&self) -> (u32, u32) {
        (self.num_spots, self.volume_size)
    }

    fn place(&self, entry: &SparseEntry) -> Result<Option<Placed>> {
        check_voxel(entry.voxel, self.volume_size)?;
        check_spot(entry.spot, self.num_spots)?;
        Ok(Some(Placed {
            row: entry.spot,
            col: entry.voxel,
            value: ValueTransform::Scale(self.scale).apply(entry)?,
        }))
    }
}

/// One row per in-region voxel, one column per spot, columns ascending.
#[derive(Debug)]
pub struct VoxelMajorMasked<'m, M: ?Sized> {
    mask: &'m M,
    num_spots: u32,
    scale: f64,
}

impl<'m, M: RegionMask + ?Sized> VoxelMajorMasked<'m, M> {
    pub fn new(mask: &'m M, num_spots: u32, scale: f64) -> Self {
        Self {
            mask,
            num_spots,
            scale,
        }
    }
}

impl<M: RegionMask + ?Sized> CsrLayout for VoxelMajorMasked<'_, M> {
    fn label(&self) -> &'static str {
        "voxel_major_masked"
    }

    fn filter(&self) -> SlotFilter {
        SlotFilter::LivePositive
    }

    fn shape(&self) -> (u32, u32) {
        (self.mask.mask_size(), self.num_spots)
    }

    fn place(&self, entry: &SparseEntry) -> Result<Option<Placed>> {
        let Some(row) = self.mask.mask_index(entry.voxel) else {
            return Ok(None);
        };
        let mask_size = self.mask.mask_size();
        if row >= mask_size {
            return Err(ExportError::MaskIndexOutOfRange {
                voxel: entry.voxel,
                index: row,
                mask_size,
            });
        }
        check_spot(entry.spot, self.num_spots)?;
        Ok(Some(Placed {
            row,
            col: entry.spot,
            value: ValueTransform::PositiveScale(self.scale).apply(entry)?,
        }))
    }

    fn sorted_rows(&self) -> bool {
        true
    }
}

/// Spot-major with threshold removal and per-spot time normalisation.
#[derive(Debug, Clone, Copy)]
pub struct TimeNormalized<'t> {
    volume_size: u32,
    num_spots: u32,
    transform: ValueTransform<'t>,
}

impl<'t> TimeNormalized<'t> {
    /// `time_scale` must cover every spot.
    pub fn new(
        dims: VolumeDims,
        num_spots: u32,
        scale: f64,
        threshold: f64,
        time_scale: &'t [f64],
    ) -> Result<Self> {
        if time_scale.len() < num_spots as usize {
            return Err(ExportError::TimeScaleLength {
                len: time_scale.len(),
                num_spots,
            });
        }
        Ok(Self {
            volume_size: dims.volume_size()?,
            num_spots,
            transform: ValueTransform::TimeNormalized {
                scale,
                threshold,
                time_scale,
            },
        })
    }
}

impl CsrLayout for TimeNormalized<'_> {
    fn label(&self) -> &'static str {
        "time_normalized"
    }

    fn filter(&self) -> SlotFilter {
        SlotFilter::Occupied
    }

    fn shape(&self) -> (u32, u32) {
        (self.num_spots, self.volume_size)
    }

    fn place(&self, entry: &SparseEntry) -> Result<Option<Placed>> {
        check_voxel(entry.voxel, self.volume_size)?;
        check_spot(entry.spot, self.num_spots)?;
        Ok(Some(Placed {
            row: entry.spot,
            col: entry.voxel,
            value: self.transform.apply(entry)?,
        }))
    }
}

/// Build the CSR matrix of `layout` from a read-only scoring source.
pub fn build_csr<L, S>(layout: &L, source: &S) -> Result<CsrMatrix>
where
    L: CsrLayout + ?Sized,
    S: ScoringSource + ?Sized,
{
    let filter = layout.filter();
    let shape = layout.shape();
    let excluded = Cell::new(0usize);
    let mut first_pass = true;

    let mut matrix = csr::assemble(shape, || {
        let count_excluded = first_pass;
        first_pass = false;
        let excluded = &excluded;
        source
            .entries(filter)
            .filter_map(move |entry| match layout.place(&entry) {
                Ok(Some(placed)) => Some(Ok(placed)),
                Ok(None) => {
                    if count_excluded {
                        excluded.set(excluded.get() + 1);
                    }
                    None
                }
                Err(e) => Some(Err(e)),
            })
    })?;

    let excluded = excluded.get();
    if excluded > 0 {
        debug!(variant = layout.label(), excluded, "entries outside the region mask dropped");
    }

    if layout.sorted_rows() {
        let sorted = csr::sort_rows(&mut matrix);
        debug!(variant = layout.label(), rows = sorted, "rows sorted by column");
    }

    debug!(
        variant = layout.label(),
        capacity = source.capacity(),
        rows = shape.0,
        cols = shape.1,
        nnz = matrix.nnz(),
        "csr assembled"
    );
    Ok(matrix)
}

/// Summary of one CSR export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub shape: (u32, u32),
    pub nnz: usize,
}

/// Build `layout` from `source`, validate it, and write it to
/// `<dir>/<name>.npz`.
pub fn export_csr<L, S, W>(
    layout: &L,
    source: &S,
    writer: &mut W,
    dir: &Path,
    name: &str,
) -> Result<ExportSummary>
where
    L: CsrLayout + ?Sized,
    S: ScoringSource + ?Sized,
    W: ArchiveWriter + ?Sized,
{
    let matrix = build_csr(layout, source)?;
    matrix.validate(RowOrder::Any)?;
    let path = dir.join(format!("{}.npz", name));
    write_csr(writer, &path, &matrix)?;

    info!(
        variant = layout.label(),
        file = %path.display(),
        rows = matrix.rows(),
        cols = matrix.cols(),
        nnz = matrix.nnz(),
        "csr archive written"
    );

    Ok(ExportSummary {
        path,
        shape: matrix.shape,
        nnz: matrix.nnz(),
    })
}

#[cfg(test)]
mod tests;

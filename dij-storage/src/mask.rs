//! Region-of-interest masks that compact the voxel address space.

use crate::error::{ExportError, Result};

/// Maps full-volume voxel indices to a compact region-of-interest index.
pub trait RegionMask {
    /// Number of voxels inside the region; masked indices are `[0, mask_size)`.
    fn mask_size(&self) -> u32;

    /// Compact index of `voxel`, or `None` when the voxel is outside the region.
    fn mask_index(&self, voxel: u32) -> Option<u32>;
}

/// Lookup-table mask in the engine's ROI convention.
///
/// `table[voxel]` holds the masked index, or a negative value for voxels
/// outside the region. Voxels beyond the table are outside as well.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMask {
    table: Vec<i32>,
    mask_size: u32,
}

impl IndexMask {
    /// Build from a lookup table. The mask size is one past the largest index.
    pub fn from_table(table: Vec<i32>) -> Self {
        let mask_size = table
            .iter()
            .filter(|&&idx| idx >= 0)
            .max()
            .map_or(0, |&idx| idx as u32 + 1);
        Self { table, mask_size }
    }

    /// Build from the in-region voxels of a volume.
    ///
    /// Masked indices are assigned in ascending voxel order; duplicates are
    /// ignored.
    pub fn from_voxels(volume_size: u32, voxels: &[u32]) -> Result<Self> {
        let mut sorted = voxels.to_vec();
        sorted.sort_unstable();
        sorted.dedup();

        if let Some(&last) = sorted.last() {
            if last >= volume_size {
                return Err(ExportError::VoxelOutOfRange {
                    voxel: last,
                    volume_size,
                });
            }
        }
        if sorted.len() > i32::MAX as usize {
            return Err(ExportError::InvalidInput(format!(
                "mask of {} voxels exceeds i32 lookup indices",
                sorted.len()
            )));
        }

        let mut table = vec![-1i32; volume_size as usize];
        for (masked, &voxel) in sorted.iter().enumerate() {
            table[voxel as usize] = masked as i32;
        }

        Ok(Self {
            table,
            mask_size: sorted.len() as u32,
        })
    }

    /// Length of the lookup table (the volume it was built for).
    pub fn volume_size(&self) -> usize {
        self.table.len()
    }
}

impl RegionMask for IndexMask {
    fn mask_size(&self) -> u32 {
        self.mask_size
    }

    #[inline]
    fn mask_index(&self, voxel: u32) -> Option<u32> {
        match self.table.get(voxel as usize) {
            Some(&idx) if idx >= 0 => Some(idx as u32),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_table_negative_is_excluded() {
        let mask = IndexMask::from_table(vec![0, 1, -1, 2]);
        assert_eq!(mask.mask_size(), 3);
        assert_eq!(mask.mask_index(0), Some(0));
        assert_eq!(mask.mask_index(2), None);
        assert_eq!(mask.mask_index(3), Some(2));
    }

    #[test]
    fn test_from_table_out_of_table_is_excluded() {
        let mask = IndexMask::from_table(vec![0, 1]);
        assert_eq!(mask.mask_index(7), None);
    }

    #[test]
    fn test_from_table_all_excluded() {
        let mask = IndexMask::from_table(vec![-1, -1]);
        assert_eq!(mask.mask_size(), 0);
    }

    #[test]
    fn test_from_voxels_compacts_in_voxel_order() {
        let mask = IndexMask::from_voxels(6, &[4, 1, 4, 3]).unwrap();
        assert_eq!(mask.mask_size(), 3);
        assert_eq!(mask.volume_size(), 6);
        assert_eq!(mask.mask_index(1), Some(0));
        assert_eq!(mask.mask_index(3), Some(1));
        assert_eq!(mask.mask_index(4), Some(2));
        assert_eq!(mask.mask_index(0), None);
    }

    #[test]
    fn test_from_voxels_rejects_out_of_volume() {
        let err = IndexMask::from_voxels(4, &[1, 4]).unwrap_err();
        assert!(matches!(
            err,
            ExportError::VoxelOutOfRange {
                voxel: 4,
                volume_size: 4
            }
        ));
    }
}

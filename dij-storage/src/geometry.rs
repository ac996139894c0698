//! Dose grid dimensions and placement.

use crate::error::{ExportError, Result};

/// Voxel counts along x, y and z.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeDims {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl VolumeDims {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Total voxel count `x * y * z`.
    ///
    /// Voxel indices are `u32` in the scoring store, so a grid that does not
    /// fit is rejected rather than wrapped.
    pub fn volume_size(&self) -> Result<u32> {
        self.x
            .checked_mul(self.y)
            .and_then(|xy| xy.checked_mul(self.z))
            .ok_or(ExportError::VolumeTooLarge {
                x: self.x,
                y: self.y,
                z: self.z,
            })
    }
}

impl From<[u32; 3]> for VolumeDims {
    fn from([x, y, z]: [u32; 3]) -> Self {
        Self { x, y, z }
    }
}

/// Axis-aligned dose grid: dimensions, lower edge of the first voxel, and
/// voxel spacing (mm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeGeometry {
    pub dims: VolumeDims,
    pub origin: [f64; 3],
    pub spacing: [f64; 3],
}

impl VolumeGeometry {
    pub fn new(dims: VolumeDims, origin: [f64; 3], spacing: [f64; 3]) -> Self {
        Self {
            dims,
            origin,
            spacing,
        }
    }

    /// Grid with 1 mm isotropic voxels whose first edge sits at the origin.
    pub fn unit(dims: VolumeDims) -> Self {
        Self::new(dims, [0.0; 3], [1.0; 3])
    }

    /// Centre of the first voxel.
    pub fn first_voxel_center(&self) -> [f64; 3] {
        [
            self.origin[0] + self.spacing[0] * 0.5,
            self.origin[1] + self.spacing[1] * 0.5,
            self.origin[2] + self.spacing[2] * 0.5,
        ]
    }
}

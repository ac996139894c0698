//! Value transforms applied to scored dose before it enters a matrix.

use crate::error::{ExportError, Result};
use crate::store::SparseEntry;

/// Scaling policy of an export variant.
#[derive(Debug, Clone, Copy)]
pub enum ValueTransform<'a> {
    /// `value * scale`.
    Scale(f64),
    /// `value * scale`, which must come out strictly positive.
    PositiveScale(f64),
    /// `max(0, value * scale - 2 * threshold) / time_scale[spot]`.
    TimeNormalized {
        scale: f64,
        threshold: f64,
        time_scale: &'a [f64],
    },
}

impl ValueTransform<'_> {
    /// Transformed value of `entry`.
    #[inline]
    pub fn apply(&self, entry: &SparseEntry) -> Result<f64> {
        match *self {
            ValueTransform::Scale(scale) => Ok(entry.value * scale),
            ValueTransform::PositiveScale(scale) => {
                let value = entry.value * scale;
                // NaN fails this comparison too
                if value > 0.0 {
                    Ok(value)
                } else {
                    Err(ExportError::NonPositiveValue {
                        voxel: entry.voxel,
                        spot: entry.spot,
                        value,
                    })
                }
            }
            ValueTransform::TimeNormalized {
                scale,
                threshold,
                time_scale,
            } => {
                let factor = time_scale
                    .get(entry.spot as usize)
                    .copied()
                    .ok_or(ExportError::TimeScaleLength {
                        len: time_scale.len(),
                        num_spots: entry.spot + 1,
                    })?;
                if factor == 0.0 || !factor.is_finite() {
                    return Err(ExportError::InvalidTimeScale {
                        spot: entry.spot,
                        factor,
                    });
                }
                let corrected = (entry.value * scale - 2.0 * threshold).max(0.0);
                Ok(corrected / factor)
            }
        }
    }
}

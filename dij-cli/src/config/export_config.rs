//! Export configuration for dump to CSR/flat conversion.

use std::collections::HashSet;

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Configuration for exporting one flat dump.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportConfig {
    /// Dose grid size in voxels `[x, y, z]`
    pub dims: [u32; 3],

    /// Number of spots (beamlets) scored into the dump
    pub num_spots: u32,

    /// Exports to produce, run in parallel
    #[serde(default)]
    pub jobs: Vec<ExportJob>,
}

/// One export, tagged by `kind` in JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExportJob {
    /// Spot rows, voxel columns.
    SpotMajor {
        name: String,
        #[serde(default = "default_scale")]
        scale: f64,
    },

    /// In-region voxel rows, sorted spot columns.
    VoxelMajorMasked {
        name: String,
        #[serde(default = "default_scale")]
        scale: f64,
        /// Raw i32 table of length `x*y*z`: masked index, or negative to exclude
        mask: String,
    },

    /// Spot-major with threshold removal and per-spot time normalisation.
    TimeNormalized {
        name: String,
        #[serde(default = "default_scale")]
        scale: f64,
        /// Raw f64 array with one delivery time per spot
        time_scale: String,
        #[serde(default)]
        threshold: f64,
    },

    /// Re-dump of live, positive entries as three raw arrays.
    Flat {
        name: String,
        #[serde(default = "default_scale")]
        scale: f64,
    },
}

fn default_scale() -> f64 {
    1.0
}

impl ExportJob {
    /// Output file stem.
    pub fn name(&self) -> &str {
        match self {
            ExportJob::SpotMajor { name, .. }
            | ExportJob::VoxelMajorMasked { name, .. }
            | ExportJob::TimeNormalized { name, .. }
            | ExportJob::Flat { name, .. } => name,
        }
    }

    /// The `kind` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            ExportJob::SpotMajor { .. } => "spot_major",
            ExportJob::VoxelMajorMasked { .. } => "voxel_major_masked",
            ExportJob::TimeNormalized { .. } => "time_normalized",
            ExportJob::Flat { .. } => "flat",
        }
    }
}

impl ExportConfig {
    /// Reject configs whose jobs would collide or that have nothing to do.
    ///
    /// Job names are output file stems and jobs run concurrently, so every
    /// name must be unique.
    pub fn validate(&self) -> Result<()> {
        if self.jobs.is_empty() {
            anyhow::bail!("Config has no jobs; nothing to export");
        }

        let mut seen = HashSet::new();
        for job in &self.jobs {
            if !seen.insert(job.name()) {
                anyhow::bail!("Duplicate job name '{}' in config", job.name());
            }
        }
        Ok(())
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dims: [1, 1, 1],
            num_spots: 1,
            jobs: Vec::new(),
        }
    }
}

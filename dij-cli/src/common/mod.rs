//! Common utilities shared between export and volume commands.

use anyhow::{Context, Result};
use dij_storage::raw::read_raw;
use dij_storage::{FlatDump, IndexMask, ScoringStore};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::Path;

/// Load a JSON config file, requiring it to exist.
pub fn load_config<T: DeserializeOwned>(config_path: Option<&str>, config_name: &str) -> Result<T> {
    let path = config_path.ok_or_else(|| {
        anyhow::anyhow!("--config is required. Use generate-config to create {}", config_name)
    })?;

    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path))?;

    serde_json::from_str(&json)
        .with_context(|| format!("Failed to parse config: {}", path))
}

/// Load a flat dump directory into a scoring store.
pub fn load_dump(input_dir: &str, name: &str) -> Result<ScoringStore> {
    let dir = Path::new(input_dir);
    if !dir.is_dir() {
        anyhow::bail!("Input path must be a directory: {}", input_dir);
    }

    let dump = FlatDump::load(dir, name)
        .with_context(|| format!("Failed to load dump '{}' from {}", name, input_dir))?;

    Ok(dump.into_store())
}

/// Load a region mask stored as a raw i32 lookup table.
pub fn load_mask(path: &str, volume_size: u32) -> Result<IndexMask> {
    let table: Vec<i32> = read_raw(Path::new(path))
        .with_context(|| format!("Failed to read mask: {}", path))?;

    if table.len() != volume_size as usize {
        anyhow::bail!(
            "Mask {} has {} entries, expected {} (one per voxel)",
            path,
            table.len(),
            volume_size
        );
    }

    Ok(IndexMask::from_table(table))
}

/// Load per-spot delivery times stored as raw f64.
pub fn load_time_scale(path: &str, num_spots: u32) -> Result<Vec<f64>> {
    let times: Vec<f64> = read_raw(Path::new(path))
        .with_context(|| format!("Failed to read time scale: {}", path))?;

    if times.len() < num_spots as usize {
        anyhow::bail!(
            "Time scale {} has {} entries, expected at least {}",
            path,
            times.len(),
            num_spots
        );
    }

    Ok(times)
}

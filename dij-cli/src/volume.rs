//! Volume module - dense f64 dose grid to raw/mhd/mha.

use anyhow::{Context, Result};
use dij_storage::raw::read_raw;
use dij_storage::{save_volume, DenseFormat, VolumeDims, VolumeGeometry};
use std::fs;
use std::path::Path;

/// Arguments of the `volume` command.
#[derive(Debug, Clone)]
pub struct VolumeArgs {
    pub input: String,
    pub dims: Vec<u32>,
    pub spacing: Option<Vec<f64>>,
    pub origin: Option<Vec<f64>>,
    pub format: String,
    pub output: String,
    pub name: String,
    pub scale: f64,
}

/// Parse a dense output format name.
pub fn parse_format(s: &str) -> Result<DenseFormat> {
    match s.to_lowercase().as_str() {
        "raw" => Ok(DenseFormat::Raw),
        "mhd" => Ok(DenseFormat::Mhd),
        "mha" => Ok(DenseFormat::Mha),
        _ => anyhow::bail!("Unknown volume format '{}'. Supported: raw, mhd, mha", s),
    }
}

fn triple<T: Copy>(values: &[T], what: &str) -> Result<[T; 3]> {
    match values {
        [a, b, c] => Ok([*a, *b, *c]),
        _ => anyhow::bail!("{} needs exactly 3 values, got {}", what, values.len()),
    }
}

/// Read a raw f64 volume and write it in the requested format.
pub fn run(args: &VolumeArgs) -> Result<()> {
    let format = parse_format(&args.format)?;
    let dims = VolumeDims::from(triple(&args.dims, "--dims")?);

    let spacing = match &args.spacing {
        Some(s) => triple(s, "--spacing")?,
        None => [1.0; 3],
    };
    let origin = match &args.origin {
        Some(o) => triple(o, "--origin")?,
        None => [0.0; 3],
    };
    let geometry = VolumeGeometry::new(dims, origin, spacing);

    let values: Vec<f64> = read_raw(Path::new(&args.input))
        .with_context(|| format!("Failed to read volume: {}", args.input))?;

    let output_dir = Path::new(&args.output);
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", args.output))?;

    let path = save_volume(format, &geometry, &values, args.scale, output_dir, &args.name)
        .with_context(|| format!("Failed to write {} volume '{}'", format.extension(), args.name))?;

    println!(
        "Wrote {} [{}x{}x{}] ({} voxels, scale {})",
        path.display(),
        dims.x,
        dims.y,
        dims.z,
        values.len(),
        args.scale
    );

    Ok(())
}

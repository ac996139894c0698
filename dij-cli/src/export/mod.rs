//! Export module - flat dump to CSR archives and flat re-dumps.

use anyhow::{Context, Result};
use dij_storage::{
    dump_store, export_csr, DumpReport, ExportSummary, NpzWriter, ScoringStore, SpotMajor,
    TimeNormalized, VolumeDims, VoxelMajorMasked,
};
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

use crate::common::{load_config, load_dump, load_mask, load_time_scale};
use crate::config::export_config::{ExportConfig, ExportJob};

/// What one job produced.
enum JobOutcome {
    Csr(ExportSummary),
    Flat(DumpReport),
}

/// Shared, read-only inputs of every job.
struct JobContext<'a> {
    store: &'a ScoringStore,
    dims: VolumeDims,
    volume_size: u32,
    num_spots: u32,
    output_dir: &'a Path,
}

/// Write an export config template listing one job of every kind.
pub fn generate_config_template(output_path: Option<&str>) -> Result<()> {
    let output_file = output_path.unwrap_or("export_config.json");

    let config = ExportConfig {
        dims: [100, 100, 100],
        num_spots: 1,
        jobs: vec![
            ExportJob::SpotMajor {
                name: "dij".to_string(),
                scale: 1.0,
            },
            ExportJob::VoxelMajorMasked {
                name: "dij_roi".to_string(),
                scale: 1.0,
                mask: "roi_mask.raw".to_string(),
            },
            ExportJob::TimeNormalized {
                name: "dij_rate".to_string(),
                scale: 1.0,
                time_scale: "spot_times.raw".to_string(),
                threshold: 0.0,
            },
            ExportJob::Flat {
                name: "dij_flat".to_string(),
                scale: 1.0,
            },
        ],
    };

    fs::write(output_file, serde_json::to_string_pretty(&config)?)
        .with_context(|| format!("Failed to write config: {}", output_file))?;

    println!("Generated {} ({} jobs)", output_file, config.jobs.len());
    println!("Edit dims, num_spots and the job list, then run:");
    println!(
        "  dij export --input <dump_dir> --name <dump_name> --config {}",
        output_file
    );

    Ok(())
}

/// Load a flat dump and run every job in the config in parallel.
///
/// Each job only reads the shared store; a failing job does not stop the
/// others. Returns an error if any job failed.
pub fn run(
    input_dir: &str,
    name: &str,
    config_path: Option<&str>,
    output_dir: Option<&str>,
) -> Result<()> {
    let config: ExportConfig = load_config(config_path, "export_config.json")?;
    config.validate()?;

    let dims = VolumeDims::from(config.dims);
    let volume_size = dims.volume_size().context("Invalid dims in config")?;

    let store = load_dump(input_dir, name)?;
    let output_dir = Path::new(output_dir.unwrap_or(input_dir));
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory: {}", output_dir.display()))?;

    println!(
        "Exporting '{}' ({} entries, grid {}x{}x{}, {} spots): {} jobs",
        name,
        store.occupied(),
        dims.x,
        dims.y,
        dims.z,
        config.num_spots,
        config.jobs.len()
    );

    let ctx = JobContext {
        store: &store,
        dims,
        volume_size,
        num_spots: config.num_spots,
        output_dir,
    };

    let results: Vec<(&ExportJob, Result<JobOutcome>)> = config
        .jobs
        .par_iter()
        .map(|job| (job, run_job(job, &ctx)))
        .collect();

    let mut failed = 0usize;
    for (job, result) in &results {
        match result {
            Ok(JobOutcome::Csr(summary)) => {
                info!(
                    kind = job.kind(),
                    job = job.name(),
                    nnz = summary.nnz,
                    path = %summary.path.display(),
                    "export job finished"
                );
                println!(
                    "  [{}] {} -> {} [{}x{}] nnz={}",
                    job.kind(),
                    job.name(),
                    summary.path.display(),
                    summary.shape.0,
                    summary.shape.1,
                    summary.nnz
                );
            }
            Ok(JobOutcome::Flat(report)) => {
                println!(
                    "  [{}] {} -> {} files, {} entries",
                    job.kind(),
                    job.name(),
                    report.written.len(),
                    report.entries
                );
                for err in &report.failures {
                    eprintln!("    Warning: {}", err);
                }
                if !report.is_complete() {
                    warn!(
                        kind = job.kind(),
                        job = job.name(),
                        failed_files = report.failures.len(),
                        "flat dump incomplete"
                    );
                    failed += 1;
                }
            }
            Err(e) => {
                error!(kind = job.kind(), job = job.name(), error = %format!("{:#}", e), "export job failed");
                eprintln!("  [{}] {} failed: {:#}", job.kind(), job.name(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} export jobs failed", failed, results.len());
    }

    println!("\nExport complete: {}", output_dir.display());
    Ok(())
}

fn run_job(job: &ExportJob, ctx: &JobContext<'_>) -> Result<JobOutcome> {
    let mut writer = NpzWriter;

    let outcome = match job {
        ExportJob::SpotMajor { name, scale } => {
            let layout = SpotMajor::new(ctx.dims, ctx.num_spots, *scale)?;
            JobOutcome::Csr(export_csr(&layout, ctx.store, &mut writer, ctx.output_dir, name)?)
        }
        ExportJob::VoxelMajorMasked { name, scale, mask } => {
            let mask = load_mask(mask, ctx.volume_size)?;
            let layout = VoxelMajorMasked::new(&mask, ctx.num_spots, *scale);
            JobOutcome::Csr(export_csr(&layout, ctx.store, &mut writer, ctx.output_dir, name)?)
        }
        ExportJob::TimeNormalized {
            name,
            scale,
            time_scale,
            threshold,
        } => {
            let times = load_time_scale(time_scale, ctx.num_spots)?;
            let layout = TimeNormalized::new(ctx.dims, ctx.num_spots, *scale, *threshold, &times)?;
            JobOutcome::Csr(export_csr(&layout, ctx.store, &mut writer, ctx.output_dir, name)?)
        }
        ExportJob::Flat { name, scale } => {
            JobOutcome::Flat(dump_store(ctx.store, *scale, ctx.output_dir, name))
        }
    };

    Ok(outcome)
}

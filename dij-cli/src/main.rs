//! DIJ CLI - Export dose-influence dumps to CSR archives and dense volumes.

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod common;
mod config;
mod export;
mod volume;

#[derive(Parser)]
#[command(name = "dij")]
#[command(about = "CLI tool for exporting dose-influence matrices and dose volumes")]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a flat dump to CSR archives and dumps described by a config
    Export {
        /// Directory holding the flat dump
        #[arg(short, long)]
        input: String,

        /// Dump name (files are <name>_key1.raw, <name>_key2.raw, <name>_value.raw)
        #[arg(short, long)]
        name: String,

        /// Path to export config JSON
        #[arg(short, long)]
        config: Option<String>,

        /// Output directory (defaults to the input directory)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Write a template export config
    GenerateConfig {
        /// Output path for the template
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Write a dense f64 volume as raw, mhd or mha
    Volume {
        /// Raw f64 volume file
        #[arg(short, long)]
        input: String,

        /// Grid size in voxels
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], required = true)]
        dims: Vec<u32>,

        /// Voxel spacing
        #[arg(long, num_args = 3, value_names = ["DX", "DY", "DZ"])]
        spacing: Option<Vec<f64>>,

        /// Lower edge of the first voxel
        #[arg(long, num_args = 3, value_names = ["X0", "Y0", "Z0"], allow_negative_numbers = true)]
        origin: Option<Vec<f64>>,

        /// Output format: raw, mhd or mha
        #[arg(short, long, default_value = "mhd")]
        format: String,

        /// Output directory
        #[arg(short, long)]
        output: String,

        /// Output file stem
        #[arg(short, long)]
        name: String,

        /// Multiply every value by this factor
        #[arg(long, default_value_t = 1.0)]
        scale: f64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Export {
            input,
            name,
            config,
            output,
        } => {
            export::run(&input, &name, config.as_deref(), output.as_deref())?;
        }
        Commands::GenerateConfig { output } => {
            export::generate_config_template(output.as_deref())?;
        }
        Commands::Volume {
            input,
            dims,
            spacing,
            origin,
            format,
            output,
            name,
            scale,
        } => {
            let args = volume::VolumeArgs {
                input,
                dims,
                spacing,
                origin,
                format,
                output,
                name,
                scale,
            };
            volume::run(&args)?;
        }
    }

    Ok(())
}

//! GFS raster processor.
//!
//! Turns downloaded GFS GRIB2 files into normalized grayscale rasters with
//! `.info` records, reconciles families to shared extrema, and builds
//! isobaric contour and wind vector overlays.

mod config;
mod report;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gfs_common::BoundingBox;
use raster_pipeline::{Pipeline, PipelineConfig, WindMode};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use report::{ContourSummary, GenerateSummary, RasterSummary, ReconcileSummary};

#[derive(Parser, Debug)]
#[command(name = "gfs-processor")]
#[command(about = "Normalize GFS GRIB2 grids into raster products")]
struct Args {
    /// YAML configuration file
    #[arg(short, long, env = "GFS_PROCESSOR_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding .grb2 source files
    #[arg(long)]
    source_dir: Option<PathBuf>,

    /// Directory receiving rasters and products
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Decode, reconcile and renormalize every source of a family
    Generate {
        /// Parameter short name
        #[arg(short, long, default_value = "HGT")]
        param: String,

        /// Level token as used in file names
        #[arg(short, long, default_value = "500_mb")]
        level: String,

        /// Region as "lon_min,lat_min,lon_max,lat_max"
        #[arg(long)]
        bbox: Option<String>,
    },

    /// Decode one source file into a raster without touching its family
    Decode {
        file: PathBuf,

        /// Message to decode from a multi-message file
        #[arg(long)]
        index: Option<usize>,

        #[arg(long)]
        bbox: Option<String>,
    },

    /// Reconcile and renormalize an already decoded family
    Reconcile {
        #[arg(short, long, default_value = "HGT")]
        param: String,

        #[arg(short, long, default_value = "500_mb")]
        level: String,
    },

    /// Build isobaric contour products
    Contours {
        /// Raster to contour (default: every raster of an isobaric parameter)
        raster: Option<PathBuf>,
    },

    /// Build wind products from UGRD_/VGRD_ rasters
    Wind {
        #[arg(long, requires = "v")]
        u: Option<PathBuf>,

        #[arg(long, requires = "u")]
        v: Option<PathBuf>,

        /// arrows or streamlines
        #[arg(long)]
        mode: Option<String>,
    },

    /// Delete every raster, record and product in the output directory
    Purge,

    /// Print the effective configuration as YAML
    ShowConfig,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();
    init_tracing(&args)?;

    let mut config = config::load(args.config.as_deref())?;
    if let Some(dir) = &args.source_dir {
        config.source_dir = dir.clone();
    }
    if let Some(dir) = &args.output_dir {
        config.output_dir = dir.clone();
    }

    if let Command::ShowConfig = args.command {
        print!("{}", config::to_yaml(&config)?);
        return Ok(());
    }
    if let Command::Wind { mode: Some(mode), .. } = &args.command {
        config.wind.mode = WindMode::from_str(mode);
    }

    info!(
        source_dir = %config.source_dir.display(),
        output_dir = %config.output_dir.display(),
        "Starting GFS raster processor"
    );
    let pipeline = Pipeline::new(config).context("Invalid pipeline configuration")?;
    run(&pipeline, args.command)
}

fn init_tracing(args: &Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Logs go to stderr so stdout stays clean for summaries
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);
    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn run(pipeline: &Pipeline, command: Command) -> Result<()> {
    match command {
        Command::Generate { param, level, bbox } => {
            let bbox = parse_bbox(bbox.as_deref(), pipeline.config())?;
            let report = pipeline
                .generate_family(&param, &level, Some(&bbox))
                .with_context(|| format!("Failed to generate {param} {level}"))?;
            report::print(&GenerateSummary::from(&report))
        }

        Command::Decode { file, index, bbox } => {
            let bbox = parse_bbox(bbox.as_deref(), pipeline.config())?;
            let out = match index {
                Some(i) => pipeline.decode_message_to_raster(&file, i, &bbox),
                None => pipeline.decode_to_raster(&file, &bbox),
            }
            .with_context(|| format!("Failed to decode {:?}", file))?;
            report::print(&RasterSummary::from(&out))
        }

        Command::Reconcile { param, level } => {
            let (global_min, global_max) = pipeline
                .normalize_family(&param, &level)
                .with_context(|| format!("Failed to reconcile {param} {level}"))?;
            let renormalized = pipeline
                .renormalize_family(&param, &level, global_min, global_max)
                .with_context(|| format!("Failed to renormalize {param} {level}"))?;
            report::print(&ReconcileSummary {
                parameter: param,
                level,
                global_min,
                global_max,
                renormalized,
            })
        }

        Command::Contours { raster: Some(raster) } => {
            let (image, levels) = pipeline
                .build_contours(&raster)
                .with_context(|| format!("Failed to contour {:?}", raster))?;
            report::print(&ContourSummary { image, levels })
        }

        Command::Contours { raster: None } => {
            let results = pipeline.build_isobaric_products()?;
            let mut built = Vec::new();
            for result in &results {
                match result {
                    Ok(product) => built.push(ContourSummary::from(product)),
                    Err(e) => tracing::error!(error = %e, "Isobaric product failed"),
                }
            }
            report::print(&built)
        }

        Command::Wind {
            u: Some(u),
            v: Some(v),
            ..
        } => {
            let out = pipeline
                .build_wind_product(&u, &v)
                .with_context(|| format!("Failed to build wind product from {:?} and {:?}", u, v))?;
            report::print(&[out])
        }

        Command::Wind { .. } => {
            let products = pipeline.build_wind_products()?;
            report::print(&products)
        }

        Command::Purge => {
            let removed = pipeline.purge()?;
            report::print(&serde_json::json!({ "removed": removed }))
        }

        Command::ShowConfig => Ok(()),
    }
}

fn parse_bbox(arg: Option<&str>, config: &PipelineConfig) -> Result<BoundingBox> {
    match arg {
        Some(s) => BoundingBox::parse(s).with_context(|| format!("Invalid --bbox {s:?}")),
        None => Ok(config.bbox),
    }
}

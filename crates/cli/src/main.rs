//! landclust CLI - spectral clustering validated against reference land cover

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use landclust_algorithms::classification::{
    cluster_validation, valid_mask, ClusterValidation, ImputeStrategy, Initialization,
    KmeansParams, MaskParams, MissingValues, PipelineParams, UNASSIGNED,
};
use landclust_algorithms::statistics::{band_mean, class_fractions, percentile_range};
use landclust_core::io::{read_band_stack, read_geotiff, write_geotiff};
use landclust_core::{GeoTransform, Raster, RasterStack};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "landclust")]
#[command(author, version, about = "Unsupervised spectral clustering validated against reference land cover", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Cluster a scene and cross-tabulate clusters against reference classes
    Cluster {
        #[command(flatten)]
        scene: SceneArgs,
        /// Output cluster grid (GeoTIFF, -1 = unassigned)
        #[arg(short, long)]
        output: PathBuf,
        /// Optional JSON report with matrices and diagnostics
        #[arg(long)]
        report: Option<PathBuf>,
        /// Number of clusters
        #[arg(short, long, default_value = "10")]
        k: usize,
        /// Seed for centroid initialization
        #[arg(long, default_value = "42")]
        seed: u64,
        /// Maximum k-means iterations
        #[arg(long, default_value = "300")]
        max_iterations: usize,
        /// Stop once no centroid moves farther than this
        #[arg(long, default_value = "1e-4")]
        tolerance: f64,
        /// Centroid seeding: kmeans++ or random
        #[arg(long, default_value = "kmeans++")]
        init: String,
        /// Imputation strategy: mean, median or constant:<value>
        #[arg(long, default_value = "mean")]
        impute: String,
    },
    /// Write the band-averaged quick-look of the valid region
    Quicklook {
        #[command(flatten)]
        scene: SceneArgs,
        /// Output file
        #[arg(short, long)]
        output: PathBuf,
        /// Lower display percentile
        #[arg(long, default_value = "2")]
        low: f64,
        /// Upper display percentile
        #[arg(long, default_value = "98")]
        high: f64,
    },
}

#[derive(clap::Args)]
struct SceneArgs {
    /// Spectral band file, one per band in band order
    #[arg(short, long = "band", required = true)]
    bands: Vec<PathBuf>,
    /// Reference land-cover label raster aligned with the bands
    #[arg(short, long)]
    reference: PathBuf,
    /// Reference label for background / no data
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    background: i32,
    /// Reference label for cells outside the region of interest
    #[arg(long, default_value_t = -1, allow_negative_numbers = true)]
    outside: i32,
    /// Keep pixels with some missing bands and impute them
    #[arg(long)]
    keep_partial: bool,
}

impl SceneArgs {
    fn mask_params(&self) -> MaskParams {
        MaskParams {
            background: self.background,
            outside: self.outside,
            missing: if self.keep_partial {
                MissingValues::Impute
            } else {
                MissingValues::Exclude
            },
        }
    }
}

// ─── Report ─────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Report {
    k: usize,
    seed: u64,
    impute: String,
    valid_pixels: usize,
    /// Georeferencing of the cluster grid
    transform: GeoTransform,
    iterations: usize,
    converged: bool,
    inertia: f64,
    reseeded_clusters: Vec<usize>,
    /// Original reference label of each matrix row
    class_labels: Vec<i32>,
    overlap: Vec<Vec<u64>>,
    accuracy: Vec<Vec<f64>>,
    cluster_fractions: BTreeMap<i32, f64>,
    centroids: Vec<Vec<f64>>,
}

impl Report {
    fn new(result: &ClusterValidation, params: &PipelineParams) -> Self {
        Self {
            k: params.kmeans.k,
            seed: params.kmeans.seed,
            impute: params.impute.to_string(),
            valid_pixels: result.mask.count(),
            transform: *result.cluster_grid.transform(),
            iterations: result.clustering.iterations,
            converged: result.clustering.converged,
            inertia: result.clustering.inertia,
            reseeded_clusters: result.clustering.reseeded.clone(),
            class_labels: result.classes.labels().to_vec(),
            overlap: result.matrices.overlap.outer_iter().map(|r| r.to_vec()).collect(),
            accuracy: result.matrices.accuracy.outer_iter().map(|r| r.to_vec()).collect(),
            cluster_fractions: class_fractions(&result.cluster_grid, &[UNASSIGNED]),
            centroids: result.clustering.centroids.outer_iter().map(|r| r.to_vec()).collect(),
        }
    }
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_scene(args: &SceneArgs) -> Result<(RasterStack, Raster<i32>)> {
    let pb = spinner("Reading scene...");
    let stack = read_band_stack(&args.bands).context("Failed to read spectral bands")?;
    let reference: Raster<i32> =
        read_geotiff(&args.reference).context("Failed to read reference labels")?;
    pb.finish_and_clear();
    info!(
        "Scene: {} x {}, {} bands",
        stack.cols(),
        stack.rows(),
        stack.bands()
    );
    Ok((stack, reference))
}

fn write_result<T: landclust_core::RasterElement>(raster: &Raster<T>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn parse_init(s: &str) -> Result<Initialization> {
    match s.to_lowercase().as_str() {
        "kmeans++" | "k-means++" | "plusplus" | "++" => Ok(Initialization::KMeansPlusPlus),
        "random" | "sample" => Ok(Initialization::RandomSample),
        _ => anyhow::bail!("Unknown initialization: {}. Use kmeans++ or random.", s),
    }
}

fn print_matrices(result: &ClusterValidation) {
    let k = result.matrices.overlap.ncols();
    let header: String = (0..k).map(|j| format!("{:>8}", j)).collect();
    println!("\nOverlap (rows: reference class, columns: cluster)");
    println!("{:>8}{}", "class", header);
    for (i, row) in result.matrices.overlap.outer_iter().enumerate() {
        let label = result.classes.label_of(i).unwrap_or_default();
        let cells: String = row.iter().map(|v| format!("{:>8}", v)).collect();
        println!("{:>8}{}", label, cells);
    }

    println!("\nAccuracy (overlap / class size)");
    println!("{:>8}{}", "class", header);
    for (i, row) in result.matrices.accuracy.outer_iter().enumerate() {
        let label = result.classes.label_of(i).unwrap_or_default();
        let cells: String = row.iter().map(|v| format!("{:>8.2}", v)).collect();
        println!("{:>8}{}", label, cells);
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Info { input } => {
            let pb = spinner("Reading raster...");
            let raster: Raster<f64> = read_geotiff(&input).context("Failed to read raster")?;
            pb.finish_and_clear();

            let (rows, cols) = raster.shape();
            let bounds = raster.bounds();
            let stats = raster.statistics();

            println!("File: {}", input.display());
            println!("Dimensions: {} x {} ({} cells)", cols, rows, raster.len());
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(nodata) = raster.nodata() {
                println!("NoData: {}", nodata);
            }
            println!("\nStatistics:");
            if let Some(min) = stats.min {
                println!("  Min: {:.4}", min);
            }
            if let Some(max) = stats.max {
                println!("  Max: {:.4}", max);
            }
            if let Some(mean) = stats.mean {
                println!("  Mean: {:.4}", mean);
            }
            println!(
                "  Valid cells: {} ({:.1}%)",
                stats.valid_count,
                100.0 * stats.valid_count as f64 / raster.len().max(1) as f64
            );
        }

        Commands::Cluster {
            scene,
            output,
            report,
            k,
            seed,
            max_iterations,
            tolerance,
            init,
            impute,
        } => {
            let params = PipelineParams {
                mask: scene.mask_params(),
                impute: impute
                    .parse::<ImputeStrategy>()
                    .context("Invalid --impute")?,
                kmeans: KmeansParams {
                    k,
                    max_iterations,
                    tolerance,
                    seed,
                    init: parse_init(&init)?,
                },
            };

            let (stack, reference) = read_scene(&scene)?;
            let start = Instant::now();
            let result = cluster_validation(&stack, &reference, &params)
                .context("Cluster validation failed")?;
            let elapsed = start.elapsed();

            write_result(&result.cluster_grid, &output)?;
            if let Some(path) = &report {
                let json = serde_json::to_string_pretty(&Report::new(&result, &params))
                    .context("Failed to serialize report")?;
                std::fs::write(path, json)
                    .with_context(|| format!("Failed to write report {}", path.display()))?;
                println!("Report saved to: {}", path.display());
            }

            print_matrices(&result);
            println!("\nCluster grid saved to: {}", output.display());
            println!(
                "  Valid pixels: {}, iterations: {}{}",
                result.mask.count(),
                result.clustering.iterations,
                if result.clustering.converged { "" } else { " (iteration cap reached)" }
            );
            println!("  Processing time: {:.2?}", elapsed);
        }

        Commands::Quicklook {
            scene,
            output,
            low,
            high,
        } => {
            let (stack, reference) = read_scene(&scene)?;
            let mask = valid_mask(&stack, &reference, &scene.mask_params())
                .context("Failed to build valid mask")?;
            let mean = band_mean(&stack, &mask).context("Failed to average bands")?;
            write_result(&mean, &output)?;

            println!("Quick-look saved to: {}", output.display());
            match percentile_range(&mean, low, high)? {
                Some((lo, hi)) => println!("  Display range (p{} - p{}): {:.4} - {:.4}", low, high, lo, hi),
                None => println!("  No valid pixels to stretch"),
            }
        }
    }

    Ok(())
}

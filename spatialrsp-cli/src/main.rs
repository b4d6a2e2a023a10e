use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use polars::prelude::*;
use rsp_anndata::{
    AnnotatedMatrix, Dataset, FetchConfig, Fetcher, KpmpKind, LoadOptions, TableOptions,
    load_cell_table, load_data, parse_separator, read_table, write_table,
};
use rsp_plots::{CompositeData, CompositePlot, CompositePlotOptions, EmbeddingLayers, Plot};
use spatialrsp::{
    EmbeddingData, RspConfig, RspMode, angular_significance, cartesian_to_polar, centroid,
    compute_rsp, correct, split_by_label,
};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// spatialrsp - Radial spatial profiles of single-cell embeddings
#[derive(Parser, Debug)]
#[command(name = "spatialrsp", author, version, long_about = None)]
#[command(about = "Radial spatial profile (RSP) analysis for single-cell embeddings")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output (debug logging)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download a public single-cell atlas
    Fetch(FetchArgs),
    /// Add Benjamini-Hochberg q-values to a table of p-values
    Fdr(FdrArgs),
    /// Compute RSP curves, RMSD, coverage and angular significance
    Rsp(RspArgs),
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum DatasetArg {
    /// Human Cell Landscape
    Hcl,
    /// Kidney Precision Medicine Project (see --data-type)
    Kpmp,
    /// Mouse Cell Atlas
    Mca,
}

#[derive(Args, Debug)]
struct FetchArgs {
    #[arg(value_enum)]
    dataset: DatasetArg,

    /// KPMP assay: "sn" (single-nucleus) or "sc" (single-cell)
    #[arg(long, default_value = "sn")]
    data_type: String,

    /// Directory to download into
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// Concurrent downloads
    #[arg(long, default_value = "4")]
    workers: usize,

    /// Retries per file after the first attempt
    #[arg(long, default_value = "3")]
    retries: u32,

    /// Hide progress bars
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct FdrArgs {
    /// Delimited table with a header row
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Column holding the p-values
    #[arg(long, default_value = "p_value")]
    column: String,

    /// Output table (defaults to "<input>_fdr" next to the input)
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Significance level reported in the summary
    #[arg(long, default_value = "0.05")]
    alpha: f64,

    /// Field separator ("," or "tab")
    #[arg(long, default_value = ",")]
    sep: String,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    /// Curves are fractions of each population
    Relative,
    /// Curves are counts, with expected foreground counts
    Absolute,
}

impl From<ModeArg> for RspMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Relative => RspMode::Relative,
            ModeArg::Absolute => RspMode::Absolute,
        }
    }
}

#[derive(Args, Debug)]
struct RspArgs {
    /// .h5ad file, or a per-cell CSV/TSV table with coordinate columns
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Metadata column with the group labels
    #[arg(long)]
    group_by: String,

    /// Foreground groups (comma-separated, e.g. "podocyte,tubule")
    #[arg(long, value_delimiter = ',', required = true)]
    foreground: Vec<String>,

    /// Embedding key (obsm) holding the 2D coordinates
    #[arg(long, default_value = "X_umap")]
    embedding: String,

    /// Vantage point as "x,y"; defaults to the centroid of all cells
    #[arg(long, value_parser = parse_point, allow_hyphen_values = true)]
    vantage: Option<[f64; 2]>,

    /// Number of grid angles
    #[arg(long, default_value = "360")]
    resolution: usize,

    /// Scanning window width in degrees
    #[arg(long, default_value = "90")]
    window: f64,

    #[arg(short = 'm', long, value_enum, default_value = "relative")]
    mode: ModeArg,

    /// x coordinate column of a cell table
    #[arg(long, default_value = "x")]
    x_column: String,

    /// y coordinate column of a cell table
    #[arg(long, default_value = "y")]
    y_column: String,

    /// Column of a cell table holding cell names
    #[arg(long)]
    index_column: Option<String>,

    /// Field separator of a cell table ("," or "tab")
    #[arg(long, default_value = ",")]
    sep: String,

    /// Save the embedding and RSP curves as a PNG or SVG figure
    #[arg(long, value_name = "PLOT_PATH")]
    plot: Option<PathBuf>,

    /// Save the analysis report as JSON (printed to stdout otherwise)
    #[arg(long, value_name = "REPORT_PATH")]
    report: Option<PathBuf>,

    /// FDR level for per-angle significance
    #[arg(long, default_value = "0.05")]
    alpha: f64,
}

/// Parse "x,y" into a point
fn parse_point(s: &str) -> std::result::Result<[f64; 2], String> {
    let parts: Vec<&str> = s.split(',').map(str::trim).collect();
    let &[x, y] = parts.as_slice() else {
        return Err(format!("expected \"x,y\", got \"{}\"", s));
    };
    let parse = |v: &str| {
        v.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("invalid coordinate \"{}\"", v))
    };
    Ok([parse(x)?, parse(y)?])
}

/// `dir/name.ext` -> `dir/name{suffix}.ext`
fn default_output(input: &Path, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let name = match input.extension() {
        Some(ext) => format!("{}{}.{}", stem, suffix, ext.to_string_lossy()),
        None => format!("{}{}", stem, suffix),
    };
    input.with_file_name(name)
}

fn is_h5ad(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("h5ad"))
}

fn run_fetch(args: &FetchArgs) -> Result<()> {
    let dataset = match args.dataset {
        DatasetArg::Hcl => Dataset::Hcl,
        DatasetArg::Kpmp => Dataset::Kpmp(args.data_type.parse::<KpmpKind>()?),
        DatasetArg::Mca => Dataset::Mca,
    };

    let config = FetchConfig {
        retries: args.retries,
        workers: args.workers.max(1),
        show_progress: !args.no_progress,
        data_dir: args.data_dir.clone(),
        ..FetchConfig::default()
    };
    let fetcher = Fetcher::new(config)?;

    let start = Instant::now();
    let paths = fetcher.fetch_dataset(dataset)?;
    println!("{} ready in {:.1?}:", dataset, start.elapsed());
    for path in paths {
        println!("  {}", path.display());
    }
    Ok(())
}

fn run_fdr(args: &FdrArgs) -> Result<()> {
    let sep = parse_separator(&args.sep)?;
    let mut df = read_table(&args.input, sep)?;

    let column = df
        .column(&args.column)
        .map_err(|_| anyhow!("Column '{}' not found in {}", args.column, args.input.display()))?
        .cast(&DataType::Float64)
        .with_context(|| format!("Column '{}' is not numeric", args.column))?;
    let pvalues = column
        .f64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| value.ok_or_else(|| anyhow!("Missing p-value at row {}", row)))
        .collect::<Result<Vec<f64>>>()?;

    let result = correct(&pvalues)?;
    df.with_column(Column::new("q_value".into(), result.q_values.clone()))?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_output(&args.input, "_fdr"));
    write_table(&mut df, &output, sep)?;

    info!(
        "{} of {} tests significant at q < {}",
        result.n_significant(args.alpha),
        result.n_tests(),
        args.alpha
    );
    println!("Wrote q-values to {}", output.display());
    Ok(())
}

fn load_input(args: &RspArgs) -> Result<AnnotatedMatrix> {
    if is_h5ad(&args.input) {
        return load_data(&args.input, &LoadOptions::default());
    }
    let options = TableOptions {
        sep: parse_separator(&args.sep)?,
        x_column: args.x_column.clone(),
        y_column: args.y_column.clone(),
        key: args.embedding.clone(),
        index_column: args.index_column.clone(),
    };
    load_cell_table(&args.input, &options)
}

fn run_rsp(args: &RspArgs) -> Result<()> {
    let start = Instant::now();
    let adata = load_input(args)?;

    let coords = adata.embedding_2d(&args.embedding)?;
    let vantage = match args.vantage {
        Some(point) => point,
        None => centroid(coords.view())?,
    };
    info!(
        "{} cells, vantage point ({:.3}, {:.3})",
        coords.nrows(),
        vantage[0],
        vantage[1]
    );

    let background = cartesian_to_polar(coords.view(), &vantage)?.angles;
    let groups = split_by_label(&adata, &args.embedding, &args.group_by, &args.foreground)?;
    let foregrounds = groups
        .iter()
        .map(|(label, points)| {
            let angles = cartesian_to_polar(points.view(), &vantage)?.angles;
            debug!("group '{}': {} cells", label, angles.len());
            Ok((label.clone(), angles))
        })
        .collect::<Result<Vec<(String, Vec<f64>)>>>()?;

    let config = RspConfig {
        resolution: args.resolution,
        scanning_window: args.window.to_radians(),
        mode: args.mode.into(),
    };
    let curves = compute_rsp(&background, &foregrounds, &config)?;
    let rmsd_background = curves.rmsd_against_background()?;
    let rmsd_expected = curves.rmsd_against_expected()?;
    let coverage = curves.coverage()?;

    let mut group_reports = Vec::with_capacity(foregrounds.len());
    for (index, (label, angles)) in foregrounds.iter().enumerate() {
        let significance = angular_significance(&background, angles, &config)?;
        let significant_degrees: Vec<f64> = significance
            .significant_indices(args.alpha)
            .into_iter()
            .map(|i| curves.angles[i].to_degrees())
            .collect();
        println!(
            "{:<20} n={:<7} RMSD(bg)={:.4}  RMSD(ref)={:.4}  coverage={:.3}  significant angles={}",
            label,
            angles.len(),
            rmsd_background[index].1,
            rmsd_expected[index].1,
            coverage[index].1,
            significant_degrees.len()
        );
        group_reports.push(serde_json::json!({
            "label": label,
            "n_cells": angles.len(),
            "rmsd_vs_background": rmsd_background[index].1,
            "rmsd_vs_reference": rmsd_expected[index].1,
            "coverage": coverage[index].1,
            "n_significant_angles": significant_degrees.len(),
            "significant_angles_deg": significant_degrees,
            "p_values": significance.p_values,
            "q_values": significance.q_values,
        }));
    }

    let report = serde_json::json!({
        "input": args.input.display().to_string(),
        "embedding": args.embedding,
        "group_by": args.group_by,
        "vantage": vantage,
        "config": config,
        "alpha": args.alpha,
        "n_background": curves.n_background,
        "groups": group_reports,
        "curves": curves,
    });
    let report_json = serde_json::to_string_pretty(&report)?;
    match &args.report {
        Some(path) => {
            std::fs::write(path, report_json)
                .with_context(|| format!("Failed to write report {}", path.display()))?;
            println!("Report saved to {}", path.display());
        }
        None => println!("{}", report_json),
    }

    if let Some(plot_path) = &args.plot {
        let data = CompositeData {
            embedding: EmbeddingLayers::new(coords, groups).with_vantage(vantage),
            curves,
        };
        CompositePlot::new().save(&data, &CompositePlotOptions::default(), plot_path)?;
        println!("Plot saved to {}", plot_path.display());
    }

    info!("RSP analysis finished in {:.2?}", start.elapsed());
    Ok(())
}

fn main() -> Result<()> {
    let args = Cli::parse();

    // RUST_LOG overrides the default level; --verbose forces debug
    let filter = if args.verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match &args.command {
        Command::Fetch(fetch) => run_fetch(fetch),
        Command::Fdr(fdr) => run_fdr(fdr),
        Command::Rsp(rsp) => run_rsp(rsp),
    }
}

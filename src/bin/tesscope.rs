//! Command line front end of the TESS sector locator.
//!
//! ```text
//! tesscope search "Betelgeuse" --radius 0.1 --sector 6
//! tesscope batch targets.csv --output sectors.csv --table combined.csv
//! tesscope lookup-tic "TIC 141914082"
//! tesscope metadata "88.7929583 7.4070639"
//! tesscope sky-map targets.csv
//! ```
//!
//! Logging goes through `env_logger`; set `RUST_LOG=tesscope=debug` to follow the
//! MAST requests.

use std::{
    fs::File,
    io::{self, BufWriter},
    path::PathBuf,
    process::ExitCode,
};

use clap::{Parser, Subcommand};
use tesscope::{
    batch::sort_by_row,
    chart_data::{distance_histogram, hr_points, magnitude_histogram, sector_coverage},
    config::PipelineConfig,
    export::{write_batch_csv, write_combined_table, write_single_target_csv},
    locator::SectorLocator,
    mast::MastClient,
    tesscope_errors::TesscopeError,
    validation::{parse_radius, SearchRequest},
};

#[derive(Parser, Debug)]
#[command(
    name = "tesscope",
    about = "Find the TESS sectors covering a target or a list of targets",
    long_about = None
)]
struct Args {
    /// JSON file overriding the default pipeline configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sectors covering one target (coordinates, object name or TIC ID)
    Search {
        input: String,
        /// Search radius in degrees
        #[arg(long, default_value = "0.01")]
        radius: String,
        /// Keep only this sector
        #[arg(long)]
        sector: Option<String>,
        /// Write the records as CSV
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Sectors of every row of a CSV target list
    Batch {
        file: PathBuf,
        /// Search radius in degrees (defaults to the configured batch radius)
        #[arg(long)]
        radius: Option<String>,
        /// Write the grouped records as CSV
        #[arg(long)]
        output: Option<PathBuf>,
        /// Write catalog metadata and records side by side as CSV
        #[arg(long)]
        table: Option<PathBuf>,
        /// Keep the input row order instead of completion order
        #[arg(long)]
        sorted: bool,
    },
    /// Catalog position of a TIC identifier
    LookupTic { tic_id: String },
    /// Catalog metadata around one target
    Metadata { input: String },
    /// Positions of every row of a CSV target list, as JSON
    SkyMap { file: PathBuf },
}

fn load_config(path: Option<&PathBuf>) -> Result<PipelineConfig, TesscopeError> {
    match path {
        Some(path) => Ok(serde_json::from_reader(File::open(path)?)?),
        None => Ok(PipelineConfig::default()),
    }
}

async fn run(args: Args) -> Result<(), TesscopeError> {
    let config = load_config(args.config.as_ref())?;
    let locator: SectorLocator<MastClient, MastClient> = SectorLocator::with_mast(config)?;

    match args.command {
        Command::Search {
            input,
            radius,
            sector,
            output,
        } => {
            let request = SearchRequest::validate(
                Some(input.as_str()),
                Some(radius.as_str()),
                sector.as_deref(),
            )?;
            let outcome = locator.search(&request).await?;

            println!("{}", outcome.target.display_name);
            for record in &outcome.records {
                println!(
                    "  sector {:>3}  cycle {:>2}  camera {}  {}",
                    record.window_number, record.cycle, record.channel, record.observed_at
                );
            }
            if let Some(path) = output {
                write_single_target_csv(BufWriter::new(File::create(path)?), &outcome.records)?;
            }
        }
        Command::Batch {
            file,
            radius,
            output,
            table,
            sorted,
        } => {
            let radius = match radius {
                Some(text) => parse_radius(&text)?,
                None => locator.config().batch_radius,
            };
            let mut report = locator
                .process_batch_with_radius(File::open(file)?, radius)
                .await?;
            if sorted {
                sort_by_row(&mut report.records);
            }

            println!(
                "{} records from {} rows ({} rows failed)",
                report.records.len(),
                report.rows,
                report.failures.len()
            );
            for failure in &report.failures {
                eprintln!("  row {}: {}", failure.row_index + 1, failure.reason);
            }

            match output {
                Some(path) => write_batch_csv(BufWriter::new(File::create(path)?), &report.records)?,
                None => write_batch_csv(io::stdout().lock(), &report.records)?,
            }

            if let Some(path) = table {
                let metadata = locator.batch_metadata(&report.records).await;
                let sectors: Vec<_> = report.records.iter().map(|r| r.sector.clone()).collect();
                write_combined_table(BufWriter::new(File::create(path)?), &metadata, &sectors)?;
                for coverage in sector_coverage(&sectors) {
                    println!(
                        "  sector {:>3}  cycle {:>2}  camera {}  x{}",
                        coverage.window_number, coverage.cycle, coverage.channel, coverage.count
                    );
                }
            }
        }
        Command::LookupTic { tic_id } => {
            let coord = locator.lookup_tic(&tic_id).await?;
            println!("{} {}", coord.ra, coord.dec);
        }
        Command::Metadata { input } => {
            let target = locator.resolve(&input).await?;
            let metadata = locator.target_metadata(&target).await?;

            println!("{}: {} catalog stars", metadata.star_name(), metadata.len());
            println!("  HR diagram points: {}", hr_points(&metadata).len());
            if let Some(hist) = magnitude_histogram(&metadata) {
                println!("  magnitude histogram: {} bins {:?}", hist.counts.len(), hist.counts);
            }
            if let Some(hist) = distance_histogram(&metadata) {
                println!("  distance histogram: {} stars in {} bins", hist.total(), hist.counts.len());
            }
        }
        Command::SkyMap { file } => {
            let targets = locator.sky_map_targets(File::open(file)?).await?;
            println!("{}", serde_json::to_string_pretty(&targets)?);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("{err}");
            eprintln!("{}", err.user_message());
            ExitCode::FAILURE
        }
    }
}

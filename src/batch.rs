//! # Batch orchestration
//!
//! Processes an uploaded list of targets, one row per target, and flattens every
//! row's sector records into [`AggregateRecord`]s tagged with the row's position.
//!
//! ## Input format
//! -----------------
//! Comma-delimited text, no header. A row holds either
//! - two fields: right ascension and declination in degrees, or
//! - one field: a TIC identifier (digits only), a coordinate expression
//!   (`"10.0 20.0"`), or an object name.
//!
//! Any other field count is a row error.
//!
//! ## Failure policy
//! -----------------
//! [`process_batch`] is tolerant: a row that cannot be parsed, resolved, queried or
//! normalized contributes no record, its cause is logged and kept in the
//! [`BatchReport`], and the batch carries on. Only an unreadable input file
//! ([`read_rows`]) or an invalid search radius is fatal.
//!
//! [`read_targets_strict`] and [`sky_map_targets`] are the strict counterparts:
//! the first bad row aborts the whole file.
//!
//! ## Concurrency
//! -----------------
//! Rows run on a per-call pool of `concurrency` workers
//! ([`run_bounded`](crate::worker_pool::run_bounded)). Rows share no mutable state, and
//! output order follows completion order; use [`sort_by_row`] to restore input order.

use std::{io::Read, sync::Arc, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    catalog::CatalogService,
    constants::Degree,
    coordinates::SkyCoord,
    footprint::{query_footprint, FootprintService},
    normalizer::{normalize, SectorRecord},
    resolver::{catalog_position, is_all_digits, parse_locally, LocalParse, ResolvedTarget, TicId},
    tesscope_errors::TesscopeError,
    validation::check_radius,
    worker_pool::run_bounded,
};

/// One line of the input file, fields trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Zero-based position of the line among the records of the file
    pub index: usize,
    pub fields: Vec<String>,
}

impl RawRow {
    pub fn new(index: usize, fields: &[&str]) -> Self {
        RawRow {
            index,
            fields: fields.iter().map(|f| f.trim().to_string()).collect(),
        }
    }
}

/// A parsed row.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchRow {
    Coordinate(SkyCoord),
    CatalogId(TicId),
    Name(String),
}

impl BatchRow {
    pub fn parse(row: &RawRow) -> Result<Self, TesscopeError> {
        match row.fields.as_slice() {
            [ra, dec] => SkyCoord::from_components(ra, dec)
                .map(BatchRow::Coordinate)
                .map_err(|e| {
                    TesscopeError::InvalidInput(format!("row {}: {e}", row.index + 1))
                }),
            [single] if single.is_empty() => Err(TesscopeError::InvalidInput(format!(
                "row {}: empty identifier",
                row.index + 1
            ))),
            [single] if is_all_digits(single) => Ok(BatchRow::CatalogId(TicId::parse(single)?)),
            [single] => Ok(match parse_locally(single) {
                LocalParse::Coordinate(coord) => BatchRow::Coordinate(coord),
                _ => BatchRow::Name(single.clone()),
            }),
            other => Err(TesscopeError::InvalidInput(format!(
                "row {}: Error: Invalid input format. ({} fields)",
                row.index + 1,
                other.len()
            ))),
        }
    }
}

/// One sector record of one batch row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub row_index: usize,
    pub ra: Degree,
    pub dec: Degree,
    pub sector: SectorRecord,
}

impl AggregateRecord {
    pub fn coordinate(&self) -> SkyCoord {
        SkyCoord {
            ra: self.ra,
            dec: self.dec,
        }
    }
}

/// Why a row produced no record.
#[derive(Debug, Clone, PartialEq)]
pub struct RowFailure {
    pub row_index: usize,
    pub reason: String,
}

/// Everything a batch produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    pub records: Vec<AggregateRecord>,
    pub failures: Vec<RowFailure>,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchOptions {
    pub concurrency: usize,
    /// Upper bound on one row's pipeline
    pub row_timeout: Option<Duration>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        BatchOptions {
            concurrency: crate::constants::DEFAULT_BATCH_CONCURRENCY,
            row_timeout: None,
        }
    }
}

/// Read every record of a comma-delimited file.
///
/// Rows of any length are accepted here; their shape is checked per row later.
///
/// Return
/// ----------
/// * The rows, or an error when the input itself cannot be read.
pub fn read_rows<R: Read>(reader: R) -> Result<Vec<RawRow>, TesscopeError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut rows = Vec::new();
    for (index, record) in csv_reader.records().enumerate() {
        let record = record?;
        rows.push(RawRow {
            index,
            fields: record.iter().map(str::to_string).collect(),
        });
    }
    Ok(rows)
}

/// Read and parse every row; the first malformed row aborts the file.
pub fn read_targets_strict<R: Read>(reader: R) -> Result<Vec<BatchRow>, TesscopeError> {
    read_rows(reader)?.iter().map(BatchRow::parse).collect()
}

/// Resolve a parsed row into a target with a known position.
async fn locate_row<F, C>(
    footprint: &F,
    catalog: &C,
    row: &BatchRow,
) -> Result<ResolvedTarget, TesscopeError>
where
    F: FootprintService,
    C: CatalogService,
{
    match row {
        BatchRow::Coordinate(coord) => Ok(ResolvedTarget::from_coordinate(*coord)),
        BatchRow::CatalogId(tic_id) => {
            let coord = catalog_position(catalog, tic_id).await?;
            Ok(ResolvedTarget::from_catalog_id(*tic_id, coord))
        }
        BatchRow::Name(name) => {
            let coord = footprint.resolve_name(name).await?;
            Ok(ResolvedTarget::from_name(name).with_coordinate(coord))
        }
    }
}

/// Full pipeline of one row: parse, resolve, query, normalize.
pub async fn process_row<F, C>(
    footprint: &F,
    catalog: &C,
    row: &RawRow,
    radius: Degree,
) -> Result<Vec<AggregateRecord>, TesscopeError>
where
    F: FootprintService,
    C: CatalogService,
{
    let parsed = BatchRow::parse(row)?;
    let target = locate_row(footprint, catalog, &parsed).await?;
    let coord = target.coordinate.ok_or_else(|| {
        TesscopeError::QueryError(format!("no position for {}", target.display_name))
    })?;

    let pairs = query_footprint(footprint, &target, radius).await?;
    let normalized = normalize(&pairs)?;

    Ok(normalized
        .records
        .into_iter()
        .map(|sector| AggregateRecord {
            row_index: row.index,
            ra: coord.ra,
            dec: coord.dec,
            sector,
        })
        .collect())
}

/// Run every row on a bounded pool and collect records and failures.
///
/// An invalid radius fails the whole batch before any row is looked up.
pub async fn process_batch_report<F, C>(
    footprint: Arc<F>,
    catalog: Arc<C>,
    rows: Vec<RawRow>,
    radius: Degree,
    options: BatchOptions,
) -> Result<BatchReport, TesscopeError>
where
    F: FootprintService + 'static,
    C: CatalogService + 'static,
{
    let radius = check_radius(radius)?;
    let row_indices: Vec<usize> = rows.iter().map(|row| row.index).collect();
    let total = rows.len();
    log::info!(
        "processing {total} rows with {} workers (radius {radius} deg)",
        options.concurrency
    );

    let outputs = run_bounded(rows, options.concurrency, |row: RawRow| {
        let footprint = Arc::clone(&footprint);
        let catalog = Arc::clone(&catalog);
        let row_timeout = options.row_timeout;
        async move {
            let pipeline = process_row(footprint.as_ref(), catalog.as_ref(), &row, radius);
            match row_timeout {
                Some(limit) => tokio::time::timeout(limit, pipeline).await.unwrap_or_else(|_| {
                    Err(TesscopeError::QueryError(format!(
                        "row {} timed out after {limit:?}",
                        row.index + 1
                    )))
                }),
                None => pipeline.await,
            }
        }
    })
    .await;

    let mut report = BatchReport {
        rows: total,
        ..Default::default()
    };
    for (position, output) in outputs {
        let row_index = row_indices[position];
        let reason = match output {
            Ok(Ok(records)) => {
                report.records.extend(records);
                continue;
            }
            Ok(Err(err)) => err.to_string(),
            Err(join_err) => format!("worker aborted: {join_err}"),
        };
        log::warn!("row {} skipped: {reason}", row_index + 1);
        report.failures.push(RowFailure { row_index, reason });
    }

    log::info!(
        "batch done: {} records from {} rows, {} rows failed",
        report.records.len(),
        total,
        report.failures.len()
    );
    Ok(report)
}

/// Tolerant batch: records of every row that went through, in completion order.
pub async fn process_batch<F, C>(
    footprint: Arc<F>,
    catalog: Arc<C>,
    rows: Vec<RawRow>,
    radius: Degree,
    concurrency: usize,
) -> Result<Vec<AggregateRecord>, TesscopeError>
where
    F: FootprintService + 'static,
    C: CatalogService + 'static,
{
    let options = BatchOptions {
        concurrency,
        ..Default::default()
    };
    Ok(process_batch_report(footprint, catalog, rows, radius, options)
        .await?
        .records)
}

/// Restore input order (stable within a row).
pub fn sort_by_row(records: &mut [AggregateRecord]) {
    records.sort_by_key(|record| record.row_index);
}

/// One point of the sky map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkyMapTarget {
    pub ra: Degree,
    pub dec: Degree,
    pub target_name: Option<String>,
}

/// Positions of every row of a file, for the sky map. The first bad row aborts.
pub async fn sky_map_targets<F, C, R>(
    footprint: &F,
    catalog: &C,
    reader: R,
) -> Result<Vec<SkyMapTarget>, TesscopeError>
where
    F: FootprintService,
    C: CatalogService,
    R: Read,
{
    let rows = read_targets_strict(reader)?;
    let mut targets = Vec::with_capacity(rows.len());
    for row in &rows {
        let target = locate_row(footprint, catalog, row).await?;
        let coord = target.coordinate.ok_or_else(|| {
            TesscopeError::QueryError(format!("no position for {}", target.display_name))
        })?;
        let target_name = match row {
            BatchRow::Coordinate(_) => None,
            _ => Some(target.display_name),
        };
        targets.push(SkyMapTarget {
            ra: coord.ra,
            dec: coord.dec,
            target_name,
        });
    }
    Ok(targets)
}

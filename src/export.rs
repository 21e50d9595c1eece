//! # Tabular exports
//!
//! Three CSV layouts are produced:
//!
//! | Writer | Header |
//! |--------|--------|
//! | [`write_batch_csv`] | `RA, Dec, Sector, Cycle, Camera, Observation Date` |
//! | [`write_single_target_csv`] | `Sector, Cycle, Camera, Observation Date` |
//! | [`write_combined_table`] | `temperature,luminosity,magnitudes,distance,sectors,cycles,cameras,observation_dates` |
//!
//! In the batch layout records are grouped by target (first appearance order) and
//! the RA/Dec cells are left blank on every row after the first of a group.

use std::{collections::HashMap, io::Write};

use crate::{
    batch::AggregateRecord, metadata::TargetMetadata, normalizer::SectorRecord,
    tesscope_errors::TesscopeError,
};

pub const BATCH_HEADER: [&str; 6] = ["RA", "Dec", "Sector", "Cycle", "Camera", "Observation Date"];
pub const SINGLE_TARGET_HEADER: [&str; 4] = ["Sector", "Cycle", "Camera", "Observation Date"];
pub const COMBINED_HEADER: [&str; 8] = [
    "temperature",
    "luminosity",
    "magnitudes",
    "distance",
    "sectors",
    "cycles",
    "cameras",
    "observation_dates",
];

fn sector_cells(record: &SectorRecord) -> [String; 4] {
    [
        record.window_number.to_string(),
        record.cycle.to_string(),
        record.channel.to_string(),
        record.observed_at.clone(),
    ]
}

/// Group records by target coordinate, keeping the order in which targets first appear.
fn group_by_target(records: &[AggregateRecord]) -> Vec<Vec<&AggregateRecord>> {
    let mut slot: HashMap<(u64, u64), usize> = HashMap::new();
    let mut groups: Vec<Vec<&AggregateRecord>> = Vec::new();
    for record in records {
        let key = (record.ra.to_bits(), record.dec.to_bits());
        let index = *slot.entry(key).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[index].push(record);
    }
    groups
}

/// Write batch records, one group per target.
pub fn write_batch_csv<W: Write>(
    writer: W,
    records: &[AggregateRecord],
) -> Result<(), TesscopeError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(BATCH_HEADER)?;

    for group in group_by_target(records) {
        for (position, record) in group.into_iter().enumerate() {
            let (ra, dec) = if position == 0 {
                (record.ra.to_string(), record.dec.to_string())
            } else {
                (String::new(), String::new())
            };
            let [sector, cycle, camera, date] = sector_cells(&record.sector);
            csv_writer.write_record([ra, dec, sector, cycle, camera, date])?;
        }
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write the records of one resolved target.
pub fn write_single_target_csv<W: Write>(
    writer: W,
    records: &[SectorRecord],
) -> Result<(), TesscopeError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(SINGLE_TARGET_HEADER)?;
    for record in records {
        csv_writer.write_record(sector_cells(record))?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn metadata_cell(series: &[f64], index: usize) -> String {
    match series.get(index) {
        Some(value) if value.is_finite() => value.to_string(),
        _ => String::new(),
    }
}

/// Write catalog series next to sector records.
///
/// Both sides are padded with empty cells up to the longer one, so the table has
/// `max(metadata.len(), records.len())` data rows.
pub fn write_combined_table<W: Write>(
    writer: W,
    metadata: &TargetMetadata,
    records: &[SectorRecord],
) -> Result<(), TesscopeError> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(COMBINED_HEADER)?;

    let rows = metadata.len().max(records.len());
    for index in 0..rows {
        let [sector, cycle, camera, date] = records
            .get(index)
            .map(sector_cells)
            .unwrap_or_default();
        csv_writer.write_record([
            metadata_cell(metadata.temperature(), index),
            metadata_cell(metadata.luminosity(), index),
            metadata_cell(metadata.magnitude(), index),
            metadata_cell(metadata.distance(), index),
            sector,
            cycle,
            camera,
            date,
        ])?;
    }
    csv_writer.flush()?;
    Ok(())
}

//! # Metadata enrichment
//!
//! Queries the object catalog around each resolved target and extracts four
//! index-aligned series: luminosity, effective temperature, TESS magnitude, and
//! distance from the query centre. Index *i* of every series describes the same
//! catalog star.
//!
//! Missing catalog values stay in the series as `NaN` so the alignment holds;
//! consumers filter non-finite values before any log scale or histogram
//! (see [`chart_data`](crate::chart_data)).
//!
//! The search radius depends on the view: batch lists use a small radius to avoid
//! pulling in neighbours, single-target views a larger one (see [`MetadataScope`]).

use serde::Serialize;

use crate::{
    catalog::{CatalogRow, CatalogService},
    config::PipelineConfig,
    constants::Degree,
    coordinates::SkyCoord,
    resolver::{ResolvedTarget, TargetKind},
    tesscope_errors::TesscopeError,
};

/// Catalog series for one query. The four series always have equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TargetMetadata {
    star_name: String,
    luminosity: Vec<f64>,
    temperature: Vec<f64>,
    magnitude: Vec<f64>,
    distance: Vec<f64>,
}

impl TargetMetadata {
    pub fn empty(star_name: &str) -> Self {
        TargetMetadata {
            star_name: star_name.to_string(),
            ..Default::default()
        }
    }

    /// Build the series from catalog rows.
    ///
    /// When a row has no `dstArcSec`, its distance is the separation between the
    /// row position and `center` (if both are known), `NaN` otherwise.
    pub fn from_rows(star_name: &str, rows: &[CatalogRow], center: Option<&SkyCoord>) -> Self {
        let mut metadata = TargetMetadata::empty(star_name);
        for row in rows {
            let distance = row.dst_arcsec.or_else(|| {
                let position = row.coordinate()?;
                center.map(|c| c.separation_arcsec(&position))
            });
            metadata.push(row.luminosity, row.teff, row.tmag, distance);
        }
        metadata
    }

    fn push(
        &mut self,
        luminosity: Option<f64>,
        temperature: Option<f64>,
        magnitude: Option<f64>,
        distance: Option<f64>,
    ) {
        self.luminosity.push(luminosity.unwrap_or(f64::NAN));
        self.temperature.push(temperature.unwrap_or(f64::NAN));
        self.magnitude.push(magnitude.unwrap_or(f64::NAN));
        self.distance.push(distance.unwrap_or(f64::NAN));
    }

    /// Concatenate several results under one label.
    pub fn merge<I>(star_name: &str, parts: I) -> Self
    where
        I: IntoIterator<Item = TargetMetadata>,
    {
        let mut merged = TargetMetadata::empty(star_name);
        for part in parts {
            merged.luminosity.extend(part.luminosity);
            merged.temperature.extend(part.temperature);
            merged.magnitude.extend(part.magnitude);
            merged.distance.extend(part.distance);
        }
        merged
    }

    pub fn star_name(&self) -> &str {
        &self.star_name
    }

    pub fn luminosity(&self) -> &[f64] {
        &self.luminosity
    }

    pub fn temperature(&self) -> &[f64] {
        &self.temperature
    }

    pub fn magnitude(&self) -> &[f64] {
        &self.magnitude
    }

    pub fn distance(&self) -> &[f64] {
        &self.distance
    }

    pub fn len(&self) -> usize {
        self.luminosity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.luminosity.is_empty()
    }
}

/// Which view the metadata is for; selects the search radius.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataScope {
    Batch,
    Single,
}

impl MetadataScope {
    pub fn radius(&self, config: &PipelineConfig) -> Degree {
        match self {
            MetadataScope::Batch => config.batch_metadata_radius_deg(),
            MetadataScope::Single => config.single_metadata_radius,
        }
    }
}

/// Catalog metadata around one target.
///
/// Dispatches on the target kind like the footprint query: region search for a
/// coordinate, name search for a name, and name search on `"TIC <n>"` for a
/// catalog identifier. Zero rows give empty series, not an error.
pub async fn fetch_target_metadata<C: CatalogService>(
    catalog: &C,
    target: &ResolvedTarget,
    radius: Degree,
) -> Result<TargetMetadata, TesscopeError> {
    let (rows, star_name) = match &target.kind {
        TargetKind::Coordinate => {
            let coord = target.coordinate.ok_or_else(|| {
                TesscopeError::InvalidInput(format!(
                    "coordinate target {} carries no position",
                    target.display_name
                ))
            })?;
            (
                catalog.query_by_region(&coord, radius).await?,
                coord.to_string(),
            )
        }
        TargetKind::Name(name) => (catalog.query_by_name(name, radius).await?, name.clone()),
        TargetKind::CatalogId(tic_id) => (
            catalog.query_by_name(&tic_id.query_string(), radius).await?,
            tic_id.query_string(),
        ),
    };

    log::debug!("{star_name}: {} catalog rows within {radius} deg", rows.len());
    Ok(TargetMetadata::from_rows(
        &star_name,
        &rows,
        target.coordinate.as_ref(),
    ))
}

/// Catalog metadata for several targets, in input order. The first error aborts.
pub async fn fetch_metadata<C: CatalogService>(
    catalog: &C,
    targets: &[ResolvedTarget],
    radius: Degree,
) -> Result<Vec<TargetMetadata>, TesscopeError> {
    let mut results = Vec::with_capacity(targets.len());
    for target in targets {
        results.push(fetch_target_metadata(catalog, target, radius).await?);
    }
    Ok(results)
}

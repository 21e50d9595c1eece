//! # Sector locator
//!
//! [`SectorLocator`] is the entry point of the crate. It owns the two external
//! collaborators and the [`PipelineConfig`], and exposes every user-level flow:
//!
//! | Method | Flow |
//! |--------|------|
//! | [`search`](SectorLocator::search) | validate → resolve → footprint query → normalize → sector filter |
//! | [`lookup_tic`](SectorLocator::lookup_tic) | TIC identifier → catalog position |
//! | [`process_batch`](SectorLocator::process_batch) | tolerant batch over uploaded rows |
//! | [`sky_map_targets`](SectorLocator::sky_map_targets) | strict positions of an uploaded list |
//! | [`target_metadata`](SectorLocator::target_metadata) | catalog series for one target |
//! | [`batch_metadata`](SectorLocator::batch_metadata) | merged catalog series of a batch |
//!
//! Single-target flows stop at the first error; batch flows never fail because of
//! one row.
//!
//! ## Example
//!
//! ```rust, no_run
//! use tesscope::{config::PipelineConfig, locator::SectorLocator, validation::SearchRequest};
//!
//! # async fn run() -> Result<(), tesscope::tesscope_errors::TesscopeError> {
//! let locator = SectorLocator::with_mast(PipelineConfig::default())?;
//! let request = SearchRequest::validate(Some("Betelgeuse"), Some("0.1"), None)?;
//! let outcome = locator.search(&request).await?;
//! for record in &outcome.records {
//!     println!("sector {} (cycle {}) camera {}", record.window_number, record.cycle, record.channel);
//! }
//! # Ok(())
//! # }
//! ```

use std::{io::Read, sync::Arc};

use itertools::Itertools;
use serde::Serialize;

use crate::{
    batch::{self, AggregateRecord, BatchOptions, BatchReport, SkyMapTarget},
    catalog::CatalogService,
    config::PipelineConfig,
    coordinates::SkyCoord,
    footprint::{query_footprint, FootprintService},
    mast::MastClient,
    metadata::{fetch_target_metadata, MetadataScope, TargetMetadata},
    normalizer::{normalize, SectorRecord},
    resolver::{catalog_position, resolve, ResolvedTarget, TicId},
    tesscope_errors::TesscopeError,
    validation::{check_radius, SearchRequest},
};

/// Label of the merged metadata of a batch.
pub const ALL_TARGETS: &str = "All Targets";

/// Result of a single-target search.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub target: ResolvedTarget,
    /// Records after the optional sector filter
    pub records: Vec<SectorRecord>,
    /// Taken before filtering
    pub last_cycle: Option<u32>,
    pub last_observed_at: Option<String>,
    pub sector_filter: Option<u32>,
}

pub struct SectorLocator<F, C> {
    footprint: Arc<F>,
    catalog: Arc<C>,
    config: PipelineConfig,
}

impl SectorLocator<MastClient, MastClient> {
    /// Locator backed by the live MAST services.
    pub fn with_mast(config: PipelineConfig) -> Result<Self, TesscopeError> {
        let client = Arc::new(MastClient::new(config.clone())?);
        Ok(SectorLocator {
            footprint: Arc::clone(&client),
            catalog: client,
            config,
        })
    }
}

impl<F, C> SectorLocator<F, C>
where
    F: FootprintService + 'static,
    C: CatalogService + 'static,
{
    pub fn new(footprint: F, catalog: C, config: PipelineConfig) -> Self {
        SectorLocator {
            footprint: Arc::new(footprint),
            catalog: Arc::new(catalog),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn footprint(&self) -> &F {
        &self.footprint
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Resolve one search string (see [`resolve`]).
    pub async fn resolve(&self, input: &str) -> Result<ResolvedTarget, TesscopeError> {
        resolve(input, self.catalog.as_ref()).await
    }

    /// Observation windows covering a validated search.
    ///
    /// Arguments
    /// -----------------
    /// * `request`: the output of [`SearchRequest::validate`].
    ///
    /// Return
    /// ----------
    /// * A [`SearchOutcome`], or the first error of the pipeline. A connect timeout
    ///   comes back as [`TesscopeError::ConnectTimeout`].
    pub async fn search(&self, request: &SearchRequest) -> Result<SearchOutcome, TesscopeError> {
        let target = self.resolve(&request.search_input).await?;
        let pairs = query_footprint(self.footprint.as_ref(), &target, request.radius).await?;
        let normalized = normalize(&pairs)?;

        let records = match request.sector {
            Some(sector) => normalized
                .records
                .into_iter()
                .filter(|record| record.window_number == sector)
                .collect(),
            None => normalized.records,
        };
        log::info!(
            "{}: {} records within {} deg",
            target.display_name,
            records.len(),
            request.radius
        );

        Ok(SearchOutcome {
            target,
            records,
            last_cycle: normalized.last_cycle,
            last_observed_at: normalized.last_observed_at,
            sector_filter: request.sector,
        })
    }

    /// Catalog position of a TIC identifier, with or without its `TIC` prefix.
    pub async fn lookup_tic(&self, input: &str) -> Result<SkyCoord, TesscopeError> {
        let tic_id = TicId::parse(input)?;
        catalog_position(self.catalog.as_ref(), &tic_id).await
    }

    /// Tolerant batch at the configured radius and concurrency.
    pub async fn process_batch<R: Read>(&self, reader: R) -> Result<BatchReport, TesscopeError> {
        self.process_batch_with_radius(reader, self.config.batch_radius)
            .await
    }

    /// Tolerant batch at an explicit radius.
    ///
    /// Only an invalid radius or an unreadable input is an error; failing rows
    /// are listed in the report.
    pub async fn process_batch_with_radius<R: Read>(
        &self,
        reader: R,
        radius: f64,
    ) -> Result<BatchReport, TesscopeError> {
        let radius = check_radius(radius)?;
        let rows = batch::read_rows(reader)?;
        let options = BatchOptions {
            concurrency: self.config.batch_concurrency,
            row_timeout: self.config.row_timeout,
        };
        batch::process_batch_report(
            Arc::clone(&self.footprint),
            Arc::clone(&self.catalog),
            rows,
            radius,
            options,
        )
        .await
    }

    /// Positions of every row of an uploaded list; the first bad row aborts.
    pub async fn sky_map_targets<R: Read>(
        &self,
        reader: R,
    ) -> Result<Vec<SkyMapTarget>, TesscopeError> {
        batch::sky_map_targets(self.footprint.as_ref(), self.catalog.as_ref(), reader).await
    }

    /// Catalog series around one target, at the single-target radius.
    pub async fn target_metadata(
        &self,
        target: &ResolvedTarget,
    ) -> Result<TargetMetadata, TesscopeError> {
        let radius = MetadataScope::Single.radius(&self.config);
        fetch_target_metadata(self.catalog.as_ref(), target, radius).await
    }

    /// Catalog series of every target of a batch, merged under [`ALL_TARGETS`].
    ///
    /// Each distinct target coordinate is queried once, at the batch radius. A
    /// target whose query fails is logged and left out.
    pub async fn batch_metadata(&self, records: &[AggregateRecord]) -> TargetMetadata {
        let radius = MetadataScope::Batch.radius(&self.config);
        let targets = records
            .iter()
            .map(AggregateRecord::coordinate)
            .unique_by(|coord| (coord.ra.to_bits(), coord.dec.to_bits()))
            .map(ResolvedTarget::from_coordinate);

        let mut parts = Vec::new();
        for target in targets {
            match fetch_target_metadata(self.catalog.as_ref(), &target, radius).await {
                Ok(metadata) => parts.push(metadata),
                Err(err) => log::warn!("metadata for {} skipped: {err}", target.display_name),
            }
        }
        TargetMetadata::merge(ALL_TARGETS, parts)
    }
}

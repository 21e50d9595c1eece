//! Pipeline configuration.
//!
//! Every tunable of the lookup pipeline lives in [`PipelineConfig`], which is
//! handed to [`TesscopeEnv::new`](crate::env_state::TesscopeEnv::new) and
//! [`SectorLocator::new`](crate::locator::SectorLocator::new) at construction time.
//! Nothing is read from process state; callers that keep their settings in a file
//! can deserialize this struct with `serde`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    arcmin_to_deg, ArcMin, Degree, DEFAULT_BATCH_CONCURRENCY, DEFAULT_BATCH_METADATA_RADIUS,
    DEFAULT_BATCH_RADIUS, DEFAULT_SINGLE_METADATA_RADIUS, MAST_API_URL, TESSCUT_API_URL,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct PipelineConfig {
    /// Footprint radius applied to uploaded target lists, in degrees.
    pub batch_radius: Degree,
    /// Rows processed simultaneously by one batch.
    pub batch_concurrency: usize,
    /// Catalog radius for batch list views.
    pub batch_metadata_radius: ArcMin,
    /// Catalog radius for single-target views.
    pub single_metadata_radius: Degree,
    /// TCP connect timeout for every MAST request.
    pub connect_timeout: Duration,
    /// Whole-request timeout for every MAST request.
    pub request_timeout: Duration,
    /// Upper bound on one batch row's pipeline; `None` leaves it to the HTTP timeouts.
    pub row_timeout: Option<Duration>,
    /// MAST `invoke` endpoint.
    pub mast_api_url: String,
    /// Tesscut API base URL.
    pub tesscut_api_url: String,
    /// Edge length of the cutouts requested for header retrieval, in pixels.
    pub cutout_size_px: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        PipelineConfig {
            batch_radius: DEFAULT_BATCH_RADIUS,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
            batch_metadata_radius: DEFAULT_BATCH_METADATA_RADIUS,
            single_metadata_radius: DEFAULT_SINGLE_METADATA_RADIUS,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(120),
            row_timeout: None,
            mast_api_url: MAST_API_URL.to_string(),
            tesscut_api_url: TESSCUT_API_URL.to_string(),
            cutout_size_px: 1,
        }
    }
}

impl PipelineConfig {
    pub fn with_batch_concurrency(mut self, concurrency: usize) -> Self {
        self.batch_concurrency = concurrency;
        self
    }

    pub fn with_row_timeout(mut self, timeout: Duration) -> Self {
        self.row_timeout = Some(timeout);
        self
    }

    pub fn with_endpoints(mut self, mast_api_url: &str, tesscut_api_url: &str) -> Self {
        self.mast_api_url = mast_api_url.trim_end_matches('/').to_string();
        self.tesscut_api_url = tesscut_api_url.trim_end_matches('/').to_string();
        self
    }

    /// Batch metadata radius converted to degrees.
    pub fn batch_metadata_radius_deg(&self) -> Degree {
        arcmin_to_deg(self.batch_metadata_radius)
    }
}

//! # Constants and type definitions for tesscope
//!
//! This module centralizes the **survey constants**, **unit conversions**, and **common type
//! aliases** used throughout the crate, together with the default MAST endpoints.
//!
//! ## Overview
//!
//! - TESS survey constants (windows per cycle, catalog prefix)
//! - Angular unit conversions (degrees ↔ arcminutes ↔ arcseconds)
//! - Core type aliases used across the crate
//! - Default search radii and endpoints consumed by [`PipelineConfig`](crate::config::PipelineConfig)

// -------------------------------------------------------------------------------------------------
// Survey constants
// -------------------------------------------------------------------------------------------------

/// Number of consecutive observation windows (sectors) grouped in one TESS cycle
pub const WINDOWS_PER_CYCLE: u32 = 13;

/// Prefix of the TESS Input Catalog identifiers, as expected by MAST
pub const TIC_PREFIX: &str = "TIC";

/// FITS header keyword carrying the observation start timestamp
pub const DATE_OBS_KEY: &str = "DATE-OBS";

// -------------------------------------------------------------------------------------------------
// Unit conversions
// -------------------------------------------------------------------------------------------------

/// Arcminutes in one degree
pub const ARCMIN_PER_DEG: f64 = 60.0;

/// Arcseconds in one degree
pub const ARCSEC_PER_DEG: f64 = 3600.0;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in arcminutes
pub type ArcMin = f64;
/// Angle in arcseconds
pub type ArcSec = f64;

// -------------------------------------------------------------------------------------------------
// Defaults
// -------------------------------------------------------------------------------------------------

/// Footprint search radius used for uploaded target lists
pub const DEFAULT_BATCH_RADIUS: Degree = 0.01;

/// Number of rows processed simultaneously by a batch
pub const DEFAULT_BATCH_CONCURRENCY: usize = 4;

/// Catalog search radius for batch list views (favours precision)
pub const DEFAULT_BATCH_METADATA_RADIUS: ArcMin = 1.0;

/// Catalog search radius for single-target views (favours completeness)
pub const DEFAULT_SINGLE_METADATA_RADIUS: Degree = 0.2;

/// Base URL of the MAST Tesscut service
pub const TESSCUT_API_URL: &str = "https://mast.stsci.edu/tesscut/api/v0.1";

/// MAST portal `invoke` endpoint (catalogs and name lookup)
pub const MAST_API_URL: &str = "https://mast.stsci.edu/api/v0/invoke";

/// Convert arcminutes to degrees
#[inline]
pub fn arcmin_to_deg(arcmin: ArcMin) -> Degree {
    arcmin / ARCMIN_PER_DEG
}

/// Convert degrees to arcseconds
#[inline]
pub fn deg_to_arcsec(deg: Degree) -> ArcSec {
    deg * ARCSEC_PER_DEG
}

//! # Footprint query adapter
//!
//! Asks the survey footprint service which observation windows cover a resolved
//! target, fetches the matching cutouts, and pairs both lists **by position**.
//!
//! The service contract ([`FootprintService`]) mirrors the Tesscut API:
//!
//! - `get_sectors` → one [`SectorWindow`] per intersecting window,
//! - `get_cutouts` → one [`Cutout`] per window, in the same order,
//! - `resolve_name` → the position behind an object name or a `"TIC <n>"` string.
//!
//! A name the service cannot resolve is a [`TesscopeError::InvalidObjectName`]; a
//! valid target outside every window yields an empty list, which is not an error.

use std::{collections::BTreeMap, fmt, future::Future};

use serde::{Deserialize, Serialize};

use crate::{
    constants::{Degree, DATE_OBS_KEY},
    coordinates::SkyCoord,
    resolver::{ResolvedTarget, TargetKind},
    tesscope_errors::TesscopeError,
    validation::check_radius,
};

/// One observation window intersecting the search region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectorWindow {
    /// Service name of the window, e.g. `tess-s0006-1-1`
    pub sector_name: String,
    pub sector: u32,
    pub camera: u8,
    pub ccd: u8,
}

/// Header of one exposure (HDU) of a cutout: keyword → raw value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exposure {
    pub header: BTreeMap<String, String>,
}

/// Cutout product for one window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cutout {
    pub name: String,
    pub exposures: Vec<Exposure>,
}

impl Cutout {
    /// Value of `key` in the header of the first exposure.
    pub fn first_header_value(&self, key: &str) -> Option<&str> {
        self.exposures
            .first()
            .and_then(|exposure| exposure.header.get(key))
            .map(String::as_str)
    }

    /// Observation start of the first exposure, verbatim.
    pub fn date_obs(&self) -> Option<&str> {
        self.first_header_value(DATE_OBS_KEY)
    }
}

/// Identifier form sent to the footprint service.
#[derive(Debug, Clone, PartialEq)]
pub enum FootprintQuery {
    Coordinates(SkyCoord),
    ObjectName(String),
    /// Always in the `"TIC <digits>"` form.
    CatalogId(String),
}

impl FootprintQuery {
    /// Choose the query form from how the target was resolved.
    ///
    /// A catalog target is queried by its `"TIC <digits>"` string even when its
    /// position is known, so the service resolves it the same way every time.
    pub fn for_target(target: &ResolvedTarget) -> Result<Self, TesscopeError> {
        match &target.kind {
            TargetKind::Coordinate => target
                .coordinate
                .map(FootprintQuery::Coordinates)
                .ok_or_else(|| {
                    TesscopeError::InvalidInput(format!(
                        "coordinate target {} carries no position",
                        target.display_name
                    ))
                }),
            TargetKind::Name(name) => Ok(FootprintQuery::ObjectName(name.clone())),
            TargetKind::CatalogId(tic_id) => Ok(FootprintQuery::CatalogId(tic_id.query_string())),
        }
    }
}

impl fmt::Display for FootprintQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FootprintQuery::Coordinates(coord) => write!(f, "{coord}"),
            FootprintQuery::ObjectName(name) => write!(f, "{name}"),
            FootprintQuery::CatalogId(tic) => write!(f, "{tic}"),
        }
    }
}

pub trait FootprintService: Send + Sync {
    fn get_sectors(
        &self,
        query: &FootprintQuery,
        radius: Degree,
    ) -> impl Future<Output = Result<Vec<SectorWindow>, TesscopeError>> + Send;

    fn get_cutouts(
        &self,
        query: &FootprintQuery,
    ) -> impl Future<Output = Result<Vec<Cutout>, TesscopeError>> + Send;

    fn resolve_name(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<SkyCoord, TesscopeError>> + Send;
}

/// Pair windows and cutouts index by index.
///
/// Return
/// ----------
/// * The pairs, or a [`TesscopeError::QueryError`] when the two lists differ in length.
pub fn pair_by_position(
    windows: Vec<SectorWindow>,
    cutouts: Vec<Cutout>,
) -> Result<Vec<(SectorWindow, Cutout)>, TesscopeError> {
    if windows.len() != cutouts.len() {
        return Err(TesscopeError::QueryError(format!(
            "footprint service returned {} windows but {} cutouts",
            windows.len(),
            cutouts.len()
        )));
    }
    Ok(windows.into_iter().zip(cutouts).collect())
}

/// Query the windows covering `target` within `radius` degrees, with their cutouts.
///
/// Arguments
/// -----------------
/// * `service`: the footprint service.
/// * `target`: a resolved target; its kind selects the query form.
/// * `radius`: search radius in degrees, strictly positive.
///
/// Return
/// ----------
/// * `(window, cutout)` pairs in service order (possibly empty), or the first error.
pub async fn query_footprint<F: FootprintService>(
    service: &F,
    target: &ResolvedTarget,
    radius: Degree,
) -> Result<Vec<(SectorWindow, Cutout)>, TesscopeError> {
    let radius = check_radius(radius)?;

    let query = FootprintQuery::for_target(target)?;
    let windows = service.get_sectors(&query, radius).await?;
    if windows.is_empty() {
        log::info!("no window covers {query} within {radius} deg");
        return Ok(Vec::new());
    }

    let cutouts = service.get_cutouts(&query).await?;
    log::debug!(
        "{query}: {} windows, {} cutouts",
        windows.len(),
        cutouts.len()
    );
    pair_by_position(windows, cutouts)
}

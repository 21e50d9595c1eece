//! # Tesscut API
//!
//! - `GET {base}/sector?ra=..&dec=..&radius=..` lists the observation windows
//!   intersecting a cone. Numbers come back as zero-padded strings:
//!
//! ```json
//! {"results": [{"sectorName": "tess-s0006-1-1", "sector": "0006", "camera": "1", "ccd": "1"}]}
//! ```
//!
//! - `GET {base}/astrocut?ra=..&dec=..&y=N&x=N&units=px` returns a zip archive
//!   with one FITS cutout per window. Only the primary header of each cutout is
//!   decoded; it becomes the single [`Exposure`] of the [`Cutout`].
//!
//! ## Alignment
//! -----------------
//! The two endpoints are separate requests, and the archive lists its members in
//! no guaranteed order. Both lists are therefore sorted by name: a window named
//! `tess-sNNNN-C-D` and its cutout `tess-sNNNN-C-D_<ra>_<dec>_<size>_astrocut.fits`
//! share that prefix, so the sorted lists pair up position by position. The
//! record order of a MAST query is thus ascending sector, then camera and CCD,
//! rather than the raw order of the `sector` response.

use serde::Deserialize;

use crate::{
    constants::Degree,
    coordinates::SkyCoord,
    env_state::TesscopeEnv,
    footprint::{Cutout, Exposure, SectorWindow},
    tesscope_errors::TesscopeError,
};

use super::{cutout_archive::CutoutArchive, fits_header::read_primary_header};

const SERVICE: &str = "Tesscut";

#[derive(Debug, Deserialize)]
struct SectorEntry {
    #[serde(rename = "sectorName")]
    sector_name: String,
    sector: String,
    camera: String,
    ccd: String,
}

#[derive(Debug, Deserialize)]
struct SectorResponse {
    #[serde(default)]
    results: Vec<SectorEntry>,
}

fn parse_number<T: std::str::FromStr>(field: &str, value: &str) -> Result<T, TesscopeError> {
    value.trim().parse().map_err(|_| {
        TesscopeError::QueryError(format!("{SERVICE}: {field} is not a number: {value:?}"))
    })
}

impl TryFrom<SectorEntry> for SectorWindow {
    type Error = TesscopeError;

    fn try_from(entry: SectorEntry) -> Result<Self, Self::Error> {
        Ok(SectorWindow {
            sector: parse_number("sector", &entry.sector)?,
            camera: parse_number("camera", &entry.camera)?,
            ccd: parse_number("ccd", &entry.ccd)?,
            sector_name: entry.sector_name,
        })
    }
}

fn decode_sectors(response: SectorResponse) -> Result<Vec<SectorWindow>, TesscopeError> {
    let mut windows = response
        .results
        .into_iter()
        .map(SectorWindow::try_from)
        .collect::<Result<Vec<_>, _>>()?;
    windows.sort_by(|a, b| a.sector_name.cmp(&b.sector_name));
    Ok(windows)
}

/// Decode an `astrocut` archive into cutouts, one per FITS member.
pub(crate) fn decode_cutouts(archive: &[u8]) -> Result<Vec<Cutout>, TesscopeError> {
    let archive = CutoutArchive::parse(archive)?;
    archive
        .fits_members()?
        .into_iter()
        .map(|(name, content)| {
            let header = read_primary_header(&content)?;
            Ok(Cutout {
                name,
                exposures: vec![Exposure { header }],
            })
        })
        .collect()
}

pub async fn get_sectors(
    env: &TesscopeEnv,
    coord: &SkyCoord,
    radius: Degree,
) -> Result<Vec<SectorWindow>, TesscopeError> {
    let url = format!("{}/sector", env.config.tesscut_api_url);
    let query = [
        ("ra", coord.ra.to_string()),
        ("dec", coord.dec.to_string()),
        ("radius", radius.to_string()),
    ];
    let response: SectorResponse = env.get_json(SERVICE, &url, &query).await?;
    decode_sectors(response)
}

pub async fn get_cutouts(env: &TesscopeEnv, coord: &SkyCoord) -> Result<Vec<Cutout>, TesscopeError> {
    let url = format!("{}/astrocut", env.config.tesscut_api_url);
    let size = env.config.cutout_size_px.max(1).to_string();
    let query = [
        ("ra", coord.ra.to_string()),
        ("dec", coord.dec.to_string()),
        ("y", size.clone()),
        ("x", size),
        ("units", "px".to_string()),
    ];
    let archive = env.get_bytes(SERVICE, &url, &query).await?;
    decode_cutouts(&archive)
}

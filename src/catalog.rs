//! Object-catalog collaborator (TESS Input Catalog).
//!
//! [`CatalogService`] is the seam between the pipeline and whatever answers TIC
//! queries: [`MastClient`](crate::mast::MastClient) over HTTP, or an in-memory
//! double in tests. Rows come back as [`CatalogRow`], which keeps every physical
//! column optional because the catalog routinely leaves them empty.

use std::future::Future;

use serde::{Deserialize, Deserializer, Serialize};

use crate::{
    constants::Degree, coordinates::SkyCoord, resolver::TicId, tesscope_errors::TesscopeError,
};

/// One star of a TIC query answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogRow {
    #[serde(rename = "ID", default, deserialize_with = "lenient_id")]
    pub id: Option<u64>,
    #[serde(default)]
    pub ra: Option<f64>,
    #[serde(default)]
    pub dec: Option<f64>,
    /// Luminosity in solar units
    #[serde(rename = "lum", default)]
    pub luminosity: Option<f64>,
    /// Effective temperature in kelvin
    #[serde(rename = "Teff", default)]
    pub teff: Option<f64>,
    /// TESS magnitude
    #[serde(rename = "Tmag", default)]
    pub tmag: Option<f64>,
    /// Distance from the query centre, in arcseconds
    #[serde(rename = "dstArcSec", default)]
    pub dst_arcsec: Option<f64>,
}

impl CatalogRow {
    /// Catalog position of the star, when both components are present and valid.
    pub fn coordinate(&self) -> Option<SkyCoord> {
        match (self.ra, self.dec) {
            (Some(ra), Some(dec)) => SkyCoord::new(ra, dec).ok(),
            _ => None,
        }
    }
}

/// MAST serves the TIC identifier either as a JSON number or as a string.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
    }

    Ok(match Option::<RawId>::deserialize(deserializer)? {
        Some(RawId::Number(n)) => Some(n),
        Some(RawId::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}

pub trait CatalogService: Send + Sync {
    /// Rows whose identifier equals `tic_id` (zero or one in practice).
    fn query_by_id(
        &self,
        tic_id: &TicId,
    ) -> impl Future<Output = Result<Vec<CatalogRow>, TesscopeError>> + Send;

    /// Rows around the position the name resolves to.
    ///
    /// A name the resolver does not know is a [`TesscopeError::InvalidObjectName`].
    fn query_by_name(
        &self,
        name: &str,
        radius: Degree,
    ) -> impl Future<Output = Result<Vec<CatalogRow>, TesscopeError>> + Send;

    /// Rows within `radius` of `coord`.
    fn query_by_region(
        &self,
        coord: &SkyCoord,
        radius: Degree,
    ) -> impl Future<Output = Result<Vec<CatalogRow>, TesscopeError>> + Send;
}

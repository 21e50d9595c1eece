//! # MAST `invoke` API
//!
//! The portal API takes one JSON request per call, posted as the urlencoded form
//! field `request`:
//!
//! ```json
//! {"service": "Mast.Catalogs.Tic.Cone", "params": {...}, "format": "json", "pagesize": 2000, "page": 1}
//! ```
//!
//! Services used here:
//!
//! | Service | Purpose |
//! |---------|---------|
//! | `Mast.Name.Lookup` | object name (or `"TIC <n>"`) → position |
//! | `Mast.Catalogs.Tic.Cone` | TIC stars within a radius |
//! | `Mast.Catalogs.Filtered.Tic` | TIC star by identifier |
//!
//! Catalog services may answer `"status": "EXECUTING"` before the data is ready;
//! the request is then re-posted after a short pause, a bounded number of times.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};

use crate::{
    catalog::CatalogRow, constants::Degree, coordinates::SkyCoord, env_state::TesscopeEnv,
    resolver::TicId, tesscope_errors::TesscopeError,
};

const SERVICE: &str = "MAST";
const PAGE_SIZE: usize = 2000;
const MAX_POLLS: usize = 30;
const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Deserialize)]
struct ResolvedCoordinate {
    ra: f64,
    decl: f64,
}

#[derive(Debug, Deserialize)]
struct NameLookupResponse {
    #[serde(rename = "resolvedCoordinate", default)]
    resolved_coordinate: Vec<ResolvedCoordinate>,
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    msg: String,
    #[serde(default)]
    data: Vec<CatalogRow>,
}

/// Body of an `invoke` request.
pub(crate) fn request_body(service: &str, params: Value) -> String {
    json!({
        "service": service,
        "params": params,
        "format": "json",
        "pagesize": PAGE_SIZE,
        "page": 1,
    })
    .to_string()
}

async fn invoke<T: for<'de> Deserialize<'de>>(
    env: &TesscopeEnv,
    service: &str,
    params: Value,
) -> Result<T, TesscopeError> {
    let body = request_body(service, params);
    env.post_form_json(SERVICE, &env.config.mast_api_url, &[("request", body)])
        .await
}

async fn catalog_query(
    env: &TesscopeEnv,
    service: &str,
    params: Value,
) -> Result<Vec<CatalogRow>, TesscopeError> {
    for attempt in 0..MAX_POLLS {
        let response: CatalogResponse = invoke(env, service, params.clone()).await?;
        match response.status.as_str() {
            "EXECUTING" => {
                log::debug!("{service} still executing (poll {})", attempt + 1);
                tokio::time::sleep(POLL_INTERVAL).await;
            }
            "ERROR" => {
                return Err(TesscopeError::QueryError(format!(
                    "{service}: {}",
                    response.msg
                )))
            }
            _ => return Ok(response.data),
        }
    }
    Err(TesscopeError::QueryError(format!(
        "{service}: no result after {MAX_POLLS} polls"
    )))
}

/// Position behind an object name.
///
/// Return
/// ----------
/// * The first resolved position, or [`TesscopeError::InvalidObjectName`] when
///   MAST does not know the name.
pub async fn lookup_name(env: &TesscopeEnv, name: &str) -> Result<SkyCoord, TesscopeError> {
    let response: NameLookupResponse = invoke(
        env,
        "Mast.Name.Lookup",
        json!({ "input": name, "format": "json" }),
    )
    .await?;

    let resolved = response
        .resolved_coordinate
        .first()
        .ok_or_else(|| TesscopeError::InvalidObjectName(name.to_string()))?;
    SkyCoord::new(resolved.ra, resolved.decl)
        .map_err(|_| TesscopeError::InvalidObjectName(name.to_string()))
}

/// TIC stars within `radius` degrees of `coord`, closest first.
pub async fn tic_cone(
    env: &TesscopeEnv,
    coord: &SkyCoord,
    radius: Degree,
) -> Result<Vec<CatalogRow>, TesscopeError> {
    let mut rows = catalog_query(
        env,
        "Mast.Catalogs.Tic.Cone",
        json!({ "ra": coord.ra, "dec": coord.dec, "radius": radius }),
    )
    .await?;
    rows.sort_by(|a, b| {
        a.dst_arcsec
            .unwrap_or(f64::INFINITY)
            .total_cmp(&b.dst_arcsec.unwrap_or(f64::INFINITY))
    });
    Ok(rows)
}

/// The TIC row of `tic_id`, if any.
pub async fn tic_by_id(env: &TesscopeEnv, tic_id: &TicId) -> Result<Vec<CatalogRow>, TesscopeError> {
    catalog_query(
        env,
        "Mast.Catalogs.Filtered.Tic",
        json!({
            "columns": "*",
            "filters": [{ "paramName": "ID", "values": [tic_id.0.to_string()] }],
        }),
    )
    .await
}

#[cfg(test)]
mod invoke_test {
    use super::*;

    #[test]
    fn test_request_body() {
        let body = request_body("Mast.Name.Lookup", json!({"input": "Vega"}));
        let value: Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["service"], "Mast.Name.Lookup");
        assert_eq!(value["params"]["input"], "Vega");
        assert_eq!(value["format"], "json");
        assert_eq!(value["pagesize"], PAGE_SIZE);
    }

    #[test]
    fn test_decode_name_lookup() {
        let response: NameLookupResponse = serde_json::from_str(
            r#"{"resolvedCoordinate": [{"cacheDate": "Apr 12, 2017", "canonicalName": "Betelgeuse",
                "decl": 7.40703634, "ra": 88.79293899, "resolver": "SIMBAD"}], "status": ""}"#,
        )
        .unwrap();
        assert_eq!(response.resolved_coordinate.len(), 1);
        assert_eq!(response.resolved_coordinate[0].decl, 7.40703634);

        let empty: NameLookupResponse =
            serde_json::from_str(r#"{"resolvedCoordinate": [], "status": ""}"#).unwrap();
        assert!(empty.resolved_coordinate.is_empty());
    }

    #[test]
    fn test_decode_catalog() {
        let response: CatalogResponse = serde_json::from_str(
            r#"{"status": "COMPLETE", "msg": "", "paging": {"page": 1, "rows": 1},
                "data": [{"ID": "141914082", "ra": 88.79, "dec": 7.41, "Teff": 3500.0,
                          "lum": null, "Tmag": -1.2, "dstArcSec": 0.31}]}"#,
        )
        .unwrap();
        assert_eq!(response.status, "COMPLETE");
        assert_eq!(response.data.len(), 1);
        assert_eq!(response.data[0].id, Some(141914082));
        assert_eq!(response.data[0].dst_arcsec, Some(0.31));

        let pending: CatalogResponse =
            serde_json::from_str(r#"{"status": "EXECUTING", "msg": ""}"#).unwrap();
        assert!(pending.data.is_empty());
    }
}

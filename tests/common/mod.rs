#![allow(dead_code)]

use std::{
    collections::{BTreeMap, HashMap},
    sync::Mutex,
    time::Duration,
};

use tesscope::{
    catalog::{CatalogRow, CatalogService},
    config::PipelineConfig,
    constants::{Degree, DATE_OBS_KEY},
    coordinates::SkyCoord,
    footprint::{Cutout, Exposure, FootprintQuery, FootprintService, SectorWindow},
    locator::SectorLocator,
    resolver::TicId,
    tesscope_errors::TesscopeError,
};

pub const BETELGEUSE: (f64, f64) = (88.7929583, 7.4070639);
pub const FIELD_A: (f64, f64) = (10.0, 20.0);
/// A field whose second cutout has no DATE-OBS card
pub const BROKEN_FIELD: (f64, f64) = (45.0, 45.0);
pub const BETELGEUSE_TIC: u64 = 141914082;
/// Delay of the queries listed in `MockFootprint::slow`
pub const SLOW_QUERY: Duration = Duration::from_secs(10);

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn coord((ra, dec): (f64, f64)) -> SkyCoord {
    SkyCoord::new(ra, dec).unwrap()
}

/// Observation windows of one sky position: `(sector, camera, DATE-OBS)`.
pub struct MockField {
    pub center: SkyCoord,
    pub windows: Vec<(u32, u8, Option<&'static str>)>,
}

/// In-memory footprint service. Every query string it receives is logged.
pub struct MockFootprint {
    pub names: HashMap<String, SkyCoord>,
    pub fields: Vec<MockField>,
    pub calls: Mutex<Vec<String>>,
    /// Query strings answered with a transport error
    pub failing: Vec<String>,
    /// Query strings answered only after [`SLOW_QUERY`]
    pub slow: Vec<String>,
}

impl MockFootprint {
    fn position(&self, query: &FootprintQuery) -> Result<SkyCoord, TesscopeError> {
        match query {
            FootprintQuery::Coordinates(coord) => Ok(*coord),
            FootprintQuery::ObjectName(name) | FootprintQuery::CatalogId(name) => self
                .names
                .get(name)
                .copied()
                .ok_or_else(|| TesscopeError::InvalidObjectName(name.clone())),
        }
    }

    fn field(&self, query: &FootprintQuery) -> Result<Option<&MockField>, TesscopeError> {
        let text = query.to_string();
        self.calls.lock().unwrap().push(text.clone());
        if self.failing.contains(&text) {
            return Err(TesscopeError::QueryError(format!("mock failure for {text}")));
        }
        let position = self.position(query)?;
        Ok(self
            .fields
            .iter()
            .find(|field| field.center.separation(&position) < 1e-6))
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl FootprintService for MockFootprint {
    async fn get_sectors(
        &self,
        query: &FootprintQuery,
        _radius: Degree,
    ) -> Result<Vec<SectorWindow>, TesscopeError> {
        if self.slow.contains(&query.to_string()) {
            tokio::time::sleep(SLOW_QUERY).await;
        }
        Ok(self
            .field(query)?
            .map(|field| {
                field
                    .windows
                    .iter()
                    .map(|&(sector, camera, _)| SectorWindow {
                        sector_name: format!("tess-s{sector:04}-{camera}-1"),
                        sector,
                        camera,
                        ccd: 1,
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_cutouts(&self, query: &FootprintQuery) -> Result<Vec<Cutout>, TesscopeError> {
        Ok(self
            .field(query)?
            .map(|field| {
                field
                    .windows
                    .iter()
                    .map(|&(sector, camera, date)| {
                        let mut header = BTreeMap::new();
                        if let Some(date) = date {
                            header.insert(DATE_OBS_KEY.to_string(), date.to_string());
                        }
                        Cutout {
                            name: format!("tess-s{sector:04}-{camera}-1_astrocut.fits"),
                            exposures: vec![Exposure { header }],
                        }
                    })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn resolve_name(&self, name: &str) -> Result<SkyCoord, TesscopeError> {
        self.calls.lock().unwrap().push(format!("resolve:{name}"));
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| TesscopeError::InvalidObjectName(name.to_string()))
    }
}

/// In-memory TIC.
pub struct MockCatalog {
    pub stars: Vec<CatalogRow>,
    pub names: HashMap<String, SkyCoord>,
    pub calls: Mutex<Vec<String>>,
}

impl MockCatalog {
    fn within(&self, center: &SkyCoord, radius: Degree) -> Vec<CatalogRow> {
        self.stars
            .iter()
            .filter(|row| {
                row.coordinate()
                    .is_some_and(|position| position.separation(center) <= radius)
            })
            .cloned()
            .collect()
    }

    pub fn queries(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CatalogService for MockCatalog {
    async fn query_by_id(&self, tic_id: &TicId) -> Result<Vec<CatalogRow>, TesscopeError> {
        self.calls.lock().unwrap().push(format!("id:{}", tic_id.0));
        Ok(self
            .stars
            .iter()
            .filter(|row| row.id == Some(tic_id.0))
            .cloned()
            .collect())
    }

    async fn query_by_name(
        &self,
        name: &str,
        radius: Degree,
    ) -> Result<Vec<CatalogRow>, TesscopeError> {
        self.calls.lock().unwrap().push(format!("name:{name}"));
        let center = self
            .names
            .get(name)
            .ok_or_else(|| TesscopeError::InvalidObjectName(name.to_string()))?;
        Ok(self.within(center, radius))
    }

    async fn query_by_region(
        &self,
        coord: &SkyCoord,
        radius: Degree,
    ) -> Result<Vec<CatalogRow>, TesscopeError> {
        self.calls.lock().unwrap().push(format!("region:{coord}"));
        Ok(self.within(coord, radius))
    }
}

fn star(id: u64, (ra, dec): (f64, f64), teff: f64, lum: Option<f64>, tmag: f64) -> CatalogRow {
    CatalogRow {
        id: Some(id),
        ra: Some(ra),
        dec: Some(dec),
        luminosity: lum,
        teff: Some(teff),
        tmag: Some(tmag),
        dst_arcsec: None,
    }
}

/// Footprint and catalog describing the same small sky.
pub fn mock_sky() -> (MockFootprint, MockCatalog) {
    let names: HashMap<String, SkyCoord> = [
        ("Betelgeuse".to_string(), coord(BETELGEUSE)),
        (format!("TIC {BETELGEUSE_TIC}"), coord(BETELGEUSE)),
        ("Field A".to_string(), coord(FIELD_A)),
    ]
    .into_iter()
    .collect();

    let footprint = MockFootprint {
        names: names.clone(),
        fields: vec![
            MockField {
                center: coord(BETELGEUSE),
                windows: vec![
                    (6, 1, Some("2018-12-15T05:12:00.000")),
                    (33, 3, Some("2020-12-18T06:34:00.000")),
                    (43, 1, Some("2021-09-16T02:40:00.000")),
                ],
            },
            MockField {
                center: coord(FIELD_A),
                windows: vec![
                    (17, 1, Some("2019-10-08T03:30:00.000")),
                    (57, 1, Some("2022-09-30T18:55:00.000")),
                ],
            },
            MockField {
                center: coord(BROKEN_FIELD),
                windows: vec![(18, 2, Some("2019-11-03T02:42:00.000")), (19, 2, None)],
            },
        ],
        calls: Mutex::new(Vec::new()),
        failing: Vec::new(),
        slow: Vec::new(),
    };

    let catalog = MockCatalog {
        stars: vec![
            star(BETELGEUSE_TIC, BETELGEUSE, 3500.0, Some(126000.0), -1.2),
            star(2, (88.7935, 7.4072), 5200.0, Some(0.8), 12.4),
            star(3, (88.85, 7.45), 6100.0, None, 13.9),
            star(10, FIELD_A, 5800.0, Some(1.0), 9.5),
            star(11, (10.005, 20.004), 4400.0, Some(0.3), 11.1),
        ],
        names,
        calls: Mutex::new(Vec::new()),
    };

    (footprint, catalog)
}

pub fn mock_locator(config: PipelineConfig) -> SectorLocator<MockFootprint, MockCatalog> {
    let (footprint, catalog) = mock_sky();
    SectorLocator::new(footprint, catalog, config)
}

//! # Sector normalization
//!
//! Converts `(window, cutout)` pairs into uniform [`SectorRecord`]s:
//!
//! - `window_number` and `channel` come from the window descriptor,
//! - `cycle = ((window_number - 1) div 13) + 1`,
//! - `observed_at` is the `DATE-OBS` card of the cutout's first exposure.
//!
//! A pair without a usable timestamp is a [`TesscopeError::MalformedRecord`]: it
//! aborts the call instead of being skipped.

use hifitime::Epoch;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    constants::WINDOWS_PER_CYCLE,
    footprint::{pair_by_position, Cutout, SectorWindow},
    tesscope_errors::TesscopeError,
};

/// Cycle containing observation window `window` (windows are numbered from 1).
#[inline]
pub fn cycle_from_window(window: u32) -> u32 {
    (window.max(1) - 1) / WINDOWS_PER_CYCLE + 1
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SectorRecord {
    pub window_number: u32,
    pub cycle: u32,
    pub channel: u8,
    pub observed_at: String,
}

impl SectorRecord {
    pub fn from_pair(window: &SectorWindow, cutout: &Cutout) -> Result<Self, TesscopeError> {
        if window.sector == 0 {
            return Err(TesscopeError::MalformedRecord(format!(
                "{}: window number must be positive",
                window.sector_name
            )));
        }
        if cutout.exposures.is_empty() {
            return Err(TesscopeError::MalformedRecord(format!(
                "cutout for sector {} has no exposure",
                window.sector
            )));
        }
        let observed_at = cutout
            .date_obs()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                TesscopeError::MalformedRecord(format!(
                    "cutout for sector {} has no DATE-OBS",
                    window.sector
                ))
            })?;
        parse_observation_time(observed_at)?;

        Ok(SectorRecord {
            window_number: window.sector,
            cycle: cycle_from_window(window.sector),
            channel: window.camera,
            observed_at: observed_at.to_string(),
        })
    }

    /// `observed_at` as a UTC epoch.
    pub fn observed_epoch(&self) -> Result<Epoch, TesscopeError> {
        parse_observation_time(&self.observed_at)
    }
}

fn parse_observation_time(value: &str) -> Result<Epoch, TesscopeError> {
    Epoch::from_gregorian_str(value).map_err(|e| {
        TesscopeError::MalformedRecord(format!("unreadable DATE-OBS {value:?}: {e}"))
    })
}

/// Records of one footprint query, with the last cycle and timestamp seen.
///
/// `last_cycle` / `last_observed_at` serve callers that expect a single window;
/// everything else should read `records`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSectors {
    pub records: Vec<SectorRecord>,
    pub last_cycle: Option<u32>,
    pub last_observed_at: Option<String>,
}

pub fn normalize(pairs: &[(SectorWindow, Cutout)]) -> Result<NormalizedSectors, TesscopeError> {
    let records = pairs
        .iter()
        .map(|(window, cutout)| SectorRecord::from_pair(window, cutout))
        .collect::<Result<Vec<_>, _>>()?;

    let last = records.last();
    Ok(NormalizedSectors {
        last_cycle: last.map(|r| r.cycle),
        last_observed_at: last.map(|r| r.observed_at.clone()),
        records,
    })
}

/// Same as [`normalize`] for two separate lists, which must have equal length.
pub fn normalize_lists(
    windows: Vec<SectorWindow>,
    cutouts: Vec<Cutout>,
) -> Result<NormalizedSectors, TesscopeError> {
    normalize(&pair_by_position(windows, cutouts)?)
}

/// Drop repeated windows, keeping the first occurrence of each.
pub fn dedup_windows(records: Vec<SectorRecord>) -> Vec<SectorRecord> {
    records
        .into_iter()
        .unique_by(|r| (r.window_number, r.channel))
        .collect()
}

#[cfg(test)]
mod normalizer_test {
    use std::collections::BTreeMap;

    use super::*;
    use crate::{constants::DATE_OBS_KEY, footprint::Exposure};

    fn pair(sector: u32, camera: u8, date: Option<&str>) -> (SectorWindow, Cutout) {
        let mut header = BTreeMap::new();
        if let Some(date) = date {
            header.insert(DATE_OBS_KEY.to_string(), date.to_string());
        }
        (
            SectorWindow {
                sector_name: format!("tess-s{sector:04}-{camera}-2"),
                sector,
                camera,
                ccd: 2,
            },
            Cutout {
                name: format!("tess-s{sector:04}-{camera}-2"),
                exposures: vec![Exposure { header }],
            },
        )
    }

    #[test]
    fn test_cycle_boundaries() {
        assert_eq!(cycle_from_window(1), 1);
        assert_eq!(cycle_from_window(13), 1);
        assert_eq!(cycle_from_window(14), 2);
        assert_eq!(cycle_from_window(26), 2);
        assert_eq!(cycle_from_window(27), 3);
        for w in 1..200 {
            assert_eq!(cycle_from_window(w), (w - 1) / 13 + 1);
        }
    }

    #[test]
    fn test_normalize() {
        let pairs = vec![
            pair(6, 1, Some("2018-12-15T05:12:00.000")),
            pair(33, 3, Some("2020-12-18T06:34:00.000")),
        ];
        let normalized = normalize(&pairs).unwrap();
        assert_eq!(
            normalized.records,
            vec![
                SectorRecord {
                    window_number: 6,
                    cycle: 1,
                    channel: 1,
                    observed_at: "2018-12-15T05:12:00.000".into()
                },
                SectorRecord {
                    window_number: 33,
                    cycle: 3,
                    channel: 3,
                    observed_at: "2020-12-18T06:34:00.000".into()
                },
            ]
        );
        assert_eq!(normalized.last_cycle, Some(3));
        assert_eq!(
            normalized.last_observed_at.as_deref(),
            Some("2020-12-18T06:34:00.000")
        );
    }

    #[test]
    fn test_empty_input() {
        let normalized = normalize(&[]).unwrap();
        assert!(normalized.records.is_empty());
        assert_eq!(normalized.last_cycle, None);
        assert_eq!(normalized.last_observed_at, None);
    }

    #[test]
    fn test_missing_or_bad_timestamp() {
        let missing = normalize(&[pair(6, 1, None)]);
        assert!(matches!(missing, Err(TesscopeError::MalformedRecord(_))));

        let garbage = normalize(&[pair(6, 1, Some("yesterday"))]);
        assert!(matches!(garbage, Err(TesscopeError::MalformedRecord(_))));

        let (window, _) = pair(6, 1, None);
        let empty = SectorRecord::from_pair(&window, &Cutout::default());
        assert!(matches!(empty, Err(TesscopeError::MalformedRecord(_))));
    }

    #[test]
    fn test_length_mismatch() {
        let (w1, c1) = pair(1, 1, Some("2018-07-25T19:01:42.708"));
        let (w2, _) = pair(2, 1, Some("2018-08-23T16:00:00.000"));
        let result = normalize_lists(vec![w1, w2], vec![c1]);
        assert!(matches!(result, Err(TesscopeError::QueryError(_))));
    }

    #[test]
    fn test_dedup_windows() {
        let pairs = vec![
            pair(6, 1, Some("2018-12-15T05:12:00.000")),
            pair(6, 1, Some("2018-12-15T05:12:00.000")),
            pair(7, 1, Some("2019-01-08T04:12:00.000")),
        ];
        let records = normalize(&pairs).unwrap().records;
        assert_eq!(records.len(), 3);
        let deduped = dedup_windows(records);
        assert_eq!(
            deduped.iter().map(|r| r.window_number).collect::<Vec<_>>(),
            vec![6, 7]
        );
    }

    #[test]
    fn test_observed_epoch() {
        let (window, cutout) = pair(1, 1, Some("2018-07-25T19:01:42.708"));
        let record = SectorRecord::from_pair(&window, &cutout).unwrap();
        let epoch = record.observed_epoch().unwrap();
        let (y, m, d, _, _, _, _) = epoch.to_gregorian_utc();
        assert_eq!((y, m, d), (2018, 7, 25));
    }
}

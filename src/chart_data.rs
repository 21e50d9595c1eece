//! # Chart data
//!
//! Presentation-free series behind the four charts of a target view:
//!
//! - temperature / luminosity points (HR diagram),
//! - magnitude histogram with automatically chosen bins,
//! - distance histogram with a fixed number of bins,
//! - number of records per observation window.
//!
//! Non-finite catalog values are dropped here, never upstream, so the
//! [`TargetMetadata`] series stay index-aligned.

use std::collections::BTreeMap;

use itertools::Itertools;
use serde::Serialize;

use crate::{metadata::TargetMetadata, normalizer::SectorRecord};

pub const DISTANCE_BINS: usize = 50;

/// Equal-width histogram. `edges.len() == counts.len() + 1`; the last bin is closed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Histogram {
    pub counts: Vec<usize>,
    pub edges: Vec<f64>,
}

fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Histogram range; a degenerate range is widened by 0.5 on each side.
fn value_range(values: &[f64]) -> Option<(f64, f64)> {
    let (lo, hi) = values.iter().copied().minmax().into_option()?;
    Some(if lo == hi { (lo - 0.5, hi + 0.5) } else { (lo, hi) })
}

/// Linear-interpolation percentile of sorted data, `q` in `[0, 1]`.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let below = position.floor() as usize;
    let above = position.ceil() as usize;
    let fraction = position - below as f64;
    sorted[below] + (sorted[above] - sorted[below]) * fraction
}

impl Histogram {
    /// Histogram of the finite values over `bins` equal bins; `None` when none is finite.
    pub fn with_bins(values: &[f64], bins: usize) -> Option<Self> {
        let values = finite(values);
        let (lo, hi) = value_range(&values)?;
        Some(Self::fill(&values, lo, hi, bins.max(1)))
    }

    /// Histogram with the bin count chosen from the data.
    ///
    /// The bin width is the smaller of the Sturges and Freedman–Diaconis widths,
    /// Sturges alone when the interquartile range is zero.
    pub fn auto(values: &[f64]) -> Option<Self> {
        let mut values = finite(values);
        let (lo, hi) = value_range(&values)?;
        values.sort_by(f64::total_cmp);

        let n = values.len() as f64;
        let span = values[values.len() - 1] - values[0];
        let sturges = span / (n.log2() + 1.0);
        let iqr = percentile(&values, 0.75) - percentile(&values, 0.25);
        let freedman_diaconis = 2.0 * iqr * n.powf(-1.0 / 3.0);
        let width = if freedman_diaconis > 0.0 {
            freedman_diaconis.min(sturges)
        } else {
            sturges
        };

        let bins = if width > 0.0 {
            ((hi - lo) / width).ceil() as usize
        } else {
            1
        };
        Some(Self::fill(&values, lo, hi, bins.max(1)))
    }

    fn fill(values: &[f64], lo: f64, hi: f64, bins: usize) -> Self {
        let step = (hi - lo) / bins as f64;
        let edges = (0..=bins).map(|i| lo + step * i as f64).collect();
        let mut counts = vec![0; bins];
        for &value in values {
            let index = (((value - lo) / (hi - lo)) * bins as f64) as usize;
            counts[index.min(bins - 1)] += 1;
        }
        Histogram { counts, edges }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

/// `(temperature, luminosity)` pairs usable on log axes.
pub fn hr_points(metadata: &TargetMetadata) -> Vec<(f64, f64)> {
    metadata
        .temperature()
        .iter()
        .zip(metadata.luminosity())
        .map(|(&t, &l)| (t, l))
        .filter(|&(t, l)| t.is_finite() && l.is_finite() && t > 0.0 && l > 0.0)
        .collect()
}

pub fn magnitude_histogram(metadata: &TargetMetadata) -> Option<Histogram> {
    Histogram::auto(metadata.magnitude())
}

pub fn distance_histogram(metadata: &TargetMetadata) -> Option<Histogram> {
    Histogram::with_bins(metadata.distance(), DISTANCE_BINS)
}

/// Records per `(window, cycle, channel)`, ordered by window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectorCoverage {
    pub window_number: u32,
    pub cycle: u32,
    pub channel: u8,
    pub count: usize,
}

pub fn sector_coverage<'a, I>(records: I) -> Vec<SectorCoverage>
where
    I: IntoIterator<Item = &'a SectorRecord>,
{
    let mut counts: BTreeMap<(u32, u32, u8), usize> = BTreeMap::new();
    for record in records {
        *counts
            .entry((record.window_number, record.cycle, record.channel))
            .or_default() += 1;
    }
    counts
        .into_iter()
        .map(|((window_number, cycle, channel), count)| SectorCoverage {
            window_number,
            cycle,
            channel,
            count,
        })
        .collect()
}

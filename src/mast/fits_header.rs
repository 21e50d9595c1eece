//! Primary header of an `astrocut` FITS member, read with `fitrs`.
//!
//! `fitrs` opens files by path, so the inflated member is spilled to a temporary
//! file first. Only the keywords of [`CUTOUT_KEYWORDS`] are kept, rendered as
//! text: strings without their trailing padding, logicals as `T`/`F`.

use std::{collections::BTreeMap, io::Write};

use fitrs::{Fits, HeaderValue};
use tempfile::NamedTempFile;

use crate::{constants::DATE_OBS_KEY, tesscope_errors::TesscopeError};

const CARD_LEN: usize = 80;

/// Primary header keywords copied into an [`Exposure`](crate::footprint::Exposure).
pub const CUTOUT_KEYWORDS: [&str; 7] = [
    DATE_OBS_KEY,
    "DATE-END",
    "TSTART",
    "TSTOP",
    "SECTOR",
    "CAMERA",
    "CCD",
];

fn header_text(value: &HeaderValue) -> String {
    match value {
        HeaderValue::CharacterString(text) => text.trim_end().to_string(),
        HeaderValue::Logical(flag) => String::from(if *flag { "T" } else { "F" }),
        HeaderValue::IntegerNumber(number) => number.to_string(),
        HeaderValue::RealFloatingNumber(number) => number.to_string(),
        other => format!("{other:?}"),
    }
}

fn has_end_card(bytes: &[u8]) -> bool {
    bytes
        .chunks_exact(CARD_LEN)
        .any(|card| card.starts_with(b"END") && card[3..].iter().all(|&b| b == b' '))
}

/// Selected keywords of the primary HDU of the FITS file held in `bytes`.
///
/// Return
/// ----------
/// * The keyword/value pairs present in the header, or a
///   [`TesscopeError::MalformedRecord`] when `bytes` is not a FITS file.
pub fn read_primary_header(bytes: &[u8]) -> Result<BTreeMap<String, String>, TesscopeError> {
    if !bytes.starts_with(b"SIMPLE  =") {
        return Err(TesscopeError::MalformedRecord(
            "FITS member does not start with a SIMPLE card".into(),
        ));
    }
    if !has_end_card(bytes) {
        return Err(TesscopeError::MalformedRecord(
            "FITS header has no END card".into(),
        ));
    }

    let mut spill = NamedTempFile::new()?;
    spill.write_all(bytes)?;
    spill.flush()?;

    let fits = Fits::open(spill.path())?;
    let hdu = fits
        .get(0)
        .ok_or_else(|| TesscopeError::MalformedRecord("FITS member has no primary HDU".into()))?;

    Ok(CUTOUT_KEYWORDS
        .iter()
        .filter_map(|&key| hdu.value(key).map(|value| (key.to_string(), header_text(value))))
        .collect())
}

//! # Sky coordinates and their textual forms
//!
//! [`SkyCoord`] is an ICRS right-ascension / declination pair in **degrees**.
//! User input reaches it through two explicit parse strategies, each returning a
//! typed [`CoordParseError`] instead of an opaque failure:
//!
//! - [`SkyCoord::parse_direct`]: the whole string is one coordinate expression.
//!   Both components must share one notation: two decimal numbers
//!   (`"10.5 20.3"`, `"10.5,20.3"`), two sexagesimal tokens
//!   (`"10h30m00s +20d18m00s"`, `"10:30:00 +20:18:00"`) or six space-separated
//!   sexagesimal fields (`"10 30 00 +20 18 00"`).
//! - [`SkyCoord::parse_split`]: the string is cut once at its first space and
//!   each half is parsed on its own, which also accepts mixed notations
//!   (`"10h30m00s 20.3"`).
//!
//! Units follow the degree convention: a bare number or a colon-separated value
//! is read in degrees, only an explicit `h` marker switches a component to hours.

use std::fmt;
use std::sync::LazyLock;

use nalgebra::Vector3;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{deg_to_arcsec, ArcSec, Degree, RADEG};

static DECIMAL_ANGLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[+-]?(?:\d+(?:\.\d*)?|\.\d+)(?:[eE][+-]?\d+)?(?:d|deg|°)?$")
        .expect("valid decimal angle regex")
});

static LETTER_ANGLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^([+-]?)(\d+)([hd°])(?:(\d+)[m'])?(?:(\d+(?:\.\d*)?)[s"]?)?$"#)
        .expect("valid sexagesimal angle regex")
});

static COLON_ANGLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([+-]?)(\d+):(\d+)(?::(\d+(?:\.\d*)?))?$").expect("valid colon angle regex")
});

static SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s,]+").expect("valid separator regex"));

/// Failure of one coordinate parse strategy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoordParseError {
    #[error("empty coordinate expression")]
    Empty,

    #[error("expected 2 or 6 coordinate fields, found {0}")]
    ComponentCount(usize),

    #[error("right ascension and declination use different notations")]
    MixedNotation,

    #[error("unrecognised angle: {0}")]
    InvalidAngle(String),

    #[error("no space separating right ascension and declination")]
    NoSeparator,

    #[error("right ascension is not finite: {0}")]
    RaOutOfRange(String),

    #[error("declination outside [-90, 90]: {0}")]
    DecOutOfRange(String),
}

/// Notation an angle was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notation {
    Decimal,
    Sexagesimal,
}

/// Parse one angle token into degrees.
///
/// Arguments
/// -----------------
/// * `token`: a decimal number (optionally suffixed `d`, `deg`, `°`), a lettered
///   sexagesimal value (`10h30m00s`, `-20d18m00s`) or a colon form (`20:18:00`).
///
/// Return
/// ----------
/// * The angle in degrees with the notation it was written in, or
///   [`CoordParseError::InvalidAngle`].
pub fn parse_angle(token: &str) -> Result<(Degree, Notation), CoordParseError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(CoordParseError::Empty);
    }

    if DECIMAL_ANGLE.is_match(token) {
        let digits = token.trim_end_matches(['d', 'e', 'g', '°']);
        let value = digits
            .parse::<f64>()
            .map_err(|_| CoordParseError::InvalidAngle(token.to_string()))?;
        return Ok((value, Notation::Decimal));
    }

    let (negative, whole, minutes, seconds, hours) =
        if let Some(caps) = LETTER_ANGLE.captures(token) {
            (
                &caps[1] == "-",
                caps[2].to_string(),
                caps.get(4).map(|m| m.as_str().to_string()),
                caps.get(5).map(|m| m.as_str().to_string()),
                &caps[3] == "h",
            )
        } else if let Some(caps) = COLON_ANGLE.captures(token) {
            (
                &caps[1] == "-",
                caps[2].to_string(),
                Some(caps[3].to_string()),
                caps.get(4).map(|m| m.as_str().to_string()),
                false,
            )
        } else {
            return Err(CoordParseError::InvalidAngle(token.to_string()));
        };

    let value = sexagesimal_to_deg(negative, &whole, minutes.as_deref(), seconds.as_deref())
        .ok_or_else(|| CoordParseError::InvalidAngle(token.to_string()))?;

    let value = if hours { value * 15.0 } else { value };
    Ok((value, Notation::Sexagesimal))
}

fn sexagesimal_to_deg(
    negative: bool,
    whole: &str,
    minutes: Option<&str>,
    seconds: Option<&str>,
) -> Option<Degree> {
    let whole: f64 = whole.parse().ok()?;
    let minutes: f64 = minutes.map(str::parse).transpose().ok()?.unwrap_or(0.0);
    let seconds: f64 = seconds.map(str::parse).transpose().ok()?.unwrap_or(0.0);
    if minutes >= 60.0 || seconds >= 60.0 {
        return None;
    }
    let magnitude = whole + minutes / 60.0 + seconds / 3600.0;
    Some(if negative { -magnitude } else { magnitude })
}

/// ICRS position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SkyCoord {
    pub ra: Degree,
    pub dec: Degree,
}

impl SkyCoord {
    /// Build a coordinate, wrapping the right ascension into `[0, 360)`.
    ///
    /// Return
    /// ----------
    /// * The coordinate, or a range error when `dec` is outside `[-90, 90]` or
    ///   either component is not finite.
    pub fn new(ra: Degree, dec: Degree) -> Result<Self, CoordParseError> {
        if !ra.is_finite() {
            return Err(CoordParseError::RaOutOfRange(ra.to_string()));
        }
        if !dec.is_finite() || !(-90.0..=90.0).contains(&dec) {
            return Err(CoordParseError::DecOutOfRange(dec.to_string()));
        }
        Ok(SkyCoord {
            ra: ra.rem_euclid(360.0),
            dec,
        })
    }

    /// Parse a whole string as a single coordinate expression.
    pub fn parse_direct(input: &str) -> Result<Self, CoordParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CoordParseError::Empty);
        }
        let fields: Vec<&str> = SEPARATORS.split(input).filter(|f| !f.is_empty()).collect();

        match fields.as_slice() {
            [ra, dec] => {
                let (ra, ra_notation) = parse_angle(ra)?;
                let (dec, dec_notation) = parse_angle(dec)?;
                if ra_notation != dec_notation {
                    return Err(CoordParseError::MixedNotation);
                }
                SkyCoord::new(ra, dec)
            }
            [rh, rm, rs, dd, dm, ds] => {
                let ra = format!("{rh}:{rm}:{rs}");
                let dec = format!("{dd}:{dm}:{ds}");
                let (ra, _) = parse_angle(&ra)?;
                let (dec, _) = parse_angle(&dec)?;
                SkyCoord::new(ra, dec)
            }
            other => Err(CoordParseError::ComponentCount(other.len())),
        }
    }

    /// Cut the string once at its first space and parse both halves independently.
    pub fn parse_split(input: &str) -> Result<Self, CoordParseError> {
        let (ra, dec) = input
            .trim()
            .split_once(' ')
            .ok_or(CoordParseError::NoSeparator)?;
        SkyCoord::from_components(ra, dec)
    }

    /// Build a coordinate from two separately supplied fields (e.g. two CSV columns).
    pub fn from_components(ra: &str, dec: &str) -> Result<Self, CoordParseError> {
        let (ra, _) = parse_angle(ra)?;
        let (dec, _) = parse_angle(dec)?;
        SkyCoord::new(ra, dec)
    }

    /// Unit vector pointing at this position on the celestial sphere.
    pub fn to_unit_vector(&self) -> Vector3<f64> {
        let (ra, dec) = (self.ra * RADEG, self.dec * RADEG);
        Vector3::new(dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin())
    }

    /// Angular distance to `other`, in degrees.
    pub fn separation(&self, other: &SkyCoord) -> Degree {
        let a = self.to_unit_vector();
        let b = other.to_unit_vector();
        a.cross(&b).norm().atan2(a.dot(&b)) / RADEG
    }

    /// Angular distance to `other`, in arcseconds.
    pub fn separation_arcsec(&self, other: &SkyCoord) -> ArcSec {
        deg_to_arcsec(self.separation(other))
    }
}

impl fmt::Display for SkyCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.ra, self.dec)
    }
}

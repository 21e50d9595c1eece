//! Checks on the raw fields of a search form, run before any remote call.
//!
//! Every rejection is a [`TesscopeError::InvalidInput`] carrying the corrective
//! message shown to the user.

use crate::{constants::Degree, tesscope_errors::TesscopeError};

pub const MSG_INVALID_SEARCH: &str = "Please provide a valid search input.";
pub const MSG_INVALID_RADIUS: &str = "Please provide a valid radius value like 0.5, 1 etc...";
pub const MSG_NON_POSITIVE_RADIUS: &str = "Please provide a positive radius value.";
pub const MSG_INVALID_SECTOR: &str = "Please provide a valid sector number.";

/// A validated single-target search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub search_input: String,
    pub radius: Degree,
    /// Keep only records of this window
    pub sector: Option<u32>,
}

impl SearchRequest {
    /// Validate the three form fields, in the order the form presents them.
    ///
    /// Arguments
    /// -----------------
    /// * `search_input`: target text; required.
    /// * `radius`: search radius in degrees, as typed; required.
    /// * `sector`: optional window filter; absent or blank means no filter.
    pub fn validate(
        search_input: Option<&str>,
        radius: Option<&str>,
        sector: Option<&str>,
    ) -> Result<Self, TesscopeError> {
        let search_input = search_input
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| TesscopeError::InvalidInput(MSG_INVALID_SEARCH.into()))?;

        let radius = parse_radius(radius.unwrap_or_default())?;

        let sector = match sector.map(str::trim).filter(|s| !s.is_empty()) {
            None => None,
            Some(text) => Some(
                text.parse::<u32>()
                    .map_err(|_| TesscopeError::InvalidInput(MSG_INVALID_SECTOR.into()))?,
            ),
        };

        Ok(SearchRequest {
            search_input: search_input.to_string(),
            radius,
            sector,
        })
    }
}

/// Parse a radius in degrees; it must be a finite, strictly positive number.
pub fn parse_radius(text: &str) -> Result<Degree, TesscopeError> {
    let radius: f64 = text
        .trim()
        .parse()
        .map_err(|_| TesscopeError::InvalidInput(MSG_INVALID_RADIUS.into()))?;
    check_radius(radius)
}

/// Reject a radius that is not finite and strictly positive.
pub fn check_radius(radius: Degree) -> Result<Degree, TesscopeError> {
    if !radius.is_finite() || radius <= 0.0 {
        return Err(TesscopeError::InvalidInput(MSG_NON_POSITIVE_RADIUS.into()));
    }
    Ok(radius)
}

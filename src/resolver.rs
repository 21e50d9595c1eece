//! # Identifier resolution
//!
//! Turns one free-form search string into a [`ResolvedTarget`]. The precedence is
//! strict and each step is driven by a typed result:
//!
//! 1. **Digits only** → TIC identifier. The catalog is asked for its position; an
//!    identifier with no catalog row fails with [`TesscopeError::UnresolvedCatalogId`].
//! 2. **Direct parse** of the whole string as one coordinate expression
//!    ([`SkyCoord::parse_direct`]).
//! 3. **Split parse** at the first space ([`SkyCoord::parse_split`]).
//! 4. Anything else is an **object name**. Its position is left to the footprint
//!    query, which resolves names through the same service.
//!
//! Only step 1 can fail; malformed coordinates fall through to the next step.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    catalog::CatalogService,
    constants::TIC_PREFIX,
    coordinates::{CoordParseError, SkyCoord},
    tesscope_errors::TesscopeError,
};

/// TESS Input Catalog identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TicId(pub u64);

impl TicId {
    /// Parse an identifier with or without its `TIC` prefix.
    ///
    /// `"141914082"`, `"TIC 141914082"`, `"tic141914082"` all give the same id.
    pub fn parse(input: &str) -> Result<Self, TesscopeError> {
        let trimmed = input.trim();
        let digits = match trimmed.get(..TIC_PREFIX.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(TIC_PREFIX) => {
                trimmed[TIC_PREFIX.len()..].trim()
            }
            _ => trimmed,
        };
        if !is_all_digits(digits) {
            return Err(TesscopeError::InvalidInput(format!(
                "not a TIC identifier: {input}"
            )));
        }
        digits
            .parse()
            .map(TicId)
            .map_err(|_| TesscopeError::UnresolvedCatalogId(input.to_string()))
    }

    /// The `"TIC <digits>"` form MAST expects. Idempotent with respect to [`TicId::parse`].
    pub fn query_string(&self) -> String {
        format!("{TIC_PREFIX} {}", self.0)
    }
}

impl fmt::Display for TicId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{TIC_PREFIX} {}", self.0)
    }
}

pub(crate) fn is_all_digits(input: &str) -> bool {
    !input.is_empty() && input.bytes().all(|b| b.is_ascii_digit())
}

/// How a search string was understood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TargetKind {
    Coordinate,
    CatalogId(TicId),
    Name(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedTarget {
    pub kind: TargetKind,
    /// Known position; set for every kind whenever it could be derived.
    pub coordinate: Option<SkyCoord>,
    pub display_name: String,
}

impl ResolvedTarget {
    pub fn from_coordinate(coord: SkyCoord) -> Self {
        ResolvedTarget {
            kind: TargetKind::Coordinate,
            coordinate: Some(coord),
            display_name: coord.to_string(),
        }
    }

    pub fn from_catalog_id(tic_id: TicId, coord: SkyCoord) -> Self {
        ResolvedTarget {
            kind: TargetKind::CatalogId(tic_id),
            coordinate: Some(coord),
            display_name: tic_id.to_string(),
        }
    }

    pub fn from_name(name: &str) -> Self {
        ResolvedTarget {
            kind: TargetKind::Name(name.to_string()),
            coordinate: None,
            display_name: name.to_string(),
        }
    }

    /// Attach a position discovered after resolution (e.g. by a name lookup).
    pub fn with_coordinate(mut self, coord: SkyCoord) -> Self {
        self.coordinate = Some(coord);
        self
    }

    pub fn tic_id(&self) -> Option<TicId> {
        match self.kind {
            TargetKind::CatalogId(id) => Some(id),
            _ => None,
        }
    }
}

/// Position of a TIC star, from the catalog.
pub async fn catalog_position<C: CatalogService>(
    catalog: &C,
    tic_id: &TicId,
) -> Result<SkyCoord, TesscopeError> {
    let rows = catalog.query_by_id(tic_id).await?;
    rows.iter()
        .find_map(|row| row.coordinate())
        .ok_or_else(|| TesscopeError::UnresolvedCatalogId(tic_id.0.to_string()))
}

/// Outcome of the coordinate steps of the precedence, without any remote call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum LocalParse {
    Digits(String),
    Coordinate(SkyCoord),
    Name {
        direct: CoordParseError,
        split: CoordParseError,
    },
}

pub(crate) fn parse_locally(input: &str) -> LocalParse {
    if is_all_digits(input) {
        return LocalParse::Digits(input.to_string());
    }
    let direct = match SkyCoord::parse_direct(input) {
        Ok(coord) => return LocalParse::Coordinate(coord),
        Err(err) => err,
    };
    let split = if input.contains(' ') {
        match SkyCoord::parse_split(input) {
            Ok(coord) => return LocalParse::Coordinate(coord),
            Err(err) => err,
        }
    } else {
        CoordParseError::NoSeparator
    };
    LocalParse::Name { direct, split }
}

/// Resolve a search string.
///
/// Arguments
/// -----------------
/// * `input`: the user-supplied search text.
/// * `catalog`: catalog used for the TIC identifier branch.
///
/// Return
/// ----------
/// * A [`ResolvedTarget`], [`TesscopeError::InvalidInput`] for an empty string, or
///   [`TesscopeError::UnresolvedCatalogId`] for an unknown TIC identifier.
pub async fn resolve<C: CatalogService>(
    input: &str,
    catalog: &C,
) -> Result<ResolvedTarget, TesscopeError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(TesscopeError::InvalidInput(
            "Please provide a valid search input.".into(),
        ));
    }

    match parse_locally(input) {
        LocalParse::Digits(digits) => {
            let tic_id = TicId::parse(&digits)?;
            let coord = catalog_position(catalog, &tic_id).await?;
            log::debug!("{input} resolved as {tic_id} at {coord}");
            Ok(ResolvedTarget::from_catalog_id(tic_id, coord))
        }
        LocalParse::Coordinate(coord) => Ok(ResolvedTarget::from_coordinate(coord)),
        LocalParse::Name { direct, split } => {
            log::debug!("{input:?} taken as an object name (direct: {direct}; split: {split})");
            Ok(ResolvedTarget::from_name(input))
        }
    }
}

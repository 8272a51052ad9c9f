// ==============================================================================
// identifiers.rs - Structured Identifier Decoding
// ==============================================================================
// Description: Decodes specimen, library and sequencing-run identifiers into
//              entity keys
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-16
// Version: 1.1.0
// ==============================================================================
// Formats:
//   Library:   <specimen>-<plate>-<index set>-<well>    e.g. R1234567-102-C-B07
//   Controls:  POS-<tag>-<plate>[-<index set>]           e.g. POS-CTRL-102-C
//              NEG-<tag>-<plate>[-<index set>]
//   Run:       YYMMDD_<instrument>_<...>                  e.g. 210115_M00325_0101_000000000-JGYTW
// ==============================================================================

use chrono::NaiveDate;
use thiserror::Error;

use crate::models::{Library, Platform, SequencingRun};

/// Well assigned to positive controls
pub const POSITIVE_CONTROL_WELL: &str = "G12";

/// Well assigned to negative controls
pub const NEGATIVE_CONTROL_WELL: &str = "H12";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum IdentifierError {
    #[error("Malformed identifier '{id}': {reason}")]
    MalformedIdentifier { id: String, reason: String },
}

impl IdentifierError {
    fn malformed(id: &str, reason: impl Into<String>) -> Self {
        IdentifierError::MalformedIdentifier {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

/// Control well markers found at the start of control library ids
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    Positive,
    Negative,
}

impl ControlKind {
    /// Detect a control marker at the start of `id`
    pub fn detect(id: &str) -> Option<Self> {
        if id.starts_with("POS") {
            Some(ControlKind::Positive)
        } else if id.starts_with("NEG") {
            Some(ControlKind::Negative)
        } else {
            None
        }
    }

    pub fn well(&self) -> &'static str {
        match self {
            ControlKind::Positive => POSITIVE_CONTROL_WELL,
            ControlKind::Negative => NEGATIVE_CONTROL_WELL,
        }
    }
}

/// Structured key decoded from a library identifier
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryKey {
    pub library_id: String,
    /// None for control libraries
    pub specimen_id: Option<String>,
    pub plate_id: String,
    pub index_set_id: Option<String>,
    pub well: String,
    pub plate_row: char,
    pub plate_col: u32,
    pub control: Option<ControlKind>,
}

impl LibraryKey {
    pub fn is_control(&self) -> bool {
        self.control.is_some()
    }

    pub fn into_library(self) -> Library {
        Library {
            id: self.library_id,
            specimen_id: self.specimen_id,
            plate_id: self.plate_id,
            index_set_id: self.index_set_id,
            well: self.well,
            plate_row: self.plate_row.to_string(),
            plate_col: self.plate_col,
        }
    }
}

/// Decode a library identifier into its specimen, plate, index set and well
///
/// # Rules
/// 1. Ids starting with `POS`/`NEG` are controls: no specimen, fixed well
///    (`G12`/`H12`), plate = 3rd dash token, index set = 4th token if present.
/// 2. Otherwise `<specimen>-<plate>-<index set>-<well>`.
/// 3. Row = first character of the well, column = its last two digits.
///
/// # Example
/// ```
/// use ncov_db::identifiers::decode_library_id;
///
/// let key = decode_library_id("R1234567-102-C-B07").unwrap();
/// assert_eq!(key.specimen_id.as_deref(), Some("R1234567"));
/// assert_eq!(key.plate_row, 'B');
/// assert_eq!(key.plate_col, 7);
/// ```
pub fn decode_library_id(id: &str) -> Result<LibraryKey, IdentifierError> {
    let tokens: Vec<&str> = id.split('-').collect();

    let control = ControlKind::detect(id);
    let (specimen_id, plate_id, index_set_id, well) = match control {
        Some(kind) => {
            if tokens.len() < 3 {
                return Err(IdentifierError::malformed(
                    id,
                    format!("control id needs at least 3 dash-delimited tokens, found {}", tokens.len()),
                ));
            }
            (
                None,
                tokens[2],
                tokens.get(3).map(|s| s.to_string()),
                kind.well(),
            )
        }
        None => {
            if tokens.len() < 4 {
                return Err(IdentifierError::malformed(
                    id,
                    format!("expected 4 dash-delimited tokens, found {}", tokens.len()),
                ));
            }
            if tokens[0].is_empty() {
                return Err(IdentifierError::malformed(id, "empty specimen id"));
            }
            (
                Some(tokens[0].to_string()),
                tokens[1],
                Some(tokens[2].to_string()),
                tokens[3],
            )
        }
    };

    let (plate_row, plate_col) = decode_well(id, well)?;

    Ok(LibraryKey {
        library_id: id.to_string(),
        specimen_id,
        plate_id: plate_id.to_string(),
        index_set_id,
        well: well.to_string(),
        plate_row,
        plate_col,
        control,
    })
}

/// Split a 3-character well label (`B07`) into row letter and column number
fn decode_well(id: &str, well: &str) -> Result<(char, u32), IdentifierError> {
    if well.len() != 3 || !well.is_ascii() {
        return Err(IdentifierError::malformed(
            id,
            format!("well '{}' is not <letter><2-digit column>", well),
        ));
    }

    let row = well.chars().next().unwrap_or_default();
    let digits = &well[1..];
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(IdentifierError::malformed(
            id,
            format!("well column '{}' is not numeric", digits),
        ));
    }
    let col = digits
        .parse::<u32>()
        .map_err(|e| IdentifierError::malformed(id, e.to_string()))?;

    Ok((row, col))
}

/// Specimen id carried by a library id
///
/// # Returns
/// * `Ok(None)` - control ids, which have no specimen
/// * `Err(MalformedIdentifier)` - the leading token is empty
pub fn decode_specimen_id(library_id: &str) -> Result<Option<String>, IdentifierError> {
    if ControlKind::detect(library_id).is_some() {
        return Ok(None);
    }
    match library_id.split('-').next() {
        Some(specimen_id) if !specimen_id.is_empty() => Ok(Some(specimen_id.to_string())),
        _ => Err(IdentifierError::malformed(library_id, "empty specimen id")),
    }
}

/// Decode a sequencing run id (`YYMMDD_<instrument>_...`)
///
/// Run date comes from the first 6 characters (`20YY-MM-DD`), the instrument
/// from the second underscore-delimited token. Instruments starting with `M`
/// are MiSeq, `V` NextSeq; any other prefix leaves the platform unset.
pub fn decode_run_id(run_id: &str) -> Result<SequencingRun, IdentifierError> {
    let mut tokens = run_id.split('_');
    let date_token = tokens.next().unwrap_or_default();
    let instrument_id = tokens
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| IdentifierError::malformed(run_id, "missing instrument token"))?;

    let run_date = decode_run_date(run_id, date_token)?;

    Ok(SequencingRun {
        id: run_id.to_string(),
        run_date,
        instrument_id: instrument_id.to_string(),
        platform: Platform::from_instrument_id(instrument_id),
    })
}

fn decode_run_date(run_id: &str, token: &str) -> Result<NaiveDate, IdentifierError> {
    if token.len() < 6 || !token.is_ascii() || !token[..6].bytes().all(|b| b.is_ascii_digit()) {
        return Err(IdentifierError::malformed(run_id, "run id must start with YYMMDD"));
    }

    // All three slices are ASCII digits, checked above
    let year: i32 = 2000 + token[0..2].parse::<i32>().unwrap_or_default();
    let month: u32 = token[2..4].parse().unwrap_or_default();
    let day: u32 = token[4..6].parse().unwrap_or_default();

    NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        IdentifierError::malformed(run_id, format!("'{}' is not a calendar date", &token[..6]))
    })
}

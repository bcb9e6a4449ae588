//! Optimization log parsing.
//!
//! This module extracts the final converged Cartesian geometry from a
//! geometry-optimization log. The log is only loosely structured, so parsing is
//! marker driven:
//!
//! 1. Find the first line containing the convergence marker
//!    (`OPTIMIZATION CONVERGED` by default).
//! 2. From there, find every geometry block header
//!    (`Standard Nuclear Orientation` by default).
//! 3. Skip the three-line preamble (header plus two separator lines) and read
//!    coordinate lines until the next blank line.
//! 4. Return the last block that produced at least one atom.
//!
//! # Log Format
//!
//! ```text
//!  **  OPTIMIZATION CONVERGED  **
//!
//!              Standard Nuclear Orientation (Angstroms)
//!     I     Atom           X                Y                Z
//!  ----------------------------------------------------------------
//!     1      C       0.0000000000     0.0000000000     0.0000000000
//!     2      O       0.0000000000     0.0000000000     1.1280000000
//!  ----------------------------------------------------------------
//!
//! ```
//!
//! Only lines with exactly five whitespace separated tokens
//! (index, label, x, y, z) are coordinate records. What happens to a record whose
//! coordinates do not parse is decided by the [`ParsePolicy`].

use crate::geometry::{AtomRecord, Geometry};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default convergence marker printed by the optimizer.
pub const CONVERGENCE_MARKER: &str = "OPTIMIZATION CONVERGED";
/// Default header of a geometry block.
pub const GEOMETRY_HEADER: &str = "Standard Nuclear Orientation";
/// Header line plus two separator lines precede the coordinate records.
const GEOMETRY_PREAMBLE_LINES: usize = 3;

/// Error type for log parsing operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// A required marker or block is absent from the log
    #[error("Not found: {0}")]
    NotFound(String),
    /// A numeric line could not be parsed under the strict policy
    #[error("Malformed line {line}: {reason}")]
    Malformed {
        /// 1-based line number in the parsed text
        line: usize,
        /// What was wrong with the line
        reason: String,
    },
}

/// Type alias for parse operation results
pub type Result<T> = std::result::Result<T, ParseError>;

/// How the parsers treat numeric lines that fail to parse.
///
/// `Lenient` drops the line and carries on, which shrinks the affected
/// structure by one row. `Strict` aborts with [`ParseError::Malformed`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParsePolicy {
    /// Skip malformed lines with a warning
    #[default]
    Lenient,
    /// Fail on the first malformed line
    Strict,
}

impl ParsePolicy {
    /// Applies the policy to a malformed line.
    ///
    /// Returns `Ok(())` when the line should be skipped and an error when the
    /// parse must stop. `line` is 1-based.
    pub fn reject(self, line: usize, reason: impl Into<String>) -> Result<()> {
        let reason = reason.into();
        match self {
            ParsePolicy::Lenient => {
                warn!("Skipping malformed line {}: {}", line, reason);
                Ok(())
            }
            ParsePolicy::Strict => Err(ParseError::Malformed { line, reason }),
        }
    }
}

impl FromStr for ParsePolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "lenient" => Ok(ParsePolicy::Lenient),
            "strict" => Ok(ParsePolicy::Strict),
            other => Err(format!(
                "Unknown parse policy '{}' (expected 'lenient' or 'strict')",
                other
            )),
        }
    }
}

impl fmt::Display for ParsePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsePolicy::Lenient => write!(f, "lenient"),
            ParsePolicy::Strict => write!(f, "strict"),
        }
    }
}

/// Text markers used to locate the converged geometry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryMarkers {
    /// Line fragment marking a converged optimization
    pub convergence: String,
    /// Line fragment marking the start of a geometry block
    pub header: String,
}

impl Default for GeometryMarkers {
    fn default() -> Self {
        Self {
            convergence: CONVERGENCE_MARKER.to_string(),
            header: GEOMETRY_HEADER.to_string(),
        }
    }
}

/// Options shared by the log parsers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOptions {
    /// Treatment of malformed numeric lines
    pub policy: ParsePolicy,
    /// Markers for the optimization log
    pub markers: GeometryMarkers,
}

impl ParseOptions {
    /// Default markers with the given policy.
    pub fn with_policy(policy: ParsePolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }
}

/// Extracts the final converged geometry from an optimization log.
///
/// # Arguments
///
/// * `content` - Entire text of the optimization log
/// * `options` - Markers and malformed-line policy
///
/// # Returns
///
/// The atoms of the last non-empty geometry block found after the convergence
/// marker, in file order.
///
/// # Errors
///
/// - [`ParseError::NotFound`] if the convergence marker is missing, or no
///   geometry block after it yields a coordinate record
/// - [`ParseError::Malformed`] under [`ParsePolicy::Strict`] when a five-token
///   record has non-numeric coordinates
///
/// # Examples
///
/// ```
/// use qmodes::parser::{extract_optimized_geometry, ParseOptions};
///
/// let log = "\
///  ** OPTIMIZATION CONVERGED **
///  Standard Nuclear Orientation (Angstroms)
///     I     Atom           X                Y                Z
///  ------------------------------------------------------------
///     1      H       0.000000     0.000000     0.000000
///     2      H       0.000000     0.000000     0.740000
///  ------------------------------------------------------------
///
/// ";
/// let geometry = extract_optimized_geometry(log, &ParseOptions::default()).unwrap();
/// assert_eq!(geometry.labels(), ["H", "H"]);
/// ```
pub fn extract_optimized_geometry(content: &str, options: &ParseOptions) -> Result<Geometry> {
    let markers = &options.markers;
    let lines: Vec<&str> = content.lines().collect();

    let start = lines
        .iter()
        .position(|line| line.contains(markers.convergence.as_str()))
        .ok_or_else(|| {
            ParseError::NotFound(format!("'{}' not found in log", markers.convergence))
        })?;
    debug!("Convergence marker found on line {}", start + 1);

    let mut last_block: Option<Vec<AtomRecord>> = None;
    let mut block_count = 0;
    let mut i = start;
    while i < lines.len() {
        if !lines[i].contains(markers.header.as_str()) {
            i += 1;
            continue;
        }

        let (records, end) =
            read_coordinate_block(&lines, i + GEOMETRY_PREAMBLE_LINES, options.policy)?;
        block_count += 1;
        debug!(
            "Geometry block {} at line {}: {} atoms",
            block_count,
            i + 1,
            records.len()
        );
        if !records.is_empty() {
            last_block = Some(records);
        }
        i = end.max(i + 1);
    }

    match last_block {
        Some(records) => Ok(Geometry::from_records(records)),
        None => Err(ParseError::NotFound(format!(
            "no valid '{}' block after '{}'",
            markers.header, markers.convergence
        ))),
    }
}

/// Reads coordinate records from `start` up to the next blank line.
///
/// Returns the records and the index of the line that ended the block.
fn read_coordinate_block(
    lines: &[&str],
    start: usize,
    policy: ParsePolicy,
) -> Result<(Vec<AtomRecord>, usize)> {
    let mut records = Vec::new();
    let mut j = start;
    while j < lines.len() {
        let line = lines[j];
        if line.trim().is_empty() {
            break;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() == 5 {
            match parse_triplet(&parts[2..5]) {
                Ok([x, y, z]) => records.push(AtomRecord::new(parts[1], x, y, z)),
                Err(reason) => policy.reject(j + 1, reason)?,
            }
        }
        j += 1;
    }
    Ok((records, j))
}

/// Parses three coordinate tokens.
pub(crate) fn parse_triplet(tokens: &[&str]) -> std::result::Result<[f64; 3], String> {
    let mut values = [0.0; 3];
    for (value, token) in values.iter_mut().zip(tokens) {
        *value = token
            .parse()
            .map_err(|_| format!("non-numeric coordinate '{}'", token))?;
    }
    Ok(values)
}

//! Frequency and normal-mode parsing for vibrational analysis logs.
//!
//! A frequency log carries two kinds of data that are scanned independently:
//!
//! - **Frequencies**: every line starting with `Frequency:` (case-insensitive)
//!   contributes its numeric tokens, in file order.
//! - **Displacement blocks**: a header of one or more `X Y Z` groups followed by
//!   exactly `natoms` lines of `label dx dy dz [dx dy dz ...]`. Each `X Y Z`
//!   group is one mode.
//!
//! ```text
//!  Frequency:      523.41     612.08     788.90
//!  ...
//!                X      Y      Z        X      Y      Z        X      Y      Z
//!  C         0.000  0.000  0.120    0.000  0.110  0.000   -0.050  0.000  0.000
//!  H         0.000  0.000 -0.600    0.000 -0.550  0.000    0.250  0.000  0.000
//! ```
//!
//! Block detection runs through [`BlockScanner`], a two-state machine that
//! alternates between seeking a header and collecting a block body. Atom labels
//! are read from the first block only and are assumed to hold for all later
//! blocks.
//!
//! The number of frequencies is not required to match the number of modes; the
//! difference is reported through [`ParsedModes::count_mismatch`].

use crate::parser::{ParsePolicy, Result};
use lazy_static::lazy_static;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};
use regex::Regex;
use serde::Serialize;
use std::fmt;

lazy_static! {
    // " Frequency:    523.41    612.08    788.90"
    static ref FREQUENCY_RE: Regex = Regex::new(r"(?i)^\s*Frequency:\s+(.+)$").unwrap();

    // "      X      Y      Z        X      Y      Z"
    static ref MODE_HEADER_RE: Regex = Regex::new(r"^\s*X\s+Y\s+Z(?:\s+X\s+Y\s+Z)*").unwrap();
}

/// Returns true if `line` opens a displacement block.
pub fn is_mode_header(line: &str) -> bool {
    MODE_HEADER_RE.is_match(line)
}

/// One body line of a displacement block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockLine<'a> {
    /// Zero-based line index in the scanned text
    pub index: usize,
    /// Raw line text
    pub text: &'a str,
}

/// A displacement block as located by the scanner, before numeric parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock<'a> {
    /// Zero-based index of the header line
    pub header_index: usize,
    /// Body lines following the header
    pub lines: Vec<BlockLine<'a>>,
}

impl<'a> RawBlock<'a> {
    fn new(header_index: usize) -> Self {
        Self {
            header_index,
            lines: Vec::new(),
        }
    }
}

/// State of the displacement-block scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanState<'a> {
    /// Looking for an `X Y Z` header line
    SeekingHeader,
    /// Collecting body lines of the current block
    InBlock {
        /// Block collected so far
        block: RawBlock<'a>,
        /// Body lines still to consume
        remaining: usize,
    },
}

/// Line scanner that splits a frequency log into displacement blocks.
///
/// Transitions:
///
/// - `SeekingHeader` + header line: start a block of `natoms` lines
///   (an empty block is emitted at once when `natoms == 0`)
/// - `SeekingHeader` + other line: ignored
/// - `InBlock` + any line: appended to the body; the block is emitted and the
///   scanner returns to `SeekingHeader` once `natoms` lines are collected
///
/// A body line is never checked for being a header. Running out of input while
/// in a block emits the short block from [`BlockScanner::finish`].
///
/// ```
/// use qmodes::modes::BlockScanner;
///
/// let mut scanner = BlockScanner::new(1);
/// assert!(scanner.feed(0, "   X   Y   Z").is_none());
/// let block = scanner.feed(1, " H  0.0 0.0 1.0").unwrap();
/// assert_eq!(block.lines.len(), 1);
/// assert!(scanner.is_seeking());
/// ```
#[derive(Debug, Clone)]
pub struct BlockScanner<'a> {
    natoms: usize,
    state: ScanState<'a>,
}

impl<'a> BlockScanner<'a> {
    /// Creates a scanner expecting `natoms` body lines per block.
    pub fn new(natoms: usize) -> Self {
        Self {
            natoms,
            state: ScanState::SeekingHeader,
        }
    }

    /// Current scanner state.
    pub fn state(&self) -> &ScanState<'a> {
        &self.state
    }

    /// Returns true while the scanner is looking for a header.
    pub fn is_seeking(&self) -> bool {
        matches!(self.state, ScanState::SeekingHeader)
    }

    /// Consumes one line and returns a block if this line completed one.
    pub fn feed(&mut self, index: usize, line: &'a str) -> Option<RawBlock<'a>> {
        match std::mem::replace(&mut self.state, ScanState::SeekingHeader) {
            ScanState::SeekingHeader => {
                if !is_mode_header(line) {
                    return None;
                }
                debug!("Displacement header on line {}", index + 1);
                let block = RawBlock::new(index);
                if self.natoms == 0 {
                    return Some(block);
                }
                self.state = ScanState::InBlock {
                    block,
                    remaining: self.natoms,
                };
                None
            }
            ScanState::InBlock {
                mut block,
                remaining,
            } => {
                block.lines.push(BlockLine { index, text: line });
                if remaining > 1 {
                    self.state = ScanState::InBlock {
                        block,
                        remaining: remaining - 1,
                    };
                    None
                } else {
                    Some(block)
                }
            }
        }
    }

    /// Ends the scan, returning a block that was cut short by end of input.
    pub fn finish(self) -> Option<RawBlock<'a>> {
        match self.state {
            ScanState::SeekingHeader => None,
            ScanState::InBlock { block, remaining } => {
                warn!(
                    "Displacement block at line {} is truncated: {} of {} atom lines missing",
                    block.header_index + 1,
                    remaining,
                    self.natoms
                );
                Some(block)
            }
        }
    }
}

/// Splits `content` into raw displacement blocks of `natoms` lines each.
pub fn scan_blocks(content: &str, natoms: usize) -> Vec<RawBlock<'_>> {
    let mut scanner = BlockScanner::new(natoms);
    let mut blocks: Vec<RawBlock<'_>> = content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| scanner.feed(index, line))
        .collect();
    blocks.extend(scanner.finish());
    blocks
}

/// Extracts every numeric token from `Frequency:` lines, in file order.
///
/// Non-numeric tokens are skipped.
///
/// ```
/// use qmodes::modes::parse_frequencies;
///
/// let freqs = parse_frequencies(" Frequency:   100.5   n/a   200.0\n FREQUENCY: 300\n");
/// assert_eq!(freqs, vec![100.5, 200.0, 300.0]);
/// ```
pub fn parse_frequencies(content: &str) -> Vec<f64> {
    content
        .lines()
        .filter_map(|line| FREQUENCY_RE.captures(line))
        .flat_map(|caps| {
            caps[1]
                .split_whitespace()
                .filter_map(|token| token.parse::<f64>().ok())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Atom labels taken from the first token of each non-blank line of a block.
pub fn block_labels(block: &RawBlock<'_>) -> Vec<String> {
    block
        .lines
        .iter()
        .filter_map(|line| line.text.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Builds the displacement matrices encoded in one block.
///
/// The mode count is the first line's numeric column count divided by three;
/// leftover columns are ignored. Each returned matrix has one row per accepted
/// body line and three columns. A body line whose numeric tokens do not all
/// parse, or that has fewer than `3 * modes` of them, is handed to `policy`; when
/// skipped it is missing from every mode of the block.
pub fn block_modes(block: &RawBlock<'_>, policy: ParsePolicy) -> Result<Vec<DMatrix<f64>>> {
    let Some(first) = block.lines.first() else {
        return Ok(Vec::new());
    };

    let numeric_columns = first.text.split_whitespace().count().saturating_sub(1);
    let mode_count = numeric_columns / 3;
    if numeric_columns % 3 != 0 {
        warn!(
            "Displacement block at line {} has {} numeric columns; ignoring the last {}",
            block.header_index + 1,
            numeric_columns,
            numeric_columns % 3
        );
    }

    let mut rows: Vec<Vec<f64>> = Vec::with_capacity(block.lines.len());
    for line in &block.lines {
        match parse_displacement_row(line.text, mode_count) {
            Ok(values) => rows.push(values),
            Err(reason) => policy.reject(line.index + 1, reason)?,
        }
    }

    Ok((0..mode_count)
        .map(|k| DMatrix::from_fn(rows.len(), 3, |r, c| rows[r][3 * k + c]))
        .collect())
}

fn parse_displacement_row(text: &str, mode_count: usize) -> std::result::Result<Vec<f64>, String> {
    let values = text
        .split_whitespace()
        .skip(1)
        .map(|token| {
            token
                .parse::<f64>()
                .map_err(|_| format!("non-numeric displacement '{}'", token))
        })
        .collect::<std::result::Result<Vec<f64>, String>>()?;

    if values.len() < 3 * mode_count {
        return Err(format!(
            "expected {} displacement values, found {}",
            3 * mode_count,
            values.len()
        ));
    }
    Ok(values)
}

/// Frequency and mode count disagreement, reported as a warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CountMismatch {
    /// Number of frequencies parsed
    pub frequencies: usize,
    /// Number of displacement matrices parsed
    pub modes: usize,
}

impl fmt::Display for CountMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Number of extracted frequencies ({}) does not equal number of mode blocks ({})",
            self.frequencies, self.modes
        )
    }
}

/// Raw result of parsing a frequency log.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedModes {
    /// Frequencies in file order
    pub frequencies: Vec<f64>,
    /// Displacement matrices, block-major and mode-minor within a block
    pub displacements: Vec<DMatrix<f64>>,
    /// Atom labels of the first displacement block
    pub atom_labels: Vec<String>,
}

impl ParsedModes {
    /// Returns the counts when frequencies and modes disagree.
    pub fn count_mismatch(&self) -> Option<CountMismatch> {
        (self.frequencies.len() != self.displacements.len()).then(|| CountMismatch {
            frequencies: self.frequencies.len(),
            modes: self.displacements.len(),
        })
    }

    /// Pairs displacements with frequencies by position.
    ///
    /// Modes beyond the last frequency get `None`; extra frequencies are dropped.
    pub fn into_mode_set(self) -> ModeSet {
        let mut frequencies = self.frequencies.into_iter();
        let modes = self
            .displacements
            .into_iter()
            .map(|displacement| Mode {
                frequency: frequencies.next(),
                displacement,
            })
            .collect();
        ModeSet {
            atom_labels: self.atom_labels,
            modes,
        }
    }
}

/// A vibrational normal mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Mode {
    /// Frequency in cm⁻¹ when one was parsed for this position
    pub frequency: Option<f64>,
    /// Per-atom displacement, `natoms x 3`
    pub displacement: DMatrix<f64>,
}

impl Mode {
    /// Displacement flattened atom by atom: `[dx1, dy1, dz1, dx2, ...]`.
    pub fn flattened(&self) -> DVector<f64> {
        let d = &self.displacement;
        DVector::from_fn(d.nrows() * 3, |i, _| d[(i / 3, i % 3)])
    }
}

/// Ordered modes sharing one atom-label ordering.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSet {
    /// Atom labels shared by every mode
    pub atom_labels: Vec<String>,
    /// Modes in file order
    pub modes: Vec<Mode>,
}

impl ModeSet {
    /// Number of modes.
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    /// Returns true when no mode was parsed.
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }
}

/// Parses frequencies, displacement matrices and atom labels from a frequency log.
///
/// # Arguments
///
/// * `content` - Entire text of the frequency log
/// * `natoms` - Number of body lines per displacement block
/// * `policy` - Treatment of malformed displacement lines
///
/// # Errors
///
/// Only [`crate::parser::ParseError::Malformed`] under [`ParsePolicy::Strict`].
/// Missing blocks, count mismatches and truncated blocks are not errors.
///
/// # Examples
///
/// ```
/// use qmodes::modes::parse_frequencies_and_modes;
/// use qmodes::parser::ParsePolicy;
///
/// let log = "\
///  Frequency:   1500.0
///               X      Y      Z
///  H        0.000  0.000  0.500
///  H        0.000  0.000 -0.500
/// ";
/// let parsed = parse_frequencies_and_modes(log, 2, ParsePolicy::Lenient).unwrap();
/// assert_eq!(parsed.frequencies, vec![1500.0]);
/// assert_eq!(parsed.atom_labels, ["H", "H"]);
/// assert_eq!(parsed.displacements[0][(1, 2)], -0.5);
/// ```
pub fn parse_frequencies_and_modes(
    content: &str,
    natoms: usize,
    policy: ParsePolicy,
) -> Result<ParsedModes> {
    let frequencies = parse_frequencies(content);
    let blocks = scan_blocks(content, natoms);
    debug!(
        "Found {} frequencies and {} displacement blocks",
        frequencies.len(),
        blocks.len()
    );

    let atom_labels = blocks.first().map(block_labels).unwrap_or_default();

    let mut displacements = Vec::new();
    for block in &blocks {
        displacements.extend(block_modes(block, policy)?);
    }

    let parsed = ParsedModes {
        frequencies,
        displacements,
        atom_labels,
    };
    if let Some(mismatch) = parsed.count_mismatch() {
        warn!("{}", mismatch);
    }
    Ok(parsed)
}

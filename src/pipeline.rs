//! End-to-end normal coordinate projection.
//!
//! The pipeline is linear and synchronous:
//!
//! 1. Extract the converged geometry from the optimization log
//! 2. Parse frequencies and modes with `natoms` equal to the geometry size
//! 3. Check atom label agreement (fatal on mismatch)
//! 4. Load the mass table
//! 5. Mass-weight the geometry
//! 6. Build the mode matrix
//! 7. Project
//! 8. Assemble the report
//!
//! Any error aborts the run before a report exists. A frequency/mode count
//! mismatch is only recorded on the report.

use crate::geometry::Geometry;
use crate::masses::{MassError, MassTable};
use crate::modes::{parse_frequencies_and_modes, CountMismatch};
use crate::parser::{extract_optimized_geometry, ParseError, ParseOptions};
use crate::projection::{build_mode_matrix, mass_weight, project, ProjectionError};
use crate::validation::{check_label_agreement, LabelMismatch};
use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for a pipeline run.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// An input log could not be read
    #[error("Failed to read {path:?}: {source}")]
    Read {
        /// Path of the unreadable file
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },
    /// Marker missing or strict-mode malformed line
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// Geometry and frequency logs list different atoms
    #[error(transparent)]
    LabelMismatch(#[from] LabelMismatch),
    /// Mass table could not be loaded
    #[error(transparent)]
    Masses(#[from] MassError),
    /// Mass-weighting or projection failed
    #[error(transparent)]
    Projection(#[from] ProjectionError),
}

type Result<T> = std::result::Result<T, PipelineError>;

/// Inputs of a projection run. Nothing here has a default path.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Geometry optimization log
    pub geometry_log: PathBuf,
    /// Frequency calculation log
    pub frequency_log: PathBuf,
    /// XML mass table
    pub mass_table: PathBuf,
    /// Parser markers and malformed-line policy
    pub parse: ParseOptions,
}

impl RunConfig {
    /// Creates a run over the three input files with default parse options.
    pub fn new(
        geometry_log: impl Into<PathBuf>,
        frequency_log: impl Into<PathBuf>,
        mass_table: impl Into<PathBuf>,
    ) -> Self {
        Self {
            geometry_log: geometry_log.into(),
            frequency_log: frequency_log.into(),
            mass_table: mass_table.into(),
            parse: ParseOptions::default(),
        }
    }

    /// Replaces the parse options.
    pub fn with_parse_options(mut self, parse: ParseOptions) -> Self {
        self.parse = parse;
        self
    }
}

/// Projected coordinate of one mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ModeCoordinate {
    /// 1-based mode index
    pub index: usize,
    /// Frequency in cm⁻¹, when the log provided one for this mode
    pub frequency: Option<f64>,
    /// Generalized coordinate Q
    pub q: f64,
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionReport {
    /// Converged geometry the projection was computed for
    pub geometry: Geometry,
    /// One entry per mode, in mode order
    pub coordinates: Vec<ModeCoordinate>,
    /// Set when frequency and mode counts differ
    pub frequency_mismatch: Option<CountMismatch>,
}

impl ProjectionReport {
    /// Q values in mode order.
    pub fn q_values(&self) -> Vec<f64> {
        self.coordinates.iter().map(|c| c.q).collect()
    }
}

/// Runs the full pipeline on the files named in `config`.
///
/// # Examples
///
/// ```no_run
/// use qmodes::pipeline::{run, RunConfig};
///
/// let config = RunConfig::new("opt.out", "freq.out", "data/atomic_masses.xml");
/// let report = run(&config)?;
/// for c in &report.coordinates {
///     println!("Mode {}: {:e}", c.index, c.q);
/// }
/// # Ok::<(), qmodes::pipeline::PipelineError>(())
/// ```
pub fn run(config: &RunConfig) -> Result<ProjectionReport> {
    let geometry_text = read_log(&config.geometry_log)?;
    let frequency_text = read_log(&config.frequency_log)?;
    project_logs(&geometry_text, &frequency_text, &config.parse, || {
        info!("Loading atomic masses from {}", config.mass_table.display());
        MassTable::load(&config.mass_table)
    })
}

/// Runs the pipeline on log text already in memory.
///
/// `load_masses` is only called once both logs parsed and their atom labels
/// agree.
pub fn project_logs<F>(
    geometry_text: &str,
    frequency_text: &str,
    options: &ParseOptions,
    load_masses: F,
) -> Result<ProjectionReport>
where
    F: FnOnce() -> std::result::Result<MassTable, MassError>,
{
    let geometry = extract_optimized_geometry(geometry_text, options)?;
    info!("Extracted converged geometry with {} atoms", geometry.num_atoms);

    let parsed = parse_frequencies_and_modes(frequency_text, geometry.num_atoms, options.policy)?;
    info!(
        "Parsed {} frequencies and {} normal modes",
        parsed.frequencies.len(),
        parsed.displacements.len()
    );
    let frequency_mismatch = parsed.count_mismatch();

    check_label_agreement(geometry.labels(), &parsed.atom_labels)?;

    let masses = load_masses()?;
    let weighted = mass_weight(&geometry, &masses)?;

    let modes = parsed.into_mode_set();
    if modes.is_empty() {
        warn!("No normal modes found in frequency log");
    }
    let mode_matrix = build_mode_matrix(&modes)?;
    let q = project(&weighted, &mode_matrix)?;

    let coordinates = modes
        .modes
        .iter()
        .zip(q.iter())
        .enumerate()
        .map(|(k, (mode, &q))| ModeCoordinate {
            index: k + 1,
            frequency: mode.frequency,
            q,
        })
        .collect();

    Ok(ProjectionReport {
        geometry,
        coordinates,
        frequency_mismatch,
    })
}

fn read_log(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|source| PipelineError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsePolicy;

    const H2_GEOMETRY: &str = "\
 ** OPTIMIZATION CONVERGED **
             Standard Nuclear Orientation (Angstroms)
    I     Atom           X                Y                Z
 ----------------------------------------------------------------
    1      H       0.0000000000     0.0000000000     0.0000000000
    2      H       0.0000000000     0.0000000000     1.0000000000
 ----------------------------------------------------------------

";

    const H2_FREQUENCIES: &str = "\
 Frequency:      4401.21
               X      Y      Z
 H         0.000  0.000  0.500
 H         0.000  0.000 -0.500
";

    fn hydrogen_masses() -> std::result::Result<MassTable, MassError> {
        MassTable::from_pairs([("H", 1.0)])
    }

    #[test]
    fn test_hydrogen_projection() {
        let report = project_logs(
            H2_GEOMETRY,
            H2_FREQUENCIES,
            &ParseOptions::default(),
            hydrogen_masses,
        )
        .unwrap();

        assert_eq!(report.coordinates.len(), 1);
        assert_eq!(report.coordinates[0].index, 1);
        assert_eq!(report.coordinates[0].frequency, Some(4401.21));
        assert!((report.coordinates[0].q + 0.5).abs() < 1e-12);
        assert!(report.frequency_mismatch.is_none());
    }

    #[test]
    fn test_label_mismatch_skips_mass_loading() {
        let frequencies = H2_FREQUENCIES.replacen(" H ", " D ", 1);
        let mut loaded = false;
        let result = project_logs(H2_GEOMETRY, &frequencies, &ParseOptions::default(), || {
            loaded = true;
            hydrogen_masses()
        });

        assert!(matches!(result, Err(PipelineError::LabelMismatch(_))));
        assert!(!loaded);
    }

    #[test]
    fn test_missing_mass() {
        let result = project_logs(H2_GEOMETRY, H2_FREQUENCIES, &ParseOptions::default(), || {
            MassTable::from_pairs([("He", 4.0)])
        });
        assert!(matches!(
            result,
            Err(PipelineError::Projection(ProjectionError::MissingMass { .. }))
        ));
    }

    #[test]
    fn test_lenient_row_loss_fails_projection() {
        let frequencies = H2_FREQUENCIES.replace("-0.500", "-0.5x0");
        let result = project_logs(
            H2_GEOMETRY,
            &frequencies,
            &ParseOptions::default(),
            hydrogen_masses,
        );
        assert!(matches!(
            result,
            Err(PipelineError::Projection(ProjectionError::ModeShape { .. }))
        ));

        let strict = project_logs(
            H2_GEOMETRY,
            &frequencies,
            &ParseOptions::with_policy(ParsePolicy::Strict),
            hydrogen_masses,
        );
        assert!(matches!(
            strict,
            Err(PipelineError::Parse(ParseError::Malformed { line: 4, .. }))
        ));
    }

    #[test]
    fn test_missing_geometry_log() {
        let config = RunConfig::new("no/such/opt.out", "no/such/freq.out", "no/such/masses.xml");
        assert!(matches!(run(&config), Err(PipelineError::Read { .. })));
    }
}

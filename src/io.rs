//! Text output for geometries, modes and projection reports.
//!
//! Everything here is formatting: functions build strings from already
//! computed values, and the `write_*` variants put those strings in a file.

use crate::geometry::Geometry;
use crate::modes::{CountMismatch, ParsedModes};
use crate::pipeline::{ModeCoordinate, ProjectionReport};
use crate::settings::OutputSettings;
use serde::Serialize;
use std::fmt::Write as _;
use std::fs;
use std::io::Result;
use std::path::Path;

/// Header line of a projection report.
pub const REPORT_HEADER: &str = "Mass-weighted normal coordinates (Q) for optimized geometry:";

/// Formats one report line per mode.
///
/// Each line shows the 1-based mode index, the frequency when known and Q in
/// scientific notation:
///
/// ```text
/// Mode   1:      4401.21 cm^-1  Q =    -5.000000e-01
/// Mode   2:          n/a        Q =     1.230000e-03
/// ```
pub fn format_report(report: &ProjectionReport, output: &OutputSettings) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "{}", REPORT_HEADER);
    for c in &report.coordinates {
        let frequency = match c.frequency {
            Some(f) => format!("{:>12.prec$} cm^-1", f, prec = output.frequency_precision),
            None => format!("{:>12}      ", "n/a"),
        };
        let _ = writeln!(
            text,
            "Mode {:>3}: {}  Q = {:>16}",
            c.index,
            frequency,
            format_scientific(c.q, output.q_precision)
        );
    }
    text
}

/// Scientific notation with a signed exponent of at least two digits.
///
/// ```
/// use qmodes::io::format_scientific;
///
/// assert_eq!(format_scientific(-0.5, 6), "-5.000000e-01");
/// assert_eq!(format_scientific(12345.0, 2), "1.23e+04");
/// ```
pub fn format_scientific(value: f64, precision: usize) -> String {
    let formatted = format!("{:.prec$e}", value, prec = precision);
    let Some((mantissa, exponent)) = formatted.split_once('e') else {
        return formatted;
    };
    match exponent.parse::<i32>() {
        Ok(exp) => format!(
            "{}e{}{:02}",
            mantissa,
            if exp < 0 { '-' } else { '+' },
            exp.abs()
        ),
        Err(_) => formatted,
    }
}

/// Writes [`format_report`] output to `path`.
pub fn write_report(report: &ProjectionReport, output: &OutputSettings, path: &Path) -> Result<()> {
    fs::write(path, format_report(report, output))
}

/// Serializable view of a [`ProjectionReport`].
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    /// Atom labels in geometry order
    pub atoms: &'a [String],
    /// Cartesian coordinates per atom
    pub coordinates: Vec<[f64; 3]>,
    /// Projected coordinate of every mode
    pub modes: &'a [ModeCoordinate],
    /// Frequency and mode count disagreement, if any
    pub frequency_mismatch: Option<CountMismatch>,
}

impl<'a> From<&'a ProjectionReport> for JsonReport<'a> {
    fn from(report: &'a ProjectionReport) -> Self {
        let geometry = &report.geometry;
        Self {
            atoms: geometry.labels(),
            coordinates: (0..geometry.num_atoms)
                .map(|i| geometry.get_atom_coords(i))
                .collect(),
            modes: &report.coordinates,
            frequency_mismatch: report.frequency_mismatch,
        }
    }
}

/// Writes the report as pretty-printed JSON.
pub fn write_report_json(report: &ProjectionReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(&JsonReport::from(report))?;
    fs::write(path, json)
}

/// Formats a geometry as `label x y z` lines with six decimals.
pub fn format_geometry(geom: &Geometry) -> String {
    let mut text = String::new();
    for record in geom.records() {
        let _ = writeln!(
            text,
            "{:<2}  {:>10.6}  {:>10.6}  {:>10.6}",
            record.label, record.x, record.y, record.z
        );
    }
    text
}

/// Writes a molecular geometry to an XYZ file.
///
/// The file holds the atom count, a comment line and one `label x y z` line per
/// atom.
pub fn write_xyz(geom: &Geometry, comment: &str, path: &Path) -> Result<()> {
    let mut content = format!("{}\n{}\n", geom.num_atoms, comment);
    for record in geom.records() {
        let _ = writeln!(
            content,
            "{}  {:.8}  {:.8}  {:.8}",
            record.label, record.x, record.y, record.z
        );
    }
    fs::write(path, content)
}

/// Formats every parsed mode with its frequency and per-atom displacements.
///
/// Modes are paired with frequencies by position and listing stops at the
/// shorter of the two sequences. Atoms beyond the label list are called
/// `Atom <n>`.
pub fn format_modes(parsed: &ParsedModes, output: &OutputSettings) -> String {
    let mut text = String::new();
    if let Some(mismatch) = parsed.count_mismatch() {
        let _ = writeln!(text, "Warning: {}.", mismatch);
    }
    for (k, (frequency, mode)) in parsed
        .frequencies
        .iter()
        .zip(&parsed.displacements)
        .enumerate()
    {
        let _ = writeln!(
            text,
            "Mode {}: Frequency = {:.prec$} cm^-1",
            k + 1,
            frequency,
            prec = output.frequency_precision
        );
        let _ = writeln!(text, "Displacement vectors for each atom:");
        for (i, row) in mode.row_iter().enumerate() {
            let label = parsed
                .atom_labels
                .get(i)
                .cloned()
                .unwrap_or_else(|| format!("Atom {}", i + 1));
            let _ = writeln!(
                text,
                "  {}: x = {:.4}, y = {:.4}, z = {:.4}",
                label,
                row[0],
                row[1],
                row[2]
            );
        }
        let _ = writeln!(text, "{}", "-".repeat(50));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::AtomRecord;
    use nalgebra::DMatrix;
    use tempfile::TempDir;

    fn water() -> Geometry {
        Geometry::from_records(vec![
            AtomRecord::new("O", 0.0, 0.0, 0.1173),
            AtomRecord::new("H", 0.0, 0.7572, -0.4692),
            AtomRecord::new("H", 0.0, -0.7572, -0.4692),
        ])
    }

    #[test]
    fn test_format_report() {
        let report = ProjectionReport {
            geometry: water(),
            coordinates: vec![
                ModeCoordinate {
                    index: 1,
                    frequency: Some(1648.5),
                    q: -0.5,
                },
                ModeCoordinate {
                    index: 2,
                    frequency: None,
                    q: 0.00123,
                },
            ],
            frequency_mismatch: None,
        };

        let text = format_report(&report, &OutputSettings::default());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], REPORT_HEADER);
        assert_eq!(lines[1], "Mode   1:      1648.50 cm^-1  Q =    -5.000000e-01");
        assert_eq!(lines[2], "Mode   2:          n/a        Q =     1.230000e-03");
        assert!(!lines[2].contains("cm^-1"));
    }

    #[test]
    fn test_format_scientific_exponent() {
        assert_eq!(format_scientific(-0.5, 6), "-5.000000e-01");
        assert_eq!(format_scientific(0.0, 3), "0.000e+00");
        assert_eq!(format_scientific(6.02e23, 2), "6.02e+23");
        assert_eq!(format_scientific(2.0e-120, 1), "2.0e-120");
        assert_eq!(format_scientific(f64::INFINITY, 6), "inf");
    }

    #[test]
    fn test_write_report_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.json");
        let report = ProjectionReport {
            geometry: water(),
            coordinates: vec![ModeCoordinate {
                index: 1,
                frequency: Some(1648.5),
                q: -0.5,
            }],
            frequency_mismatch: Some(CountMismatch {
                frequencies: 1,
                modes: 3,
            }),
        };
        write_report_json(&report, &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["atoms"][0], "O");
        assert_eq!(value["coordinates"][1][1], 0.7572);
        assert_eq!(value["modes"][0]["q"], -0.5);
        assert_eq!(value["modes"][0]["frequency"], 1648.5);
        assert_eq!(value["frequency_mismatch"]["modes"], 3);
    }

    #[test]
    fn test_format_geometry() {
        let text = format_geometry(&water());
        assert_eq!(
            text.lines().next().unwrap(),
            "O     0.000000    0.000000    0.117300"
        );
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_write_xyz() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("water.xyz");
        write_xyz(&water(), "final geometry", &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "3");
        assert_eq!(lines[1], "final geometry");
        assert_eq!(lines[2], "O  0.00000000  0.00000000  0.11730000");
    }

    #[test]
    fn test_format_modes() {
        let parsed = ParsedModes {
            frequencies: vec![1000.0],
            displacements: vec![
                DMatrix::from_row_slice(2, 3, &[0.0, 0.0, 0.5, 0.0, 0.0, -0.5]),
                DMatrix::from_row_slice(2, 3, &[1.0, 0.0, 0.0, -1.0, 0.0, 0.0]),
            ],
            atom_labels: vec!["H".to_string()],
        };

        let text = format_modes(&parsed, &OutputSettings::default());
        assert!(text.starts_with("Warning: Number of extracted frequencies (1)"));
        assert!(text.contains("Mode 1: Frequency = 1000.00 cm^-1"));
        assert!(text.contains("  H: x = 0.0000, y = 0.0000, z = 0.5000"));
        assert!(text.contains("  Atom 2: x = 0.0000, y = 0.0000, z = -0.5000"));
        assert!(!text.contains("Mode 2"));
    }
}

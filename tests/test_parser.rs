use qmodes::modes::{parse_frequencies_and_modes, scan_blocks};
use qmodes::parser::{extract_optimized_geometry, ParseError, ParseOptions, ParsePolicy};
use std::fs;
use tempfile::TempDir;

const OPTIMIZATION_LOG: &str = "\
 Optimization Cycle:   1
             Standard Nuclear Orientation (Angstroms)
    I     Atom           X                Y                Z
 ----------------------------------------------------------------
    1      O       0.0000000000     0.0000000000     0.1300000000
    2      H       0.0000000000     0.7700000000    -0.4800000000
    3      H       0.0000000000    -0.7700000000    -0.4800000000
 ----------------------------------------------------------------

 Optimization Cycle:   2
 **  OPTIMIZATION CONVERGED  **
 Coordinates (Angstroms)
             Standard Nuclear Orientation (Angstroms)
    I     Atom           X                Y                Z
 ----------------------------------------------------------------
    1      O       0.0000000000     0.0000000000     0.1173000000
    2      H       0.0000000000     0.7572000000    -0.4692000000
    3      H       0.0000000000    -0.7572000000    -0.4692000000
 ----------------------------------------------------------------

 Final energy is     -76.026760737428
";

const FREQUENCY_LOG: &str = "\
 **                       VIBRATIONAL ANALYSIS                       **
 Mode:                 1                      2                      3
 Frequency:      1648.52                3832.17                3932.81
 Force Cnst:      1.6215                 8.5724                 9.1234
               X      Y      Z        X      Y      Z        X      Y      Z
 O         0.000  0.000  0.070    0.000  0.000 -0.049    0.000  0.069  0.000
 H         0.000  0.431 -0.557    0.000  0.583  0.396    0.000 -0.549  0.434
 H         0.000 -0.431 -0.557    0.000 -0.583  0.396    0.000 -0.549 -0.434
 TransDip   0.000  0.000  0.067   0.000  0.000 -0.009    0.000  0.062  0.000
";

#[test]
fn test_geometry_from_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("water_opt.out");
    fs::write(&path, OPTIMIZATION_LOG).unwrap();

    let content = fs::read_to_string(&path).unwrap();
    let geometry = extract_optimized_geometry(&content, &ParseOptions::default()).unwrap();

    assert_eq!(geometry.labels(), ["O", "H", "H"]);
    assert_eq!(geometry.get_atom_coords(0), [0.0, 0.0, 0.1173]);
    assert_eq!(geometry.get_atom_coords(2), [0.0, -0.7572, -0.4692]);
}

#[test]
fn test_unconverged_log() {
    let content = OPTIMIZATION_LOG.replace("OPTIMIZATION CONVERGED", "MAX CYCLES REACHED");
    let result = extract_optimized_geometry(&content, &ParseOptions::default());
    assert!(matches!(result, Err(ParseError::NotFound(_))));
}

#[test]
fn test_strict_geometry_reports_line() {
    let content = OPTIMIZATION_LOG.replace("-0.7572000000", "-0.75x2000000");
    let lenient = extract_optimized_geometry(&content, &ParseOptions::default()).unwrap();
    assert_eq!(lenient.labels(), ["O", "H"]);

    let strict =
        extract_optimized_geometry(&content, &ParseOptions::with_policy(ParsePolicy::Strict));
    assert_eq!(
        strict.unwrap_err(),
        ParseError::Malformed {
            line: 18,
            reason: "non-numeric coordinate '-0.75x2000000'".to_string(),
        }
    );
}

#[test]
fn test_three_mode_block() {
    let parsed = parse_frequencies_and_modes(FREQUENCY_LOG, 3, ParsePolicy::Lenient).unwrap();

    assert_eq!(parsed.frequencies, vec![1648.52, 3832.17, 3932.81]);
    assert_eq!(parsed.atom_labels, ["O", "H", "H"]);
    assert_eq!(parsed.displacements.len(), 3);
    for matrix in &parsed.displacements {
        assert_eq!(matrix.shape(), (3, 3));
    }
    assert_eq!(parsed.displacements[1][(1, 1)], 0.583);
    assert_eq!(parsed.displacements[2][(2, 2)], -0.434);
    assert!(parsed.count_mismatch().is_none());
}

#[test]
fn test_block_stops_after_natoms_lines() {
    let blocks = scan_blocks(FREQUENCY_LOG, 3);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].lines.len(), 3);
    assert!(blocks[0]
        .lines
        .iter()
        .all(|line| !line.text.contains("TransDip")));
}

#[test]
fn test_malformed_row_drops_one_row() {
    let content = FREQUENCY_LOG.replacen("0.431 -0.557", "0.4?1 -0.557", 1);

    let parsed = parse_frequencies_and_modes(&content, 3, ParsePolicy::Lenient).unwrap();
    assert_eq!(parsed.displacements.len(), 3);
    for matrix in &parsed.displacements {
        assert_eq!(matrix.nrows(), 2);
    }
    assert_eq!(parsed.atom_labels, ["O", "H", "H"]);

    let strict = parse_frequencies_and_modes(&content, 3, ParsePolicy::Strict);
    assert!(matches!(strict, Err(ParseError::Malformed { line: 7, .. })));
}

#[test]
fn test_frequency_count_mismatch() {
    let content = FREQUENCY_LOG.replace("3932.81", "");
    let parsed = parse_frequencies_and_modes(&content, 3, ParsePolicy::Lenient).unwrap();

    let mismatch = parsed.count_mismatch().unwrap();
    assert_eq!(mismatch.frequencies, 2);
    assert_eq!(mismatch.modes, 3);

    let set = parsed.into_mode_set();
    assert_eq!(set.modes[2].frequency, None);
}

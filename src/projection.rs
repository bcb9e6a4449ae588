//! Projection of a Cartesian geometry onto a normal-mode basis.
//!
//! The generalized coordinate of mode *k* is
//!
//! ```text
//! Q_k = Σ_i  L_ik · √m_a(i) · r_i
//! ```
//!
//! where `r` is the flattened Cartesian geometry, `m_a(i)` the mass of the atom
//! owning component `i`, and `L` the `3N x M` matrix whose columns are the
//! flattened mode displacements. In matrix form `Q = Lᵀ · (M^½ r)`.
//!
//! The basis is used as given: no normalization, orthogonality or rank check
//! is performed on `L`.

use crate::geometry::Geometry;
use crate::masses::MassTable;
use crate::modes::ModeSet;
use nalgebra::{DMatrix, DVector};
use thiserror::Error;

/// Error type for projection operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProjectionError {
    /// An atom label has no entry in the mass table
    #[error("No atomic mass for '{label}' (atom {atom})")]
    MissingMass {
        /// Label without a mass
        label: String,
        /// 1-based atom position in the geometry
        atom: usize,
    },
    /// A mode's flattened displacement does not span all atoms
    #[error("Mode {mode} has {found} displacement components, expected {expected}")]
    ModeShape {
        /// 1-based mode index
        mode: usize,
        /// Expected component count (3 x atoms)
        expected: usize,
        /// Actual component count
        found: usize,
    },
    /// Vector and mode matrix dimensions disagree
    #[error("Mass-weighted vector has {found} components but the mode matrix has {expected} rows")]
    VectorLength {
        /// Row count of the mode matrix
        expected: usize,
        /// Length of the vector
        found: usize,
    },
}

type Result<T> = std::result::Result<T, ProjectionError>;

/// Scales each atom's coordinates by the square root of its mass.
///
/// # Errors
///
/// [`ProjectionError::MissingMass`] for the first atom whose label is not in
/// `masses`.
///
/// # Examples
///
/// ```
/// use qmodes::geometry::Geometry;
/// use qmodes::masses::MassTable;
/// use qmodes::projection::mass_weight;
///
/// let geometry = Geometry::new(vec!["He".to_string()], vec![1.0, 2.0, 3.0]);
/// let masses = MassTable::from_pairs([("He", 4.0)]).unwrap();
/// let weighted = mass_weight(&geometry, &masses).unwrap();
/// assert_eq!(weighted.as_slice(), &[2.0, 4.0, 6.0]);
/// ```
pub fn mass_weight(geometry: &Geometry, masses: &MassTable) -> Result<DVector<f64>> {
    let mut weighted = geometry.coords.clone();
    for (i, label) in geometry.elements.iter().enumerate() {
        let mass = masses.get(label).ok_or_else(|| ProjectionError::MissingMass {
            label: label.clone(),
            atom: i + 1,
        })?;
        let sqrt_m = mass.sqrt();
        for c in 0..3 {
            weighted[3 * i + c] *= sqrt_m;
        }
    }
    Ok(weighted)
}

/// Stacks the flattened mode displacements as columns of a `3N x M` matrix.
///
/// `N` is the number of atom labels in `modes`.
///
/// # Errors
///
/// [`ProjectionError::ModeShape`] when a mode lost rows to lenient parsing or
/// otherwise does not cover `N` atoms.
pub fn build_mode_matrix(modes: &ModeSet) -> Result<DMatrix<f64>> {
    let rows = 3 * modes.atom_labels.len();
    let mut matrix = DMatrix::zeros(rows, modes.len());
    for (k, mode) in modes.modes.iter().enumerate() {
        let column = mode.flattened();
        if column.len() != rows {
            return Err(ProjectionError::ModeShape {
                mode: k + 1,
                expected: rows,
                found: column.len(),
            });
        }
        matrix.set_column(k, &column);
    }
    Ok(matrix)
}

/// Computes `Q = modeMatrixᵀ · weighted`.
///
/// # Errors
///
/// [`ProjectionError::VectorLength`] when the vector length differs from the
/// matrix row count.
pub fn project(weighted: &DVector<f64>, mode_matrix: &DMatrix<f64>) -> Result<DVector<f64>> {
    if weighted.len() != mode_matrix.nrows() {
        return Err(ProjectionError::VectorLength {
            expected: mode_matrix.nrows(),
            found: weighted.len(),
        });
    }
    Ok(mode_matrix.tr_mul(weighted))
}

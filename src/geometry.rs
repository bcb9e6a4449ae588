//! Molecular geometry data structures.
//!
//! This module provides the Cartesian representation shared by the log parsers
//! and the normal-mode projector:
//!
//! - [`AtomRecord`]: A single `(label, x, y, z)` tuple as it appears in a log
//! - [`Geometry`]: An ordered sequence of atoms with flattened coordinates
//!
//! Atom order is significant. It is preserved from the log text through
//! mass-weighting and projection, and is what the label agreement check
//! compares against the frequency calculation.

use nalgebra::DVector;

/// One atom of a parsed geometry block.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomRecord {
    /// Atomic symbol as printed in the log (e.g. "C", "H")
    pub label: String,
    /// Cartesian x coordinate
    pub x: f64,
    /// Cartesian y coordinate
    pub y: f64,
    /// Cartesian z coordinate
    pub z: f64,
}

impl AtomRecord {
    /// Creates a record from a label and three coordinates.
    pub fn new(label: impl Into<String>, x: f64, y: f64, z: f64) -> Self {
        Self {
            label: label.into(),
            x,
            y,
            z,
        }
    }
}

/// Represents a molecular geometry with atomic labels and Cartesian coordinates.
///
/// Coordinates are stored flat, in the order `[x1, y1, z1, x2, y2, z2, ...]`, so
/// the geometry can be handed to nalgebra routines without reshaping. No unit
/// conversion is applied; values keep whatever unit the source log used.
///
/// # Examples
///
/// ```
/// use qmodes::geometry::Geometry;
///
/// let elements = vec!["O".to_string(), "H".to_string(), "H".to_string()];
/// let coords = vec![
///     0.0, 0.0, 0.0,
///     0.757, 0.586, 0.0,
///     -0.757, 0.586, 0.0,
/// ];
///
/// let geometry = Geometry::new(elements, coords);
/// assert_eq!(geometry.num_atoms, 3);
/// assert_eq!(geometry.get_atom_coords(1), [0.757, 0.586, 0.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    /// Atomic labels for each atom in order
    pub elements: Vec<String>,
    /// Flattened Cartesian coordinates [x1, y1, z1, x2, y2, z2, ...]
    pub coords: DVector<f64>,
    /// Number of atoms in the molecule
    pub num_atoms: usize,
}

impl Geometry {
    /// Create a new `Geometry` from a label list and a flat coordinate vector.
    ///
    /// # Panics
    ///
    /// Panics if `coords.len() != elements.len() * 3`.
    pub fn new(elements: Vec<String>, coords: Vec<f64>) -> Self {
        let num_atoms = elements.len();
        assert_eq!(coords.len(), num_atoms * 3);
        Self {
            elements,
            coords: DVector::from_vec(coords),
            num_atoms,
        }
    }

    /// Builds a geometry from parsed atom records, keeping their order.
    ///
    /// ```
    /// use qmodes::geometry::{AtomRecord, Geometry};
    ///
    /// let geometry = Geometry::from_records(vec![
    ///     AtomRecord::new("H", 0.0, 0.0, 0.0),
    ///     AtomRecord::new("H", 0.0, 0.0, 0.74),
    /// ]);
    /// assert_eq!(geometry.labels(), ["H", "H"]);
    /// ```
    pub fn from_records(records: Vec<AtomRecord>) -> Self {
        let mut elements = Vec::with_capacity(records.len());
        let mut coords = Vec::with_capacity(records.len() * 3);
        for record in records {
            coords.extend_from_slice(&[record.x, record.y, record.z]);
            elements.push(record.label);
        }
        Self::new(elements, coords)
    }

    /// Get the Cartesian coordinates of a specific atom (zero-based index).
    pub fn get_atom_coords(&self, atom_idx: usize) -> [f64; 3] {
        let i = atom_idx * 3;
        [self.coords[i], self.coords[i + 1], self.coords[i + 2]]
    }

    /// Atom labels in geometry order.
    pub fn labels(&self) -> &[String] {
        &self.elements
    }

    /// Returns true when the geometry holds no atoms.
    pub fn is_empty(&self) -> bool {
        self.num_atoms == 0
    }

    /// Iterates over the atoms as owned records, in order.
    pub fn records(&self) -> impl Iterator<Item = AtomRecord> + '_ {
        (0..self.num_atoms).map(move |i| {
            let [x, y, z] = self.get_atom_coords(i);
            AtomRecord::new(self.elements[i].clone(), x, y, z)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_records_preserves_order() {
        let geometry = Geometry::from_records(vec![
            AtomRecord::new("C", 1.0, 2.0, 3.0),
            AtomRecord::new("H", 4.0, 5.0, 6.0),
            AtomRecord::new("O", 7.0, 8.0, 9.0),
        ]);

        assert_eq!(geometry.num_atoms, 3);
        assert_eq!(geometry.labels(), ["C", "H", "O"]);
        assert_eq!(
            geometry.coords.as_slice(),
            &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]
        );
    }

    #[test]
    fn test_records_round_trip() {
        let records = vec![
            AtomRecord::new("N", -0.5, 0.25, 1.0),
            AtomRecord::new("H", 0.0, 0.0, 2.0),
        ];
        let geometry = Geometry::from_records(records.clone());
        let back: Vec<AtomRecord> = geometry.records().collect();
        assert_eq!(back, records);
    }

    #[test]
    fn test_empty_geometry() {
        let geometry = Geometry::from_records(Vec::new());
        assert!(geometry.is_empty());
        assert_eq!(geometry.coords.len(), 0);
    }

    #[test]
    #[should_panic]
    fn test_new_rejects_inconsistent_lengths() {
        Geometry::new(vec!["H".to_string()], vec![0.0, 0.0]);
    }
}

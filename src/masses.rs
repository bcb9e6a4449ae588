//! Atomic mass table loaded from an XML resource.
//!
//! The resource is a flat XML document whose root children are tagged by
//! atomic symbol and hold the mass as text:
//!
//! ```xml
//! <atomicMasses>
//!   <H>1.00794</H>
//!   <C>12.0107</C>
//!   <O>15.9994</O>
//! </atomicMasses>
//! ```
//!
//! Children without text are ignored. A later entry for the same symbol
//! replaces an earlier one. Lookups never fall back to a default mass.

use log::{debug, warn};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Error type for mass table loading.
#[derive(Error, Debug)]
pub enum MassError {
    /// The resource could not be read
    #[error("IO error reading mass table: {0}")]
    Io(#[from] std::io::Error),
    /// The resource is not well-formed XML
    #[error("Malformed mass table: {0}")]
    Xml(#[from] roxmltree::Error),
    /// An entry's text is not a number
    #[error("Invalid mass for '{symbol}': '{value}'")]
    InvalidValue {
        /// Atomic symbol of the entry
        symbol: String,
        /// Offending text
        value: String,
    },
    /// An entry is zero, negative or not finite
    #[error("Mass for '{symbol}' must be positive, got {mass}")]
    NonPositive {
        /// Atomic symbol of the entry
        symbol: String,
        /// Offending mass
        mass: f64,
    },
}

type Result<T> = std::result::Result<T, MassError>;

/// Mapping from atomic symbol to mass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MassTable {
    masses: HashMap<String, f64>,
}

impl MassTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads a table from an XML file.
    ///
    /// # Errors
    ///
    /// Returns [`MassError::Io`] if the file cannot be read, and the errors of
    /// [`MassTable::from_xml`] otherwise.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let table = Self::from_xml(&content)?;
        debug!(
            "Loaded {} atomic masses from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Parses a table from XML text.
    ///
    /// ```
    /// use qmodes::masses::MassTable;
    ///
    /// let table = MassTable::from_xml("<masses><H> 1.008 </H><Ghost/></masses>").unwrap();
    /// assert_eq!(table.get("H"), Some(1.008));
    /// assert_eq!(table.get("Ghost"), None);
    /// ```
    pub fn from_xml(content: &str) -> Result<Self> {
        let document = roxmltree::Document::parse(content)?;
        let mut table = Self::new();
        for node in document.root_element().children().filter(|n| n.is_element()) {
            let Some(text) = node.text() else {
                continue;
            };
            let symbol = node.tag_name().name().trim();
            let value = text.trim();
            let mass: f64 = value.parse().map_err(|_| MassError::InvalidValue {
                symbol: symbol.to_string(),
                value: value.to_string(),
            })?;
            table.insert(symbol, mass)?;
        }
        Ok(table)
    }

    /// Builds a table from `(symbol, mass)` pairs.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut table = Self::new();
        for (symbol, mass) in pairs {
            table.insert(symbol, mass)?;
        }
        Ok(table)
    }

    /// Adds or replaces the mass for `symbol`.
    ///
    /// # Errors
    ///
    /// [`MassError::NonPositive`] when `mass` is not a finite positive number.
    pub fn insert(&mut self, symbol: impl Into<String>, mass: f64) -> Result<()> {
        let symbol = symbol.into();
        if !(mass.is_finite() && mass > 0.0) {
            return Err(MassError::NonPositive { symbol, mass });
        }
        if let Some(previous) = self.masses.insert(symbol.clone(), mass) {
            warn!(
                "Duplicate mass entry for '{}': {} replaced by {}",
                symbol, previous, mass
            );
        }
        Ok(())
    }

    /// Mass of `symbol`, if present.
    pub fn get(&self, symbol: &str) -> Option<f64> {
        self.masses.get(symbol).copied()
    }

    /// Returns true if `symbol` has a mass.
    pub fn contains(&self, symbol: &str) -> bool {
        self.masses.contains_key(symbol)
    }

    /// Number of symbols in the table.
    pub fn len(&self) -> usize {
        self.masses.len()
    }

    /// Returns true when the table holds no symbols.
    pub fn is_empty(&self) -> bool {
        self.masses.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_table() {
        let table = MassTable::from_xml(
            r#"<?xml version="1.0"?>
<atomicMasses>
  <H>1.00794</H>
  <C>12.0107</C>
  <!-- comment -->
  <O>
    15.9994
  </O>
</atomicMasses>"#,
        )
        .unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.get("C"), Some(12.0107));
        assert_eq!(table.get("O"), Some(15.9994));
        assert!(!table.contains("N"));
    }

    #[test]
    fn test_malformed_xml() {
        let result = MassTable::from_xml("<masses><H>1.0</masses>");
        assert!(matches!(result, Err(MassError::Xml(_))));
    }

    #[test]
    fn test_non_numeric_value() {
        let result = MassTable::from_xml("<masses><H>light</H></masses>");
        match result {
            Err(MassError::InvalidValue { symbol, value }) => {
                assert_eq!(symbol, "H");
                assert_eq!(value, "light");
            }
            other => panic!("Expected InvalidValue, got {:?}", other),
        }
    }

    #[test]
    fn test_non_positive_mass() {
        let result = MassTable::from_xml("<masses><X>-1.0</X></masses>");
        assert!(matches!(result, Err(MassError::NonPositive { .. })));
        assert!(MassTable::from_pairs([("H", 0.0)]).is_err());
    }

    #[test]
    fn test_duplicate_symbol_last_wins() {
        let table = MassTable::from_xml("<m><H>1.0</H><H>2.0</H></m>").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("H"), Some(2.0));
    }

    #[test]
    fn test_missing_file() {
        let result = MassTable::load(Path::new("definitely/not/here.xml"));
        assert!(matches!(result, Err(MassError::Io(_))));
    }
}

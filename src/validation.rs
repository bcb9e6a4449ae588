//! Cross-source consistency checks.
//!
//! The geometry and the normal modes come from two independently parsed logs.
//! Before any numeric work the atom labels of both must agree element for
//! element, in order.

use std::fmt;

/// Atom labels of the geometry and frequency logs disagree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelMismatch {
    /// 1-based position of the first disagreement
    pub atom: usize,
    /// Labels from the optimization log
    pub geometry_labels: Vec<String>,
    /// Labels from the first displacement block
    pub mode_labels: Vec<String>,
}

impl fmt::Display for LabelMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let describe = |labels: &[String]| {
            labels
                .get(self.atom - 1)
                .map(|l| format!("'{}'", l))
                .unwrap_or_else(|| "nothing".to_string())
        };
        write!(
            f,
            "Atom label mismatch between geometry ({} atoms) and frequency file ({} atoms): atom {} is {} vs {}",
            self.geometry_labels.len(),
            self.mode_labels.len(),
            self.atom,
            describe(&self.geometry_labels),
            describe(&self.mode_labels)
        )
    }
}

impl std::error::Error for LabelMismatch {}

/// Checks that both label sequences are identical.
///
/// # Examples
///
/// ```
/// use qmodes::validation::check_label_agreement;
///
/// let geometry = vec!["C".to_string(), "H".to_string()];
/// let modes = vec!["H".to_string(), "C".to_string()];
/// let err = check_label_agreement(&geometry, &modes).unwrap_err();
/// assert_eq!(err.atom, 1);
/// ```
pub fn check_label_agreement(
    geometry_labels: &[String],
    mode_labels: &[String],
) -> Result<(), LabelMismatch> {
    if geometry_labels == mode_labels {
        return Ok(());
    }

    let atom = geometry_labels
        .iter()
        .zip(mode_labels)
        .position(|(a, b)| a != b)
        .unwrap_or_else(|| geometry_labels.len().min(mode_labels.len()))
        + 1;

    Err(LabelMismatch {
        atom,
        geometry_labels: geometry_labels.to_vec(),
        mode_labels: mode_labels.to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_identical_labels() {
        assert!(check_label_agreement(&labels(&["C", "H", "H"]), &labels(&["C", "H", "H"])).is_ok());
        assert!(check_label_agreement(&[], &[]).is_ok());
    }

    #[test]
    fn test_swapped_labels() {
        let err = check_label_agreement(&labels(&["C", "H"]), &labels(&["H", "C"])).unwrap_err();
        assert_eq!(err.atom, 1);
        assert!(err.to_string().contains("atom 1 is 'C' vs 'H'"));
    }

    #[test]
    fn test_different_lengths() {
        let err = check_label_agreement(&labels(&["C", "H", "H"]), &labels(&["C", "H"])).unwrap_err();
        assert_eq!(err.atom, 3);
        assert!(err.to_string().contains("'H' vs nothing"));
    }

    #[test]
    fn test_no_mode_labels() {
        let err = check_label_agreement(&labels(&["O"]), &[]).unwrap_err();
        assert_eq!(err.atom, 1);
    }
}

#![deny(missing_docs)]

//! QModes - Normal Coordinate Projection for Quantum Chemistry Logs
//!
//! QModes reads the converged geometry of a geometry optimization and the
//! normal modes of a frequency calculation, both from plain-text program logs,
//! and projects the mass-weighted geometry onto the normal-mode basis. The
//! result is one generalized coordinate Q per vibrational mode.
//!
//! # Algorithm
//!
//! For a geometry `r` (flattened, `3N` components), atomic masses `m` and the
//! `3N x M` matrix `L` of flattened mode displacements:
//!
//! ```text
//! Q = Lᵀ · (M^½ r)        (M^½)_ii = √m_atom(i)
//! ```
//!
//! The atom labels of both logs must agree, in order, before any numeric work
//! starts.
//!
//! # Quick Start
//!
//! ```no_run
//! use qmodes::pipeline::{run, RunConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = RunConfig::new("opt.out", "freq.out", "data/atomic_masses.xml");
//!     let report = run(&config)?;
//!     for c in &report.coordinates {
//!         println!("Mode {:3}: {:.6e}", c.index, c.q);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Malformed Input
//!
//! Numeric lines that fail to parse are skipped by default
//! ([`parser::ParsePolicy::Lenient`]); [`parser::ParsePolicy::Strict`] turns
//! them into errors. Missing markers, mismatched atom labels, missing masses and
//! a malformed mass table are always fatal.
//!
//! # Modules
//!
//! - [`geometry`] - Atom records and Cartesian geometries
//! - [`parser`] - Converged geometry extraction from optimization logs
//! - [`modes`] - Frequency and displacement-block parsing
//! - [`masses`] - Atomic mass table
//! - [`projection`] - Mass-weighting and normal-mode projection
//! - [`validation`] - Atom label agreement between logs
//! - [`pipeline`] - The end-to-end run
//! - [`io`] - Report and geometry output
//! - [`settings`] - Layered INI configuration

pub mod geometry;
pub mod io;
pub mod masses;
pub mod modes;
pub mod parser;
pub mod pipeline;
pub mod projection;
/// Configuration management system
pub mod settings;
pub mod validation;

pub use geometry::Geometry;
pub use masses::MassTable;
pub use pipeline::{run, ProjectionReport, RunConfig};

//!
//! # Dpl21 Detail-Placement Legalizer
//!
//! Snaps a globally-placed [db::Design] onto its rows:
//! every movable instance lands on a site, within its group's regions,
//! without overlapping any other, as near as possible to where it started.
//!
//! Also inserts and removes fillers, mirrors instances to shorten nets,
//! and audits and summarizes placements.
//!
//! ```ignore
//! let mut dpl = Legalizer::new(design, LegalizerConfig::default());
//! dpl.detailed_placement(0, 0)?;
//! assert!(dpl.check_placement(false)?.is_legal());
//! ```
//!

// Re-export the database crate
pub use dpl21db as db;

// Modules
pub mod cell;
pub mod check;
pub mod config;
pub mod coords;
pub mod drc;
pub mod error;
pub mod filler;
pub mod grid;
pub mod group;
pub mod legalizer;
pub mod mirror;
pub mod network;
pub mod padding;
pub mod place;
pub mod report;

// Primary exports
pub use check::LegalityReport;
pub use config::{LegalizerConfig, LegalizerConfigBuilder};
pub use error::{DplError, DplResult, ErrorContext};
pub use filler::{FillerReport, UnfillableGap};
pub use legalizer::{Legalizer, PlacementFailure};
pub use mirror::MirrorReport;
pub use report::LegalizationStats;

#[cfg(test)]
mod tests;

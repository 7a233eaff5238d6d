//!
//! # Legalizer Configuration
//!

// Crates.io
use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// Local imports
use crate::db::{Int, SerdeFile};

///
/// # Legalizer Configuration
///
/// Loadable from any of the [crate::db::SerializationFormat]s, in which every field is optional:
///
/// ```yaml
/// max_displacement_x: 200
/// disallow_one_site_gaps: true
/// ```
///
#[derive(Debug, Clone, Builder, Serialize, Deserialize, JsonSchema, PartialEq)]
#[builder(pattern = "owned", default)]
#[serde(default)]
pub struct LegalizerConfig {
    /// Default horizontal displacement limit, in sites
    pub max_displacement_x: Int,
    /// Default vertical displacement limit, in rows
    pub max_displacement_y: Int,
    /// Pixels further than the displacement limit less this many sites or rows from any row are marked hopeless
    pub hopeless_safety_margin: Int,
    /// Reject placements leaving a single empty site beside a neighbor
    pub disallow_one_site_gaps: bool,
    /// Evict and re-place neighbors when a cell's own search fails
    pub shift_move: bool,
    /// Run the global refinement pass after placement
    pub refine: bool,
    /// Fraction of cells, in decreasing order of displacement, visited by global refinement
    pub refine_percent: f64,
    /// Fraction of each group's cells visited by a group refinement pass
    pub group_refine_percent: f64,
    /// Maximum refine-and-swap passes per group
    pub group_refine_passes: usize,
    /// Random swap attempts per group member, per pass
    pub group_anneal_swaps_per_cell: usize,
    /// Run the global random move-and-swap pass after refinement
    pub global_anneal: bool,
    /// Random attempts per movable cell for the global pass
    pub anneal_swaps_per_cell: usize,
    /// Seed for every random choice made
    pub rand_seed: u64,
    /// Instances with more terminals than this are skipped by mirroring.
    /// Candidates' nets are all weighed, whatever their size.
    pub mirror_max_iterms: usize,
}
impl Default for LegalizerConfig {
    fn default() -> Self {
        Self {
            max_displacement_x: 500,
            max_displacement_y: 100,
            hopeless_safety_margin: 20,
            disallow_one_site_gaps: false,
            shift_move: true,
            refine: true,
            refine_percent: 0.05,
            group_refine_percent: 0.05,
            group_refine_passes: 3,
            group_anneal_swaps_per_cell: 100,
            global_anneal: false,
            anneal_swaps_per_cell: 100,
            rand_seed: 777,
            mirror_max_iterms: 100,
        }
    }
}
impl SerdeFile for LegalizerConfig {}

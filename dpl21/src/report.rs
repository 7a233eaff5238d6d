//!
//! # Legalization Statistics
//!

// Std-Lib
use std::fmt;

// Crates.io
use log::info;

// Local imports
use crate::db::Int;
use crate::legalizer::Legalizer;
use crate::network;

/// # Legalization Statistics
///
/// Displacements are in database units, measured against each instance's location
/// at the start of the last [Legalizer::detailed_placement].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LegalizationStats {
    pub legalized: usize,
    pub failures: usize,
    pub total_displacement: Int,
    pub average_displacement: f64,
    pub max_displacement: Int,
    pub hpwl_before: Int,
    pub hpwl_after: Int,
    /// Change in HPWL, as a percentage of its starting value
    pub hpwl_delta_percent: f64,
}
impl fmt::Display for LegalizationStats {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "Legalized instances:  {}", self.legalized)?;
        writeln!(f, "Placement failures:   {}", self.failures)?;
        writeln!(f, "Total displacement:   {}", self.total_displacement)?;
        writeln!(f, "Average displacement: {:.1}", self.average_displacement)?;
        writeln!(f, "Max displacement:     {}", self.max_displacement)?;
        writeln!(f, "Original HPWL:        {}", self.hpwl_before)?;
        writeln!(f, "Legalized HPWL:       {}", self.hpwl_after)?;
        write!(f, "Delta HPWL:           {:.1}%", self.hpwl_delta_percent)
    }
}

impl Legalizer {
    /// Summarize the last [Legalizer::detailed_placement], and log the summary.
    /// All zeros if it has never run.
    pub fn report_legalization_stats(&self) -> LegalizationStats {
        if self.initial.is_empty() {
            return LegalizationStats::default();
        }
        let mut stats = LegalizationStats {
            failures: self.failures.len(),
            hpwl_before: self.hpwl_before,
            hpwl_after: network::total_hpwl(&self.design),
            ..Default::default()
        };
        for key in self.legalized.iter() {
            let (inst, init) = match (self.design.insts.get(*key), self.initial.get(key)) {
                (Some(inst), Some(init)) => (inst, init),
                _ => continue,
            };
            let disp = inst.location.manhattan(init);
            stats.legalized += 1;
            stats.total_displacement += disp;
            stats.max_displacement = stats.max_displacement.max(disp);
        }
        if stats.legalized > 0 {
            stats.average_displacement = stats.total_displacement as f64 / stats.legalized as f64;
        }
        if stats.hpwl_before != 0 {
            stats.hpwl_delta_percent =
                (stats.hpwl_after - stats.hpwl_before) as f64 / stats.hpwl_before as f64 * 100.0;
        }
        info!("Legalization statistics:\n{}", stats);
        stats
    }
}

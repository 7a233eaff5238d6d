//!
//! # Unit Tests
//!

// Local imports
use crate::db::{Design, InstKey, Point};
use crate::{DplError, DplResult, Legalizer};

// Modules
pub mod audit;
pub mod placement;
use designs::SampleDesigns;

/// Location of the instance named `name`
fn location(design: &Design, name: &str) -> DplResult<Point> {
    let key = find(design, name)?;
    Ok(design.inst(key)?.location)
}
/// Key of the instance named `name`
fn find(design: &Design, name: &str) -> DplResult<InstKey> {
    design
        .find_inst(name)
        .ok_or_else(|| DplError::msg(format!("No instance {}", name)))
}

/// Legalizing an empty set of rows succeeds, and changes nothing
#[test]
fn empty_design() -> DplResult<()> {
    let design = SampleDesigns::rows(10, 2)?;
    let mut dpl = Legalizer::new(design, Default::default());
    dpl.detailed_placement(0, 0)?;
    assert!(dpl.placement_failures().is_empty());
    assert!(dpl.check_placement(true)?.is_legal());
    assert_eq!(dpl.report_legalization_stats().legalized, 0);
    Ok(())
}

/// Designs without usable rows are configuration errors
#[test]
fn no_rows() -> DplResult<()> {
    let mut dpl = Legalizer::new(Design::new("bare"), Default::default());
    assert!(matches!(dpl.detailed_placement(0, 0), Err(DplError::Config { .. })));
    Ok(())
}

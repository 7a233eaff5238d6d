//!
//! # Placement Audit Tests
//!

use super::*;
use crate::db::{Group, PlacementStatus, Rect};

/// One offender per category, plus a bystander
fn offenders() -> DplResult<Design> {
    let mut design = SampleDesigns::rows(25, 2)?;
    let w1 = SampleDesigns::std_master(&mut design, "W1", 1, 1)?;
    let w2 = SampleDesigns::std_master(&mut design, "W2", 2, 1)?;
    SampleDesigns::inst(&mut design, "off", w1, 15, 0);
    SampleDesigns::inst(&mut design, "o1", w2, 100, 0);
    SampleDesigns::inst(&mut design, "o2", w2, 110, 0);
    SampleDesigns::inst(&mut design, "far", w1, 300, 0);
    let un = SampleDesigns::inst(&mut design, "un", w1, 0, 100);
    design.inst_mut(un)?.status = PlacementStatus::Unplaced;
    SampleDesigns::inst(&mut design, "ybad", w1, 60, 50);
    SampleDesigns::inst(&mut design, "ok", w1, 160, 100);
    Ok(design)
}

#[test]
fn finds_violations() -> DplResult<()> {
    let mut dpl = Legalizer::new(offenders()?, Default::default());
    let report = dpl.check_placement(true)?;
    assert_eq!(report.checked, 7);
    assert_eq!(report.unplaced, vec!["un"]);
    assert_eq!(report.site_misaligned, vec!["off"]);
    assert_eq!(report.out_of_core, vec!["far"]);
    assert_eq!(report.row_misaligned, vec!["far", "ybad"]);
    assert_eq!(report.overlaps, vec![("o1".to_string(), "o2".to_string())]);
    assert!(report.outside_group.is_empty());
    assert!(report.edge_spacing.is_empty());
    assert!(!report.is_legal());

    // Auditing changes nothing
    assert_eq!(location(dpl.design(), "off")?, Point::new(15, 0));
    Ok(())
}

/// Legalizing clears every violation
#[test]
fn legalized_offenders() -> DplResult<()> {
    let mut dpl = Legalizer::new(offenders()?, Default::default());
    dpl.detailed_placement(0, 0)?;
    assert!(dpl.placement_failures().is_empty());
    let report = dpl.check_placement(true)?;
    assert!(report.is_legal(), "{:?}", report);
    assert_eq!(report.violation_count(), 0);
    assert_eq!(location(dpl.design(), "ok")?, Point::new(160, 100));
    Ok(())
}

/// Abutting edges which require spacing are flagged on both sides
#[test]
fn edge_spacing_violations() -> DplResult<()> {
    let mut design = SampleDesigns::rows(10, 1)?;
    let edged = SampleDesigns::edged_master(&mut design, "EDGED", 2, "A")?;
    SampleDesigns::spacing_rule(&mut design, "A", 10);
    SampleDesigns::inst(&mut design, "a", edged, 0, 0);
    SampleDesigns::inst(&mut design, "b", edged, 20, 0);

    let mut dpl = Legalizer::new(design, Default::default());
    let report = dpl.check_placement(false)?;
    assert_eq!(report.edge_spacing, vec!["a", "b"]);
    assert!(report.overlaps.is_empty());
    Ok(())
}

/// Group containment counts the overlap of two regions once
#[test]
fn overlapping_regions() -> DplResult<()> {
    let mut design = SampleDesigns::rows(20, 1)?;
    let w2 = SampleDesigns::std_master(&mut design, "W2", 2, 1)?;
    let gkey = design.add_group(Group {
        name: "g".into(),
        regions: vec![Rect::new(0, 0, 60, 100), Rect::new(40, 0, 120, 100)],
    });
    // Across the overlap, and half out of the second region
    for (name, x) in [("inside", 50), ("straddle", 110)] {
        let key = SampleDesigns::inst(&mut design, name, w2, x, 0);
        design.inst_mut(key)?.group = Some(gkey);
    }
    let mut dpl = Legalizer::new(design, Default::default());
    let report = dpl.check_placement(false)?;
    assert_eq!(report.outside_group, vec!["straddle"]);
    assert!(report.overlaps.is_empty());
    Ok(())
}

//!
//! # Placement Tests
//!

use super::*;
use crate::cell::CellKey;
use crate::coords::{GridPt, GridX, GridY};
use crate::db::{Int, MasterClass, PlacementStatus};
use crate::LegalizerConfigBuilder;

/// Import `design` and paint its fixed cells, without placing anything else
fn imported(design: Design) -> DplResult<Legalizer> {
    let mut dpl = Legalizer::new(design, Default::default());
    dpl.import()?;
    dpl.paint_fixed_cells()?;
    Ok(dpl)
}
/// Cell of the instance named `name`
fn cell(dpl: &Legalizer, name: &str) -> DplResult<CellKey> {
    Ok(dpl.inst_cells[&find(dpl.design(), name)?])
}
fn pt(x: Int, y: Int) -> GridPt {
    GridPt::new(GridX(x), GridY(y))
}

/// Overlapping cells spread to the nearest free site, measured in DBU: a site over beats a row up
#[test]
fn stacks_overlapping_cells() -> DplResult<()> {
    let mut design = SampleDesigns::rows(10, 10)?;
    let w1 = SampleDesigns::std_master(&mut design, "W1", 1, 1)?;
    SampleDesigns::inst(&mut design, "a", w1, 50, 500);
    SampleDesigns::inst(&mut design, "b", w1, 50, 500);

    let mut dpl = Legalizer::new(design, Default::default());
    assert_eq!(dpl.report_legalization_stats(), crate::LegalizationStats::default());
    dpl.detailed_placement(0, 0)?;
    assert!(dpl.placement_failures().is_empty());
    assert_eq!(location(dpl.design(), "a")?, Point::new(50, 500));
    assert_eq!(location(dpl.design(), "b")?, Point::new(60, 500));
    // Row five is an MX row
    let b = find(dpl.design(), "b")?;
    assert_eq!(dpl.design().inst(b)?.orient, crate::db::Orient::MX);

    let stats = dpl.report_legalization_stats();
    assert_eq!(stats.legalized, 2);
    assert_eq!(stats.failures, 0);
    assert_eq!(stats.total_displacement, 10);
    assert_eq!(stats.max_displacement, 10);
    assert_eq!(stats.average_displacement, 5.0);
    assert!(dpl.check_placement(true)?.is_legal());
    Ok(())
}

/// Eight sites over is nearer than one row up
#[test]
fn dbu_distance_order() -> DplResult<()> {
    let mut design = SampleDesigns::rows(20, 3)?;
    let w2 = SampleDesigns::std_master(&mut design, "W2", 2, 1)?;
    let w8 = SampleDesigns::std_master(&mut design, "W8", 8, 1)?;
    let w9 = SampleDesigns::std_master(&mut design, "W9", 9, 1)?;
    let w1 = SampleDesigns::std_master(&mut design, "W1", 1, 1)?;
    // Row one is full, bar site 17
    SampleDesigns::fixed(&mut design, "left", w9, 0, 100);
    SampleDesigns::fixed(&mut design, "mid", w8, 90, 100);
    SampleDesigns::fixed(&mut design, "right", w2, 180, 100);
    SampleDesigns::inst(&mut design, "c", w1, 90, 100);

    let mut dpl = Legalizer::new(design, Default::default());
    dpl.detailed_placement(0, 0)?;
    assert!(dpl.placement_failures().is_empty());
    assert_eq!(location(dpl.design(), "c")?, Point::new(170, 100));
    assert_eq!(dpl.report_legalization_stats().total_displacement, 80);
    Ok(())
}

/// Cells off the site grid, overlapping each other, with a double-height cell among them
#[test]
fn aligns_and_separates() -> DplResult<()> {
    let mut design = SampleDesigns::rows(20, 4)?;
    let w2 = SampleDesigns::std_master(&mut design, "W2", 2, 1)?;
    let w3 = SampleDesigns::std_master(&mut design, "W3", 3, 1)?;
    let tall = SampleDesigns::std_master(&mut design, "TALL", 2, 2)?;
    SampleDesigns::inst(&mut design, "p", w2, 13, 17);
    SampleDesigns::inst(&mut design, "q", w2, 18, 22);
    SampleDesigns::inst(&mut design, "r", w3, 25, 5);
    SampleDesigns::inst(&mut design, "tall", tall, 40, 90);

    let mut dpl = Legalizer::new(design, Default::default());
    dpl.detailed_placement(0, 0)?;
    assert!(dpl.placement_failures().is_empty());
    let report = dpl.check_placement(true)?;
    assert!(report.is_legal(), "{:?}", report);
    assert_eq!(report.checked, 4);
    for name in ["p", "q", "r", "tall"] {
        let loc = location(dpl.design(), name)?;
        assert_eq!(loc.x % 10, 0);
        assert_eq!(loc.y % 100, 0);
    }
    Ok(())
}

/// Already-legal placements are left alone
#[test]
fn legal_placements_stay() -> DplResult<()> {
    let mut design = SampleDesigns::rows(10, 2)?;
    let w2 = SampleDesigns::std_master(&mut design, "W2", 2, 1)?;
    let w1 = SampleDesigns::std_master(&mut design, "W1", 1, 1)?;
    SampleDesigns::inst(&mut design, "a", w2, 0, 0);
    SampleDesigns::inst(&mut design, "b", w2, 50, 100);
    SampleDesigns::inst(&mut design, "c", w1, 30, 0);

    let mut dpl = Legalizer::new(design, Default::default());
    dpl.detailed_placement(0, 0)?;
    assert_eq!(location(dpl.design(), "a")?, Point::new(0, 0));
    assert_eq!(location(dpl.design(), "b")?, Point::new(50, 100));
    assert_eq!(location(dpl.design(), "c")?, Point::new(30, 0));
    assert_eq!(dpl.report_legalization_stats().total_displacement, 0);
    Ok(())
}

/// No cell moves further than the displacement limits; those with nowhere to go fail in place
#[test]
fn displacement_limits() -> DplResult<()> {
    let mut design = SampleDesigns::rows(10, 3)?;
    let w1 = SampleDesigns::std_master(&mut design, "W1", 1, 1)?;
    for i in 0..20 {
        SampleDesigns::inst(&mut design, &format!("c{}", i), w1, 50, 100);
    }
    let mut dpl = Legalizer::new(design, Default::default());
    dpl.detailed_placement(2, 1)?;

    // Two sites either side, one row either side: fifteen slots
    assert_eq!(dpl.placement_failures().len(), 5);
    let failed: Vec<_> = dpl.placement_failures().iter().map(|f| f.inst).collect();
    for failure in dpl.placement_failures() {
        assert_eq!(failure.location, Point::new(50, 100));
    }
    for (key, inst) in dpl.design().insts.iter() {
        if failed.contains(&key) {
            continue;
        }
        assert!((inst.location.x - 50).abs() <= 20, "{} at {:?}", inst.name, inst.location);
        assert!((inst.location.y - 100).abs() <= 100, "{} at {:?}", inst.name, inst.location);
    }
    assert_eq!(dpl.report_legalization_stats().legalized, 15);
    Ok(())
}

/// A movable macro with no room is a failure, not an error
#[test]
fn unplaceable_macro() -> DplResult<()> {
    let mut design = SampleDesigns::rows(10, 4)?;
    let full = SampleDesigns::std_master(&mut design, "FULL", 10, 1)?;
    let block = SampleDesigns::master(&mut design, "MACRO", MasterClass::Block, 4, 2)?;
    for r in 0..4 {
        SampleDesigns::fixed(&mut design, &format!("full{}", r), full, 0, r * 100);
    }
    SampleDesigns::inst(&mut design, "blk", block, 30, 100);

    let mut dpl = Legalizer::new(design, Default::default());
    dpl.detailed_placement(5, 2)?;
    let failures = dpl.placement_failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].name, "blk");
    assert_eq!(failures[0].location, Point::new(30, 100));
    assert_eq!(location(dpl.design(), "blk")?, Point::new(30, 100));
    assert_eq!(location(dpl.design(), "full2")?, Point::new(0, 200));
    Ok(())
}

/// Double-height cells take the double-height rows, and block both their single-height rows
#[test]
fn mixed_row_heights() -> DplResult<()> {
    let mut design = SampleDesigns::mixed_heights(10, 1)?;
    let dh = SampleDesigns::std_master(&mut design, "DH", 3, 2)?;
    let w2 = SampleDesigns::std_master(&mut design, "W2", 2, 1)?;
    SampleDesigns::inst(&mut design, "dh", dh, 0, 0);
    SampleDesigns::inst(&mut design, "a", w2, 0, 0);
    SampleDesigns::inst(&mut design, "b", w2, 0, 100);

    let mut dpl = Legalizer::new(design, Default::default());
    dpl.detailed_placement(0, 0)?;
    assert_eq!(dpl.grid().layers().len(), 2);
    assert!(dpl.placement_failures().is_empty());
    assert_eq!(location(dpl.design(), "dh")?, Point::new(0, 0));
    assert_eq!(location(dpl.design(), "a")?, Point::new(30, 0));
    assert_eq!(location(dpl.design(), "b")?, Point::new(30, 100));
    assert!(dpl.check_placement(true)?.is_legal());
    Ok(())
}

/// Padding sites separate neighbors
#[test]
fn padded_cells() -> DplResult<()> {
    let mut design = SampleDesigns::rows(10, 1)?;
    let w2 = SampleDesigns::std_master(&mut design, "W2", 2, 1)?;
    SampleDesigns::inst(&mut design, "a", w2, 0, 0);
    SampleDesigns::inst(&mut design, "b", w2, 0, 0);

    let mut dpl = Legalizer::new(design, Default::default());
    dpl.padding_mut().set_global(1, 1);
    dpl.detailed_placement(0, 0)?;
    assert_eq!(location(dpl.design(), "a")?, Point::new(10, 0));
    assert_eq!(location(dpl.design(), "b")?, Point::new(50, 0));
    assert!(dpl.check_placement(true)?.is_legal());
    Ok(())
}

/// Facing edges keep their required spacing
#[test]
fn edge_spacing() -> DplResult<()> {
    let mut design = SampleDesigns::rows(10, 1)?;
    let edged = SampleDesigns::edged_master(&mut design, "EDGED", 2, "A")?;
    SampleDesigns::spacing_rule(&mut design, "A", 10);
    SampleDesigns::inst(&mut design, "a", edged, 0, 0);
    SampleDesigns::inst(&mut design, "b", edged, 0, 0);

    let mut dpl = Legalizer::new(design, Default::default());
    dpl.detailed_placement(0, 0)?;
    assert_eq!(location(dpl.design(), "a")?, Point::new(0, 0));
    assert_eq!(location(dpl.design(), "b")?, Point::new(30, 0));
    assert!(dpl.check_placement(true)?.edge_spacing.is_empty());
    Ok(())
}

/// With one-site gaps disallowed, cells abut rather than leave a lone empty site
#[test]
fn one_site_gaps() -> DplResult<()> {
    let build = || -> DplResult<Design> {
        let mut design = SampleDesigns::rows(10, 1)?;
        let w1 = SampleDesigns::std_master(&mut design, "W1", 1, 1)?;
        let w2 = SampleDesigns::std_master(&mut design, "W2", 2, 1)?;
        SampleDesigns::inst(&mut design, "a", w1, 10, 0);
        SampleDesigns::inst(&mut design, "b", w2, 30, 0);
        Ok(design)
    };
    // Allowed by default
    let mut dpl = Legalizer::new(build()?, Default::default());
    dpl.detailed_placement(0, 0)?;
    assert_eq!(location(dpl.design(), "a")?, Point::new(10, 0));

    let config = LegalizerConfigBuilder::default()
        .disallow_one_site_gaps(true)
        .build()
        .map_err(|e| DplError::msg(e.to_string()))?;
    let mut dpl = Legalizer::new(build()?, config);
    dpl.detailed_placement(0, 0)?;
    assert_eq!(location(dpl.design(), "a")?, Point::new(20, 0));
    assert_eq!(location(dpl.design(), "b")?, Point::new(30, 0));
    let report = dpl.check_placement(true)?;
    assert!(report.one_site_gaps.is_empty());
    assert!(report.is_legal());
    Ok(())
}

/// The random passes repeat exactly for a given seed
#[test]
fn seeded_anneal_repeats() -> DplResult<()> {
    let run = || -> DplResult<Vec<(String, Point)>> {
        let mut design = SampleDesigns::rows(20, 4)?;
        let w1 = SampleDesigns::std_master(&mut design, "W1", 1, 1)?;
        let w2 = SampleDesigns::std_master(&mut design, "W2", 2, 1)?;
        for i in 0..16 {
            let master = if i % 3 == 0 { w2 } else { w1 };
            let (x, y) = ((i * 37) % 170, (i * 53) % 300);
            SampleDesigns::inst(&mut design, &format!("c{}", i), master, x, y);
        }
        let config = LegalizerConfigBuilder::default()
            .global_anneal(true)
            .anneal_swaps_per_cell(20usize)
            .refine_percent(0.5)
            .build()
            .map_err(|e| DplError::msg(e.to_string()))?;
        let mut dpl = Legalizer::new(design, config);
        dpl.detailed_placement(0, 0)?;
        assert!(dpl.placement_failures().is_empty());
        assert!(dpl.check_placement(false)?.is_legal());
        let mut locs: Vec<(String, Point)> = dpl
            .design()
            .insts
            .values()
            .map(|i| (i.name.clone(), i.location))
            .collect();
        locs.sort();
        Ok(locs)
    };
    assert_eq!(run()?, run()?);
    Ok(())
}

/// Unplaced instances are placed too
#[test]
fn places_unplaced() -> DplResult<()> {
    let mut design = SampleDesigns::rows(10, 2)?;
    let w1 = SampleDesigns::std_master(&mut design, "W1", 1, 1)?;
    let key = SampleDesigns::inst(&mut design, "u", w1, 42, 130);
    design.inst_mut(key)?.status = PlacementStatus::Unplaced;

    let mut dpl = Legalizer::new(design, Default::default());
    dpl.detailed_placement(0, 0)?;
    assert_eq!(location(dpl.design(), "u")?, Point::new(40, 100));
    assert_eq!(dpl.design().inst(key)?.status, PlacementStatus::Placed);
    Ok(())
}

/// Instances wider than the core are configuration errors
#[test]
fn too_wide() -> DplResult<()> {
    let mut design = SampleDesigns::rows(4, 1)?;
    let wide = SampleDesigns::std_master(&mut design, "WIDE", 5, 1)?;
    SampleDesigns::inst(&mut design, "w", wide, 0, 0);
    let mut dpl = Legalizer::new(design, Default::default());
    assert!(matches!(dpl.detailed_placement(0, 0), Err(DplError::Config { .. })));
    Ok(())
}

/// Starts moved off a block are still held to the limits from the initial location
#[test]
fn limits_hold_past_blocks() -> DplResult<()> {
    let build = || -> DplResult<Design> {
        let mut design = SampleDesigns::rows(20, 1)?;
        let block = SampleDesigns::master(&mut design, "MACRO", MasterClass::Block, 8, 1)?;
        let w1 = SampleDesigns::std_master(&mut design, "W1", 1, 1)?;
        SampleDesigns::fixed(&mut design, "blk", block, 0, 0);
        SampleDesigns::inst(&mut design, "c", w1, 30, 0);
        Ok(design)
    };
    // The block's right edge is five sites away
    let mut dpl = Legalizer::new(build()?, Default::default());
    dpl.detailed_placement(2, 1)?;
    let failures: Vec<&str> = dpl.placement_failures().iter().map(|f| f.name.as_str()).collect();
    assert_eq!(failures, vec!["c"]);
    assert_eq!(location(dpl.design(), "c")?, Point::new(30, 0));

    let mut dpl = Legalizer::new(build()?, Default::default());
    dpl.detailed_placement(5, 1)?;
    assert!(dpl.placement_failures().is_empty());
    assert_eq!(location(dpl.design(), "c")?, Point::new(80, 0));
    Ok(())
}

/// Shifting evicts the neighbors around the start point, and re-places them after
#[test]
fn shift_makes_room() -> DplResult<()> {
    let mut design = SampleDesigns::rows(5, 1)?;
    let w1 = SampleDesigns::std_master(&mut design, "W1", 1, 1)?;
    let w2 = SampleDesigns::std_master(&mut design, "W2", 2, 1)?;
    SampleDesigns::inst(&mut design, "a", w1, 10, 0);
    SampleDesigns::inst(&mut design, "b", w1, 30, 0);
    SampleDesigns::inst(&mut design, "c", w2, 20, 0);

    let mut dpl = imported(design)?;
    let (a, b, c) = (cell(&dpl, "a")?, cell(&dpl, "b")?, cell(&dpl, "c")?);
    dpl.place_cell(a, pt(1, 0))?;
    dpl.place_cell(b, pt(3, 0))?;
    // Sites 0, 2 and 4 are free, but no two of them adjacent
    assert!(!dpl.map_move(c)?);
    assert!(dpl.shift_move(c)?);
    assert_eq!(dpl.grid_pt(c), pt(2, 0));
    assert_eq!(dpl.grid_pt(a), pt(1, 0));
    assert_eq!(dpl.grid_pt(b), pt(4, 0));
    assert!(dpl.placement_failures().is_empty());
    Ok(())
}

/// Re-searching a displaced cell moves it only when that strictly shortens its displacement
#[test]
fn refine_move_improves() -> DplResult<()> {
    let mut design = SampleDesigns::rows(10, 1)?;
    let w1 = SampleDesigns::std_master(&mut design, "W1", 1, 1)?;
    SampleDesigns::inst(&mut design, "d", w1, 50, 0);

    let mut dpl = imported(design)?;
    let d = cell(&dpl, "d")?;
    dpl.place_cell(d, pt(8, 0))?;
    assert_eq!(dpl.cells[d].displacement(), 30);
    assert!(dpl.refine_move(d)?);
    assert_eq!(dpl.grid_pt(d), pt(5, 0));
    assert_eq!(dpl.cells[d].displacement(), 0);
    // Nothing left to gain
    assert!(!dpl.refine_move(d)?);
    // Held cells stay put
    dpl.unplace_cell(d);
    dpl.place_cell(d, pt(8, 0))?;
    dpl.cells[d].hold = true;
    assert!(!dpl.refine_move(d)?);
    assert_eq!(dpl.grid_pt(d), pt(8, 0));
    Ok(())
}

/// Swaps are kept only when they strictly shorten the pair's total displacement
#[test]
fn swap_improves() -> DplResult<()> {
    let mut design = SampleDesigns::rows(10, 1)?;
    let w1 = SampleDesigns::std_master(&mut design, "W1", 1, 1)?;
    let w2 = SampleDesigns::std_master(&mut design, "W2", 2, 1)?;
    SampleDesigns::inst(&mut design, "a", w1, 10, 0);
    SampleDesigns::inst(&mut design, "b", w1, 60, 0);
    SampleDesigns::inst(&mut design, "w", w2, 80, 0);

    let mut dpl = imported(design)?;
    let (a, b, w) = (cell(&dpl, "a")?, cell(&dpl, "b")?, cell(&dpl, "w")?);
    dpl.place_cell(a, pt(6, 0))?;
    dpl.place_cell(b, pt(1, 0))?;
    dpl.place_cell(w, pt(8, 0))?;
    let total = |dpl: &Legalizer| dpl.cells[a].displacement() + dpl.cells[b].displacement();
    assert_eq!(total(&dpl), 100);
    assert!(dpl.swap_cells(a, b)?);
    assert_eq!(dpl.grid_pt(a), pt(1, 0));
    assert_eq!(dpl.grid_pt(b), pt(6, 0));
    assert_eq!(total(&dpl), 0);
    // Swapping back would only add displacement
    assert!(!dpl.swap_cells(a, b)?);
    assert_eq!(total(&dpl), 0);
    // Cells of different sizes never swap
    assert!(!dpl.swap_cells(a, w)?);
    assert_eq!(dpl.grid_pt(w), pt(8, 0));
    Ok(())
}

/// Annealing never adds displacement, and here undoes a crossed pair entirely
#[test]
fn anneal_reduces_displacement() -> DplResult<()> {
    let mut design = SampleDesigns::rows(10, 2)?;
    let w1 = SampleDesigns::std_master(&mut design, "W1", 1, 1)?;
    SampleDesigns::inst(&mut design, "a", w1, 10, 0);
    SampleDesigns::inst(&mut design, "b", w1, 60, 0);
    SampleDesigns::inst(&mut design, "c", w1, 30, 100);

    let mut dpl = imported(design)?;
    let (a, b, c) = (cell(&dpl, "a")?, cell(&dpl, "b")?, cell(&dpl, "c")?);
    dpl.place_cell(a, pt(6, 0))?;
    dpl.place_cell(b, pt(1, 0))?;
    dpl.place_cell(c, pt(3, 1))?;
    let total = |dpl: &Legalizer| -> Int { [a, b, c].iter().map(|k| dpl.cells[*k].displacement()).sum() };
    assert_eq!(total(&dpl), 100);
    dpl.anneal()?;
    assert_eq!(total(&dpl), 0);
    assert_eq!(dpl.grid_pt(c), pt(3, 1));
    Ok(())
}

//!
//! # Placement Legality Audit
//!
//! Checks the design's current placement, independently of any legalization run.
//!

// Std-Lib
use std::collections::HashMap;

// Crates.io
use log::{info, warn};

// Local imports
use crate::cell::CellKey;
use crate::coords::{GridX, GridY, HasUnits};
use crate::db::{Point, Rect};
use crate::error::DplResult;
use crate::grid::Side;
use crate::legalizer::Legalizer;

///
/// # Legality Report
///
/// Offending instance names, by category.
///
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LegalityReport {
    /// Number of movable instances checked
    pub checked: usize,
    pub unplaced: Vec<String>,
    pub out_of_core: Vec<String>,
    /// Not on a site boundary
    pub site_misaligned: Vec<String>,
    /// Not on a row boundary, or not over any row
    pub row_misaligned: Vec<String>,
    /// Pairs of overlapping instances
    pub overlaps: Vec<(String, String)>,
    pub outside_group: Vec<String>,
    pub edge_spacing: Vec<String>,
    pub one_site_gaps: Vec<String>,
}
impl LegalityReport {
    /// Total number of violations, over every category
    pub fn violation_count(&self) -> usize {
        self.unplaced.len()
            + self.out_of_core.len()
            + self.site_misaligned.len()
            + self.row_misaligned.len()
            + self.overlaps.len()
            + self.outside_group.len()
            + self.edge_spacing.len()
            + self.one_site_gaps.len()
    }
    pub fn is_legal(&self) -> bool {
        self.violation_count() == 0
    }
    /// Log every offender, one line each
    fn log_offenders(&self) {
        let categories = [
            ("Unplaced", &self.unplaced),
            ("Outside core", &self.out_of_core),
            ("Not on a site", &self.site_misaligned),
            ("Not on a row", &self.row_misaligned),
            ("Outside group", &self.outside_group),
            ("Edge spacing", &self.edge_spacing),
            ("One-site gap", &self.one_site_gaps),
        ];
        for (category, names) in categories {
            for name in names.iter() {
                warn!("{}: {}", category, name);
            }
        }
        for (a, b) in self.overlaps.iter() {
            warn!("Overlap: {} and {}", a, b);
        }
    }
}

impl Legalizer {
    ///
    /// # Check Placement
    ///
    /// Audit the design's current placement. With `verbose`, each offender is logged.
    ///
    pub fn check_placement(&mut self, verbose: bool) -> DplResult<LegalityReport> {
        self.import()?;
        self.paint_design_cells()?;
        let sw = self.grid.site_width;
        let core = Rect::new(0, 0, self.grid.core.dx(), self.grid.core.dy());
        let mut report = LegalityReport::default();

        let mut keys: Vec<CellKey> = self.cells.keys().collect();
        keys.sort_by(|a, b| self.cells[*a].name.cmp(&self.cells[*b].name));
        for key in keys.iter() {
            let cell = &self.cells[*key];
            if cell.is_fixed() {
                continue;
            }
            report.checked += 1;
            if !cell.is_placed() {
                report.unplaced.push(cell.name.clone());
                continue;
            }
            let bbox = cell.bbox();
            if !core.encloses(&bbox) {
                report.out_of_core.push(cell.name.clone());
            }
            if cell.x.raw() % sw.raw() != 0 {
                report.site_misaligned.push(cell.name.clone());
            }
            let h = self.grid.row_height(cell.layer);
            let on_row = self
                .grid
                .pixel(cell.layer, self.grid.grid_x(cell.x), self.grid.grid_y(cell.layer, cell.y))
                .map(|p| p.is_valid)
                .unwrap_or(false);
            if cell.y.raw() % h.raw() != 0 || !on_row {
                report.row_misaligned.push(cell.name.clone());
            }
            if let Some(group) = cell.group.and_then(|g| self.groups.get(g)) {
                if bbox.covered_area(&group.regions) != bbox.area() {
                    report.outside_group.push(cell.name.clone());
                }
            }
            let master = self.design.master(cell.master)?;
            if !self
                .drc
                .check_edge_spacing(&self.grid, &self.design, &self.cells, *key, cell.x, cell.y, cell.orient)
            {
                report.edge_spacing.push(cell.name.clone());
            }
            if self.config.disallow_one_site_gaps {
                let mut gap = false;
                self.grid.visit_cell_boundary_pixels(cell, master, false, |_, side, x, y| {
                    let (beside, beyond) = match side {
                        Side::West => (x - GridX(1), x - GridX(2)),
                        Side::East => (x + GridX(1), x + GridX(2)),
                        _ => return,
                    };
                    gap |= self.one_site_gap_at(cell.layer, *key, beside, beyond, y);
                });
                if gap {
                    report.one_site_gaps.push(cell.name.clone());
                }
            }
        }
        report.overlaps = self.find_overlaps()?;

        if verbose {
            report.log_offenders();
        }
        info!(
            "Checked {} instances: {} violations",
            report.checked,
            report.violation_count()
        );
        Ok(report)
    }

    /// Boolean indication of an empty valid site at `beside`, with another cell at `beyond`
    fn one_site_gap_at(&self, layer: usize, key: CellKey, beside: GridX, beyond: GridX, y: GridY) -> bool {
        let empty = self
            .grid
            .pixel(layer, beside, y)
            .map(|p| p.is_valid && p.is_empty())
            .unwrap_or(false);
        let taken = self
            .grid
            .pixel(layer, beyond, y)
            .and_then(|p| p.occupant)
            .and_then(|o| o.cell())
            .map(|c| c != key)
            .unwrap_or(false);
        empty && taken
    }

    /// Padded footprints of cell `key`, core-relative.
    /// Fixed cells with overlap obstructions occupy only those.
    fn footprints(&self, key: CellKey) -> DplResult<Vec<Rect>> {
        let cell = &self.cells[key];
        let master = self.design.master(cell.master)?;
        if cell.is_fixed() {
            let obs: Vec<Rect> = master
                .overlap_obstructions()
                .map(|r| {
                    cell.orient
                        .apply_rect(r, master.width, master.height)
                        .shift(&Point::new(cell.x.raw(), cell.y.raw()))
                })
                .collect();
            if !obs.is_empty() {
                return Ok(obs);
            }
        }
        let sw = self.grid.site_width;
        let x = (cell.x - cell.pad_left.to_dbu(sw)).raw();
        Ok(vec![Rect::new(
            x,
            cell.y.raw(),
            x + cell.padded_width(sw).raw(),
            (cell.y + cell.height).raw(),
        )])
    }

    ///
    /// Find overlapping pairs of placed cells.
    ///
    /// Every footprint is marked upon a shadow grid of the finest layer's pixels.
    /// Pixels claimed twice are confirmed by exact footprint intersection.
    /// Overlaps between two fixed cells are not reported.
    ///
    fn find_overlaps(&self) -> DplResult<Vec<(String, String)>> {
        let mut shadow: HashMap<(GridX, GridY), Vec<CellKey>> = HashMap::new();
        let mut footprints: HashMap<CellKey, Vec<Rect>> = HashMap::new();
        let mut pairs: Vec<(CellKey, CellKey)> = Vec::new();
        let mut keys: Vec<CellKey> = self
            .cells
            .iter()
            .filter(|(_, c)| c.is_placed() || c.is_fixed())
            .map(|(k, _)| k)
            .collect();
        keys.sort_by(|a, b| self.cells[*a].name.cmp(&self.cells[*b].name));
        for key in keys {
            let rects = self.footprints(key)?;
            for rect in rects.iter() {
                let r = self.grid.grid_covering(0, rect);
                let mut y = r.ylo;
                while y < r.yhi {
                    let mut x = r.xlo;
                    while x < r.xhi {
                        let owners = shadow.entry((x, y)).or_default();
                        for other in owners.iter() {
                            if *other == key || pairs.contains(&(*other, key)) {
                                continue;
                            }
                            if self.cells[*other].is_fixed() && self.cells[key].is_fixed() {
                                continue;
                            }
                            let hit = footprints[other]
                                .iter()
                                .any(|o| rects.iter().any(|r| r.intersects(o)));
                            if hit {
                                pairs.push((*other, key));
                            }
                        }
                        if !owners.contains(&key) {
                            owners.push(key);
                        }
                        x += GridX(1);
                    }
                    y += GridY(1);
                }
            }
            footprints.insert(key, rects);
        }
        Ok(pairs
            .into_iter()
            .map(|(a, b)| (self.cells[a].name.clone(), self.cells[b].name.clone()))
            .collect())
    }
}

//!
//! # Group (Fence) Placement
//!
//! Pixel assignment, pre-placement, brick placement and per-group refinement
//! for cells constrained to the regions of their group.
//!

// Std-Lib
use std::collections::HashMap;

// Crates.io
use log::{debug, warn};
use rand::Rng;

// Local imports
use crate::cell::{CellKey, CellPlaceOrder};
use crate::coords::{DbuX, DbuY, GridPt, GridX, GridY, HasUnits};
use crate::db::{GroupKey, Int, Point, Rect};
use crate::error::DplResult;
use crate::grid::Occupant;
use crate::legalizer::Legalizer;

/// Utilization above which brick placement packs towards the group's corners
const BRICK_UTIL_THRESHOLD: f64 = 0.95;

/// Manhattan distance from `p` to the nearest point of `r`
fn rect_distance(r: &Rect, p: &Point) -> Int {
    let dx = (r.xlo - p.x).max(0).max(p.x - r.xhi);
    let dy = (r.ylo - p.y).max(0).max(p.y - r.yhi);
    dx + dy
}

/// Corners of `r`, for a window of size `(w, h)` to sit inside each
fn inner_corners(r: &Rect, w: Int, h: Int) -> [Point; 4] {
    [
        Point::new(r.xlo, r.ylo),
        Point::new(r.xhi - w, r.ylo),
        Point::new(r.xlo, r.yhi - h),
        Point::new(r.xhi - w, r.yhi - h),
    ]
}

impl Legalizer {
    ///
    /// Assign grid pixels to groups.
    ///
    /// Pixels fully covered by a group's regions take its key.
    /// Pixels only partly covered become invalid and are filled with [Occupant::Dummy].
    ///
    pub(crate) fn group_init_pixels(&mut self) {
        let sw = self.grid.site_width;
        for (gkey, group) in self.groups.iter() {
            for layer in 0..self.grid.layers().len() {
                let h = self.grid.row_height(layer);
                let mut coverage: HashMap<(GridX, GridY), Int> = HashMap::new();
                for region in group.regions.iter() {
                    let covering = self.grid.grid_covering(layer, region);
                    if covering != self.grid.grid_within(layer, region) {
                        warn!(
                            "Region {:?} of group {} is not aligned to the sites and rows of grid layer {}",
                            region, group.name, layer
                        );
                    }
                    let mut y = covering.ylo.max(GridY(0));
                    while y < covering.yhi.min(self.grid.row_count(layer)) {
                        let mut x = covering.xlo.max(GridX(0));
                        while x < covering.xhi.min(self.grid.site_count()) {
                            coverage.entry((x, y)).or_insert_with(|| {
                                let pixel = Rect::new(
                                    x.to_dbu(sw).raw(),
                                    y.to_dbu(h).raw(),
                                    (x + GridX(1)).to_dbu(sw).raw(),
                                    (y + GridY(1)).to_dbu(h).raw(),
                                );
                                // Overlapping regions count once
                                pixel.covered_area(&group.regions)
                            });
                            x += GridX(1);
                        }
                        y += GridY(1);
                    }
                }
                let full = sw.raw() * h.raw();
                let target = self.grid.layer_mut(layer);
                for ((x, y), area) in coverage {
                    if let Some(pixel) = target.pixel_mut(x, y) {
                        if area >= full {
                            pixel.group = Some(gkey);
                        } else if area > 0 {
                            pixel.occupant = Some(Occupant::Dummy);
                            pixel.is_valid = false;
                        }
                    }
                }
            }
        }
    }

    ///
    /// Compute each group's utilization, and assign each member the region containing it,
    /// or the group's first region if none does.
    ///
    pub(crate) fn group_assign_cell_regions(&mut self) {
        let sw = self.grid.site_width;
        let h = self.grid.row_height(0);
        let keys: Vec<GroupKey> = self.groups.keys().collect();
        for gkey in keys {
            let sites = self
                .grid
                .layer(0)
                .pixels()
                .filter(|p| p.is_valid && p.group == Some(gkey))
                .count() as Int;
            let available = sites * sw.raw() * h.raw();
            let group = &self.groups[gkey];
            let area: Int = group
                .cells
                .iter()
                .map(|c| {
                    let cell = &self.cells[*c];
                    cell.padded_width(sw).raw() * cell.height.raw()
                })
                .sum();
            let util = match available {
                0 => f64::INFINITY,
                _ => area as f64 / available as f64,
            };
            if util > 1.0 {
                warn!("Group {} is over-utilized: {:.2}", group.name, util);
            }
            let assignments: Vec<(CellKey, Rect)> = group
                .cells
                .iter()
                .map(|c| {
                    let bbox = self.cells[*c].bbox();
                    let region = group
                        .regions
                        .iter()
                        .find(|r| r.encloses(&bbox))
                        .unwrap_or(&group.regions[0]);
                    (*c, *region)
                })
                .collect();
            for (c, region) in assignments {
                self.cells[c].region = Some(region);
            }
            self.groups[gkey].util = util;
        }
    }

    /// Padded grid point nearest `(x, y)` keeping cell `key` inside core-relative `rect`
    fn grid_pt_inside(&self, key: CellKey, rect: &Rect, x: Int, y: Int) -> GridPt {
        let cell = &self.cells[key];
        let sw = self.grid.site_width;
        let pw = cell.padded_width(sw).raw();
        let h = cell.height.raw();
        let x = x.max(rect.xlo).min(rect.xhi - pw);
        let y = y.max(rect.ylo).min(rect.yhi - h);
        GridPt::new(
            self.grid.grid_end_x(DbuX(x)),
            self.grid.grid_end_y(cell.layer, DbuY(y)),
        )
    }

    /// Move members lying outside their group to the nearest point of its nearest region, holding them there
    pub(crate) fn pre_place_groups(&mut self) -> DplResult<()> {
        let sw = self.grid.site_width;
        let keys: Vec<GroupKey> = self.groups.keys().collect();
        for gkey in keys {
            let members = self.groups[gkey].cells.clone();
            for key in members {
                let cell = &self.cells[key];
                if cell.is_fixed() || cell.is_placed() {
                    continue;
                }
                let bbox = cell.bbox();
                let group = &self.groups[gkey];
                if group.regions.iter().any(|r| r.encloses(&bbox)) {
                    continue;
                }
                let init = cell.init_loc(true, sw);
                let p = Point::new(init.x.raw(), init.y.raw());
                let nearest = match group.regions.iter().min_by_key(|r| rect_distance(r, &p)) {
                    Some(r) => *r,
                    None => continue,
                };
                let pt = self.grid_pt_inside(key, &nearest, p.x, p.y);
                self.cells[key].region = Some(nearest);
                if self.check_pixels(key, pt, true) {
                    self.place_cell(key, pt)?;
                    self.cells[key].hold = true;
                }
            }
        }
        Ok(())
    }

    /// Push ungrouped cells overlapping any group region to the region's nearest edge, holding them there
    pub(crate) fn pre_place(&mut self) -> DplResult<()> {
        let sw = self.grid.site_width;
        let regions: Vec<Rect> = self
            .groups
            .values()
            .flat_map(|g| g.regions.iter().copied())
            .collect();
        let keys: Vec<CellKey> = self
            .cells
            .iter()
            .filter(|(_, c)| !c.is_fixed() && !c.in_group() && !c.is_placed())
            .map(|(k, _)| k)
            .collect();
        for key in keys {
            let cell = &self.cells[key];
            let pw = cell.padded_width(sw).raw();
            let h = cell.height.raw();
            let init = cell.init_loc(true, sw);
            let (x, y) = (init.x.raw(), init.y.raw());
            let bbox = Rect::new(x, y, x + pw, y + h);
            let region = match regions.iter().find(|r| r.intersects(&bbox)) {
                Some(r) => *r,
                None => continue,
            };
            // Candidate locations just beyond each edge, with their distances
            let moves = [
                (bbox.xhi - region.xlo, Point::new(region.xlo - pw, y)),
                (region.xhi - bbox.xlo, Point::new(region.xhi, y)),
                (bbox.yhi - region.ylo, Point::new(x, region.ylo - h)),
                (region.yhi - bbox.ylo, Point::new(x, region.yhi)),
            ];
            let target = match moves.iter().min_by_key(|(d, _)| *d) {
                Some((_, p)) => *p,
                None => continue,
            };
            let layer = cell.layer;
            // Round away from the region
            let gx = match target.x < region.xlo {
                true => self.grid.grid_x(DbuX(target.x)),
                false => self.grid.grid_end_x(DbuX(target.x)),
            };
            let gy = match target.y < region.ylo {
                true => self.grid.grid_y(layer, DbuY(target.y)),
                false => self.grid.grid_end_y(layer, DbuY(target.y)),
            };
            let pt = GridPt::new(gx, gy);
            if self.check_pixels(key, pt, true) {
                self.place_cell(key, pt)?;
                self.cells[key].hold = true;
            }
        }
        Ok(())
    }

    ///
    /// Place each group's members, multi-row cells first.
    /// If any member fails, the group's unheld members are unplaced and brick-placed instead.
    ///
    pub(crate) fn place_groups(&mut self) -> DplResult<()> {
        let order = CellPlaceOrder::new(self.grid.core.dx(), self.grid.core.dy());
        let keys: Vec<GroupKey> = self.groups.keys().collect();
        for gkey in keys {
            let mut members: Vec<CellKey> = self.groups[gkey]
                .cells
                .iter()
                .copied()
                .filter(|c| !self.cells[*c].is_fixed())
                .collect();
            members.sort_by(|a, b| {
                let (a, b) = (&self.cells[*a], &self.cells[*b]);
                b.is_multi_row().cmp(&a.is_multi_row()).then_with(|| order.cmp(a, b))
            });
            let mut single_pass = true;
            for key in members.iter() {
                if !self.cells[*key].is_placed() && !self.map_move(*key)? {
                    single_pass = false;
                }
            }
            if single_pass {
                continue;
            }
            debug!("Brick-placing group {}", self.groups[gkey].name);
            for key in members.iter() {
                if !self.cells[*key].hold {
                    self.unplace_cell(*key);
                }
            }
            self.brick_place(gkey, &members)?;
        }
        Ok(())
    }

    /// Pack unheld `members` of group `gkey` towards corners:
    /// of the group's bounding box when densely utilized, else of each cell's own region
    fn brick_place(&mut self, gkey: GroupKey, members: &[CellKey]) -> DplResult<()> {
        let sw = self.grid.site_width;
        let dense = self.groups[gkey].util > BRICK_UTIL_THRESHOLD;
        let bbox = self.groups[gkey].bbox;
        let mut targets: Vec<(CellKey, Int, Point, Rect)> = Vec::new();
        for key in members.iter() {
            let cell = &self.cells[*key];
            if cell.hold || cell.is_placed() {
                continue;
            }
            let rect = match (dense, cell.region) {
                (false, Some(r)) => r,
                _ => bbox,
            };
            let init = cell.init_loc(true, sw);
            let p = Point::new(init.x.raw(), init.y.raw());
            let corner = inner_corners(&rect, cell.padded_width(sw).raw(), cell.height.raw())
                .into_iter()
                .min_by_key(|c| c.manhattan(&p))
                .unwrap_or(p);
            targets.push((*key, corner.manhattan(&p), corner, rect));
        }
        // Nearest the corners go first, so that cells pack outward from them
        targets.sort_by_key(|(_, dist, _, _)| *dist);
        for (key, _, corner, rect) in targets {
            let pt = self.grid_pt_inside(key, &rect, corner.x, corner.y);
            if !self.map_move_from(key, pt)? {
                self.record_failure(key);
            }
        }
        Ok(())
    }

    /// Refine the most-displaced members of group `gkey`. Returns the number moved.
    pub(crate) fn group_refine(&mut self, gkey: GroupKey) -> DplResult<usize> {
        let mut members: Vec<CellKey> = self.groups[gkey]
            .cells
            .iter()
            .copied()
            .filter(|c| {
                let cell = &self.cells[*c];
                cell.is_placed() && !cell.is_fixed() && !cell.hold
            })
            .collect();
        members.sort_by(|a, b| {
            let (a, b) = (&self.cells[*a], &self.cells[*b]);
            b.displacement().cmp(&a.displacement()).then_with(|| a.name.cmp(&b.name))
        });
        let count = (members.len() as f64 * self.config.group_refine_percent).ceil() as usize;
        let mut moved = 0;
        for key in members.into_iter().take(count) {
            if self.refine_move(key)? {
                moved += 1;
            }
        }
        Ok(moved)
    }

    /// Random pairwise swaps among the members of group `gkey`. Returns the number kept.
    pub(crate) fn group_anneal(&mut self, gkey: GroupKey) -> DplResult<usize> {
        let members: Vec<CellKey> = self.groups[gkey]
            .cells
            .iter()
            .copied()
            .filter(|c| {
                let cell = &self.cells[*c];
                cell.is_placed() && !cell.is_fixed() && !cell.hold
            })
            .collect();
        if members.len() < 2 {
            return Ok(0);
        }
        let mut swapped = 0;
        for _ in 0..(self.config.group_anneal_swaps_per_cell * members.len()) {
            let a = members[self.rng.gen_range(0..members.len())];
            let b = members[self.rng.gen_range(0..members.len())];
            if self.swap_cells(a, b)? {
                swapped += 1;
            }
        }
        Ok(swapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distances() {
        let r = Rect::new(10, 10, 20, 20);
        assert_eq!(rect_distance(&r, &Point::new(15, 15)), 0);
        assert_eq!(rect_distance(&r, &Point::new(0, 15)), 10);
        assert_eq!(rect_distance(&r, &Point::new(25, 30)), 15);
        let corners = inner_corners(&r, 4, 2);
        assert_eq!(corners[3], Point::new(16, 18));
    }
}

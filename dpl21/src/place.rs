//!
//! # Cell Placement
//!
//! Diamond search for free windows, and the moves built upon it:
//! map, shift, refine, swap, and the random anneal.
//!

// Std-Lib
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};

// Crates.io
use log::{debug, trace};
use rand::Rng;

// Local imports
use crate::cell::{CellKey, CellPlaceOrder, CellState};
use crate::coords::{DbuX, DbuY, GridPt, GridRect, GridX, GridY, HasUnits};
use crate::db::Int;
use crate::error::DplResult;
use crate::grid::{Occupant, Pixel};
use crate::legalizer::Legalizer;

/// Position of offset `(dx, dy)` along its Manhattan ring,
/// clockwise from the ring's north vertex: north-east, south-east, south-west, then north-west sides.
pub fn ring_index(dx: Int, dy: Int) -> Int {
    let r = dx.abs() + dy.abs();
    if dx >= 0 && dy > 0 {
        dx
    } else if dx > 0 && dy <= 0 {
        r - dy
    } else if dx <= 0 && dy < 0 {
        2 * r - dx
    } else {
        3 * r + dy
    }
}

impl Legalizer {
    /// Boolean indication of whether `pixel` is free for cell `key`: empty, or already its own
    fn free_for(pixel: &Pixel, key: CellKey) -> bool {
        match pixel.occupant {
            None => true,
            Some(Occupant::Cell { cell, .. }) => cell == key,
            Some(_) => false,
        }
    }

    /// Range of legal window origins for cell `key`, inclusive at both ends:
    /// the core, clipped to its group's bounding box for group members
    pub(crate) fn search_bounds(&self, key: CellKey) -> GridRect {
        let cell = &self.cells[key];
        let sw = self.grid.site_width;
        let pw = cell.grid_padded_width(sw);
        let mut bounds = GridRect {
            xlo: GridX(0),
            ylo: GridY(0),
            xhi: self.grid.site_count() - pw,
            yhi: self.grid.row_count(cell.layer) - cell.grid_height,
        };
        if let Some(group) = cell.group.and_then(|g| self.groups.get(g)) {
            let within = self.grid.grid_within(cell.layer, &group.bbox);
            bounds.xlo = bounds.xlo.max(within.xlo);
            bounds.ylo = bounds.ylo.max(within.ylo);
            bounds.xhi = bounds.xhi.min(within.xhi - pw);
            bounds.yhi = bounds.yhi.min(within.yhi - cell.grid_height);
        }
        bounds
    }

    ///
    /// Boolean indication of whether cell `key` may be placed with its padded window at `pt`.
    ///
    /// Every own-layer pixel must be free, valid, and of the cell's group (or of none, for ungrouped cells).
    /// Hopeless pixels pass only if `allow_hopeless`.
    /// The row's orientation must suit the master's symmetry, and the edge-spacing rules must hold.
    ///
    pub(crate) fn check_pixels(&self, key: CellKey, pt: GridPt, allow_hopeless: bool) -> bool {
        let cell = &self.cells[key];
        let sw = self.grid.site_width;
        let layer = cell.layer;
        let window = self.grid.cell_window(cell, pt);
        if window.xlo < GridX(0)
            || window.ylo < GridY(0)
            || window.xhi > self.grid.site_count()
            || window.yhi > self.grid.row_count(layer)
        {
            return false;
        }
        let mut y = window.ylo;
        while y < window.yhi {
            let mut x = window.xlo;
            while x < window.xhi {
                let pixel = match self.grid.pixel(layer, x, y) {
                    Some(p) => p,
                    None => return false,
                };
                if !Self::free_for(pixel, key)
                    || !pixel.is_valid
                    || (pixel.is_hopeless && !allow_hopeless)
                    || pixel.group != cell.group
                {
                    return false;
                }
                x += GridX(1);
            }
            y += GridY(1);
        }
        if self.config.disallow_one_site_gaps && self.leaves_one_site_gap(key, window) {
            return false;
        }
        let orient = match self.grid.site_orient(layer, pt.x, pt.y) {
            Some(o) => o,
            None => return false,
        };
        let master = match self.design.masters.get(cell.master) {
            Some(m) => m,
            None => return false,
        };
        if !master.symmetry.allows(orient) {
            return false;
        }
        let x = (pt.x + cell.pad_left).to_dbu(sw);
        let y = self.grid.grid_y_to_dbu(layer, pt.y);
        self.drc
            .check_edge_spacing(&self.grid, &self.design, &self.cells, key, x, y, orient)
    }

    /// Boolean indication of whether `window` would leave a single empty site beside a neighbor, on any row
    fn leaves_one_site_gap(&self, key: CellKey, window: GridRect) -> bool {
        let layer = self.cells[key].layer;
        let is_gap = |x: GridX, y: GridY| {
            self.grid
                .pixel(layer, x, y)
                .map(|p| p.is_valid && Self::free_for(p, key))
                .unwrap_or(false)
        };
        let is_taken = |x: GridX, y: GridY| {
            self.grid
                .pixel(layer, x, y)
                .map(|p| !Self::free_for(p, key) && !matches!(p.occupant, Some(Occupant::Dummy)))
                .unwrap_or(false)
        };
        let mut y = window.ylo;
        while y < window.yhi {
            let left = window.xlo - GridX(1);
            if is_gap(left, y) && is_taken(left - GridX(1), y) {
                return true;
            }
            if is_gap(window.xhi, y) && is_taken(window.xhi + GridX(1), y) {
                return true;
            }
            y += GridY(1);
        }
        false
    }

    ///
    /// Search outward from `start` for the nearest legal window of cell `key`.
    ///
    /// Candidate origins are visited in increasing distance in DBU, `|dx| * site_width + |dy| * row_height`,
    /// ties going first to the smaller ring radius, then clockwise from north.
    /// Offsets are bounded by the displacement limits.
    /// The first pass rejects hopeless pixels beyond the start point itself; the second admits them.
    ///
    pub(crate) fn diamond_search(&self, key: CellKey, start: GridPt) -> Option<GridPt> {
        let bounds = self.search_bounds(key);
        let layer = self.cells[key].layer;
        let (sw, h) = (self.grid.site_width.raw(), self.grid.row_height(layer).raw());
        // Expansion stays on the grid, and within the limits
        let reach = GridRect {
            xlo: (start.x - GridX(self.max_dx)).max(GridX(0)),
            ylo: (start.y - GridY(self.max_dy)).max(GridY(0)),
            xhi: (start.x + GridX(self.max_dx)).min(self.grid.site_count() - GridX(1)),
            yhi: (start.y + GridY(self.max_dy)).min(self.grid.row_count(layer) - GridY(1)),
        };
        let inside = |r: &GridRect, p: GridPt| p.x >= r.xlo && p.x <= r.xhi && p.y >= r.ylo && p.y <= r.yhi;
        for allow_hopeless in [false, true] {
            let mut heap: BinaryHeap<Reverse<(Int, Int, Int, GridX, GridY)>> = BinaryHeap::new();
            let mut seen: HashSet<GridPt> = HashSet::new();
            heap.push(Reverse((0, 0, 0, start.x, start.y)));
            seen.insert(start);
            while let Some(Reverse((dist, r, _, x, y))) = heap.pop() {
                let pt = GridPt::new(x, y);
                if inside(&bounds, pt) && self.check_pixels(key, pt, allow_hopeless || r == 0) {
                    trace!("Found ({}, {}) at {} DBU for {}", pt.x, pt.y, dist, self.cells[key].name);
                    return Some(pt);
                }
                for (nx, ny) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                    let next = GridPt::new(x + GridX(nx), y + GridY(ny));
                    if !inside(&reach, next) || !seen.insert(next) {
                        continue;
                    }
                    let (dx, dy) = ((next.x - start.x).raw(), (next.y - start.y).raw());
                    let dist = dx.abs() * sw + dy.abs() * h;
                    heap.push(Reverse((dist, dx.abs() + dy.abs(), ring_index(dx, dy), next.x, next.y)));
                }
            }
        }
        None
    }

    ///
    /// Legal starting point for the search of cell `key`: its initial location,
    /// clamped into the core and snapped to the nearest site and row.
    /// Starts on hopeless invalid pixels move to the nearest valid one,
    /// and starts on fixed blocks move to the block's nearest edge.
    ///
    pub(crate) fn legal_grid_pt(&self, key: CellKey) -> GridPt {
        let cell = &self.cells[key];
        let sw = self.grid.site_width;
        let layer = cell.layer;
        let h = self.grid.row_height(layer);
        let init = cell.init_loc(true, sw);

        let xmax = self.grid.site_count().to_dbu(sw) - cell.padded_width(sw);
        let ymax = self.grid.row_count(layer).to_dbu(h) - cell.grid_height.to_dbu(h);
        let x = init.x.max(DbuX(0)).min(xmax);
        let y = init.y.max(DbuY(0)).min(ymax);
        let bounds = GridRect {
            xlo: GridX(0),
            ylo: GridY(0),
            xhi: self.grid.site_count() - cell.grid_padded_width(sw),
            yhi: self.grid.row_count(layer) - cell.grid_height,
        };
        let clamp = |pt: GridPt| GridPt::new(pt.x.max(bounds.xlo).min(bounds.xhi), pt.y.max(bounds.ylo).min(bounds.yhi));
        let pt = clamp(GridPt::new(x.grid_round(sw), self.grid.grid_round_y(layer, y)));

        let pixel = match self.grid.pixel(layer, pt.x, pt.y) {
            Some(p) => p,
            None => return pt,
        };
        if pixel.is_hopeless && !pixel.is_valid {
            return clamp(self.move_hopeless(layer, pt));
        }
        if let Some(Occupant::Fixed(block)) = pixel.occupant {
            if self.cells.get(block).map(|b| b.is_block).unwrap_or(false) {
                return clamp(self.nearest_block_edge(key, block, pt));
            }
        }
        pt
    }

    /// Nearest valid pixel to `pt`, scanning left, right, down and up
    fn move_hopeless(&self, layer: usize, pt: GridPt) -> GridPt {
        let valid = |x: GridX, y: GridY| self.grid.pixel(layer, x, y).map(|p| p.is_valid).unwrap_or(false);
        let mut best: Option<(Int, GridPt)> = None;
        let mut consider = |dist: Int, p: GridPt| {
            if best.map(|(d, _)| dist < d).unwrap_or(true) {
                best = Some((dist, p));
            }
        };
        let (site_count, row_count) = (self.grid.site_count(), self.grid.row_count(layer));
        if let Some(x) = (0..pt.x.raw()).rev().map(GridX).find(|x| valid(*x, pt.y)) {
            consider((pt.x - x).raw(), GridPt::new(x, pt.y));
        }
        if let Some(x) = (pt.x.raw()..site_count.raw()).map(GridX).find(|x| valid(*x, pt.y)) {
            consider((x - pt.x).raw(), GridPt::new(x, pt.y));
        }
        if let Some(y) = (0..pt.y.raw()).rev().map(GridY).find(|y| valid(pt.x, *y)) {
            consider((pt.y - y).raw(), GridPt::new(pt.x, y));
        }
        if let Some(y) = (pt.y.raw()..row_count.raw()).map(GridY).find(|y| valid(pt.x, *y)) {
            consider((y - pt.y).raw(), GridPt::new(pt.x, y));
        }
        best.map(|(_, p)| p).unwrap_or(pt)
    }

    /// Move `pt` just outside fixed block `block`, across whichever of its edges is nearest
    fn nearest_block_edge(&self, key: CellKey, block: CellKey, pt: GridPt) -> GridPt {
        let (cell, block) = (&self.cells[key], &self.cells[block]);
        let sw = self.grid.site_width;
        let layer = cell.layer;
        let pw = cell.grid_padded_width(sw);
        let xlo = self.grid.grid_x(block.x);
        let xhi = self.grid.grid_end_x(block.x + block.width);
        let ylo = self.grid.grid_y(layer, block.y);
        let yhi = self.grid.grid_end_y(layer, block.y + block.height);
        let candidates = [
            GridPt::new(xlo - pw, pt.y),
            GridPt::new(xhi, pt.y),
            GridPt::new(pt.x, ylo - cell.grid_height),
            GridPt::new(pt.x, yhi),
        ];
        let bounds = self.search_bounds(key);
        candidates
            .into_iter()
            .filter(|p| p.x >= bounds.xlo && p.x <= bounds.xhi && p.y >= bounds.ylo && p.y <= bounds.yhi)
            .min_by_key(|p| (p.x - pt.x).abs().raw() + (p.y - pt.y).abs().raw())
            .unwrap_or(pt)
    }

    /// Padded grid location of placed cell `key`
    pub(crate) fn grid_pt(&self, key: CellKey) -> GridPt {
        let cell = &self.cells[key];
        GridPt::new(
            cell.grid_padded_x(self.grid.site_width),
            self.grid.grid_y(cell.layer, cell.y),
        )
    }

    /// Paint cell `key` with its padded window at `pt`, and update its location and orientation to match
    pub(crate) fn place_cell(&mut self, key: CellKey, pt: GridPt) -> DplResult<()> {
        let orient = self.grid.paint_pixel(&self.cells, key, pt.x, pt.y)?;
        let sw = self.grid.site_width;
        let y = self.grid.grid_y_to_dbu(self.cells[key].layer, pt.y);
        let cell = &mut self.cells[key];
        cell.x = (pt.x + cell.pad_left).to_dbu(sw);
        cell.y = y;
        cell.orient = orient;
        cell.state = CellState::Placed;
        Ok(())
    }

    /// Erase cell `key` from the grid
    pub(crate) fn unplace_cell(&mut self, key: CellKey) {
        if !self.cells[key].is_placed() {
            return;
        }
        self.grid.erase_pixel(&self.cells, key);
        let cell = &mut self.cells[key];
        cell.state = CellState::Unplaced;
        cell.hold = false;
    }

    ///
    /// Search from the legal start point of `key`, and place it at the first window found.
    /// The search is bounded around the start point, which [Legalizer::legal_grid_pt] may have moved,
    /// so the result is re-checked against the limits measured from the initial location.
    ///
    pub(crate) fn map_move(&mut self, key: CellKey) -> DplResult<bool> {
        let start = self.legal_grid_pt(key);
        match self.diamond_search(key, start) {
            Some(pt) if self.within_limits(key, pt) => {
                self.place_cell(key, pt)?;
                Ok(true)
            }
            Some(pt) => {
                debug!("Nearest window ({}, {}) of {} exceeds its displacement limits", pt.x, pt.y, self.cells[key].name);
                Ok(false)
            }
            None => Ok(false),
        }
    }
    /// Search from `start`, and place `key` at the first window found.
    /// Brick placement starts from group corners, so its results are not held to the displacement limits.
    pub(crate) fn map_move_from(&mut self, key: CellKey, start: GridPt) -> DplResult<bool> {
        match self.diamond_search(key, start) {
            Some(pt) => {
                self.place_cell(key, pt)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    ///
    /// Evict the movable neighbors around the start point of `key`, place it, then re-place the evicted cells.
    /// Only neighbors sharing the cell's in-group status are evicted.
    /// Evicted cells which fail to re-place are recorded as failures.
    ///
    pub(crate) fn shift_move(&mut self, key: CellKey) -> DplResult<bool> {
        const MARGIN: Int = 3;
        let start = self.legal_grid_pt(key);
        let (layer, in_group, margin_x) = {
            let cell = &self.cells[key];
            (
                cell.layer,
                cell.in_group(),
                cell.grid_padded_width(self.grid.site_width) * MARGIN,
            )
        };
        let mut evicted: Vec<CellKey> = Vec::new();
        let mut y = start.y - GridY(MARGIN);
        while y < start.y + GridY(MARGIN) {
            let mut x = start.x - margin_x;
            while x < start.x + margin_x {
                if let Some(Occupant::Cell { cell: other, .. }) = self.grid.pixel(layer, x, y).and_then(|p| p.occupant) {
                    let neighbor = &self.cells[other];
                    if other != key && neighbor.in_group() == in_group && !evicted.contains(&other) {
                        evicted.push(other);
                    }
                }
                x += GridX(1);
            }
            y += GridY(1);
        }
        debug!("Shift move of {} evicts {} cells", self.cells[key].name, evicted.len());
        for other in evicted.iter() {
            self.unplace_cell(*other);
        }
        let placed = self.map_move(key)?;
        for other in evicted {
            if !self.map_move(other)? {
                self.record_failure(other);
            }
        }
        Ok(placed)
    }

    /// Place every movable, ungrouped, unplaced cell
    pub(crate) fn place(&mut self) -> DplResult<()> {
        let order = CellPlaceOrder::new(self.grid.core.dx(), self.grid.core.dy());
        let mut keys: Vec<CellKey> = self
            .cells
            .iter()
            .filter(|(_, c)| !c.is_fixed() && !c.in_group() && !c.is_placed())
            .map(|(k, _)| k)
            .collect();
        keys.sort_by(|a, b| {
            let (a, b) = (&self.cells[*a], &self.cells[*b]);
            b.is_multi_row().cmp(&a.is_multi_row()).then_with(|| order.cmp(a, b))
        });
        for key in keys {
            if self.cells[key].is_placed() {
                continue; // Placed by an earlier shift
            }
            if self.map_move(key)? {
                continue;
            }
            if !(self.config.shift_move && self.shift_move(key)?) {
                self.record_failure(key);
            }
        }
        Ok(())
    }

    /// Manhattan displacement of cell `key` were its padded window at `pt`
    pub(crate) fn displacement_at(&self, key: CellKey, pt: GridPt) -> Int {
        let cell = &self.cells[key];
        let x = (pt.x + cell.pad_left).to_dbu(self.grid.site_width);
        let y = self.grid.grid_y_to_dbu(cell.layer, pt.y);
        (x - cell.init.x).abs().raw() + (y - cell.init.y).abs().raw()
    }

    /// Boolean indication of whether `pt` is within the displacement limits of cell `key`
    pub(crate) fn within_limits(&self, key: CellKey, pt: GridPt) -> bool {
        let cell = &self.cells[key];
        let sw = self.grid.site_width;
        let h = self.grid.row_height(cell.layer);
        let x = (pt.x + cell.pad_left).to_dbu(sw);
        let y = pt.y.to_dbu(h);
        (x - cell.init.x).abs().grid_floor(sw) <= GridX(self.max_dx)
            && (y - cell.init.y).abs().grid_floor(h) <= GridY(self.max_dy)
    }

    ///
    /// Re-search for placed cell `key` from its legal start point, while it remains painted,
    /// and move it to the result if that strictly reduces its displacement within the limits.
    ///
    pub(crate) fn refine_move(&mut self, key: CellKey) -> DplResult<bool> {
        let cell = &self.cells[key];
        if !cell.is_placed() || cell.hold {
            return Ok(false);
        }
        let start = self.legal_grid_pt(key);
        let pt = match self.diamond_search(key, start) {
            Some(pt) => pt,
            None => return Ok(false),
        };
        if !self.within_limits(key, pt) || self.displacement_at(key, pt) >= self.cells[key].displacement() {
            return Ok(false);
        }
        self.unplace_cell(key);
        self.place_cell(key, pt)?;
        Ok(true)
    }

    ///
    /// Swap the locations of placed cells `a` and `b`, if that strictly reduces their total displacement.
    /// Both must be movable, not held, of the same group and of the same padded size.
    /// Undone if either fails its checks at the other's location.
    ///
    pub(crate) fn swap_cells(&mut self, a: CellKey, b: CellKey) -> DplResult<bool> {
        if a == b {
            return Ok(false);
        }
        let sw = self.grid.site_width;
        {
            let (ca, cb) = (&self.cells[a], &self.cells[b]);
            if ca.is_fixed()
                || cb.is_fixed()
                || !ca.is_placed()
                || !cb.is_placed()
                || ca.hold
                || cb.hold
                || ca.group != cb.group
                || ca.layer != cb.layer
                || ca.width != cb.width
                || ca.height != cb.height
                || ca.grid_padded_width(sw) != cb.grid_padded_width(sw)
            {
                return Ok(false);
            }
        }
        let (pa, pb) = (self.grid_pt(a), self.grid_pt(b));
        let before = self.cells[a].displacement() + self.cells[b].displacement();
        let after = self.displacement_at(a, pb) + self.displacement_at(b, pa);
        if after >= before || !self.within_limits(a, pb) || !self.within_limits(b, pa) {
            return Ok(false);
        }
        self.unplace_cell(a);
        self.unplace_cell(b);
        if self.check_pixels(a, pb, true) {
            self.place_cell(a, pb)?;
            if self.check_pixels(b, pa, true) {
                self.place_cell(b, pa)?;
                return Ok(true);
            }
            self.unplace_cell(a);
        }
        self.place_cell(a, pa)?;
        self.place_cell(b, pb)?;
        Ok(false)
    }

    ///
    /// Refine the most-displaced cells: re-search each, or failing that,
    /// swap it with whichever cell occupies its starting location.
    ///
    pub(crate) fn refine(&mut self) -> DplResult<()> {
        let mut keys: Vec<CellKey> = self
            .cells
            .iter()
            .filter(|(_, c)| c.is_placed() && !c.is_fixed() && !c.hold)
            .map(|(k, _)| k)
            .collect();
        keys.sort_by(|a, b| {
            let (a, b) = (&self.cells[*a], &self.cells[*b]);
            b.displacement().cmp(&a.displacement()).then_with(|| a.name.cmp(&b.name))
        });
        let count = (keys.len() as f64 * self.config.refine_percent).ceil() as usize;
        let (mut moved, mut swapped) = (0, 0);
        for key in keys.into_iter().take(count) {
            if self.refine_move(key)? {
                moved += 1;
                continue;
            }
            let start = self.legal_grid_pt(key);
            let layer = self.cells[key].layer;
            if let Some(Occupant::Cell { cell: other, .. }) =
                self.grid.pixel(layer, start.x, start.y).and_then(|p| p.occupant)
            {
                if other != key && self.swap_cells(key, other)? {
                    swapped += 1;
                }
            }
        }
        debug!("Refinement: {} moved, {} swapped", moved, swapped);
        Ok(())
    }

    ///
    /// Random greedy improvement: repeated trial swaps and re-searches of randomly chosen ungrouped cells,
    /// each kept only if it reduces displacement.
    ///
    pub(crate) fn anneal(&mut self) -> DplResult<()> {
        let keys: Vec<CellKey> = self
            .cells
            .iter()
            .filter(|(_, c)| c.is_placed() && !c.is_fixed() && !c.hold && !c.in_group())
            .map(|(k, _)| k)
            .collect();
        if keys.len() < 2 {
            return Ok(());
        }
        let iters = self.config.anneal_swaps_per_cell * keys.len();
        let mut improved = 0;
        for _ in 0..iters {
            let a = keys[self.rng.gen_range(0..keys.len())];
            let success = match self.rng.gen_bool(0.5) {
                true => {
                    let b = keys[self.rng.gen_range(0..keys.len())];
                    self.swap_cells(a, b)?
                }
                false => self.refine_move(a)?,
            };
            if success {
                improved += 1;
            }
        }
        debug!("Anneal: {} improvements over {} trials", improved, iters);
        Ok(())
    }
}

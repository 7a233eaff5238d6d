//!
//! # Placement Grid
//!
//! One [GridLayer] of [Pixel]s per distinct row height.
//! Every layer shares the core's site width and spans the whole core,
//! so a pixel `(x, y)` of one layer overlaps the pixels of column `x` in every other,
//! at rows given by [map_coordinate].
//!
//! A placed cell occupies pixels in its own layer and in every other layer it overlaps.
//! All occupancy changes pass through [Grid::visit_cell_pixels], [Grid::paint_pixel] and [Grid::erase_pixel].
//!

// Crates.io
use log::{debug, trace};
use slotmap::SlotMap;

// Local imports
use crate::cell::{Cell, CellKey};
use crate::coords::{map_coordinate, DbuX, DbuY, GridPt, GridRect, GridX, GridY, HasUnits};
use crate::db::{Design, GroupKey, Int, Master, Orient, Rect, SiteClass};
use crate::error::{DplError, DplResult, ErrorContext, ErrorHelper};

/// # Pixel Occupants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occupant {
    /// A movable cell, and the index of its own layer
    Cell { cell: CellKey, layer: usize },
    /// A fixed cell or obstruction
    Fixed(CellKey),
    /// Sentinel for pixels which no cell may use, such as those partially covered by a group region
    Dummy,
}
impl Occupant {
    /// The occupying cell, if any
    pub fn cell(&self) -> Option<CellKey> {
        match self {
            Self::Cell { cell, .. } => Some(*cell),
            Self::Fixed(cell) => Some(*cell),
            Self::Dummy => None,
        }
    }
}

/// # Pixel
///
/// The state of one site of one row of one [GridLayer].
#[derive(Debug, Clone)]
pub struct Pixel {
    pub occupant: Option<Occupant>,
    /// Group whose regions fully cover this pixel
    pub group: Option<GroupKey>,
    pub util: f64,
    /// Covered by a row
    pub is_valid: bool,
    /// Too far from any row for a search to reach a free site
    pub is_hopeless: bool,
    /// Orientation of the covering row
    pub orient: Orient,
}
impl Default for Pixel {
    fn default() -> Self {
        Self {
            occupant: None,
            group: None,
            util: 0.0,
            is_valid: false,
            is_hopeless: false,
            orient: Orient::R0,
        }
    }
}
impl Pixel {
    /// Boolean indication of an empty pixel, whether or not valid
    pub fn is_empty(&self) -> bool {
        self.occupant.is_none()
    }
}

/// # Grid Layer
///
/// The pixels of a single row height, stored row-major.
#[derive(Debug, Clone)]
pub struct GridLayer {
    pub index: usize,
    pub row_height: DbuY,
    pub row_count: GridY,
    pub site_count: GridX,
    pixels: Vec<Pixel>,
}
impl GridLayer {
    fn new(index: usize, row_height: DbuY, row_count: GridY, site_count: GridX) -> Self {
        let npixels = (row_count.raw().max(0) * site_count.raw().max(0)) as usize;
        Self {
            index,
            row_height,
            row_count,
            site_count,
            pixels: vec![Pixel::default(); npixels],
        }
    }
    fn idx(&self, x: GridX, y: GridY) -> Option<usize> {
        if x < GridX(0) || x >= self.site_count || y < GridY(0) || y >= self.row_count {
            return None;
        }
        Some((y.raw() * self.site_count.raw() + x.raw()) as usize)
    }
    /// Get the pixel at `(x, y)`, or `None` if out of range
    pub fn pixel(&self, x: GridX, y: GridY) -> Option<&Pixel> {
        self.idx(x, y).map(|i| &self.pixels[i])
    }
    pub fn pixel_mut(&mut self, x: GridX, y: GridY) -> Option<&mut Pixel> {
        self.idx(x, y).map(move |i| &mut self.pixels[i])
    }
    /// Iterate over all pixels
    pub fn pixels(&self) -> impl Iterator<Item = &Pixel> {
        self.pixels.iter()
    }
    pub fn pixels_mut(&mut self) -> impl Iterator<Item = &mut Pixel> {
        self.pixels.iter_mut()
    }
}

/// Sides of a cell, for [Grid::visit_cell_boundary_pixels]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    North,
    South,
    East,
    West,
}

/// Pixel ranges, half-open, within a single layer
#[derive(Debug, Clone, Copy)]
struct PixelRange {
    layer: usize,
    x: (GridX, GridX),
    y: (GridY, GridY),
}

/// Row-examination context, for error reporting
struct RowExaminer<'d> {
    design: &'d Design,
    row: Option<usize>,
}
impl ErrorHelper for RowExaminer<'_> {
    fn err(&self, msg: impl Into<String>) -> DplError {
        let mut context = Vec::new();
        if let Some(row) = self.row.and_then(|r| self.design.rows.get(r)) {
            context.push(ErrorContext::Row(row.name.clone()));
            if let Ok(site) = self.design.site(row.site) {
                context.push(ErrorContext::Site(site.name.clone()));
            }
        }
        DplError::config(msg, context)
    }
}

///
/// # Placement Grid
///
#[derive(Debug, Clone)]
pub struct Grid {
    /// Core area, in absolute design coordinates
    pub core: Rect,
    pub site_width: DbuX,
    /// Layers, in increasing order of row height
    layers: Vec<GridLayer>,
}
impl Grid {
    ///
    /// Build the grid from `design`'s rows.
    ///
    /// Pad-site rows are ignored. All others must share a single site width.
    /// Pixels covered by a row become valid, taking on its orientation.
    /// Pixels beyond `max_disp - safety` sites or rows of every row are marked hopeless.
    ///
    pub fn new(design: &Design, max_disp_x: Int, max_disp_y: Int, safety: Int) -> DplResult<Self> {
        let mut examiner = RowExaminer { design, row: None };

        // Collect the usable rows, and check their site widths
        let mut site_width: Option<Int> = None;
        let mut heights: Vec<Int> = Vec::new();
        let mut rows = Vec::new();
        let mut bbox: Option<Rect> = None;
        for (idx, row) in design.rows.iter().enumerate() {
            examiner.row = Some(idx);
            let site = examiner.unwrap(design.sites.get(row.site), "Row refers to an unknown site")?;
            if site.class == SiteClass::Pad {
                continue;
            }
            examiner.assert(site.width > 0 && site.height > 0, "Sites must have positive size")?;
            match site_width {
                None => site_width = Some(site.width),
                Some(w) if w != site.width => {
                    return examiner.fail(format!(
                        "Conflicting site widths {} and {}; all rows must share one site width",
                        w, site.width
                    ));
                }
                _ => (),
            }
            if !heights.contains(&site.height) {
                heights.push(site.height);
            }
            let rect = design.row_bbox(row)?;
            bbox = Some(match bbox {
                Some(b) => b.union(&rect),
                None => rect,
            });
            rows.push((row, site.height));
        }
        examiner.row = None;
        let site_width = examiner.unwrap(site_width, "No usable rows")?;
        let core = examiner.unwrap(design.core.or(bbox), "No usable rows")?;
        examiner.assert(core.dx() > 0 && core.dy() > 0, "Empty core area")?;
        heights.sort_unstable();

        let site_count = GridX(core.dx() / site_width);
        let mut layers: Vec<GridLayer> = heights
            .iter()
            .enumerate()
            .map(|(idx, h)| GridLayer::new(idx, DbuY(*h), GridY(core.dy() / h), site_count))
            .collect();

        // Hopeless-region bookkeeping: everything starts hopeless, and each row clears its neighborhood
        let mut hopeless: Vec<Vec<bool>> = layers.iter().map(|l| vec![true; l.pixels.len()]).collect();
        let margin_x = GridX(max_disp_x - safety);
        let margin_y = GridY(max_disp_y - safety);

        for (row, height) in rows {
            let lidx = heights.binary_search(&height).unwrap_or(0);
            let layer = &mut layers[lidx];
            let x_start = DbuX(row.origin.x - core.xlo).grid_floor(DbuX(site_width));
            let x_end = x_start + GridX(row.site_count as Int);
            let y_row = DbuY(row.origin.y - core.ylo).grid_floor(layer.row_height);
            let mut x = x_start;
            while x < x_end {
                if let Some(pixel) = layer.pixel_mut(x, y_row) {
                    pixel.is_valid = true;
                    pixel.orient = row.orient;
                }
                x += GridX(1);
            }
            let xl = (x_start - margin_x).max(GridX(0));
            let xh = (x_end + margin_x).min(layer.site_count);
            let yl = (y_row - margin_y).max(GridY(0));
            let yh = (y_row + GridY(1) + margin_y).min(layer.row_count);
            let mut y = yl;
            while y < yh {
                let mut x = xl;
                while x < xh {
                    if let Some(i) = layer.idx(x, y) {
                        hopeless[lidx][i] = false;
                    }
                    x += GridX(1);
                }
                y += GridY(1);
            }
        }
        for (layer, hopeless) in layers.iter_mut().zip(hopeless) {
            for (pixel, h) in layer.pixels.iter_mut().zip(hopeless) {
                pixel.is_hopeless = h;
            }
            debug!(
                "Grid layer {}: row height {}, {} rows of {} sites",
                layer.index, layer.row_height, layer.row_count, layer.site_count
            );
        }
        Ok(Self {
            core,
            site_width: DbuX(site_width),
            layers,
        })
    }
    /// Create an empty grid, with no layers. Placeholder until an import builds the real one.
    pub fn empty() -> Self {
        Self {
            core: Rect::default(),
            site_width: DbuX(1),
            layers: Vec::new(),
        }
    }
    pub fn layers(&self) -> &[GridLayer] {
        &self.layers
    }
    pub fn layer(&self, idx: usize) -> &GridLayer {
        &self.layers[idx]
    }
    pub fn layer_mut(&mut self, idx: usize) -> &mut GridLayer {
        &mut self.layers[idx]
    }
    /// Index of the layer with row height `height`, if any
    pub fn layer_for_height(&self, height: DbuY) -> Option<usize> {
        self.layers.binary_search_by(|l| l.row_height.cmp(&height)).ok()
    }
    pub fn row_height(&self, layer: usize) -> DbuY {
        self.layers[layer].row_height
    }
    pub fn row_count(&self, layer: usize) -> GridY {
        self.layers[layer].row_count
    }
    pub fn site_count(&self) -> GridX {
        self.layers.first().map(|l| l.site_count).unwrap_or_default()
    }
    /// Get the pixel at `(x, y)` of layer `layer`, or `None` if out of range
    pub fn pixel(&self, layer: usize, x: GridX, y: GridY) -> Option<&Pixel> {
        self.layers.get(layer)?.pixel(x, y)
    }
    pub fn pixel_mut(&mut self, layer: usize, x: GridX, y: GridY) -> Option<&mut Pixel> {
        self.layers.get_mut(layer)?.pixel_mut(x, y)
    }
    /// Orientation of the row at `(x, y)`, if the pixel is valid
    pub fn site_orient(&self, layer: usize, x: GridX, y: GridY) -> Option<Orient> {
        self.pixel(layer, x, y).filter(|p| p.is_valid).map(|p| p.orient)
    }

    // Unit conversions
    pub fn grid_x(&self, x: DbuX) -> GridX {
        x.grid_floor(self.site_width)
    }
    pub fn grid_end_x(&self, x: DbuX) -> GridX {
        x.grid_ceil(self.site_width)
    }
    pub fn grid_y(&self, layer: usize, y: DbuY) -> GridY {
        y.grid_floor(self.row_height(layer))
    }
    pub fn grid_end_y(&self, layer: usize, y: DbuY) -> GridY {
        y.grid_ceil(self.row_height(layer))
    }
    pub fn grid_round_y(&self, layer: usize, y: DbuY) -> GridY {
        y.grid_round(self.row_height(layer))
    }
    pub fn grid_x_to_dbu(&self, x: GridX) -> DbuX {
        x.to_dbu(self.site_width)
    }
    pub fn grid_y_to_dbu(&self, layer: usize, y: GridY) -> DbuY {
        y.to_dbu(self.row_height(layer))
    }
    /// The largest grid rectangle inside core-relative `rect`
    pub fn grid_within(&self, layer: usize, rect: &Rect) -> GridRect {
        GridRect {
            xlo: self.grid_end_x(DbuX(rect.xlo)),
            ylo: self.grid_end_y(layer, DbuY(rect.ylo)),
            xhi: self.grid_x(DbuX(rect.xhi)),
            yhi: self.grid_y(layer, DbuY(rect.yhi)),
        }
    }
    /// The smallest grid rectangle covering core-relative `rect`
    pub fn grid_covering(&self, layer: usize, rect: &Rect) -> GridRect {
        GridRect {
            xlo: self.grid_x(DbuX(rect.xlo)),
            ylo: self.grid_y(layer, DbuY(rect.ylo)),
            xhi: self.grid_end_x(DbuX(rect.xhi)),
            yhi: self.grid_end_y(layer, DbuY(rect.yhi)),
        }
    }
    /// Boolean indication of whether `cell` can fit within the core at all
    pub fn cell_fits_in_core(&self, cell: &Cell) -> bool {
        cell.grid_padded_width(self.site_width) <= self.site_count()
            && cell.grid_height <= self.row_count(cell.layer)
    }
    /// Pixel-window of `cell` at padded grid location `(x, y)`, in its own layer
    pub fn cell_window(&self, cell: &Cell, pt: GridPt) -> GridRect {
        GridRect {
            xlo: pt.x,
            ylo: pt.y,
            xhi: pt.x + cell.grid_padded_width(self.site_width),
            yhi: pt.y + cell.grid_height,
        }
    }
    /// Map own-layer rows `[y0, y1)` of `layer` onto layer `target`, always covering at least one row
    fn map_rows(&self, layer: usize, y0: GridY, y1: GridY, target: usize) -> (GridY, GridY) {
        let (from, to) = (self.row_height(layer), self.row_height(target));
        let start = map_coordinate(y0, from, to, true);
        let mut end = map_coordinate(y1, from, to, false);
        if end == start {
            end += GridY(1);
        }
        (start, end.min(self.row_count(target)))
    }

    /// Compute the pixel ranges of `cell`, across all layers.
    /// Masters with overlap obstructions cover only their obstructions.
    fn cell_ranges(&self, cell: &Cell, master: &Master, padded: bool) -> Vec<PixelRange> {
        let mut ranges = Vec::new();
        let obstructions: Vec<&Rect> = master.overlap_obstructions().collect();
        if !obstructions.is_empty() {
            for obs in obstructions {
                let rect = cell
                    .orient
                    .apply_rect(obs, master.width, master.height)
                    .shift(&crate::db::Point::new(cell.x.raw(), cell.y.raw()));
                for layer in 0..self.layers.len() {
                    let r = self.grid_covering(layer, &rect);
                    ranges.push(PixelRange {
                        layer,
                        x: (r.xlo, r.xhi),
                        y: (r.ylo, r.yhi),
                    });
                }
            }
            return ranges;
        }
        let (x0, mut x1) = match padded {
            true => (
                cell.grid_padded_x(self.site_width),
                cell.grid_padded_end_x(self.site_width),
            ),
            false => (self.grid_x(cell.x), self.grid_end_x(cell.x + cell.width)),
        };
        if x1 == x0 {
            x1 += GridX(1);
        }
        let y0 = self.grid_y(cell.layer, cell.y);
        let y1 = self.grid_end_y(cell.layer, cell.y + cell.height);
        for layer in 0..self.layers.len() {
            ranges.push(PixelRange {
                layer,
                x: (x0, x1),
                y: self.map_rows(cell.layer, y0, y1, layer),
            });
        }
        ranges
    }

    ///
    /// Visit every pixel `cell` covers at its current location, in every layer, as [Grid::cell_ranges] defines them.
    ///
    pub fn visit_cell_pixels(
        &mut self,
        cell: &Cell,
        master: &Master,
        padded: bool,
        mut visitor: impl FnMut(&mut Pixel),
    ) {
        for range in self.cell_ranges(cell, master, padded) {
            let layer = &mut self.layers[range.layer];
            let mut y = range.y.0;
            while y < range.y.1 {
                let mut x = range.x.0;
                while x < range.x.1 {
                    if let Some(pixel) = layer.pixel_mut(x, y) {
                        visitor(pixel);
                    }
                    x += GridX(1);
                }
                y += GridY(1);
            }
        }
    }

    ///
    /// Visit the edge pixels of `cell` in its own layer.
    /// Visits north and south edges along each column, then west and east edges along each row.
    ///
    pub fn visit_cell_boundary_pixels(
        &self,
        cell: &Cell,
        master: &Master,
        padded: bool,
        mut visitor: impl FnMut(&Pixel, Side, GridX, GridY),
    ) {
        let layer = &self.layers[cell.layer];
        for range in self.cell_ranges(cell, master, padded) {
            if range.layer != cell.layer {
                continue;
            }
            let ((x0, x1), (y0, y1)) = (range.x, range.y);
            let mut x = x0;
            while x < x1 {
                if let Some(p) = layer.pixel(x, y1 - GridY(1)) {
                    visitor(p, Side::North, x, y1 - GridY(1));
                }
                if let Some(p) = layer.pixel(x, y0) {
                    visitor(p, Side::South, x, y0);
                }
                x += GridX(1);
            }
            let mut y = y0;
            while y < y1 {
                if let Some(p) = layer.pixel(x0, y) {
                    visitor(p, Side::West, x0, y);
                }
                if let Some(p) = layer.pixel(x1 - GridX(1), y) {
                    visitor(p, Side::East, x1 - GridX(1), y);
                }
                y += GridY(1);
            }
        }
    }

    /// Mark the pixels of fixed cell `key` as occupied, in every layer
    pub fn paint_fixed(&mut self, key: CellKey, cell: &Cell, master: &Master) {
        self.visit_cell_pixels(cell, master, true, |pixel| {
            pixel.occupant = Some(Occupant::Fixed(key));
            pixel.util = 1.0;
        });
    }
    /// Mark the unpadded pixels of already-placed cell `key` as occupied, leaving any existing occupant in place.
    /// Used to rebuild occupancy from a design's current locations.
    pub fn paint_existing(&mut self, key: CellKey, cell: &Cell, master: &Master) {
        let occupant = match cell.is_fixed() {
            true => Occupant::Fixed(key),
            false => Occupant::Cell {
                cell: key,
                layer: cell.layer,
            },
        };
        self.visit_cell_pixels(cell, master, false, |pixel| {
            if pixel.occupant.is_none() {
                pixel.occupant = Some(occupant);
                pixel.util = 1.0;
            }
        });
    }

    /// Occupy empty pixels of rows `[y0, y1)` and sites `[x0, x1)` of `layer` with `occupant`,
    /// along with the rows they map to in every other layer
    pub fn occupy(&mut self, layer: usize, x: (GridX, GridX), y: (GridY, GridY), occupant: Occupant) {
        for lidx in 0..self.layers.len() {
            let (ly0, ly1) = match lidx == layer {
                true => y,
                false => self.map_rows(layer, y.0, y.1, lidx),
            };
            let target = &mut self.layers[lidx];
            let mut yy = ly0;
            while yy < ly1 {
                let mut xx = x.0;
                while xx < x.1 {
                    if let Some(p) = target.pixel_mut(xx, yy) {
                        if p.occupant.is_none() {
                            p.occupant = Some(occupant);
                            p.util = 1.0;
                        }
                    }
                    xx += GridX(1);
                }
                yy += GridY(1);
            }
        }
    }

    ///
    /// Paint movable cell `key` with its padded window at grid location `(x, y)` of its own layer.
    ///
    /// Own-layer pixels must all be empty. In other layers, pixels held by a cell of that layer's own height
    /// are a conflict, while pixels held by cells of other heights, fixed cells or sentinels are left to them.
    /// Either conflict is a [DplError::PaintConflict].
    ///
    /// Returns the orientation of the row painted upon.
    ///
    pub fn paint_pixel(
        &mut self,
        cells: &SlotMap<CellKey, Cell>,
        key: CellKey,
        x: GridX,
        y: GridY,
    ) -> DplResult<Orient> {
        let cell = cells.get(key).ok_or_else(|| DplError::msg("Painting unknown cell"))?;
        let own = cell.layer;
        let window = self.cell_window(cell, GridPt::new(x, y));
        let conflict = |other: Option<CellKey>, layer: usize| DplError::PaintConflict {
            cell: cell.name.clone(),
            other: other
                .and_then(|k| cells.get(k))
                .map(|c| c.name.clone())
                .unwrap_or_else(|| "<blockage>".into()),
            layer,
        };

        // Own layer: all or nothing
        {
            let layer = &self.layers[own];
            let mut yy = window.ylo;
            while yy < window.yhi {
                let mut xx = window.xlo;
                while xx < window.xhi {
                    match layer.pixel(xx, yy) {
                        None => return DplError::fail(format!("Painting {} off the grid", cell.name)),
                        Some(p) => {
                            if let Some(occ) = p.occupant {
                                return Err(conflict(occ.cell(), own));
                            }
                        }
                    }
                    xx += GridX(1);
                }
                yy += GridY(1);
            }
        }
        let occupant = Occupant::Cell {
            cell: key,
            layer: own,
        };
        for lidx in 0..self.layers.len() {
            let (y0, y1) = match lidx == own {
                true => (window.ylo, window.yhi),
                false => self.map_rows(own, window.ylo, window.yhi, lidx),
            };
            let layer = &mut self.layers[lidx];
            let mut yy = y0;
            while yy < y1 {
                let mut xx = window.xlo;
                while xx < window.xhi {
                    if let Some(p) = layer.pixel_mut(xx, yy) {
                        match p.occupant {
                            None => {
                                p.occupant = Some(occupant);
                                p.util = 1.0;
                            }
                            Some(Occupant::Cell { cell: other, layer }) if layer == lidx => {
                                return Err(conflict(Some(other), lidx));
                            }
                            // Partially covered by a shorter or taller cell, a blockage or sentinel
                            Some(_) => trace!("Skipping shared pixel ({}, {}) of layer {}", xx, yy, lidx),
                        }
                    }
                    xx += GridX(1);
                }
                yy += GridY(1);
            }
        }
        self.site_orient(own, window.xlo, window.ylo)
            .ok_or_else(|| DplError::msg(format!("Painting {} onto an invalid site", cell.name)))
    }

    ///
    /// Clear the pixels held by movable cell `key` at its current location.
    ///
    /// Pixels of other layers shared with a neighbor are handed to that neighbor,
    /// so that a cell of one height leaving never exposes a half-occupied pixel of another.
    ///
    pub fn erase_pixel(&mut self, cells: &SlotMap<CellKey, Cell>, key: CellKey) {
        let cell = match cells.get(key) {
            Some(c) => c,
            None => return,
        };
        let own = cell.layer;
        let x0 = cell.grid_padded_x(self.site_width);
        let x1 = cell.grid_padded_end_x(self.site_width);
        let y0 = self.grid_y(own, cell.y);
        let y1 = y0 + cell.grid_height;

        let mut cleared: Vec<(usize, GridX, GridY)> = Vec::new();
        for lidx in 0..self.layers.len() {
            let (ly0, ly1) = match lidx == own {
                true => (y0, y1),
                false => self.map_rows(own, y0, y1, lidx),
            };
            let layer = &mut self.layers[lidx];
            let mut yy = ly0;
            while yy < ly1 {
                let mut xx = x0;
                while xx < x1 {
                    if let Some(p) = layer.pixel_mut(xx, yy) {
                        if p.occupant.and_then(|o| o.cell()) == Some(key) {
                            p.occupant = None;
                            p.util = 0.0;
                            if lidx != own {
                                cleared.push((lidx, xx, yy));
                            }
                        }
                    }
                    xx += GridX(1);
                }
                yy += GridY(1);
            }
        }
        // Hand shared pixels to any other cell overlapping them from its own layer
        let mut reclaimed = Vec::new();
        for (lidx, xx, yy) in cleared {
            let h = self.row_height(lidx);
            let (lo, hi) = (yy.to_dbu(h), (yy + GridY(1)).to_dbu(h));
            'layers: for (midx, layer) in self.layers.iter().enumerate() {
                if midx == lidx {
                    continue;
                }
                let mut r = lo.grid_floor(layer.row_height);
                let r1 = hi.grid_ceil(layer.row_height);
                while r < r1 {
                    if let Some(Occupant::Cell { cell, layer: m }) = layer.pixel(xx, r).and_then(|p| p.occupant) {
                        if m == midx && cell != key {
                            reclaimed.push((lidx, xx, yy, Occupant::Cell { cell, layer: m }));
                            break 'layers;
                        }
                    }
                    r += GridY(1);
                }
            }
        }
        for (lidx, xx, yy, occ) in reclaimed {
            if let Some(p) = self.pixel_mut(lidx, xx, yy) {
                p.occupant = Some(occ);
                p.util = 1.0;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellState;
    use crate::coords::DbuPt;
    use crate::db::{InstKey, MasterBuilder, MasterKey, Point, SiteBuilder};

    /// Core of 20 sites by 4 single-height rows, plus 2 double-height rows on top of them
    fn two_height_design() -> DplResult<Design> {
        let mut design = Design::new("grid");
        let sc = design.add_site(
            SiteBuilder::default()
                .name("sc")
                .width(10)
                .height(100)
                .build()
                .map_err(|e| DplError::msg(e.to_string()))?,
        );
        let dh = design.add_site(
            SiteBuilder::default()
                .name("dh")
                .width(10)
                .height(200)
                .build()
                .map_err(|e| DplError::msg(e.to_string()))?,
        );
        for r in 0..4 {
            let orient = if r % 2 == 0 { Orient::R0 } else { Orient::MX };
            design.add_row(format!("r{}", r), sc, Point::new(0, 100 * r), orient, 20);
        }
        for r in 0..2 {
            design.add_row(format!("d{}", r), dh, Point::new(0, 200 * r), Orient::R0, 20);
        }
        Ok(design)
    }

    fn cell(layer: usize, x: Int, y: Int, w: Int, h: Int, grid_height: Int) -> Cell {
        Cell {
            inst: InstKey::default(),
            name: format!("c{}_{}", x, y),
            master: MasterKey::default(),
            x: DbuX(x),
            y: DbuY(y),
            init: DbuPt::new(DbuX(x), DbuY(y)),
            width: DbuX(w),
            height: DbuY(h),
            orient: Orient::R0,
            state: CellState::Unplaced,
            hold: false,
            group: None,
            region: None,
            layer,
            grid_height: GridY(grid_height),
            pad_left: GridX(0),
            pad_right: GridX(0),
            is_block: false,
        }
    }

    #[test]
    fn layers_by_height() -> DplResult<()> {
        let design = two_height_design()?;
        let grid = Grid::new(&design, 500, 100, 20)?;
        assert_eq!(grid.layers().len(), 2);
        assert_eq!(grid.row_height(0), DbuY(100));
        assert_eq!(grid.row_count(0), GridY(4));
        assert_eq!(grid.row_count(1), GridY(2));
        assert_eq!(grid.site_count(), GridX(20));
        assert_eq!(grid.layer_for_height(DbuY(200)), Some(1));
        assert_eq!(grid.layer_for_height(DbuY(300)), None);
        assert_eq!(grid.site_orient(0, GridX(3), GridY(1)), Some(Orient::MX));
        assert!(grid.pixel(0, GridX(20), GridY(0)).is_none());
        Ok(())
    }

    #[test]
    fn conflicting_site_widths() -> DplResult<()> {
        let mut design = two_height_design()?;
        let wide = design.add_site(
            SiteBuilder::default()
                .name("wide")
                .width(20)
                .height(100)
                .build()
                .map_err(|e| DplError::msg(e.to_string()))?,
        );
        design.add_row("bad", wide, Point::new(0, 0), Orient::R0, 5);
        match Grid::new(&design, 500, 100, 20) {
            Err(DplError::Config { context, .. }) => {
                assert!(context.contains(&ErrorContext::Row("bad".into())));
            }
            other => panic!("Expected a config error, got {:?}", other.map(|_| ())),
        }
        Ok(())
    }

    #[test]
    fn fragmented_rows_and_hopeless() -> DplResult<()> {
        let mut design = Design::new("frag");
        let sc = design.add_site(
            SiteBuilder::default()
                .name("sc")
                .width(10)
                .height(100)
                .build()
                .map_err(|e| DplError::msg(e.to_string()))?,
        );
        design.core = Some(Rect::new(0, 0, 1000, 300));
        design.add_row("r0", sc, Point::new(0, 0), Orient::R0, 10);
        let grid = Grid::new(&design, 25, 21, 20)?;
        // Only the row's own ten sites are valid
        assert!(grid.pixel(0, GridX(9), GridY(0)).map(|p| p.is_valid).unwrap_or(false));
        assert!(!grid.pixel(0, GridX(10), GridY(0)).map(|p| p.is_valid).unwrap_or(true));
        // Five sites and one row of margin around the row are reachable
        assert!(!grid.pixel(0, GridX(14), GridY(1)).map(|p| p.is_hopeless).unwrap_or(true));
        assert!(grid.pixel(0, GridX(15), GridY(0)).map(|p| p.is_hopeless).unwrap_or(false));
        assert!(grid.pixel(0, GridX(0), GridY(2)).map(|p| p.is_hopeless).unwrap_or(false));
        Ok(())
    }

    #[test]
    fn cross_layer_paint_and_erase() -> DplResult<()> {
        let design = two_height_design()?;
        let mut grid = Grid::new(&design, 500, 100, 20)?;
        let mut cells: SlotMap<CellKey, Cell> = SlotMap::with_key();
        let a = cells.insert(cell(0, 0, 0, 30, 100, 1));
        let b = cells.insert(cell(0, 0, 100, 30, 100, 1));
        let d = cells.insert(cell(1, 0, 0, 30, 200, 1));

        grid.paint_pixel(&cells, a, GridX(2), GridY(0))?;
        grid.paint_pixel(&cells, b, GridX(2), GridY(1))?;
        cells[a].x = DbuX(20);
        cells[b].x = DbuX(20);
        cells[b].y = DbuY(100);
        // Both single-height cells overlap double-height row 0
        let owner = |g: &Grid, l: usize, x: Int, y: Int| g.pixel(l, GridX(x), GridY(y)).and_then(|p| p.occupant);
        assert_eq!(owner(&grid, 1, 2, 0), Some(Occupant::Cell { cell: a, layer: 0 }));
        assert_eq!(owner(&grid, 1, 4, 0), Some(Occupant::Cell { cell: a, layer: 0 }));

        // A double-height cell there is a conflict in its own layer
        assert!(matches!(
            grid.paint_pixel(&cells, d, GridX(3), GridY(0)),
            Err(DplError::PaintConflict { .. })
        ));

        // Erasing one single-height cell leaves the shared pixel with the other
        grid.erase_pixel(&cells, a);
        assert_eq!(owner(&grid, 0, 2, 0), None);
        assert_eq!(owner(&grid, 1, 2, 0), Some(Occupant::Cell { cell: b, layer: 0 }));
        grid.erase_pixel(&cells, b);
        assert_eq!(owner(&grid, 1, 2, 0), None);

        // With both gone, the double-height cell paints, into both of its single-height rows
        let orient = grid.paint_pixel(&cells, d, GridX(3), GridY(0))?;
        assert_eq!(orient, Orient::R0);
        assert_eq!(owner(&grid, 0, 3, 1), Some(Occupant::Cell { cell: d, layer: 1 }));
        Ok(())
    }

    #[test]
    fn obstruction_pixels() -> DplResult<()> {
        let design = two_height_design()?;
        let mut grid = Grid::new(&design, 500, 100, 20)?;
        let master = MasterBuilder::default()
            .name("MACRO")
            .width(100)
            .height(200)
            .obstructions(vec![crate::db::Obstruction {
                kind: crate::db::ObsKind::Overlap,
                rect: Rect::new(0, 0, 40, 100),
            }])
            .build()
            .map_err(|e| DplError::msg(e.to_string()))?;
        let mut cells: SlotMap<CellKey, Cell> = SlotMap::with_key();
        let m = cells.insert(cell(0, 100, 0, 100, 200, 2));
        grid.paint_fixed(m, &cells[m], &master);
        let mut count = 0;
        for p in grid.layer(0).pixels() {
            if p.occupant.is_some() {
                count += 1;
            }
        }
        // Four sites of the bottom row only: the obstruction, not the outline
        assert_eq!(count, 4);
        assert!(grid.pixel(1, GridX(10), GridY(0)).and_then(|p| p.occupant).is_some());
        let mut west = Vec::new();
        grid.visit_cell_boundary_pixels(&cells[m], &master, true, |_, side, x, _| {
            if side == Side::West {
                west.push(x);
            }
        });
        assert_eq!(west, vec![GridX(10)]);
        Ok(())
    }
}

//!
//! # Legalizer Cells & Groups
//!
//! The legalizer's working copies of the design's instances and fence groups.
//! Cells are created once per import and mutated in place by placement;
//! all coordinates are core-relative.
//!

// Std-Lib
use std::cmp::Ordering;

// Crates.io
use slotmap::new_key_type;

// Local imports
use crate::coords::{DbuPt, DbuX, DbuY, GridX, GridY, HasUnits};
use crate::db::{GroupKey, InstKey, Int, MasterKey, Orient, Rect};

new_key_type! {
    /// Keys for [Cell] entries
    pub struct CellKey;
}

/// # Cell Placement States
///
/// Fixed cells enter [CellState::Fixed] at import and never leave it.
/// Movable cells cycle between [CellState::Unplaced] and [CellState::Placed].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Unplaced,
    Placed,
    Fixed,
}

/// # Legalizer Cell
#[derive(Debug, Clone)]
pub struct Cell {
    pub inst: InstKey,
    pub name: String,
    pub master: MasterKey,
    /// Lower-left corner, unpadded
    pub x: DbuX,
    pub y: DbuY,
    /// Location at import, which displacement is measured against
    pub init: DbuPt,
    pub width: DbuX,
    pub height: DbuY,
    pub orient: Orient,
    pub state: CellState,
    /// Placed by group pre-placement, and not to be moved by refinement
    pub hold: bool,
    pub group: Option<GroupKey>,
    /// The group region assigned to this cell, core-relative
    pub region: Option<Rect>,
    /// Index of the grid layer the cell is placed upon
    pub layer: usize,
    /// Rows spanned in that layer
    pub grid_height: GridY,
    pub pad_left: GridX,
    pub pad_right: GridX,
    /// Hard block, as classified by its master
    pub is_block: bool,
}
impl Cell {
    pub fn is_fixed(&self) -> bool {
        self.state == CellState::Fixed
    }
    pub fn is_placed(&self) -> bool {
        self.state == CellState::Placed
    }
    pub fn in_group(&self) -> bool {
        self.group.is_some()
    }
    /// Cells spanning more than one row of their layer
    pub fn is_multi_row(&self) -> bool {
        self.grid_height > GridY(1)
    }
    pub fn area(&self) -> Int {
        self.width.raw() * self.height.raw()
    }
    /// Current location
    pub fn loc(&self) -> DbuPt {
        DbuPt::new(self.x, self.y)
    }
    /// Current bounding box, core-relative
    pub fn bbox(&self) -> Rect {
        Rect::new(
            self.x.raw(),
            self.y.raw(),
            (self.x + self.width).raw(),
            (self.y + self.height).raw(),
        )
    }
    /// Initial location, shifted left by our padding when `padded`
    pub fn init_loc(&self, padded: bool, site_width: DbuX) -> DbuPt {
        match padded {
            true => DbuPt::new(self.init.x - self.pad_left.to_dbu(site_width), self.init.y),
            false => self.init,
        }
    }
    /// Width in sites, rounded up
    pub fn grid_width(&self, site_width: DbuX) -> GridX {
        self.width.grid_ceil(site_width)
    }
    /// Padded width in sites
    pub fn grid_padded_width(&self, site_width: DbuX) -> GridX {
        self.grid_width(site_width) + self.pad_left + self.pad_right
    }
    /// Padded width in database units
    pub fn padded_width(&self, site_width: DbuX) -> DbuX {
        self.width + (self.pad_left + self.pad_right).to_dbu(site_width)
    }
    /// Left edge of the padded footprint, in sites
    pub fn grid_padded_x(&self, site_width: DbuX) -> GridX {
        (self.x - self.pad_left.to_dbu(site_width)).grid_floor(site_width)
    }
    /// Right edge (exclusive) of the padded footprint, in sites
    pub fn grid_padded_end_x(&self, site_width: DbuX) -> GridX {
        (self.x + self.width + self.pad_right.to_dbu(site_width)).grid_ceil(site_width)
    }
    /// Manhattan displacement from our initial location
    pub fn displacement(&self) -> Int {
        self.loc().manhattan(&self.init)
    }
}

///
/// # Legalizer Group
///
/// A fence: member cells must land within the union of `regions`.
///
#[derive(Debug, Clone)]
pub struct Group {
    pub name: String,
    /// Core-relative region rectangles
    pub regions: Vec<Rect>,
    /// Bounding box of all `regions`
    pub bbox: Rect,
    pub cells: Vec<CellKey>,
    /// Member cell area over assignable site area
    pub util: f64,
}

///
/// # Placement Order
///
/// Larger cells first, then those nearer the core's center, then by name.
///
pub struct CellPlaceOrder {
    center_x: Int,
    center_y: Int,
}
impl CellPlaceOrder {
    /// Create a new [CellPlaceOrder] for a core of size `(dx, dy)`
    pub fn new(core_dx: Int, core_dy: Int) -> Self {
        Self {
            center_x: core_dx / 2,
            center_y: core_dy / 2,
        }
    }
    fn center_dist(&self, cell: &Cell) -> Int {
        (cell.x.raw() - self.center_x).abs() + (cell.y.raw() - self.center_y).abs()
    }
    pub fn cmp(&self, a: &Cell, b: &Cell) -> Ordering {
        b.area()
            .cmp(&a.area())
            .then_with(|| self.center_dist(a).cmp(&self.center_dist(b)))
            .then_with(|| a.name.cmp(&b.name))
    }
}

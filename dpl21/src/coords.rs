//!
//! # Legalizer Coordinate Systems
//!
//! Two sets of units are in play throughout legalization:
//! * Database units (DBU), the physical coordinates of the design, and
//! * Grid units, indices into a grid layer's sites (x) and rows (y).
//!
//! Each axis and unit gets its own scalar type, so that a row index is never
//! silently added to a site index, or a DBU x-coordinate to a grid one.
//! All legalizer-internal coordinates are relative to the core's lower-left corner.
//!

// Crates.io
use derive_more::{Add, AddAssign, From, Sub, SubAssign, Sum};
use serde::{Deserialize, Serialize};

// Local imports
use crate::db::Int;

/// Shared access to the underlying integer of each unit-type.
pub trait HasUnits: Clone + Copy {
    /// Every so often we need the raw number, fine. Use sparingly.
    fn raw(&self) -> Int;
}

/// Declare a scalar unit-type: a newtype over [Int] with its shared arithmetic.
macro_rules! unit_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            From,
            Add,
            AddAssign,
            Sub,
            SubAssign,
            Sum,
            Debug,
            Default,
            Clone,
            Copy,
            Serialize,
            Deserialize,
            PartialEq,
            Eq,
            PartialOrd,
            Ord,
            Hash,
        )]
        pub struct $name(pub Int);
        impl $name {
            #[inline(always)]
            pub fn new(v: Int) -> Self {
                Self(v)
            }
            /// Absolute value
            #[inline(always)]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }
        }
        impl HasUnits for $name {
            #[inline(always)]
            fn raw(&self) -> Int {
                self.0
            }
        }
        impl std::ops::Mul<Int> for $name {
            type Output = Self;
            fn mul(self, rhs: Int) -> Self::Output {
                Self(self.0 * rhs)
            }
        }
        impl std::ops::Neg for $name {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }
        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

unit_type!(
    /// Horizontal distance in database units
    DbuX
);
unit_type!(
    /// Vertical distance in database units
    DbuY
);
unit_type!(
    /// Horizontal site index
    GridX
);
unit_type!(
    /// Vertical row index, within one grid layer
    GridY
);

/// Floor-division, rounding towards negative infinity
pub fn div_floor(num: Int, den: Int) -> Int {
    let q = num / den;
    if (num % den != 0) && ((num < 0) != (den < 0)) {
        q - 1
    } else {
        q
    }
}
/// Ceiling-division, rounding towards positive infinity
pub fn div_ceil(num: Int, den: Int) -> Int {
    -div_floor(-num, den)
}
/// Division rounded to the nearest integer, with halves rounding up
pub fn div_round(num: Int, den: Int) -> Int {
    div_floor(2 * num + den, 2 * den)
}

impl DbuX {
    /// Site index containing `self`, for sites of width `step`
    pub fn grid_floor(self, step: DbuX) -> GridX {
        GridX(div_floor(self.0, step.0))
    }
    /// Smallest site index at or beyond `self`
    pub fn grid_ceil(self, step: DbuX) -> GridX {
        GridX(div_ceil(self.0, step.0))
    }
    /// Nearest site index
    pub fn grid_round(self, step: DbuX) -> GridX {
        GridX(div_round(self.0, step.0))
    }
}
impl DbuY {
    /// Row index containing `self`, for rows of height `step`
    pub fn grid_floor(self, step: DbuY) -> GridY {
        GridY(div_floor(self.0, step.0))
    }
    /// Smallest row index at or beyond `self`
    pub fn grid_ceil(self, step: DbuY) -> GridY {
        GridY(div_ceil(self.0, step.0))
    }
    /// Nearest row index
    pub fn grid_round(self, step: DbuY) -> GridY {
        GridY(div_round(self.0, step.0))
    }
}
impl GridX {
    /// Convert to database units, for sites of width `step`
    pub fn to_dbu(self, step: DbuX) -> DbuX {
        DbuX(self.0 * step.0)
    }
    /// Index into per-site storage. Negative values have no index.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}
impl GridY {
    /// Convert to database units, for rows of height `step`
    pub fn to_dbu(self, step: DbuY) -> DbuY {
        DbuY(self.0 * step.0)
    }
    /// Index into per-row storage. Negative values have no index.
    pub fn index(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

///
/// # Map a row index between grid layers
///
/// Converts row `coord` of a layer with row-height `from_step` to the equivalent row of a layer with row-height `to_step`.
/// Range starts (`start = true`) round down, and range ends round up,
/// so that a mapped range always covers the original's full extent.
///
pub fn map_coordinate(coord: GridY, from_step: DbuY, to_step: DbuY, start: bool) -> GridY {
    if from_step == to_step {
        return coord;
    }
    let scaled = coord.0 * from_step.0;
    match start {
        true => GridY(div_floor(scaled, to_step.0)),
        false => GridY(div_ceil(scaled, to_step.0)),
    }
}

/// Point in database units
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct DbuPt {
    pub x: DbuX,
    pub y: DbuY,
}
impl DbuPt {
    pub fn new(x: DbuX, y: DbuY) -> Self {
        Self { x, y }
    }
    /// Manhattan distance to `other`
    pub fn manhattan(&self, other: &DbuPt) -> Int {
        (self.x - other.x).abs().raw() + (self.y - other.y).abs().raw()
    }
}

/// Point in grid units
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct GridPt {
    pub x: GridX,
    pub y: GridY,
}
impl GridPt {
    pub fn new(x: GridX, y: GridY) -> Self {
        Self { x, y }
    }
}

/// Rectangle in grid units, with exclusive upper bounds
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct GridRect {
    pub xlo: GridX,
    pub ylo: GridY,
    pub xhi: GridX,
    pub yhi: GridY,
}
impl GridRect {
    /// Nearest point within the rectangle, counting its upper edges as inside
    pub fn closest_pt_inside(&self, pt: GridPt) -> GridPt {
        GridPt {
            x: pt.x.max(self.xlo).min(self.xhi),
            y: pt.y.max(self.ylo).min(self.yhi),
        }
    }
}

//!
//! # Geometry Module
//!
//! Database-unit [Point]s and [Rect]s, and the eight placement [Orient]ations.
//!

// Crates.io
use derive_more::{Add, AddAssign, Sub, SubAssign};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// # Location Integer Type-Alias
///
/// Used for all database-unit spatial coordinates.
pub type Int = isize;

/// # Point in two-dimensional layout-space
#[derive(
    Debug,
    Copy,
    Clone,
    Default,
    Add,
    AddAssign,
    Sub,
    SubAssign,
    Serialize,
    Deserialize,
    JsonSchema,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
pub struct Point {
    pub x: Int,
    pub y: Int,
}
impl Point {
    /// Create a new [Point] from (x,y) coordinates
    pub fn new(x: Int, y: Int) -> Self {
        Self { x, y }
    }
    /// Manhattan distance to `other`
    pub fn manhattan(&self, other: &Point) -> Int {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }
}

///
/// # Axis-Aligned Rectangle
///
/// Stored as its lower-left `(xlo, ylo)` and upper-right `(xhi, yhi)` corners.
/// Upper bounds are exclusive for the purposes of area and overlap.
///
#[derive(
    Debug, Copy, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash,
)]
pub struct Rect {
    pub xlo: Int,
    pub ylo: Int,
    pub xhi: Int,
    pub yhi: Int,
}
impl Rect {
    /// Create a new [Rect] from any two corners, in any order
    pub fn new(x0: Int, y0: Int, x1: Int, y1: Int) -> Self {
        Self {
            xlo: x0.min(x1),
            ylo: y0.min(y1),
            xhi: x0.max(x1),
            yhi: y0.max(y1),
        }
    }
    /// Create a [Rect] with lower-left corner `p` and size `(dx, dy)`
    pub fn from_origin(p: Point, dx: Int, dy: Int) -> Self {
        Self::new(p.x, p.y, p.x + dx, p.y + dy)
    }
    pub fn dx(&self) -> Int {
        self.xhi - self.xlo
    }
    pub fn dy(&self) -> Int {
        self.yhi - self.ylo
    }
    pub fn area(&self) -> Int {
        self.dx() * self.dy()
    }
    pub fn ll(&self) -> Point {
        Point::new(self.xlo, self.ylo)
    }
    pub fn center(&self) -> Point {
        Point::new((self.xlo + self.xhi) / 2, (self.ylo + self.yhi) / 2)
    }
    /// Boolean indication of whether `p` lies inside or on the boundary
    pub fn contains(&self, p: &Point) -> bool {
        p.x >= self.xlo && p.x <= self.xhi && p.y >= self.ylo && p.y <= self.yhi
    }
    /// Boolean indication of whether `other` lies entirely within `self`
    pub fn encloses(&self, other: &Rect) -> bool {
        other.xlo >= self.xlo && other.xhi <= self.xhi && other.ylo >= self.ylo && other.yhi <= self.yhi
    }
    /// Boolean indication of a positive-area overlap with `other`.
    /// Abutting rectangles do not intersect.
    pub fn intersects(&self, other: &Rect) -> bool {
        self.xlo < other.xhi && other.xlo < self.xhi && self.ylo < other.yhi && other.ylo < self.yhi
    }
    /// Intersection with `other`, if it has positive area
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        if !self.intersects(other) {
            return None;
        }
        Some(Rect {
            xlo: self.xlo.max(other.xlo),
            ylo: self.ylo.max(other.ylo),
            xhi: self.xhi.min(other.xhi),
            yhi: self.yhi.min(other.yhi),
        })
    }
    /// Overlap area with `other`, zero when disjoint
    pub fn overlap_area(&self, other: &Rect) -> Int {
        self.intersection(other).map(|r| r.area()).unwrap_or(0)
    }
    /// Area of `self` covered by the union of `rects`, overlaps among them counted once
    pub fn covered_area(&self, rects: &[Rect]) -> Int {
        let clipped: Vec<Rect> = rects.iter().filter_map(|r| r.intersection(self)).collect();
        let mut xs: Vec<Int> = clipped.iter().flat_map(|r| [r.xlo, r.xhi]).collect();
        let mut ys: Vec<Int> = clipped.iter().flat_map(|r| [r.ylo, r.yhi]).collect();
        xs.sort_unstable();
        xs.dedup();
        ys.sort_unstable();
        ys.dedup();
        let mut area = 0;
        for x in xs.windows(2) {
            for y in ys.windows(2) {
                let cell = Rect::new(x[0], y[0], x[1], y[1]);
                if clipped.iter().any(|r| r.encloses(&cell)) {
                    area += cell.area();
                }
            }
        }
        area
    }
    /// Smallest [Rect] containing both `self` and `other`
    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            xlo: self.xlo.min(other.xlo),
            ylo: self.ylo.min(other.ylo),
            xhi: self.xhi.max(other.xhi),
            yhi: self.yhi.max(other.yhi),
        }
    }
    /// Grow to include point `p`
    pub fn include(&mut self, p: &Point) {
        self.xlo = self.xlo.min(p.x);
        self.ylo = self.ylo.min(p.y);
        self.xhi = self.xhi.max(p.x);
        self.yhi = self.yhi.max(p.y);
    }
    /// Shift by `p`
    pub fn shift(&self, p: &Point) -> Rect {
        Rect {
            xlo: self.xlo + p.x,
            ylo: self.ylo + p.y,
            xhi: self.xhi + p.x,
            yhi: self.yhi + p.y,
        }
    }
    /// Half-perimeter
    pub fn half_perimeter(&self) -> Int {
        self.dx() + self.dy()
    }
}

///
/// # Placement Orientation
///
/// The eight rotations and reflections of LEF/DEF.
/// `MX` mirrors about the x-axis (flipping y), and `MY` about the y-axis (flipping x).
///
#[derive(
    Debug, Copy, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash,
)]
pub enum Orient {
    #[default]
    R0,
    R90,
    R180,
    R270,
    MY,
    MYR90,
    MX,
    MXR90,
}
impl Orient {
    /// Boolean indication of a quarter-turn, which swaps width and height
    pub fn is_rotated(&self) -> bool {
        matches!(self, Self::R90 | Self::R270 | Self::MXR90 | Self::MYR90)
    }
    /// The orientation flipped about the y-axis, as used by mirroring.
    /// Only the four row-compatible orientations have partners; the rest map to themselves.
    pub fn flip_y(&self) -> Orient {
        match self {
            Self::R0 => Self::MY,
            Self::MY => Self::R0,
            Self::MX => Self::R180,
            Self::R180 => Self::MX,
            other => *other,
        }
    }
    /// Map a master-local point to its location inside the oriented instance.
    ///
    /// The master occupies `(0,0)..(width,height)`.
    /// Results are relative to the oriented instance's lower-left corner.
    pub fn apply(&self, p: &Point, width: Int, height: Int) -> Point {
        let (x, y) = (p.x, p.y);
        let (w, h) = (width, height);
        let (nx, ny) = match self {
            Self::R0 => (x, y),
            Self::MY => (w - x, y),
            Self::MX => (x, h - y),
            Self::R180 => (w - x, h - y),
            Self::R90 => (h - y, x),
            Self::R270 => (y, w - x),
            Self::MXR90 => (y, x),
            Self::MYR90 => (h - y, w - x),
        };
        Point::new(nx, ny)
    }
    /// Map a master-local rectangle into the oriented instance, as [Orient::apply] does for points
    pub fn apply_rect(&self, r: &Rect, width: Int, height: Int) -> Rect {
        let p0 = self.apply(&Point::new(r.xlo, r.ylo), width, height);
        let p1 = self.apply(&Point::new(r.xhi, r.yhi), width, height);
        Rect::new(p0.x, p0.y, p1.x, p1.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_overlap() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 15, 15);
        let c = Rect::new(10, 0, 20, 10);
        assert!(a.intersects(&b));
        assert_eq!(a.overlap_area(&b), 25);
        // Abutment is not overlap
        assert!(!a.intersects(&c));
        assert_eq!(a.overlap_area(&c), 0);
        assert!(a.encloses(&Rect::new(2, 2, 10, 10)));
        assert_eq!(a.union(&c), Rect::new(0, 0, 20, 10));
    }

    #[test]
    fn covered_area() {
        let r = Rect::new(0, 0, 10, 10);
        assert_eq!(r.covered_area(&[]), 0);
        // Overlapping halves cover the whole, once
        let halves = [Rect::new(0, 0, 6, 10), Rect::new(4, 0, 10, 10)];
        assert_eq!(r.covered_area(&halves), 100);
        let twice = [Rect::new(0, 0, 10, 10), Rect::new(-5, -5, 20, 20)];
        assert_eq!(r.covered_area(&twice), 100);
        assert_eq!(r.covered_area(&[Rect::new(5, 5, 15, 15), Rect::new(20, 20, 30, 30)]), 25);
    }

    #[test]
    fn orient_flips() {
        // A pin near the left edge of a 10x4 master
        let p = Point::new(1, 1);
        assert_eq!(Orient::R0.apply(&p, 10, 4), Point::new(1, 1));
        assert_eq!(Orient::MY.apply(&p, 10, 4), Point::new(9, 1));
        assert_eq!(Orient::MX.apply(&p, 10, 4), Point::new(1, 3));
        assert_eq!(Orient::R180.apply(&p, 10, 4), Point::new(9, 3));
        for o in [Orient::R0, Orient::MY, Orient::MX, Orient::R180] {
            assert_eq!(o.flip_y().flip_y(), o);
        }
        let r = Orient::MY.apply_rect(&Rect::new(0, 0, 2, 4), 10, 4);
        assert_eq!(r, Rect::new(8, 0, 10, 4));
    }
}

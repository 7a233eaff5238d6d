//!
//! # Placement Design-Rule Checks
//!
//! Edge-type spacing between horizontally facing cell edges.
//!

// Std-Lib
use std::collections::HashMap;

// Crates.io
use slotmap::SlotMap;

// Local imports
use crate::cell::{Cell, CellKey};
use crate::coords::{DbuX, DbuY, GridX, GridY, HasUnits};
use crate::db::{Design, Int, Master, Orient, Point, Tech};
use crate::grid::Grid;

/// # Edge Spacing Requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeSpacing {
    pub spacing: Int,
    pub exact: bool,
    pub except_abutted: bool,
}
impl EdgeSpacing {
    /// Boolean indication of whether facing edges `dist` apart violate this requirement
    pub fn violated(&self, dist: Int) -> bool {
        if self.except_abutted && dist == 0 {
            return false;
        }
        match self.exact {
            true => dist != self.spacing,
            false => dist < self.spacing,
        }
    }
}

/// Which way a vertical cell edge faces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    West,
    East,
}

/// # Placed Edge
///
/// A vertical master edge, transformed to a location and orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedEdge {
    pub edge_type: usize,
    pub facing: Facing,
    pub x: Int,
    pub ylo: Int,
    pub yhi: Int,
}

///
/// # Placement DRC
///
/// Edge types are interned from the tech rules into a symmetric spacing table.
/// The table is built once and never changes.
///
#[derive(Debug, Clone, Default)]
pub struct PlacementDrc {
    types: HashMap<String, usize>,
    table: Vec<Vec<Option<EdgeSpacing>>>,
    max_spacing: Vec<Int>,
}
impl PlacementDrc {
    pub fn new(tech: &Tech) -> Self {
        let mut types: HashMap<String, usize> = HashMap::new();
        for rule in tech.edge_spacing.iter() {
            for name in [&rule.first, &rule.second] {
                let next = types.len();
                types.entry(name.clone()).or_insert(next);
            }
        }
        let n = types.len();
        let mut table = vec![vec![None; n]; n];
        let mut max_spacing = vec![0; n];
        for rule in tech.edge_spacing.iter() {
            let (a, b) = (types[&rule.first], types[&rule.second]);
            let entry = EdgeSpacing {
                spacing: rule.spacing,
                exact: rule.exact,
                except_abutted: rule.except_abutted,
            };
            table[a][b] = Some(entry);
            table[b][a] = Some(entry);
            max_spacing[a] = max_spacing[a].max(rule.spacing);
            max_spacing[b] = max_spacing[b].max(rule.spacing);
        }
        Self {
            types,
            table,
            max_spacing,
        }
    }
    pub fn has_rules(&self) -> bool {
        !self.types.is_empty()
    }
    pub fn type_index(&self, name: &str) -> Option<usize> {
        self.types.get(name).copied()
    }
    /// Spacing requirement between edge types `a` and `b`, if any
    pub fn spacing(&self, a: usize, b: usize) -> Option<&EdgeSpacing> {
        self.table.get(a)?.get(b)?.as_ref()
    }
    /// Largest spacing any rule requires of edge type `t`
    pub fn max_spacing(&self, t: usize) -> Int {
        self.max_spacing.get(t).copied().unwrap_or(0)
    }

    /// Get the vertical, rule-bearing edges of `master` placed with lower-left `loc` and orientation `orient`.
    /// Edges not on the left or right side of the outline are ignored.
    pub fn placed_edges(&self, master: &Master, loc: Point, orient: Orient) -> Vec<PlacedEdge> {
        let mut edges = Vec::new();
        for edge in master.edges.iter() {
            let edge_type = match self.type_index(&edge.edge_type) {
                Some(t) => t,
                None => continue,
            };
            let r = orient
                .apply_rect(&edge.bbox, master.width, master.height)
                .shift(&loc);
            if r.xlo != r.xhi {
                continue; // Horizontal
            }
            let facing = if r.xlo == loc.x {
                Facing::West
            } else if r.xlo == loc.x + master.width {
                Facing::East
            } else {
                continue;
            };
            edges.push(PlacedEdge {
                edge_type,
                facing,
                x: r.xlo,
                ylo: r.ylo,
                yhi: r.yhi,
            });
        }
        edges
    }

    /// Boolean indication of a violation between two placed edges
    pub fn edges_violate(&self, a: &PlacedEdge, b: &PlacedEdge) -> bool {
        // Only opposite-facing edges face one another, and only with some vertical overlap
        let dist = match (a.facing, b.facing) {
            (Facing::West, Facing::East) => a.x - b.x,
            (Facing::East, Facing::West) => b.x - a.x,
            _ => return false,
        };
        if dist < 0 || a.ylo.max(b.ylo) >= a.yhi.min(b.yhi) {
            return false;
        }
        match self.spacing(a.edge_type, b.edge_type) {
            Some(spc) => spc.violated(dist),
            None => false,
        }
    }

    ///
    /// Check the edge spacing of cell `key` as if it were at `(x, y)` in orientation `orient`,
    /// against every neighbor currently painted within reach of its edges.
    /// The cell itself is never its own neighbor, so this works for painted and unpainted cells alike.
    ///
    /// Returns `true` when no violation is found.
    ///
    pub fn check_edge_spacing(
        &self,
        grid: &Grid,
        design: &Design,
        cells: &SlotMap<CellKey, Cell>,
        key: CellKey,
        x: DbuX,
        y: DbuY,
        orient: Orient,
    ) -> bool {
        if !self.has_rules() {
            return true;
        }
        let cell = match cells.get(key) {
            Some(c) => c,
            None => return true,
        };
        let master = match design.masters.get(cell.master) {
            Some(m) => m,
            None => return true,
        };
        let edges = self.placed_edges(master, Point::new(x.raw(), y.raw()), orient);
        if edges.is_empty() {
            return true;
        }
        let reach = edges.iter().map(|e| self.max_spacing(e.edge_type)).max().unwrap_or(0);

        // Collect neighbors from our own layer's pixels within reach
        let layer = cell.layer;
        let x0 = grid.grid_x(x - DbuX(reach));
        let x1 = grid.grid_end_x(x + cell.width + DbuX(reach));
        let y0 = grid.grid_y(layer, y);
        let y1 = y0 + cell.grid_height;
        let mut neighbors: Vec<CellKey> = Vec::new();
        let mut yy = y0;
        while yy < y1 {
            let mut xx = x0;
            while xx < x1 {
                if let Some(other) = grid
                    .pixel(layer, xx, yy)
                    .and_then(|p| p.occupant)
                    .and_then(|o| o.cell())
                {
                    if other != key && !neighbors.contains(&other) {
                        neighbors.push(other);
                    }
                }
                xx += GridX(1);
            }
            yy += GridY(1);
        }

        for other in neighbors {
            let (ncell, nmaster) = match cells.get(other).and_then(|c| Some((c, design.masters.get(c.master)?))) {
                Some(pair) => pair,
                None => continue,
            };
            let nedges = self.placed_edges(nmaster, Point::new(ncell.x.raw(), ncell.y.raw()), ncell.orient);
            for e in edges.iter() {
                if nedges.iter().any(|n| self.edges_violate(e, n)) {
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{EdgeSpacingRule, MasterBuilder, MasterEdge, Rect};
    use crate::{DplError, DplResult};

    fn tech() -> Tech {
        Tech {
            edge_spacing: vec![
                EdgeSpacingRule {
                    first: "A".into(),
                    second: "B".into(),
                    spacing: 20,
                    exact: false,
                    except_abutted: false,
                },
                EdgeSpacingRule {
                    first: "A".into(),
                    second: "A".into(),
                    spacing: 10,
                    exact: true,
                    except_abutted: true,
                },
            ],
        }
    }

    #[test]
    fn spacing_table() {
        let drc = PlacementDrc::new(&tech());
        let (a, b) = (drc.type_index("A").unwrap(), drc.type_index("B").unwrap());
        assert_eq!(drc.spacing(b, a).map(|s| s.spacing), Some(20));
        assert!(drc.spacing(b, b).is_none());
        assert_eq!(drc.max_spacing(a), 20);
        assert_eq!(drc.max_spacing(b), 20);
        let aa = drc.spacing(a, a).unwrap();
        assert!(!aa.violated(0));
        assert!(aa.violated(5));
        assert!(!aa.violated(10));
        assert!(aa.violated(20));
        let ab = drc.spacing(a, b).unwrap();
        assert!(ab.violated(0));
        assert!(!ab.violated(30));
    }

    #[test]
    fn oriented_edges() -> DplResult<()> {
        let drc = PlacementDrc::new(&tech());
        let master = MasterBuilder::default()
            .name("X")
            .width(40)
            .height(100)
            .edges(vec![MasterEdge {
                edge_type: "A".into(),
                bbox: Rect::new(0, 0, 0, 100),
            }])
            .build()
            .map_err(|e| DplError::msg(e.to_string()))?;
        let edges = drc.placed_edges(&master, Point::new(100, 0), Orient::R0);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].facing, Facing::West);
        assert_eq!(edges[0].x, 100);
        // Mirrored about the y-axis, the left edge becomes the right one
        let edges = drc.placed_edges(&master, Point::new(100, 0), Orient::MY);
        assert_eq!(edges[0].facing, Facing::East);
        assert_eq!(edges[0].x, 140);
        Ok(())
    }

    #[test]
    fn facing_pairs() {
        let drc = PlacementDrc::new(&tech());
        let b = drc.type_index("B").unwrap();
        let a = drc.type_index("A").unwrap();
        let west = PlacedEdge {
            edge_type: a,
            facing: Facing::West,
            x: 100,
            ylo: 0,
            yhi: 100,
        };
        let east = PlacedEdge {
            edge_type: b,
            facing: Facing::East,
            x: 90,
            ylo: 0,
            yhi: 100,
        };
        assert!(drc.edges_violate(&west, &east));
        // No vertical overlap, no violation
        let above = PlacedEdge {
            ylo: 100,
            yhi: 200,
            ..east
        };
        assert!(!drc.edges_violate(&west, &above));
        // Same-facing edges never interact
        let other = PlacedEdge {
            facing: Facing::West,
            ..east
        };
        assert!(!drc.edges_violate(&west, &other));
    }
}

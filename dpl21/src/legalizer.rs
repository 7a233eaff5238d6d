//!
//! # Detail-Placement Legalizer
//!
//! [Legalizer] owns a [Design] and its working state:
//! the [Grid], one [Cell] per instance, one [Group] per fence,
//! the spacing table, and a seeded random-number generator.
//! Every public entry point re-imports that state from the design before it starts.
//!

// Std-Lib
use std::collections::HashMap;

// Crates.io
use log::{debug, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use slotmap::{SecondaryMap, SlotMap};

// Local imports
use crate::cell::{Cell, CellKey, CellState, Group};
use crate::config::LegalizerConfig;
use crate::coords::{DbuPt, DbuX, DbuY, GridX, GridY, HasUnits};
use crate::db::{Design, GroupKey, Inst, InstKey, Int, Master, PlacementStatus, Point, Rect};
use crate::drc::PlacementDrc;
use crate::error::{DplError, DplResult, ErrorContext, ErrorHelper};
use crate::grid::Grid;
use crate::network;
use crate::padding::Padding;

/// # Placement Failure
///
/// A movable instance for which no legal location was found.
/// Its database location is left as it was.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacementFailure {
    pub inst: InstKey,
    pub name: String,
    /// Location at the start of legalization
    pub location: Point,
}

/// Instance-import context, for error reporting
struct Importer<'a> {
    inst: &'a Inst,
    master: &'a Master,
}
impl ErrorHelper for Importer<'_> {
    fn err(&self, msg: impl Into<String>) -> DplError {
        DplError::config(
            msg,
            vec![
                ErrorContext::Inst(self.inst.name.clone()),
                ErrorContext::Master(self.master.name.clone()),
            ],
        )
    }
}

///
/// # Legalizer
///
pub struct Legalizer {
    pub(crate) design: Design,
    pub(crate) config: LegalizerConfig,
    pub(crate) padding: Padding,
    pub(crate) drc: PlacementDrc,
    pub(crate) grid: Grid,
    pub(crate) cells: SlotMap<CellKey, Cell>,
    pub(crate) inst_cells: HashMap<InstKey, CellKey>,
    pub(crate) groups: SecondaryMap<GroupKey, Group>,
    pub(crate) failures: Vec<PlacementFailure>,
    pub(crate) rng: StdRng,
    /// Displacement limits for the current run, in sites and rows
    pub(crate) max_dx: Int,
    pub(crate) max_dy: Int,
    /// Starting state of the last [Legalizer::detailed_placement], for reporting
    pub(crate) initial: HashMap<InstKey, Point>,
    pub(crate) legalized: Vec<InstKey>,
    pub(crate) hpwl_before: Int,
}
impl Legalizer {
    /// Create a new [Legalizer], taking ownership of `design`
    pub fn new(design: Design, config: LegalizerConfig) -> Self {
        let rng = StdRng::seed_from_u64(config.rand_seed);
        let (max_dx, max_dy) = (config.max_displacement_x, config.max_displacement_y);
        Self {
            design,
            config,
            padding: Padding::default(),
            drc: PlacementDrc::default(),
            grid: Grid::empty(),
            cells: SlotMap::with_key(),
            inst_cells: HashMap::new(),
            groups: SecondaryMap::new(),
            failures: Vec::new(),
            rng,
            max_dx,
            max_dy,
            initial: HashMap::new(),
            legalized: Vec::new(),
            hpwl_before: 0,
        }
    }
    pub fn design(&self) -> &Design {
        &self.design
    }
    pub fn design_mut(&mut self) -> &mut Design {
        &mut self.design
    }
    /// Consume the legalizer, returning its [Design]
    pub fn into_design(self) -> Design {
        self.design
    }
    pub fn config(&self) -> &LegalizerConfig {
        &self.config
    }
    /// Padding policy, applied at the next import
    pub fn padding_mut(&mut self) -> &mut Padding {
        &mut self.padding
    }
    /// Failures of the last [Legalizer::detailed_placement]
    pub fn placement_failures(&self) -> &[PlacementFailure] {
        &self.failures
    }
    /// The grid, as of the last entry point run
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    ///
    /// # Detailed Placement
    ///
    /// Legalize every movable instance, within `max_x` sites and `max_y` rows of its current location.
    /// Zero for either limit selects the configured default.
    ///
    /// Cells which cannot be legalized are recorded in [Legalizer::placement_failures] and keep their locations.
    /// Only unusable input and internal paint conflicts are errors.
    ///
    pub fn detailed_placement(&mut self, max_x: Int, max_y: Int) -> DplResult<()> {
        self.max_dx = if max_x > 0 { max_x } else { self.config.max_displacement_x };
        self.max_dy = if max_y > 0 { max_y } else { self.config.max_displacement_y };
        self.rng = StdRng::seed_from_u64(self.config.rand_seed);
        self.failures.clear();
        self.legalized.clear();
        self.import()?;

        self.initial = self
            .design
            .insts
            .iter()
            .map(|(k, inst)| (k, inst.location))
            .collect();
        self.hpwl_before = network::total_hpwl(&self.design);

        self.paint_fixed_cells()?;
        self.group_init_pixels();
        if !self.groups.is_empty() {
            self.group_assign_cell_regions();
            self.pre_place_groups()?;
            self.pre_place()?;
            self.place_groups()?;
            let keys: Vec<GroupKey> = self.groups.keys().collect();
            for gkey in keys {
                for pass in 0..self.config.group_refine_passes {
                    let refined = self.group_refine(gkey)?;
                    let swapped = self.group_anneal(gkey)?;
                    debug!("Group pass {}: {} refined, {} swapped", pass, refined, swapped);
                    if refined < 10 || swapped < 100 {
                        break;
                    }
                }
            }
        }
        self.place()?;
        if self.config.refine {
            self.refine()?;
        }
        if self.config.global_anneal {
            self.anneal()?;
        }
        self.write_back()?;
        info!(
            "Legalized {} instances, {} failures",
            self.legalized.len(),
            self.failures.len()
        );
        Ok(())
    }

    /// Rebuild the grid, spacing table, cells and groups from the design
    pub(crate) fn import(&mut self) -> DplResult<()> {
        self.grid = Grid::new(
            &self.design,
            self.max_dx,
            self.max_dy,
            self.config.hopeless_safety_margin,
        )?;
        self.drc = PlacementDrc::new(&self.design.tech);
        self.cells.clear();
        self.inst_cells.clear();
        self.groups.clear();

        let core = self.grid.core;
        let origin = core.ll();
        for (gkey, group) in self.design.groups.iter() {
            let regions: Vec<Rect> = group
                .regions
                .iter()
                .map(|r| r.shift(&Point::new(-origin.x, -origin.y)))
                .collect();
            let bbox = match regions.split_first() {
                Some((first, rest)) => rest.iter().fold(*first, |b, r| b.union(r)),
                None => {
                    warn!("Group {} has no regions; its members are placed as ungrouped", group.name);
                    continue;
                }
            };
            self.groups.insert(
                gkey,
                Group {
                    name: group.name.clone(),
                    regions,
                    bbox,
                    cells: Vec::new(),
                    util: 0.0,
                },
            );
        }

        let site_width = self.grid.site_width;
        for (ikey, inst) in self.design.insts.iter() {
            let master = self.design.master(inst.master)?;
            let fixed = inst.status.is_fixed();
            if master.class.is_unplaceable() && !fixed {
                continue;
            }
            let importer = Importer { inst, master };
            let bbox = inst.bbox(master);
            let (width, height) = (DbuX(bbox.dx()), DbuY(bbox.dy()));
            let (layer, grid_height) = match self.grid.layer_for_height(height) {
                Some(l) => (l, GridY(1)),
                None => (0, height.grid_ceil(self.grid.row_height(0))),
            };
            let loc = DbuPt::new(DbuX(inst.location.x - origin.x), DbuY(inst.location.y - origin.y));
            let (pad_left, pad_right) = match fixed {
                true => (GridX(0), GridX(0)),
                false => (
                    self.padding.pad_left(ikey, inst, master),
                    self.padding.pad_right(ikey, inst, master),
                ),
            };
            let group = inst.group.filter(|g| self.groups.contains_key(*g));
            let cell = Cell {
                inst: ikey,
                name: inst.name.clone(),
                master: inst.master,
                x: loc.x,
                y: loc.y,
                init: loc,
                width,
                height,
                orient: inst.orient,
                state: if fixed { CellState::Fixed } else { CellState::Unplaced },
                hold: false,
                group,
                region: None,
                layer,
                grid_height,
                pad_left,
                pad_right,
                is_block: master.class.is_block(),
            };
            if !fixed {
                importer.assert(
                    cell.grid_padded_width(site_width) <= self.grid.site_count(),
                    "Instance is wider than the core",
                )?;
                importer.assert(
                    cell.grid_height <= self.grid.row_count(layer),
                    "Instance is taller than the core",
                )?;
            }
            let ckey = self.cells.insert(cell);
            self.inst_cells.insert(ikey, ckey);
            if let Some(g) = group.and_then(|g| self.groups.get_mut(g)) {
                g.cells.push(ckey);
            }
        }
        debug!(
            "Imported {} cells and {} groups onto {} grid layers",
            self.cells.len(),
            self.groups.len(),
            self.grid.layers().len()
        );
        Ok(())
    }

    /// Paint every fixed cell onto the grid
    pub(crate) fn paint_fixed_cells(&mut self) -> DplResult<()> {
        for (key, cell) in self.cells.iter() {
            if cell.is_fixed() {
                let master = self.design.master(cell.master)?;
                self.grid.paint_fixed(key, cell, master);
            }
        }
        Ok(())
    }

    /// Paint every cell the design marks as placed at its current location, and mark it [CellState::Placed]
    pub(crate) fn paint_design_cells(&mut self) -> DplResult<()> {
        let keys: Vec<CellKey> = self.cells.keys().collect();
        for key in keys {
            let cell = &self.cells[key];
            let inst = self.design.inst(cell.inst)?;
            let master = self.design.master(cell.master)?;
            if cell.is_fixed() {
                self.grid.paint_fixed(key, cell, master);
            } else if inst.status.is_placed() {
                self.grid.paint_existing(key, cell, master);
                self.cells[key].state = CellState::Placed;
            }
        }
        Ok(())
    }

    /// Record a failure to place `key`
    pub(crate) fn record_failure(&mut self, key: CellKey) {
        let cell = &self.cells[key];
        let origin = self.grid.core.ll();
        warn!("Failed to legalize {}", cell.name);
        let failure = PlacementFailure {
            inst: cell.inst,
            name: cell.name.clone(),
            location: Point::new(origin.x + cell.init.x.raw(), origin.y + cell.init.y.raw()),
        };
        if !self.failures.contains(&failure) {
            self.failures.push(failure);
        }
    }

    /// Write the location and orientation of every legalized cell back to its instance
    fn write_back(&mut self) -> DplResult<()> {
        let origin = self.grid.core.ll();
        for cell in self.cells.values() {
            if cell.is_fixed() || !cell.is_placed() {
                continue;
            }
            let inst = self.design.inst_mut(cell.inst)?;
            inst.location = Point::new(origin.x + cell.x.raw(), origin.y + cell.y.raw());
            inst.orient = cell.orient;
            inst.status = PlacementStatus::Placed;
            self.legalized.push(cell.inst);
        }
        Ok(())
    }
}

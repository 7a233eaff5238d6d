//!
//! # Filler Placement
//!
//! Tiles every empty run of valid sites with filler instances.
//!

// Std-Lib
use std::collections::HashMap;

// Crates.io
use log::{info, warn};

// Local imports
use crate::coords::{DbuX, GridX, GridY, HasUnits};
use crate::db::{Inst, MasterKey, PlacementStatus, Point, SourceType};
use crate::error::DplResult;
use crate::grid::Occupant;
use crate::legalizer::Legalizer;

/// Neighbor name of gaps bounded by something other than an instance or the core edge
pub const BLOCKAGE: &str = "blockage";

/// # Unfillable Gap
///
/// A run of empty sites no combination of filler masters exactly tiles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnfillableGap {
    pub layer: usize,
    pub row: GridY,
    /// First site of the gap
    pub site: GridX,
    /// Gap width, in sites
    pub width: GridX,
    /// Instance to the left, [BLOCKAGE], or `core_left`
    pub left: String,
    /// Instance to the right, [BLOCKAGE], or `core_right`
    pub right: String,
}

/// # Filler Placement Results
#[derive(Debug, Clone, Default)]
pub struct FillerReport {
    /// Number of filler instances inserted
    pub inserted: usize,
    pub unfillable: Vec<UnfillableGap>,
}

/// Filler masters usable on one layer, widest first, with their widths in sites
struct LayerFillers {
    masters: Vec<(MasterKey, GridX)>,
    cache: HashMap<GridX, Vec<MasterKey>>,
}
impl LayerFillers {
    ///
    /// Decompose a gap of `gap` sites into fillers, widest first.
    /// Without a single-site filler on hand, a choice leaving exactly one site is skipped.
    /// Returns an empty list when no exact decomposition is found.
    ///
    fn gap_fillers(&mut self, gap: GridX) -> &[MasterKey] {
        let masters = &self.masters;
        self.cache.entry(gap).or_insert_with(|| {
            let have_filler1 = masters.last().map(|(_, w)| *w == GridX(1)).unwrap_or(false);
            let mut fillers = Vec::new();
            let mut width = GridX(0);
            for (master, w) in masters.iter() {
                while width + *w <= gap && (have_filler1 || width + *w != gap - GridX(1)) {
                    fillers.push(*master);
                    width += *w;
                    if width == gap {
                        return fillers;
                    }
                }
            }
            Vec::new()
        })
    }
}

impl Legalizer {
    ///
    /// # Filler Placement
    ///
    /// Fill each empty run of valid sites, row by row and layer by layer, from `masters`.
    /// Only masters as tall as a layer's rows fill that layer.
    /// New instances are named `<prefix><layer>_<row>_<site>`.
    ///
    /// Gaps which cannot be tiled exactly are reported, logged, and left empty.
    ///
    pub fn filler_placement(&mut self, masters: &[MasterKey], prefix: &str) -> DplResult<FillerReport> {
        self.import()?;
        self.paint_design_cells()?;

        let sw = self.grid.site_width;
        let origin = self.grid.core.ll();
        let mut report = FillerReport::default();
        for layer in 0..self.grid.layers().len() {
            let h = self.grid.row_height(layer);
            let mut candidates: Vec<(MasterKey, GridX)> = Vec::new();
            for key in masters.iter() {
                let master = self.design.master(*key)?;
                if master.height == h.raw() && master.width > 0 {
                    candidates.push((*key, DbuX(master.width).grid_ceil(sw)));
                }
            }
            if candidates.is_empty() {
                continue;
            }
            candidates.sort_by(|a, b| b.1.cmp(&a.1));
            let mut fillers = LayerFillers {
                masters: candidates,
                cache: HashMap::new(),
            };
            let (site_count, row_count) = (self.grid.site_count(), self.grid.row_count(layer));
            let mut row = GridY(0);
            while row < row_count {
                let mut x = GridX(0);
                while x < site_count {
                    let open = |x: GridX| {
                        self.grid
                            .pixel(layer, x, row)
                            .map(|p| p.is_valid && p.is_empty())
                            .unwrap_or(false)
                    };
                    if !open(x) {
                        x += GridX(1);
                        continue;
                    }
                    let start = x;
                    while x < site_count && open(x) {
                        x += GridX(1);
                    }
                    let gap = x - start;
                    let chosen = fillers.gap_fillers(gap).to_vec();
                    if chosen.is_empty() {
                        let gap = UnfillableGap {
                            layer,
                            row,
                            site: start,
                            width: gap,
                            left: self.neighbor_name(layer, start - GridX(1), row, "core_left"),
                            right: self.neighbor_name(layer, x, row, "core_right"),
                        };
                        warn!(
                            "Unfillable gap of {} sites at layer {} row {} site {}, between {} and {}",
                            gap.width, gap.layer, gap.row, gap.site, gap.left, gap.right
                        );
                        report.unfillable.push(gap);
                        continue;
                    }
                    let orient = self.grid.site_orient(layer, start, row).unwrap_or_default();
                    let mut site = start;
                    for master in chosen {
                        let width = fillers
                            .masters
                            .iter()
                            .find(|(m, _)| *m == master)
                            .map(|(_, w)| *w)
                            .unwrap_or(GridX(1));
                        let mut inst = Inst::new(
                            format!("{}{}_{}_{}", prefix, layer, row, site),
                            master,
                            Point::new(
                                origin.x + site.to_dbu(sw).raw(),
                                origin.y + row.to_dbu(h).raw(),
                            ),
                        );
                        inst.orient = orient;
                        inst.status = PlacementStatus::Placed;
                        inst.source = SourceType::Dist;
                        self.design.add_inst(inst);
                        self.grid.occupy(layer, (site, site + width), (row, row + GridY(1)), Occupant::Dummy);
                        report.inserted += 1;
                        site += width;
                    }
                }
                row += GridY(1);
            }
        }
        info!(
            "Inserted {} fillers, {} unfillable gaps",
            report.inserted,
            report.unfillable.len()
        );
        Ok(report)
    }

    ///
    /// Name of whatever bounds a gap at `(x, y)` of `layer`: the occupying instance,
    /// [BLOCKAGE] for sentinel-occupied or row-less pixels, or `default` beyond the core.
    ///
    pub(crate) fn neighbor_name(&self, layer: usize, x: GridX, y: GridY, default: &str) -> String {
        let pixel = match self.grid.pixel(layer, x, y) {
            Some(p) => p,
            None => return default.to_string(),
        };
        match pixel.occupant {
            Some(occupant) => match occupant.cell().and_then(|c| self.cells.get(c)) {
                Some(cell) => cell.name.clone(),
                None => BLOCKAGE.to_string(),
            },
            None => BLOCKAGE.to_string(),
        }
    }

    /// Remove every filler instance from the design. Returns the number removed.
    pub fn remove_fillers(&mut self) -> usize {
        let fillers: Vec<_> = self
            .design
            .insts
            .iter()
            .filter(|(_, inst)| {
                self.design
                    .masters
                    .get(inst.master)
                    .map(|m| m.class.is_filler())
                    .unwrap_or(false)
            })
            .map(|(k, _)| k)
            .collect();
        for key in fillers.iter() {
            self.design.destroy_inst(*key);
        }
        info!("Removed {} fillers", fillers.len());
        fillers.len()
    }
}

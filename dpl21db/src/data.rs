//!
//! # Design Data Model
//!
//! Defines [Design] and the rows, sites, masters, instances, groups and nets it owns.
//!

// Std-Lib
use std::collections::HashMap;

// Crates.io
use derive_builder::Builder;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use slotmap::{new_key_type, SlotMap};

// Local imports
use crate::error::{DbError, DbResult};
use crate::geom::{Int, Orient, Point, Rect};
use crate::ser::SerdeFile;

// Create key-types for each internal type stored in [SlotMap]s
new_key_type! {
    /// Keys for [Site] entries
    pub struct SiteKey;
    /// Keys for [Master] entries
    pub struct MasterKey;
    /// Keys for [Inst] entries
    pub struct InstKey;
    /// Keys for [Group] entries
    pub struct GroupKey;
    /// Keys for [Net] entries
    pub struct NetKey;
}

/// # Site Classes
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum SiteClass {
    #[default]
    Core,
    Pad,
}

/// # Placement Site
///
/// The unit step of a row, horizontally by its `width` and vertically by its `height`.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[builder(pattern = "owned")]
pub struct Site {
    #[builder(setter(into))]
    pub name: String,
    pub width: Int,
    pub height: Int,
    #[builder(default)]
    #[serde(default)]
    pub class: SiteClass,
}

/// # Placement Row
///
/// A horizontal run of `site_count` copies of `site`, starting at `origin`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Row {
    pub name: String,
    pub site: SiteKey,
    pub origin: Point,
    #[serde(default)]
    pub orient: Orient,
    pub site_count: usize,
}

/// # Master (Macro) Classes
///
/// LEF's `CLASS` values as used by placement.
/// Core sub-classes are listed individually, as padding and filling treat them differently.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq, Hash)]
pub enum MasterClass {
    #[default]
    Core,
    CoreSpacer,
    CoreWelltap,
    CoreTieHigh,
    CoreTieLow,
    CoreAntennaCell,
    CoreFeedthru,
    Block,
    Pad,
    Endcap,
    Cover,
    Ring,
}
impl MasterClass {
    /// Boolean indication of the standard-cell-like classes, which receive padding
    pub fn is_core(&self) -> bool {
        matches!(
            self,
            Self::Core
                | Self::CoreSpacer
                | Self::CoreWelltap
                | Self::CoreTieHigh
                | Self::CoreTieLow
                | Self::CoreAntennaCell
                | Self::CoreFeedthru
        )
    }
    /// Boolean indication of filler cells
    pub fn is_filler(&self) -> bool {
        matches!(self, Self::CoreSpacer)
    }
    /// Boolean indication of hard blocks
    pub fn is_block(&self) -> bool {
        matches!(self, Self::Block)
    }
    /// Boolean indication of classes the legalizer never moves
    pub fn is_unplaceable(&self) -> bool {
        matches!(self, Self::Pad | Self::Cover | Self::Ring)
    }
}

/// # Master Symmetry
///
/// Which reflections of a master remain legal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Symmetry {
    pub x: bool,
    pub y: bool,
    pub r90: bool,
}
impl Default for Symmetry {
    /// Standard cells are generally symmetric in both x and y
    fn default() -> Self {
        Self {
            x: true,
            y: true,
            r90: false,
        }
    }
}
impl Symmetry {
    /// Boolean indication of whether orientation `orient` is allowed
    pub fn allows(&self, orient: Orient) -> bool {
        match orient {
            Orient::R0 => true,
            Orient::MX => self.x,
            Orient::MY => self.y,
            Orient::R180 => self.x && self.y,
            Orient::R90 | Orient::R270 => self.r90,
            Orient::MXR90 | Orient::MYR90 => self.r90 && self.x && self.y,
        }
    }
}

/// # Obstruction Layer Types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum ObsKind {
    /// Placement-overlap layer: blocks placement beneath it
    Overlap,
    Routing,
    Cut,
    Masterslice,
}
/// # Master Obstruction
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Obstruction {
    pub kind: ObsKind,
    /// Master-local rectangle
    pub rect: Rect,
}

/// # Master Edge
///
/// A classified segment of a master's outline, used by edge-spacing rules.
/// `bbox` is in master-local coordinates;
/// vertical edges have `xlo == xhi`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MasterEdge {
    pub edge_type: String,
    pub bbox: Rect,
}

/// # Pin Directions
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum PinDirection {
    #[default]
    Inout,
    Input,
    Output,
}
/// # Master Pin
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct MasterPin {
    pub name: String,
    #[serde(default)]
    pub direction: PinDirection,
    #[serde(default)]
    pub layer: Option<String>,
    /// Master-local pin shape
    pub rect: Rect,
}

/// # Master
///
/// The template shared by all instances of a cell.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[builder(pattern = "owned")]
pub struct Master {
    #[builder(setter(into))]
    pub name: String,
    #[builder(default)]
    #[serde(default)]
    pub class: MasterClass,
    pub width: Int,
    pub height: Int,
    /// Site name, if the master is row-based
    #[builder(default, setter(into, strip_option))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site: Option<String>,
    #[builder(default)]
    #[serde(default)]
    pub symmetry: Symmetry,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub obstructions: Vec<Obstruction>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edges: Vec<MasterEdge>,
    #[builder(default)]
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pins: Vec<MasterPin>,
}
impl Master {
    /// Overlap-layer obstructions, which block placement independently of the outline
    pub fn overlap_obstructions(&self) -> impl Iterator<Item = &Rect> {
        self.obstructions
            .iter()
            .filter(|o| o.kind == ObsKind::Overlap)
            .map(|o| &o.rect)
    }
    /// Get the pin named `name`
    pub fn pin(&self, name: &str) -> Option<&MasterPin> {
        self.pins.iter().find(|p| p.name == name)
    }
}

/// # Placement Status
///
/// `Fixed`, `Locked`, `Firm` and `Cover` instances are fixed; the rest are movable.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum PlacementStatus {
    #[default]
    None,
    Unplaced,
    Suggested,
    Placed,
    Fixed,
    Locked,
    Firm,
    Cover,
}
impl PlacementStatus {
    pub fn is_fixed(&self) -> bool {
        matches!(self, Self::Fixed | Self::Locked | Self::Firm | Self::Cover)
    }
    pub fn is_placed(&self) -> bool {
        !matches!(self, Self::None | Self::Unplaced)
    }
}

/// # Instance Source Types
///
/// Where an instance came from. Inserted fillers are tagged `Dist`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub enum SourceType {
    #[default]
    Netlist,
    Dist,
    Timing,
    User,
}

/// # Left & Right Padding, in Sites
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct PadSpec {
    pub left: Int,
    pub right: Int,
}
impl PadSpec {
    pub fn new(left: Int, right: Int) -> Self {
        Self { left, right }
    }
}

/// # Instance
///
/// `location` is the lower-left corner of the instance's placed bounding box,
/// in whatever orientation `orient` it has.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Inst {
    pub name: String,
    pub master: MasterKey,
    pub location: Point,
    #[serde(default)]
    pub orient: Orient,
    #[serde(default)]
    pub status: PlacementStatus,
    #[serde(default)]
    pub source: SourceType,
    /// Per-instance padding override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding: Option<PadSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<GroupKey>,
}
impl Inst {
    /// Create a new, placed but movable, ungrouped [Inst]
    pub fn new(name: impl Into<String>, master: MasterKey, location: Point) -> Self {
        Self {
            name: name.into(),
            master,
            location,
            orient: Orient::R0,
            status: PlacementStatus::Placed,
            source: SourceType::Netlist,
            padding: None,
            group: None,
        }
    }
    /// Placed bounding box, given our `master`
    pub fn bbox(&self, master: &Master) -> Rect {
        let (w, h) = match self.orient.is_rotated() {
            true => (master.height, master.width),
            false => (master.width, master.height),
        };
        Rect::from_origin(self.location, w, h)
    }
    /// Transform master-local `rect` into design coordinates
    pub fn transform_rect(&self, master: &Master, rect: &Rect) -> Rect {
        self.orient
            .apply_rect(rect, master.width, master.height)
            .shift(&self.location)
    }
}

/// # Group (Fence)
///
/// Member instances point here via [Inst::group]; they must lie within the union of `regions`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Group {
    pub name: String,
    pub regions: Vec<Rect>,
}

/// # Net Terminal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum NetTerm {
    /// Pin `pin` of instance `inst`
    Inst { inst: InstKey, pin: String },
    /// Top-level IO at a fixed location
    Io(Point),
}
/// # Net
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Net {
    pub name: String,
    pub terms: Vec<NetTerm>,
}

/// # Edge Spacing Rule
///
/// Placement spacing required between facing edges of types `first` and `second`.
#[derive(Debug, Clone, Builder, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[builder(pattern = "owned")]
pub struct EdgeSpacingRule {
    #[builder(setter(into))]
    pub first: String,
    #[builder(setter(into))]
    pub second: String,
    pub spacing: Int,
    /// Facing edges must be exactly `spacing` apart, rather than at least
    #[builder(default)]
    #[serde(default)]
    pub exact: bool,
    /// Abutting edges are exempt
    #[builder(default)]
    #[serde(default)]
    pub except_abutted: bool,
}

/// # Technology Placement Rules
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct Tech {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub edge_spacing: Vec<EdgeSpacingRule>,
}

///
/// # Design
///
/// The full read/write view a legalizer works upon.
///
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Design {
    pub name: String,
    /// Core area. Derived from the rows when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub core: Option<Rect>,
    pub sites: SlotMap<SiteKey, Site>,
    #[serde(default)]
    pub rows: Vec<Row>,
    pub masters: SlotMap<MasterKey, Master>,
    pub insts: SlotMap<InstKey, Inst>,
    pub groups: SlotMap<GroupKey, Group>,
    pub nets: SlotMap<NetKey, Net>,
    #[serde(default)]
    pub tech: Tech,
}
impl SerdeFile for Design {}

impl Design {
    /// Create a new and empty [Design]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
    pub fn add_site(&mut self, site: Site) -> SiteKey {
        self.sites.insert(site)
    }
    /// Add a row of `site_count` sites at `origin`
    pub fn add_row(
        &mut self,
        name: impl Into<String>,
        site: SiteKey,
        origin: Point,
        orient: Orient,
        site_count: usize,
    ) {
        self.rows.push(Row {
            name: name.into(),
            site,
            origin,
            orient,
            site_count,
        })
    }
    pub fn add_master(&mut self, master: Master) -> MasterKey {
        self.masters.insert(master)
    }
    pub fn add_inst(&mut self, inst: Inst) -> InstKey {
        self.insts.insert(inst)
    }
    pub fn add_group(&mut self, group: Group) -> GroupKey {
        self.groups.insert(group)
    }
    pub fn add_net(&mut self, net: Net) -> NetKey {
        self.nets.insert(net)
    }
    /// Remove and return an instance, dropping any net terminals which referred to it
    pub fn destroy_inst(&mut self, key: InstKey) -> Option<Inst> {
        let inst = self.insts.remove(key)?;
        for net in self.nets.values_mut() {
            net.terms
                .retain(|t| !matches!(t, NetTerm::Inst { inst, .. } if *inst == key));
        }
        Some(inst)
    }
    pub fn site(&self, key: SiteKey) -> DbResult<&Site> {
        self.sites
            .get(key)
            .ok_or_else(|| DbError::not_found("Site", format!("{:?}", key)))
    }
    pub fn master(&self, key: MasterKey) -> DbResult<&Master> {
        self.masters
            .get(key)
            .ok_or_else(|| DbError::not_found("Master", format!("{:?}", key)))
    }
    pub fn inst(&self, key: InstKey) -> DbResult<&Inst> {
        self.insts
            .get(key)
            .ok_or_else(|| DbError::not_found("Instance", format!("{:?}", key)))
    }
    pub fn inst_mut(&mut self, key: InstKey) -> DbResult<&mut Inst> {
        self.insts
            .get_mut(key)
            .ok_or_else(|| DbError::not_found("Instance", format!("{:?}", key)))
    }
    pub fn group(&self, key: GroupKey) -> DbResult<&Group> {
        self.groups
            .get(key)
            .ok_or_else(|| DbError::not_found("Group", format!("{:?}", key)))
    }
    /// Find a site by name
    pub fn find_site(&self, name: &str) -> Option<SiteKey> {
        self.sites.iter().find(|(_, s)| s.name == name).map(|(k, _)| k)
    }
    /// Find a master by name
    pub fn find_master(&self, name: &str) -> Option<MasterKey> {
        self.masters.iter().find(|(_, m)| m.name == name).map(|(k, _)| k)
    }
    /// Find an instance by name
    pub fn find_inst(&self, name: &str) -> Option<InstKey> {
        self.insts.iter().find(|(_, i)| i.name == name).map(|(k, _)| k)
    }
    /// Map of instance names to keys, for repeated lookups
    pub fn inst_names(&self) -> HashMap<&str, InstKey> {
        self.insts.iter().map(|(k, i)| (i.name.as_str(), k)).collect()
    }
    /// Placed bounding box of instance `key`
    pub fn inst_bbox(&self, key: InstKey) -> DbResult<Rect> {
        let inst = self.inst(key)?;
        Ok(inst.bbox(self.master(inst.master)?))
    }
    /// Bounding box of row `row`
    pub fn row_bbox(&self, row: &Row) -> DbResult<Rect> {
        let site = self.site(row.site)?;
        let dx = site.width * row.site_count as Int;
        let (dx, dy) = match row.orient.is_rotated() {
            true => (site.height, dx),
            false => (dx, site.height),
        };
        Ok(Rect::from_origin(row.origin, dx, dy))
    }
}

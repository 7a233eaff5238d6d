//!
//! # Cell Padding
//!
//! Extra empty sites required left and right of each standard cell.
//! Resolved per instance, in priority order:
//! per-instance override, then per-master override, then the global default.
//! Only core-class masters are padded.
//!

// Std-Lib
use std::collections::HashMap;

// Local imports
use crate::coords::{DbuX, GridX};
use crate::db::{Inst, InstKey, Int, Master, MasterKey, PadSpec};

/// # Padding Policy
#[derive(Debug, Clone, Default)]
pub struct Padding {
    global: PadSpec,
    masters: HashMap<MasterKey, PadSpec>,
    insts: HashMap<InstKey, PadSpec>,
}
impl Padding {
    /// Set the default padding for all core cells
    pub fn set_global(&mut self, left: Int, right: Int) {
        self.global = PadSpec::new(left, right);
    }
    /// Set padding for all instances of `master`
    pub fn set_master(&mut self, master: MasterKey, left: Int, right: Int) {
        self.masters.insert(master, PadSpec::new(left, right));
    }
    /// Set padding for instance `inst`, overriding any held by the instance itself
    pub fn set_inst(&mut self, inst: InstKey, left: Int, right: Int) {
        self.insts.insert(inst, PadSpec::new(left, right));
    }
    /// Boolean indication of whether any padding is configured
    pub fn have_padding(&self) -> bool {
        self.global != PadSpec::default() || !self.masters.is_empty() || !self.insts.is_empty()
    }
    /// Resolve the padding of instance `key`
    pub fn resolve(&self, key: InstKey, inst: &Inst, master: &Master) -> PadSpec {
        if !master.class.is_core() {
            return PadSpec::default();
        }
        if let Some(spec) = self.insts.get(&key) {
            return *spec;
        }
        if let Some(spec) = inst.padding {
            return spec;
        }
        if let Some(spec) = self.masters.get(&inst.master) {
            return *spec;
        }
        self.global
    }
    /// Left padding of `key`, in sites
    pub fn pad_left(&self, key: InstKey, inst: &Inst, master: &Master) -> GridX {
        GridX(self.resolve(key, inst, master).left)
    }
    /// Right padding of `key`, in sites
    pub fn pad_right(&self, key: InstKey, inst: &Inst, master: &Master) -> GridX {
        GridX(self.resolve(key, inst, master).right)
    }
    /// Padded width of `key`: its own width plus both paddings' sites
    pub fn padded_width(&self, key: InstKey, inst: &Inst, master: &Master, site_width: DbuX) -> DbuX {
        let spec = self.resolve(key, inst, master);
        DbuX(master.width) + GridX(spec.left + spec.right).to_dbu(site_width)
    }
}

//!
//! # Mirroring Optimization
//!
//! Flips placed instances about their y-axis wherever that shortens their nets.
//! Locations never change, only orientations, so legality is unaffected.
//!

// Std-Lib
use std::collections::HashMap;

// Crates.io
use log::info;

// Local imports
use crate::db::{InstKey, Int, NetKey, NetTerm};
use crate::error::DplResult;
use crate::legalizer::Legalizer;
use crate::network::NetBoxes;

/// # Mirroring Results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MirrorReport {
    pub mirrored: usize,
    pub hpwl_before: Int,
    pub hpwl_after: Int,
}

impl Legalizer {
    ///
    /// # Optimize Mirroring
    ///
    /// Each candidate is flipped, and kept flipped only if the HPWL of its nets strictly decreases.
    /// Candidates are placed, movable, y-symmetric instances with at most `mirror_max_iterms` terminals.
    /// Every net a candidate touches is evaluated, however many terminals it has,
    /// so no flip ever lengthens the total.
    ///
    pub fn optimize_mirroring(&mut self) -> DplResult<MirrorReport> {
        let max_terms = self.config.mirror_max_iterms;
        let mut inst_nets: HashMap<InstKey, Vec<NetKey>> = HashMap::new();
        for (nkey, net) in self.design.nets.iter() {
            for term in net.terms.iter() {
                if let NetTerm::Inst { inst, .. } = term {
                    let nets = inst_nets.entry(*inst).or_default();
                    if !nets.contains(&nkey) {
                        nets.push(nkey);
                    }
                }
            }
        }
        let mut term_counts: HashMap<InstKey, usize> = HashMap::new();
        for net in self.design.nets.values() {
            for term in net.terms.iter() {
                if let NetTerm::Inst { inst, .. } = term {
                    *term_counts.entry(*inst).or_insert(0) += 1;
                }
            }
        }
        let candidates: Vec<InstKey> = self
            .design
            .insts
            .iter()
            .filter(|(key, inst)| {
                let symmetric = self
                    .design
                    .masters
                    .get(inst.master)
                    .map(|m| m.symmetry.y && !m.class.is_unplaceable())
                    .unwrap_or(false);
                symmetric
                    && !inst.status.is_fixed()
                    && inst.status.is_placed()
                    && term_counts.get(key).copied().unwrap_or(0) <= max_terms
                    && inst_nets.contains_key(key)
            })
            .map(|(key, _)| key)
            .collect();

        let mut boxes = NetBoxes::new(&self.design);
        let hpwl_before = boxes.total();
        let mut mirrored = 0;
        for key in candidates {
            let nets = &inst_nets[&key];
            let before = boxes.sum(nets);
            boxes.save(nets);
            let inst = self.design.inst_mut(key)?;
            let orient = inst.orient;
            inst.orient = orient.flip_y();
            boxes.update(&self.design, nets);
            if boxes.sum(nets) < before {
                mirrored += 1;
            } else {
                self.design.inst_mut(key)?.orient = orient;
                boxes.restore();
            }
        }
        let report = MirrorReport {
            mirrored,
            hpwl_before,
            hpwl_after: boxes.total(),
        };
        info!(
            "Mirrored {} instances, HPWL {} to {}",
            report.mirrored, report.hpwl_before, report.hpwl_after
        );
        Ok(report)
    }
}

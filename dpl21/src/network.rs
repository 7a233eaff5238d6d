//!
//! # Net Wirelength
//!
//! Half-perimeter wirelength (HPWL) of the design's nets, evaluated on its current instance placements.
//!

// Std-Lib
use std::collections::HashMap;

// Local imports
use crate::db::{Design, Int, Net, NetKey, NetTerm, Point, Rect};

/// Location of terminal `term`: the center of its pin shape, or of its instance if the pin has none
pub fn term_location(design: &Design, term: &NetTerm) -> Option<Point> {
    match term {
        NetTerm::Io(p) => Some(*p),
        NetTerm::Inst { inst, pin } => {
            let inst = design.insts.get(*inst)?;
            let master = design.masters.get(inst.master)?;
            let rect = match master.pin(pin) {
                Some(pin) => inst.transform_rect(master, &pin.rect),
                None => inst.bbox(master),
            };
            Some(rect.center())
        }
    }
}

/// Bounding box of all of `net`'s terminal locations, if it has any
pub fn net_box(design: &Design, net: &Net) -> Option<Rect> {
    let mut bbox: Option<Rect> = None;
    for term in net.terms.iter() {
        if let Some(p) = term_location(design, term) {
            match bbox {
                Some(ref mut b) => b.include(&p),
                None => bbox = Some(Rect::new(p.x, p.y, p.x, p.y)),
            }
        }
    }
    bbox
}

pub fn net_hpwl(design: &Design, net: &Net) -> Int {
    net_box(design, net).map(|b| b.half_perimeter()).unwrap_or(0)
}

/// Total HPWL over every net
pub fn total_hpwl(design: &Design) -> Int {
    design.nets.values().map(|n| net_hpwl(design, n)).sum()
}

///
/// # Net Bounding-Box Cache
///
/// Boxes are recomputed only for nets explicitly updated,
/// and may be saved and restored around a trial move.
///
#[derive(Debug, Clone, Default)]
pub struct NetBoxes {
    boxes: HashMap<NetKey, Option<Rect>>,
    saved: Vec<(NetKey, Option<Rect>)>,
}
impl NetBoxes {
    /// Compute boxes for every net in `design`
    pub fn new(design: &Design) -> Self {
        let boxes = design
            .nets
            .iter()
            .map(|(k, n)| (k, net_box(design, n)))
            .collect();
        Self {
            boxes,
            saved: Vec::new(),
        }
    }
    pub fn hpwl(&self, net: NetKey) -> Int {
        match self.boxes.get(&net) {
            Some(Some(b)) => b.half_perimeter(),
            _ => 0,
        }
    }
    /// Sum of HPWL over `nets`
    pub fn sum(&self, nets: &[NetKey]) -> Int {
        nets.iter().map(|n| self.hpwl(*n)).sum()
    }
    pub fn total(&self) -> Int {
        self.boxes.keys().map(|n| self.hpwl(*n)).sum()
    }
    /// Save the boxes of `nets`, replacing any earlier save
    pub fn save(&mut self, nets: &[NetKey]) {
        self.saved = nets
            .iter()
            .map(|n| (*n, self.boxes.get(n).copied().flatten()))
            .collect();
    }
    /// Restore the boxes saved by the last [NetBoxes::save]
    pub fn restore(&mut self) {
        for (net, bbox) in self.saved.drain(..) {
            self.boxes.insert(net, bbox);
        }
    }
    /// Recompute the boxes of `nets` from `design`
    pub fn update(&mut self, design: &Design, nets: &[NetKey]) {
        for net in nets {
            let bbox = design.nets.get(*net).and_then(|n| net_box(design, n));
            self.boxes.insert(*net, bbox);
        }
    }
}

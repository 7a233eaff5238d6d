//!
//! # Detail-Placement Database
//!
//! The physical-design objects a placement legalizer reads and writes:
//! sites and rows, masters with their obstructions, edges and pins,
//! instances, fence groups, nets, and the technology's edge-spacing rules.
//!
//! Everything lives in [Design], with [slotmap] keys standing in for references between objects.
//! Designs (de)serialize with [serde], and load and save via [SerializationFormat].
//!

pub mod data;
pub use data::*;

pub mod geom;
pub use geom::*;

pub mod error;
pub use error::*;

pub mod ser;
pub use ser::*;

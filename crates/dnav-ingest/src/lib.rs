//! D-NAV Ingest — page text → gated, canonicalized decision units.
//!
//! Segmentation, the noise/commitment gate and canonicalization are pure
//! functions of their input text; nothing here keeps state between calls.

pub mod canonical;
pub mod gate;
pub mod ingest;
pub mod segment;
pub mod select;
pub mod timecue;

pub use canonical::Canonicalizer;
pub use gate::Gate;
pub use ingest::{BinCounts, Ingester};
pub use segment::{Segment, Segmenter};
pub use select::{PageSelection, PageSelector};
pub use timecue::TimeCueExtractor;

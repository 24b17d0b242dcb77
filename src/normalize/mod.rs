//! The normalization pipeline: deterministic projection of heterogeneous raw
//! customs records onto the canonical shipment schema.

pub mod pipeline;
pub mod quality;

pub use pipeline::{Basis, NormalizationPipeline};
pub use quality::parse_quality;

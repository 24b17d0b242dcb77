//! Read-only reference data with process lifetime: the commodity taxonomy,
//! freight/insurance/port-charge/unit/incoterm tables, seasonal patterns,
//! and the configured harvest job catalog.

pub mod jobs;
pub mod seasonal;
pub mod tables;
pub mod taxonomy;

pub use jobs::{harvest_jobs, priority_corridors, Corridor};
pub use seasonal::{seasonal_pattern, CropYear, SeasonalPattern};
pub use tables::{
    calc_insurance, convert_to_mt, infer_incoterm, lookup_freight, lookup_port_charges,
};
pub use taxonomy::{
    classify_by_hs_code, entry_by_id, taxonomy, Classification, HsMapping, TaxonomyEntry,
};

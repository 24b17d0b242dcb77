//! Domain types shared across the pipeline: the canonical shipment schema,
//! the untyped raw-record wrapper, harvest job definitions, and the crate
//! error taxonomy.

pub mod error;
pub mod job;
pub mod raw;
pub mod shipment;

pub use error::{Result, TradeOpsError};
pub use job::{HarvestJob, HarvestStatus, HarvestSummary};
pub use raw::RawRecord;
pub use shipment::{
    CanonicalShipment, Incoterm, PriceSource, PriceStatus, QualityEstimate, TradeType, UnitStatus,
};

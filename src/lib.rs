//! Trade-Intel-Ops — commodity trade-intelligence engine.
//!
//! Continuously pulls shipment-level customs records from the upstream trade
//! data provider, normalizes each record onto one canonical schema (FOB USD,
//! metric tonnes, HCT commodity taxonomy, parsed quality grades), and derives
//! the analytics a commodity trader positions on: implied price curves, flow
//! velocity, supply-vs-consensus deltas, corridor basis and arbitrage,
//! counterparty intelligence, and an aggregated signal feed.

pub mod api;
pub mod config;
pub mod domain;
pub mod harvest;
pub mod intelligence;
pub mod normalize;
pub mod observability;
pub mod reference;
pub mod store;
pub mod upstream;

// Re-export the types most callers touch
pub use config::Config;
pub use domain::{
    CanonicalShipment, HarvestJob, HarvestStatus, HarvestSummary, RawRecord, Result,
    TradeOpsError, TradeType,
};
pub use harvest::HarvestEngine;
pub use intelligence::{
    CorridorAnalyzer, CounterpartyIntelligence, FlowVelocityIndex, ImpliedPriceCurve,
    SignalGenerator, SupplyDemandTracker,
};
pub use normalize::NormalizationPipeline;
pub use store::{GroundPriceStore, InMemoryShipmentStore, ShipmentStore};
pub use upstream::{BudgetTracker, CallKind, TokenManager, UpstreamClient};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

//! The analytics engines. All of them are stateless values holding only
//! references to reference tables: construct once, call from any task. The
//! input record slice and the reference tables are the test seams.

pub mod corridor;
pub mod counterparty;
pub mod fvi;
pub mod ipc;
pub mod sd;
pub mod signals;

pub use corridor::{ArbitrageOpportunity, CorridorAnalyzer, FabResult, OriginComparison, OriginSpec};
pub use counterparty::{
    AnomalyType, Concentration, CounterpartyAnomaly, CounterpartyIntelligence, EntityShare,
    MarketShares, OriginSwitching, PartyField,
};
pub use fvi::{AdjustedFviResult, FlowSignal, FlowVelocityIndex, FviResult};
pub use ipc::{ImpliedPriceCurve, IpcPoint, IpcResult, PriceConfidence};
pub use sd::{CumulativeFlows, SdDelta, SdSignal, SupplyDemandTracker, YoyComparison};
pub use signals::{sort_feed, Severity, SignalGenerator, SignalType, TradeSignal};

/// Round to two decimals for reported USD figures.
pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Round to one decimal for reported percentages.
pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Round to four decimals for reported ratios.
pub(crate) fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

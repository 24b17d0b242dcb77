//! Signal generation: translate analytic outputs into the uniform alert
//! envelope the trader reads first.
//!
//! Every signal is quantified and actionable; anything that would read as
//! "nothing unusual" is suppressed rather than emitted at low severity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::counterparty::{AnomalyType, CounterpartyAnomaly};
use super::fvi::AdjustedFviResult;
use super::ipc::IpcResult;
use super::sd::{SdDelta, SdSignal};

/// Signal severity, highest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    /// Sort rank: HIGH sorts before MEDIUM before LOW.
    pub fn rank(&self) -> u8 {
        match self {
            Severity::High => 0,
            Severity::Medium => 1,
            Severity::Low => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalType {
    PriceMovement,
    FlowVelocity,
    SdDelta,
    CounterpartyNewEntrant,
    CounterpartyWithdrawal,
    CounterpartyVolumeSurge,
}

/// The uniform alert envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    pub signal_type: SignalType,
    pub severity: Severity,
    pub headline: String,
    pub detail: serde_json::Value,
    pub timestamp: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hct_id: Option<String>,
}

/// Minimum absolute week-over-week IPC move worth a signal, percent.
const PRICE_MOVE_THRESHOLD_PCT: f64 = 2.0;
/// Above this the move is severe, percent.
const PRICE_MOVE_HIGH_PCT: f64 = 5.0;

/// Generate trading signals from intelligence-layer outputs.
#[derive(Debug, Clone, Default)]
pub struct SignalGenerator;

impl SignalGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Price-movement signal from two IPC evaluations a week apart.
    pub fn from_ipc_change(
        &self,
        current: &IpcResult,
        previous: &IpcResult,
        commodity_name: &str,
        origin: &str,
        timestamp: NaiveDate,
    ) -> Option<TradeSignal> {
        let curr_price = current.price_usd_per_mt?;
        let prev_price = previous.price_usd_per_mt?;
        if prev_price == 0.0 {
            return None;
        }

        let change_pct = (curr_price - prev_price) / prev_price * 100.0;
        if change_pct.abs() < PRICE_MOVE_THRESHOLD_PCT {
            return None;
        }

        let severity = if change_pct.abs() > PRICE_MOVE_HIGH_PCT {
            Severity::High
        } else {
            Severity::Medium
        };
        let direction = if change_pct > 0.0 { "up" } else { "down" };
        let arrow = if change_pct > 0.0 { "↑" } else { "↓" };

        Some(TradeSignal {
            signal_type: SignalType::PriceMovement,
            severity,
            headline: format!(
                "{commodity_name} from {origin}: implied FOB {arrow} {:.1}% to ${curr_price:.0}/MT",
                change_pct.abs()
            ),
            detail: json!({
                "commodity": commodity_name,
                "origin": origin,
                "current_price": curr_price,
                "previous_price": prev_price,
                "change_pct": (change_pct * 10.0).round() / 10.0,
                "direction": direction,
                "confidence": current.confidence,
            }),
            timestamp,
            hct_id: None,
        })
    }

    /// Flow-velocity signal; quiet FVI states produce nothing.
    pub fn from_fvi(
        &self,
        fvi: &AdjustedFviResult,
        corridor_name: &str,
        timestamp: NaiveDate,
    ) -> Option<TradeSignal> {
        let signal_state = fvi.signal_adjusted.unwrap_or(fvi.base.signal);
        if signal_state.is_quiet() {
            return None;
        }
        let value = fvi.fvi_adjusted.or(fvi.base.fvi_raw)?;

        use super::fvi::FlowSignal::*;
        let severity = match signal_state {
            StrongAcceleration | SevereDeceleration => Severity::High,
            ModerateAcceleration | ModerateDeceleration => Severity::Medium,
            _ => Severity::Low,
        };

        let change_pct = ((value - 1.0) * 1000.0).round() / 10.0;
        let accelerating = matches!(signal_state, StrongAcceleration | ModerateAcceleration);
        let (direction, movement, implication) = if accelerating {
            (
                "up",
                "UP",
                "Demand surge or supply rush. Potential price support.",
            )
        } else {
            (
                "down",
                "DOWN",
                "Demand pullback or supply shortage. Watch for price pressure.",
            )
        };

        Some(TradeSignal {
            signal_type: SignalType::FlowVelocity,
            severity,
            headline: format!(
                "{corridor_name}: flows {movement} {:.1}% vs 30d ago ({:.0} MT recent vs {:.0} MT baseline)",
                change_pct.abs(),
                fvi.base.volume_recent_mt,
                fvi.base.volume_baseline_mt
            ),
            detail: json!({
                "corridor": corridor_name,
                "fvi": value,
                "direction": direction,
                "change_pct": change_pct,
                "implication": implication,
            }),
            timestamp,
            hct_id: None,
        })
    }

    /// S&D-delta signal; ON_TRACK produces nothing.
    pub fn from_sd_delta(
        &self,
        sd: &SdDelta,
        commodity_name: &str,
        timestamp: NaiveDate,
    ) -> Option<TradeSignal> {
        let severity = match sd.signal {
            SdSignal::OnTrack => return None,
            SdSignal::UnderShipping => Severity::High,
            SdSignal::OverShipping | SdSignal::SlightlyUnder => Severity::Medium,
            SdSignal::SlightlyOver => Severity::Low,
        };

        Some(TradeSignal {
            signal_type: SignalType::SdDelta,
            severity,
            headline: format!(
                "{commodity_name}: cumulative flow {:.1}% {} consensus ({:.0} MT actual vs {:.0} MT expected)",
                sd.delta_pct.abs(),
                if sd.delta_pct > 0.0 { "above" } else { "below" },
                sd.actual_cumulative_mt,
                sd.expected_cumulative_mt
            ),
            detail: json!({
                "commodity": commodity_name,
                "delta_pct": sd.delta_pct,
                "signal": sd.signal,
                "implication": sd.implication,
            }),
            timestamp,
            hct_id: None,
        })
    }

    /// Counterparty signal, passing the anomaly severity through.
    pub fn from_counterparty(
        &self,
        anomaly: &CounterpartyAnomaly,
        timestamp: NaiveDate,
    ) -> TradeSignal {
        let signal_type = match anomaly.anomaly_type {
            AnomalyType::NewEntrant => SignalType::CounterpartyNewEntrant,
            AnomalyType::Withdrawal => SignalType::CounterpartyWithdrawal,
            AnomalyType::VolumeSurge => SignalType::CounterpartyVolumeSurge,
        };
        TradeSignal {
            signal_type,
            severity: anomaly.severity,
            headline: anomaly.detail.clone(),
            detail: serde_json::to_value(anomaly).unwrap_or_default(),
            timestamp,
            hct_id: None,
        }
    }
}

/// Order the aggregated feed by severity, then recency.
pub fn sort_feed(signals: &mut [TradeSignal]) {
    signals.sort_by(|a, b| {
        a.severity
            .rank()
            .cmp(&b.severity.rank())
            .then_with(|| b.timestamp.cmp(&a.timestamp))
    });
}

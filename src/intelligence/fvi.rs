//! Flow Velocity Index (FVI) — acceleration or deceleration of trade flows.
//!
//! FVI above 1.0 means flows are accelerating versus the baseline window a
//! month ago; below 1.0 they are decelerating. Flow changes precede price
//! changes, which makes this a leading indicator. The seasonally adjusted
//! variant divides out the expected month-over-month seasonal ratio.

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::CanonicalShipment;
use crate::reference::seasonal_pattern;

use super::{round2, round4};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowSignal {
    StrongAcceleration,
    ModerateAcceleration,
    Normal,
    ModerateDeceleration,
    SevereDeceleration,
    NoBaseline,
    NoData,
    Unknown,
}

impl FlowSignal {
    /// Signals that do not warrant a feed entry.
    pub fn is_quiet(&self) -> bool {
        matches!(
            self,
            FlowSignal::Normal | FlowSignal::NoData | FlowSignal::NoBaseline | FlowSignal::Unknown
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FviConfig {
    /// Days in the recent window
    pub recent_window: u64,
    /// How many days back the baseline window ends
    pub baseline_offset: u64,
}

impl Default for FviConfig {
    fn default() -> Self {
        Self {
            recent_window: 7,
            baseline_offset: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FviResult {
    pub fvi_raw: Option<f64>,
    pub signal: FlowSignal,
    pub volume_recent_mt: f64,
    pub volume_baseline_mt: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recent_window: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub baseline_window: Option<String>,
    pub n_records_recent: usize,
    pub n_records_baseline: usize,
}

impl FviResult {
    fn empty() -> Self {
        Self {
            fvi_raw: None,
            signal: FlowSignal::NoData,
            volume_recent_mt: 0.0,
            volume_baseline_mt: 0.0,
            recent_window: None,
            baseline_window: None,
            n_records_recent: 0,
            n_records_baseline: 0,
        }
    }
}

/// FVI with the seasonal adjustment applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjustedFviResult {
    #[serde(flatten)]
    pub base: FviResult,
    pub fvi_adjusted: Option<f64>,
    pub seasonal_factor: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signal_adjusted: Option<FlowSignal>,
}

/// Compute flow velocity for commodity corridors.
#[derive(Debug, Clone, Default)]
pub struct FlowVelocityIndex {
    config: FviConfig,
}

impl FlowVelocityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FviConfig) -> Self {
        Self { config }
    }

    /// Raw FVI: recent-window volume over the same-length window ending
    /// `baseline_offset` days ago.
    pub fn compute(&self, records: &[CanonicalShipment], target_date: Option<NaiveDate>) -> FviResult {
        if records.is_empty() {
            return FviResult::empty();
        }

        let target = target_date.unwrap_or_else(|| chrono::Utc::now().date_naive());

        let recent_start = target - Days::new(self.config.recent_window);
        let recent_end = target;
        let baseline_end = target - Days::new(self.config.baseline_offset);
        let baseline_start = baseline_end - Days::new(self.config.recent_window);

        let (recent_vol, recent_n) = window_volume(records, recent_start, recent_end);
        let (baseline_vol, baseline_n) = window_volume(records, baseline_start, baseline_end);

        let (fvi_raw, signal) = if baseline_vol <= 0.0 {
            (None, FlowSignal::NoBaseline)
        } else {
            let raw = round4(recent_vol / baseline_vol);
            (Some(raw), interpret(raw))
        };

        FviResult {
            fvi_raw,
            signal,
            volume_recent_mt: round2(recent_vol),
            volume_baseline_mt: round2(baseline_vol),
            recent_window: Some(format!("{recent_start} to {recent_end}")),
            baseline_window: Some(format!("{baseline_start} to {baseline_end}")),
            n_records_recent: recent_n,
            n_records_baseline: baseline_n,
        }
    }

    /// FVI divided by the expected seasonal ratio, so normal harvest-season
    /// acceleration does not read as a signal.
    pub fn compute_seasonally_adjusted(
        &self,
        records: &[CanonicalShipment],
        hct_id: &str,
        target_date: Option<NaiveDate>,
    ) -> AdjustedFviResult {
        let base = self.compute(records, target_date);

        let Some(raw) = base.fvi_raw else {
            return AdjustedFviResult {
                base,
                fvi_adjusted: None,
                seasonal_factor: None,
                signal_adjusted: None,
            };
        };

        let Some(pattern) = seasonal_pattern(hct_id) else {
            return AdjustedFviResult {
                base,
                fvi_adjusted: Some(raw),
                seasonal_factor: Some(1.0),
                signal_adjusted: None,
            };
        };

        let target = target_date.unwrap_or_else(|| chrono::Utc::now().date_naive());
        let current_weight = pattern.monthly_weight(target.month());
        let baseline_month = (target - Days::new(self.config.baseline_offset)).month();
        let baseline_weight = pattern.monthly_weight(baseline_month);

        let seasonal_factor = if baseline_weight <= 0.0 {
            1.0
        } else {
            current_weight / baseline_weight
        };

        let (fvi_adjusted, signal_adjusted) = if seasonal_factor > 0.0 {
            let adjusted = round4(raw / seasonal_factor);
            (Some(adjusted), Some(interpret(adjusted)))
        } else {
            (None, Some(FlowSignal::Unknown))
        };

        AdjustedFviResult {
            base,
            fvi_adjusted,
            seasonal_factor: Some(round4(seasonal_factor)),
            signal_adjusted,
        }
    }

    /// Seasonally adjusted FVI for every day in a range.
    pub fn compute_time_series(
        &self,
        records: &[CanonicalShipment],
        hct_id: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Vec<(NaiveDate, AdjustedFviResult)> {
        let mut series = Vec::new();
        let mut current = start_date;
        while current <= end_date {
            series.push((
                current,
                self.compute_seasonally_adjusted(records, hct_id, Some(current)),
            ));
            current = current + Days::new(1);
        }
        series
    }
}

fn window_volume(records: &[CanonicalShipment], start: NaiveDate, end: NaiveDate) -> (f64, usize) {
    let mut volume = 0.0;
    let mut count = 0;
    for record in records {
        let Some(date) = record.trade_date else {
            continue;
        };
        if date < start || date > end {
            continue;
        }
        count += 1;
        if let Some(qty) = record.quantity_mt.filter(|q| *q > 0.0) {
            volume += qty;
        }
    }
    (volume, count)
}

fn interpret(fvi: f64) -> FlowSignal {
    if fvi > 1.30 {
        FlowSignal::StrongAcceleration
    } else if fvi > 1.10 {
        FlowSignal::ModerateAcceleration
    } else if fvi >= 0.90 {
        FlowSignal::Normal
    } else if fvi >= 0.70 {
        FlowSignal::ModerateDeceleration
    } else {
        FlowSignal::SevereDeceleration
    }
}

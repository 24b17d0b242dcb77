//! Implied Price Curve (IPC) — continuous price discovery for commodities
//! with no published benchmark.
//!
//! The curve is a volume-weighted median of per-shipment FOB prices over a
//! rolling window, with a three-tier confidence score driven by sample size
//! and dispersion.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{CanonicalShipment, PriceStatus};

use super::round2;

/// Confidence tiers, ordered so `min` across a pair picks the weaker one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PriceConfidence {
    None,
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcConfig {
    pub window_days: u64,
    pub min_records_high: usize,
    pub min_records_medium: usize,
    /// IQR/price dispersion ceiling for HIGH confidence
    pub max_dispersion_high: f64,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            window_days: 5,
            min_records_high: 20,
            min_records_medium: 5,
            max_dispersion_high: 0.15,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcResult {
    pub price_usd_per_mt: Option<f64>,
    pub confidence: PriceConfidence,
    pub n_records: usize,
    pub volume_mt: f64,
    pub price_iqr: Option<f64>,
    pub price_min: Option<f64>,
    pub price_max: Option<f64>,
    pub price_mean: Option<f64>,
    pub window_start: Option<NaiveDate>,
    pub window_end: Option<NaiveDate>,
}

impl IpcResult {
    fn empty(window_start: Option<NaiveDate>, window_end: Option<NaiveDate>) -> Self {
        Self {
            price_usd_per_mt: None,
            confidence: PriceConfidence::None,
            n_records: 0,
            volume_mt: 0.0,
            price_iqr: None,
            price_min: None,
            price_max: None,
            price_mean: None,
            window_start,
            window_end,
        }
    }
}

/// One point of an IPC time series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcPoint {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub ipc: IpcResult,
}

/// Compute implied daily prices from normalized shipment records.
#[derive(Debug, Clone, Default)]
pub struct ImpliedPriceCurve {
    config: IpcConfig,
}

impl ImpliedPriceCurve {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: IpcConfig) -> Self {
        Self { config }
    }

    /// The IPC for a record set on a given date. With no target date the
    /// latest trade date present is used.
    pub fn compute(&self, records: &[CanonicalShipment], target_date: Option<NaiveDate>) -> IpcResult {
        self.compute_windowed(records, target_date, self.config.window_days)
    }

    /// The IPC with an explicit rolling-window width.
    pub fn compute_windowed(
        &self,
        records: &[CanonicalShipment],
        target_date: Option<NaiveDate>,
        window_days: u64,
    ) -> IpcResult {
        if records.is_empty() {
            return IpcResult::empty(None, None);
        }

        let target_date = target_date
            .or_else(|| records.iter().filter_map(|r| r.trade_date).max())
            .unwrap_or_else(|| chrono::Utc::now().date_naive());

        let window_start = target_date - Days::new(window_days);
        let window_end = target_date;

        // Window filter: NORMAL status, positive price, dated in range.
        // Weight is tonnage when known, else one shipment = one vote.
        let mut weighted: Vec<(f64, f64)> = Vec::new();
        for record in records {
            let Some(trade_date) = record.trade_date else {
                continue;
            };
            let Some(price) = record.fob_usd_per_mt.filter(|p| *p > 0.0) else {
                continue;
            };
            if record.price_status != PriceStatus::Normal {
                continue;
            }
            if trade_date < window_start || trade_date > window_end {
                continue;
            }
            let weight = record.quantity_mt.filter(|q| *q > 0.0).unwrap_or(1.0);
            weighted.push((price, weight));
        }

        if weighted.is_empty() {
            return IpcResult::empty(Some(window_start), Some(window_end));
        }

        let total_volume: f64 = weighted.iter().map(|(_, w)| w).sum();
        let wm_price = weighted_median(&weighted);

        let n_records = weighted.len();
        let mut sorted_prices: Vec<f64> = weighted.iter().map(|(p, _)| *p).collect();
        sorted_prices.sort_by(|a, b| a.total_cmp(b));

        let iqr = if sorted_prices.len() > 1 {
            let q1_idx = (sorted_prices.len() / 4).saturating_sub(1);
            let q3_idx = (3 * sorted_prices.len() / 4).min(sorted_prices.len() - 1);
            sorted_prices[q3_idx] - sorted_prices[q1_idx]
        } else {
            0.0
        };

        let dispersion = if wm_price > 0.0 { iqr / wm_price } else { 1.0 };
        let confidence = if n_records >= self.config.min_records_high
            && dispersion < self.config.max_dispersion_high
        {
            PriceConfidence::High
        } else if n_records >= self.config.min_records_medium {
            PriceConfidence::Medium
        } else {
            PriceConfidence::Low
        };

        let mean = sorted_prices.iter().sum::<f64>() / n_records as f64;

        IpcResult {
            price_usd_per_mt: Some(round2(wm_price)),
            confidence,
            n_records,
            volume_mt: round2(total_volume),
            price_iqr: Some(round2(iqr)),
            price_min: sorted_prices.first().map(|p| round2(*p)),
            price_max: sorted_prices.last().map(|p| round2(*p)),
            price_mean: Some(round2(mean)),
            window_start: Some(window_start),
            window_end: Some(window_end),
        }
    }

    /// The IPC for every day in a date range.
    pub fn compute_time_series(
        &self,
        records: &[CanonicalShipment],
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Vec<IpcPoint> {
        let mut series = Vec::new();
        let mut current = start_date;
        while current <= end_date {
            series.push(IpcPoint {
                date: current,
                ipc: self.compute(records, Some(current)),
            });
            current = current + Days::new(1);
        }
        series
    }
}

/// Weighted median: sort by price and walk the cumulative weight until it
/// reaches half the total.
fn weighted_median(pairs: &[(f64, f64)]) -> f64 {
    if pairs.is_empty() {
        return 0.0;
    }
    if pairs.len() == 1 {
        return pairs[0].0;
    }

    let mut sorted: Vec<(f64, f64)> = pairs.to_vec();
    sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

    let total: f64 = sorted.iter().map(|(_, w)| w).sum();
    let half = total / 2.0;

    let mut cumulative = 0.0;
    for (value, weight) in &sorted {
        cumulative += weight;
        if cumulative >= half {
            return *value;
        }
    }
    sorted[sorted.len() - 1].0
}

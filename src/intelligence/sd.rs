//! Supply-Demand tracker.
//!
//! Tracks cumulative flows against consensus estimates. The delta between
//! what the market expects to have shipped by now and what has actually
//! shipped is the highest-alpha output of the system.

use std::collections::HashMap;

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::domain::{CanonicalShipment, TradeType};

use super::{round1, round2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SdSignal {
    OverShipping,
    SlightlyOver,
    OnTrack,
    SlightlyUnder,
    UnderShipping,
}

impl SdSignal {
    /// Fixed trader-facing implication for each signal.
    pub fn implication(&self) -> &'static str {
        match self {
            SdSignal::OverShipping => "Supply more ample than market expects. Bearish.",
            SdSignal::SlightlyOver => "Marginally above expectations. Watch for trend.",
            SdSignal::OnTrack => "Flows in line with consensus.",
            SdSignal::SlightlyUnder => "Marginally below expectations. Watch for trend.",
            SdSignal::UnderShipping => "Supply tighter than market expects. Bullish.",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryVolume {
    pub country: String,
    pub volume_mt: f64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyCumulative {
    pub date: NaiveDate,
    pub daily_volume_mt: f64,
    pub cumulative_volume_mt: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CumulativeFlows {
    pub total_volume_mt: f64,
    pub total_value_usd: f64,
    pub record_count: usize,
    pub avg_price_per_mt: Option<f64>,
    pub country_breakdown: Vec<CountryVolume>,
    pub daily_series: Vec<DailyCumulative>,
    pub period: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdDelta {
    pub actual_cumulative_mt: f64,
    pub expected_cumulative_mt: f64,
    pub delta_mt: f64,
    pub delta_pct: f64,
    pub consensus_annual_mt: f64,
    pub crop_year_progress_pct: f64,
    pub signal: SdSignal,
    pub implication: String,
    pub country_breakdown: Vec<CountryVolume>,
    pub record_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YoyComparison {
    pub current_period: CumulativeFlows,
    pub previous_period: CumulativeFlows,
    pub yoy_volume_change_pct: Option<f64>,
    pub yoy_value_change_pct: Option<f64>,
}

/// Compute implied supply-demand balance sheets and deltas.
#[derive(Debug, Clone, Default)]
pub struct SupplyDemandTracker;

impl SupplyDemandTracker {
    pub fn new() -> Self {
        Self
    }

    /// Cumulative volumes over a period, grouped by origin country, with a
    /// running daily series.
    pub fn compute_cumulative_flows(
        &self,
        records: &[CanonicalShipment],
        start_date: NaiveDate,
        end_date: NaiveDate,
        trade_type: Option<TradeType>,
    ) -> CumulativeFlows {
        let mut daily_volumes: HashMap<NaiveDate, f64> = HashMap::new();
        let mut country_volumes: HashMap<String, f64> = HashMap::new();
        let mut total_volume = 0.0;
        let mut total_value = 0.0;
        let mut record_count = 0;

        for record in records {
            let Some(date) = record.trade_date else {
                continue;
            };
            if date < start_date || date > end_date {
                continue;
            }
            if let Some(required) = trade_type {
                if record.trade_type != required {
                    continue;
                }
            }

            let Some(qty) = record.quantity_mt.filter(|q| *q > 0.0) else {
                continue;
            };

            *daily_volumes.entry(date).or_default() += qty;

            let origin = record
                .origin_country
                .clone()
                .or_else(|| record.destination_country.clone())
                .unwrap_or_else(|| "UNKNOWN".to_string());
            *country_volumes.entry(origin).or_default() += qty;

            total_volume += qty;
            total_value += record.fob_usd_total.unwrap_or(0.0);
            record_count += 1;
        }

        let mut daily_series = Vec::new();
        let mut running = 0.0;
        let mut current = start_date;
        while current <= end_date {
            let day_vol = daily_volumes.get(&current).copied().unwrap_or(0.0);
            running += day_vol;
            daily_series.push(DailyCumulative {
                date: current,
                daily_volume_mt: round2(day_vol),
                cumulative_volume_mt: round2(running),
            });
            current = current + Days::new(1);
        }

        let mut country_breakdown: Vec<CountryVolume> = country_volumes
            .into_iter()
            .map(|(country, volume)| CountryVolume {
                country,
                volume_mt: round2(volume),
                share_pct: if total_volume > 0.0 {
                    round1(volume / total_volume * 100.0)
                } else {
                    0.0
                },
            })
            .collect();
        country_breakdown.sort_by(|a, b| b.volume_mt.total_cmp(&a.volume_mt));

        CumulativeFlows {
            total_volume_mt: round2(total_volume),
            total_value_usd: round2(total_value),
            record_count,
            avg_price_per_mt: if total_volume > 0.0 {
                Some(round2(total_value / total_volume))
            } else {
                None
            },
            country_breakdown,
            daily_series,
            period: format!("{start_date} to {end_date}"),
        }
    }

    /// Deviation of actual cumulative flow from the pro-rata share of the
    /// consensus annual estimate at this point in the crop year.
    pub fn compute_sd_delta(
        &self,
        records: &[CanonicalShipment],
        consensus_annual_mt: f64,
        crop_year_start: NaiveDate,
        target_date: Option<NaiveDate>,
    ) -> SdDelta {
        let target = target_date.unwrap_or_else(|| chrono::Utc::now().date_naive());

        let crop_year_end = add_years(crop_year_start, 1);
        let days_elapsed = (target - crop_year_start).num_days();
        let days_total = (crop_year_end - crop_year_start).num_days();
        let progress = if days_total > 0 {
            days_elapsed as f64 / days_total as f64
        } else {
            0.0
        };

        let expected = consensus_annual_mt * progress;

        let flows = self.compute_cumulative_flows(records, crop_year_start, target, None);
        let actual = flows.total_volume_mt;

        let delta = actual - expected;
        let delta_pct = if expected > 0.0 {
            delta / expected * 100.0
        } else {
            0.0
        };

        let signal = if delta_pct > 10.0 {
            SdSignal::OverShipping
        } else if delta_pct > 5.0 {
            SdSignal::SlightlyOver
        } else if delta_pct < -10.0 {
            SdSignal::UnderShipping
        } else if delta_pct < -5.0 {
            SdSignal::SlightlyUnder
        } else {
            SdSignal::OnTrack
        };

        SdDelta {
            actual_cumulative_mt: round2(actual),
            expected_cumulative_mt: round2(expected),
            delta_mt: round2(delta),
            delta_pct: round1(delta_pct),
            consensus_annual_mt,
            crop_year_progress_pct: round1(progress * 100.0),
            signal,
            implication: signal.implication().to_string(),
            country_breakdown: flows.country_breakdown,
            record_count: flows.record_count,
        }
    }

    /// Current-period flows against the same calendar window one year back.
    pub fn compute_yoy_comparison(
        &self,
        current_records: &[CanonicalShipment],
        previous_records: &[CanonicalShipment],
        period_start: NaiveDate,
        period_end: NaiveDate,
    ) -> YoyComparison {
        let current =
            self.compute_cumulative_flows(current_records, period_start, period_end, None);

        let prev_start = add_years(period_start, -1);
        let prev_end = add_years(period_end, -1);
        let previous = self.compute_cumulative_flows(previous_records, prev_start, prev_end, None);

        let yoy_volume_change_pct = if previous.total_volume_mt > 0.0 {
            Some(round1(
                (current.total_volume_mt - previous.total_volume_mt) / previous.total_volume_mt
                    * 100.0,
            ))
        } else {
            None
        };
        let yoy_value_change_pct = if previous.total_value_usd > 0.0 {
            Some(round1(
                (current.total_value_usd - previous.total_value_usd) / previous.total_value_usd
                    * 100.0,
            ))
        } else {
            None
        };

        YoyComparison {
            current_period: current,
            previous_period: previous,
            yoy_volume_change_pct,
            yoy_value_change_pct,
        }
    }
}

/// Shift a date by whole years, clamping Feb 29 to Feb 28 off leap years.
fn add_years(date: NaiveDate, years: i32) -> NaiveDate {
    date.with_year(date.year() + years)
        .or_else(|| {
            NaiveDate::from_ymd_opt(date.year() + years, date.month(), date.day() - 1)
        })
        .unwrap_or(date)
}

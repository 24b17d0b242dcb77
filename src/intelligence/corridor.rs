//! Corridor analysis: which origin is cheapest delivered, and whether a
//! basis play exists between corridors.
//!
//! FAB (freight-adjusted basis) is FOB plus freight, insurance, and port
//! charges — the implied CIF at the destination.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::CanonicalShipment;
use crate::reference::{calc_insurance, lookup_freight, lookup_port_charges};

use super::ipc::{ImpliedPriceCurve, PriceConfidence};
use super::{round1, round2};

/// Minimum inter-origin spread worth calling an arbitrage, percent.
const MIN_ARB_SPREAD_PCT: f64 = 3.0;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OriginSpec {
    pub country: String,
    pub port: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FabResult {
    pub origin: String,
    pub origin_port: String,
    pub dest_port: String,
    pub fob_usd_per_mt: Option<f64>,
    pub freight_usd_per_mt: Option<f64>,
    pub insurance_usd_per_mt: Option<f64>,
    pub port_charges_usd_per_mt: Option<f64>,
    pub implied_cif_usd_per_mt: Option<f64>,
    pub ipc_confidence: PriceConfidence,
    pub ipc_n_records: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginComparison {
    pub destination_port: String,
    pub comparisons: Vec<FabResult>,
    pub cheapest_origin: Option<String>,
    pub most_expensive_origin: Option<String>,
    pub origin_spread_usd: Option<f64>,
    pub n_origins_with_data: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArbitrageOpportunity {
    pub cheaper_origin: String,
    pub expensive_origin: String,
    pub cheaper_fob: f64,
    pub expensive_fob: f64,
    pub spread_usd: f64,
    pub spread_pct: f64,
    /// The weaker of the two origin IPC confidences
    pub confidence: PriceConfidence,
}

/// Compare corridors and compute freight-adjusted basis.
#[derive(Debug, Clone, Default)]
pub struct CorridorAnalyzer {
    ipc_engine: ImpliedPriceCurve,
}

impl CorridorAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    fn origin_records<'a>(
        records: &'a [CanonicalShipment],
        origin_country: &str,
    ) -> Vec<CanonicalShipment> {
        let origin = origin_country.to_uppercase();
        records
            .iter()
            .filter(|r| {
                r.origin_country
                    .as_deref()
                    .map(|c| c.to_uppercase() == origin)
                    .unwrap_or(false)
            })
            .cloned()
            .collect()
    }

    /// FAB for one corridor: origin IPC plus the cost stack to destination.
    pub fn compute_fab(
        &self,
        records: &[CanonicalShipment],
        origin_country: &str,
        origin_port: &str,
        dest_port: &str,
        target_date: Option<NaiveDate>,
    ) -> FabResult {
        let origin_records = Self::origin_records(records, origin_country);
        let ipc = self.ipc_engine.compute(&origin_records, target_date);

        let Some(fob_price) = ipc.price_usd_per_mt else {
            return FabResult {
                origin: origin_country.to_string(),
                origin_port: origin_port.to_string(),
                dest_port: dest_port.to_string(),
                fob_usd_per_mt: None,
                freight_usd_per_mt: None,
                insurance_usd_per_mt: None,
                port_charges_usd_per_mt: None,
                implied_cif_usd_per_mt: None,
                ipc_confidence: ipc.confidence,
                ipc_n_records: ipc.n_records,
                note: Some("Insufficient price data".to_string()),
            };
        };

        let freight = lookup_freight(Some(origin_port), Some(dest_port)).unwrap_or(0.0);
        let insurance = calc_insurance(fob_price, Some(origin_port), Some(dest_port));
        let port_charges = lookup_port_charges(Some(dest_port));

        let implied_cif = fob_price + freight + insurance + port_charges;

        FabResult {
            origin: origin_country.to_string(),
            origin_port: origin_port.to_string(),
            dest_port: dest_port.to_string(),
            fob_usd_per_mt: Some(round2(fob_price)),
            freight_usd_per_mt: Some(round2(freight)),
            insurance_usd_per_mt: Some(round2(insurance)),
            port_charges_usd_per_mt: Some(round2(port_charges)),
            implied_cif_usd_per_mt: Some(round2(implied_cif)),
            ipc_confidence: ipc.confidence,
            ipc_n_records: ipc.n_records,
            note: None,
        }
    }

    /// FAB for several origins delivering to one destination, cheapest first.
    pub fn compare_origins(
        &self,
        records: &[CanonicalShipment],
        origins: &[OriginSpec],
        dest_port: &str,
        target_date: Option<NaiveDate>,
    ) -> OriginComparison {
        let mut comparisons: Vec<FabResult> = origins
            .iter()
            .map(|origin| {
                self.compute_fab(records, &origin.country, &origin.port, dest_port, target_date)
            })
            .collect();

        comparisons.sort_by(|a, b| match (a.implied_cif_usd_per_mt, b.implied_cif_usd_per_mt) {
            (Some(a), Some(b)) => a.total_cmp(&b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let valid: Vec<&FabResult> = comparisons
            .iter()
            .filter(|c| c.implied_cif_usd_per_mt.is_some())
            .collect();

        let cheapest = valid.first();
        let most_expensive = valid.last();
        let origin_spread_usd = match (cheapest, most_expensive) {
            (Some(low), Some(high)) => Some(round2(
                high.implied_cif_usd_per_mt.unwrap_or(0.0)
                    - low.implied_cif_usd_per_mt.unwrap_or(0.0),
            )),
            _ => None,
        };

        OriginComparison {
            destination_port: dest_port.to_string(),
            cheapest_origin: cheapest.map(|c| c.origin.clone()),
            most_expensive_origin: most_expensive.map(|c| c.origin.clone()),
            origin_spread_usd,
            n_origins_with_data: valid.len(),
            comparisons,
        }
    }

    /// All origin pairs whose FOB spread exceeds the threshold, widest
    /// first. Origins without a known IPC are excluded before pairing.
    pub fn find_arbitrage(
        &self,
        records: &[CanonicalShipment],
        origin_countries: &[String],
        target_date: Option<NaiveDate>,
    ) -> Vec<ArbitrageOpportunity> {
        let mut origin_prices: Vec<(String, f64, PriceConfidence)> = Vec::new();
        for origin in origin_countries {
            let origin_records = Self::origin_records(records, origin);
            let ipc = self.ipc_engine.compute(&origin_records, target_date);
            if let Some(price) = ipc.price_usd_per_mt {
                origin_prices.push((origin.to_uppercase(), price, ipc.confidence));
            }
        }

        let mut opportunities = Vec::new();
        for i in 0..origin_prices.len() {
            for j in (i + 1)..origin_prices.len() {
                let (origin_a, price_a, conf_a) = &origin_prices[i];
                let (origin_b, price_b, conf_b) = &origin_prices[j];

                let spread = (price_a - price_b).abs();
                let spread_pct = spread / price_a.min(*price_b) * 100.0;
                if spread_pct <= MIN_ARB_SPREAD_PCT {
                    continue;
                }

                let (cheaper, expensive) = if price_a < price_b {
                    (origin_a, origin_b)
                } else {
                    (origin_b, origin_a)
                };

                opportunities.push(ArbitrageOpportunity {
                    cheaper_origin: cheaper.clone(),
                    expensive_origin: expensive.clone(),
                    cheaper_fob: round2(price_a.min(*price_b)),
                    expensive_fob: round2(price_a.max(*price_b)),
                    spread_usd: round2(spread),
                    spread_pct: round1(spread_pct),
                    confidence: (*conf_a).min(*conf_b),
                });
            }
        }

        opportunities.sort_by(|a, b| b.spread_pct.total_cmp(&a.spread_pct));
        opportunities
    }
}

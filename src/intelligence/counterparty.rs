//! Counterparty intelligence: who is buying, who is selling, and when a
//! major player changes behaviour.
//!
//! Entity resolution folds the trade houses' many subsidiaries onto one
//! canonical name; market shares and anomaly detection run on the resolved
//! entities.

use std::collections::{BTreeSet, HashMap};

use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::domain::CanonicalShipment;

use super::signals::Severity;
use super::{round1, round2};

/// Which side of the trade to group by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyField {
    Consignee,
    Consignor,
}

impl PartyField {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyField::Consignee => "consignee",
            PartyField::Consignor => "consignor",
        }
    }

    fn get<'a>(&self, record: &'a CanonicalShipment) -> Option<&'a str> {
        match self {
            PartyField::Consignee => record.consignee.as_deref(),
            PartyField::Consignor => record.consignor.as_deref(),
        }
    }
}

/// Known aliases of the major trading entities.
static ENTITY_ALIASES: Lazy<Vec<(&'static str, Vec<&'static str>)>> = Lazy::new(|| {
    vec![
        (
            "Olam Group",
            vec![
                "OLAM",
                "OLAM INTERNATIONAL",
                "OLAM AGRI",
                "OLAM FOOD",
                "OLAM NIGERIA",
                "OLAM GHANA",
                "OLAM VIETNAM",
                "OLAM IVORY",
            ],
        ),
        ("Louis Dreyfus", vec!["LOUIS DREYFUS", "LDC", "LD COMMODITIES"]),
        (
            "Cargill",
            vec!["CARGILL", "CARGILL INC", "CARGILL INDIA", "CARGILL WEST AFRICA"],
        ),
        ("ADM", vec!["ARCHER DANIELS", "ADM", "A.D.M"]),
        ("Bunge", vec!["BUNGE", "BUNGE LIMITED"]),
        ("Wilmar", vec!["WILMAR", "WILMAR INTERNATIONAL"]),
    ]
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityShare {
    pub entity: String,
    pub volume_mt: f64,
    pub value_usd: f64,
    pub shipments: usize,
    pub market_share_pct: f64,
    pub avg_price_per_mt: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Concentration {
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketShares {
    pub party_type: PartyField,
    pub total_volume_mt: f64,
    pub unique_entities: usize,
    /// Herfindahl-Hirschman index over the reported entities
    pub hhi: f64,
    pub concentration: Concentration,
    pub top_entities: Vec<EntityShare>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyType {
    NewEntrant,
    Withdrawal,
    VolumeSurge,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CounterpartyAnomaly {
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub entity: String,
    pub severity: Severity,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_mt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_share_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_share_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_volume_mt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub historical_monthly_mt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiplier: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OriginSwitching {
    pub entity: String,
    pub recent_origins: HashMap<String, f64>,
    pub earlier_origins: HashMap<String, f64>,
    pub switching_detected: bool,
}

/// Analyze counterparty behaviour from normalized records.
#[derive(Debug, Clone, Default)]
pub struct CounterpartyIntelligence;

impl CounterpartyIntelligence {
    pub fn new() -> Self {
        Self
    }

    /// Resolve a raw party name to its canonical entity. Unknown names pass
    /// through trimmed; empty names become UNKNOWN.
    pub fn resolve_entity(&self, name: Option<&str>) -> String {
        let Some(name) = name.map(str::trim).filter(|n| !n.is_empty()) else {
            return "UNKNOWN".to_string();
        };
        let upper = name.to_uppercase();
        for (canonical, aliases) in ENTITY_ALIASES.iter() {
            if aliases.iter().any(|alias| upper.contains(alias)) {
                return canonical.to_string();
            }
        }
        name.to_string()
    }

    /// Market shares by volume for buyers or sellers over a window.
    /// Undated records are included, matching how partial customs data is
    /// reported upstream.
    pub fn compute_market_shares(
        &self,
        records: &[CanonicalShipment],
        party_field: PartyField,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
        top_n: usize,
    ) -> MarketShares {
        let mut volumes: HashMap<String, f64> = HashMap::new();
        let mut values: HashMap<String, f64> = HashMap::new();
        let mut shipments: HashMap<String, usize> = HashMap::new();
        let mut total_volume = 0.0;

        for record in records {
            if let (Some(start), Some(date)) = (start_date, record.trade_date) {
                if date < start {
                    continue;
                }
            }
            if let (Some(end), Some(date)) = (end_date, record.trade_date) {
                if date > end {
                    continue;
                }
            }

            let Some(qty) = record.quantity_mt.filter(|q| *q > 0.0) else {
                continue;
            };

            let entity = self.resolve_entity(party_field.get(record));
            *volumes.entry(entity.clone()).or_default() += qty;
            *values.entry(entity.clone()).or_default() += record.fob_usd_total.unwrap_or(0.0);
            *shipments.entry(entity).or_default() += 1;
            total_volume += qty;
        }

        let mut sorted: Vec<(String, f64)> = volumes.iter().map(|(k, v)| (k.clone(), *v)).collect();
        sorted.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let top_entities: Vec<EntityShare> = sorted
            .iter()
            .take(top_n)
            .map(|(entity, volume)| {
                let value = values.get(entity).copied().unwrap_or(0.0);
                EntityShare {
                    entity: entity.clone(),
                    volume_mt: round2(*volume),
                    value_usd: round2(value),
                    shipments: shipments.get(entity).copied().unwrap_or(0),
                    market_share_pct: if total_volume > 0.0 {
                        round1(volume / total_volume * 100.0)
                    } else {
                        0.0
                    },
                    avg_price_per_mt: if *volume > 0.0 {
                        Some(round2(value / volume))
                    } else {
                        None
                    },
                }
            })
            .collect();

        let hhi: f64 = top_entities
            .iter()
            .map(|e| (e.market_share_pct / 100.0).powi(2))
            .sum();
        let hhi = (hhi * 10_000.0).round() / 10_000.0;

        let concentration = if hhi > 0.25 {
            Concentration::High
        } else if hhi > 0.15 {
            Concentration::Moderate
        } else {
            Concentration::Low
        };

        MarketShares {
            party_type: party_field,
            total_volume_mt: round2(total_volume),
            unique_entities: volumes.len(),
            hhi,
            concentration,
            top_entities,
        }
    }

    /// New entrants, withdrawals, and volume surges: the last 30 days
    /// against the prior `lookback_months`, both ending at `reference_date`.
    pub fn detect_anomalies(
        &self,
        current_records: &[CanonicalShipment],
        historical_records: &[CanonicalShipment],
        party_field: PartyField,
        lookback_months: u64,
        reference_date: NaiveDate,
    ) -> Vec<CounterpartyAnomaly> {
        let current_start = reference_date - Days::new(30);
        let historical_start = reference_date - Days::new(lookback_months * 30);

        let current = self.compute_market_shares(
            current_records,
            party_field,
            Some(current_start),
            Some(reference_date),
            20,
        );
        let historical = self.compute_market_shares(
            historical_records,
            party_field,
            Some(historical_start),
            Some(current_start),
            20,
        );

        let current_entities: HashMap<&str, &EntityShare> = current
            .top_entities
            .iter()
            .map(|e| (e.entity.as_str(), e))
            .collect();
        let historical_entities: HashMap<&str, &EntityShare> = historical
            .top_entities
            .iter()
            .map(|e| (e.entity.as_str(), e))
            .collect();

        let mut anomalies = Vec::new();

        // New entrants: in the current window, absent historically
        for (entity, share) in &current_entities {
            if historical_entities.contains_key(entity) || share.volume_mt <= 0.0 {
                continue;
            }
            anomalies.push(CounterpartyAnomaly {
                anomaly_type: AnomalyType::NewEntrant,
                entity: entity.to_string(),
                severity: if share.market_share_pct > 5.0 {
                    Severity::High
                } else {
                    Severity::Medium
                },
                detail: format!(
                    "New {} detected: {} with {} MT ({} shipments)",
                    party_field.as_str(),
                    entity,
                    share.volume_mt,
                    share.shipments
                ),
                volume_mt: Some(share.volume_mt),
                market_share_pct: Some(share.market_share_pct),
                historical_share_pct: None,
                current_volume_mt: None,
                historical_monthly_mt: None,
                multiplier: None,
            });
        }

        // Withdrawals: meaningful historical share, gone now
        for (entity, hist) in &historical_entities {
            if current_entities.contains_key(entity) || hist.market_share_pct <= 3.0 {
                continue;
            }
            anomalies.push(CounterpartyAnomaly {
                anomaly_type: AnomalyType::Withdrawal,
                entity: entity.to_string(),
                severity: if hist.market_share_pct > 10.0 {
                    Severity::High
                } else {
                    Severity::Medium
                },
                detail: format!(
                    "{} absent from recent period. Was {}% of market historically.",
                    entity, hist.market_share_pct
                ),
                volume_mt: None,
                market_share_pct: None,
                historical_share_pct: Some(hist.market_share_pct),
                current_volume_mt: None,
                historical_monthly_mt: None,
                multiplier: None,
            });
        }

        // Volume surges: current month above twice the historical average
        for (entity, curr) in &current_entities {
            let Some(hist) = historical_entities.get(entity) else {
                continue;
            };
            let hist_monthly = hist.volume_mt / lookback_months.max(1) as f64;
            if hist_monthly > 0.0 && curr.volume_mt > 2.0 * hist_monthly {
                let multiplier = curr.volume_mt / hist_monthly;
                anomalies.push(CounterpartyAnomaly {
                    anomaly_type: AnomalyType::VolumeSurge,
                    entity: entity.to_string(),
                    severity: Severity::High,
                    detail: format!(
                        "{} volume {:.0} MT in last 30d vs avg {:.0} MT/month historically ({:.1}x normal)",
                        entity, curr.volume_mt, hist_monthly, multiplier
                    ),
                    volume_mt: None,
                    market_share_pct: None,
                    historical_share_pct: None,
                    current_volume_mt: Some(curr.volume_mt),
                    historical_monthly_mt: Some(round2(hist_monthly)),
                    multiplier: Some(round1(multiplier)),
                });
            }
        }

        anomalies.sort_by_key(|a| a.severity.rank());
        anomalies
    }

    /// Whether an entity's set of origin countries changed between the two
    /// halves of a lookback window.
    pub fn compute_origin_switching(
        &self,
        records: &[CanonicalShipment],
        entity: &str,
        months: u64,
        reference_date: NaiveDate,
    ) -> OriginSwitching {
        let midpoint = reference_date - Days::new(months * 15);
        let window_start = reference_date - Days::new(months * 30);

        let mut recent_origins: HashMap<String, f64> = HashMap::new();
        let mut earlier_origins: HashMap<String, f64> = HashMap::new();

        for record in records {
            let Some(date) = record.trade_date else {
                continue;
            };
            let name = self.resolve_entity(record.consignee.as_deref().or(record.consignor.as_deref()));
            if name != entity {
                continue;
            }
            let Some(qty) = record.quantity_mt.filter(|q| *q > 0.0) else {
                continue;
            };
            let origin = record
                .origin_country
                .clone()
                .unwrap_or_else(|| "UNKNOWN".to_string());

            if date >= midpoint {
                *recent_origins.entry(origin).or_default() += qty;
            } else if date >= window_start {
                *earlier_origins.entry(origin).or_default() += qty;
            }
        }

        let recent_set: BTreeSet<&String> = recent_origins.keys().collect();
        let earlier_set: BTreeSet<&String> = earlier_origins.keys().collect();

        OriginSwitching {
            entity: entity.to_string(),
            switching_detected: recent_set != earlier_set,
            recent_origins,
            earlier_origins,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Incoterm, PriceSource, PriceStatus, QualityEstimate, TradeType, UnitStatus,
    };
    use chrono::Utc;

    fn record(date: NaiveDate, consignee: &str, qty: f64, origin: &str) -> CanonicalShipment {
        CanonicalShipment {
            record_id: format!("{date}-{consignee}-{qty}-{origin}"),
            declaration_no: None,
            bill_no: None,
            trade_date: Some(date),
            trade_type: TradeType::Import,
            trade_country: "INDIA".to_string(),
            consignee: Some(consignee.to_string()),
            consignor: None,
            origin_country: Some(origin.to_string()),
            origin_port: None,
            destination_country: None,
            destination_port: None,
            hs_code: "08013100".to_string(),
            hs_code_2: None,
            hs_code_4: None,
            hct_id: Some("HCT-0801-RCN-INSHELL".to_string()),
            hct_name: "Raw Cashew Nuts (In Shell)".to_string(),
            hct_group: "Cashew Complex".to_string(),
            product_description: String::new(),
            quantity_mt: Some(qty),
            quantity_original: Some(qty),
            unit_original: Some("MT".to_string()),
            unit_status: UnitStatus::Ok,
            fob_usd_total: Some(qty * 1500.0),
            fob_usd_per_mt: Some(1500.0),
            declared_incoterm: Incoterm::Cif,
            price_source: PriceSource::DerivedFromCif,
            price_status: PriceStatus::Normal,
            currency_original: None,
            quality_estimate: QualityEstimate::standard(),
            freight_deducted: None,
            insurance_deducted: None,
            port_charges_deducted: None,
            normalized_at: Utc::now(),
            normalization_version: "1.0".to_string(),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_entity_resolution() {
        let engine = CounterpartyIntelligence::new();
        assert_eq!(
            engine.resolve_entity(Some("OLAM AGRI INDIA PVT LTD")),
            "Olam Group"
        );
        assert_eq!(engine.resolve_entity(Some("cargill west africa sarl")), "Cargill");
        assert_eq!(
            engine.resolve_entity(Some("  Sunrise Commodities  ")),
            "Sunrise Commodities"
        );
        assert_eq!(engine.resolve_entity(None), "UNKNOWN");
        assert_eq!(engine.resolve_entity(Some("   ")), "UNKNOWN");
    }

    #[test]
    fn test_market_shares_sorted_and_bounded() {
        let engine = CounterpartyIntelligence::new();
        let records = vec![
            record(date(2025, 3, 1), "OLAM NIGERIA", 500.0, "NIGERIA"),
            record(date(2025, 3, 2), "OLAM GHANA", 300.0, "GHANA"),
            record(date(2025, 3, 3), "Sunrise Commodities", 200.0, "GHANA"),
        ];

        let shares = engine.compute_market_shares(&records, PartyField::Consignee, None, None, 20);

        assert_eq!(shares.total_volume_mt, 1000.0);
        assert_eq!(shares.unique_entities, 2);
        assert_eq!(shares.top_entities[0].entity, "Olam Group");
        assert_eq!(shares.top_entities[0].volume_mt, 800.0);
        assert_eq!(shares.top_entities[0].market_share_pct, 80.0);

        // Weakly decreasing volumes, shares within 100
        let volumes: Vec<f64> = shares.top_entities.iter().map(|e| e.volume_mt).collect();
        assert!(volumes.windows(2).all(|w| w[0] >= w[1]));
        let share_sum: f64 = shares.top_entities.iter().map(|e| e.market_share_pct).sum();
        assert!(share_sum <= 100.0 + 1e-9);

        // 0.8² + 0.2² = 0.68 → concentrated market
        assert!((shares.hhi - 0.68).abs() < 1e-6);
        assert_eq!(shares.concentration, Concentration::High);
    }

    #[test]
    fn test_new_entrant_anomaly() {
        let engine = CounterpartyIntelligence::new();
        let today = date(2025, 4, 15);

        // Historical market without entity X; current window with X at ~6.1%
        let mut records = vec![
            record(date(2024, 8, 1), "Longstanding Importer", 5000.0, "GHANA"),
            record(date(2025, 4, 1), "Longstanding Importer", 12_300.0, "GHANA"),
        ];
        records.push(record(date(2025, 4, 5), "Entity X", 800.0, "NIGERIA"));

        let anomalies =
            engine.detect_anomalies(&records, &records, PartyField::Consignee, 12, today);

        let new_entrants: Vec<_> = anomalies
            .iter()
            .filter(|a| a.anomaly_type == AnomalyType::NewEntrant)
            .collect();
        assert_eq!(new_entrants.len(), 1);
        assert_eq!(new_entrants[0].entity, "Entity X");
        assert_eq!(new_entrants[0].severity, Severity::High);
        assert!(new_entrants[0].market_share_pct.unwrap() > 5.0);
    }

    #[test]
    fn test_withdrawal_anomaly() {
        let engine = CounterpartyIntelligence::new();
        let today = date(2025, 4, 15);

        let records = vec![
            // Historical: Gone Trading at ~20% of the market
            record(date(2024, 9, 1), "Gone Trading", 2000.0, "GHANA"),
            record(date(2024, 9, 1), "Stable Importer", 8000.0, "GHANA"),
            // Current: only the stable importer remains
            record(date(2025, 4, 1), "Stable Importer", 900.0, "GHANA"),
        ];

        let anomalies =
            engine.detect_anomalies(&records, &records, PartyField::Consignee, 12, today);

        let withdrawals: Vec<_> = anomalies
            .iter()
            .filter(|a| a.anomaly_type == AnomalyType::Withdrawal)
            .collect();
        assert_eq!(withdrawals.len(), 1);
        assert_eq!(withdrawals[0].entity, "Gone Trading");
        assert_eq!(withdrawals[0].severity, Severity::High);
    }

    #[test]
    fn test_volume_surge_anomaly() {
        let engine = CounterpartyIntelligence::new();
        let today = date(2025, 4, 15);

        let mut records = Vec::new();
        // 12 months of ~100 MT/month
        for month in 1..=12u32 {
            let d = if month <= 3 {
                date(2025, month, 10)
            } else {
                date(2024, month, 10)
            };
            records.push(record(d, "Steady Buyer", 100.0, "GHANA"));
        }
        // Current 30 days: 600 MT
        records.push(record(date(2025, 4, 5), "Steady Buyer", 600.0, "GHANA"));

        let anomalies =
            engine.detect_anomalies(&records, &records, PartyField::Consignee, 12, today);

        let surges: Vec<_> = anomalies
            .iter()
            .filter(|a| a.anomaly_type == AnomalyType::VolumeSurge)
            .collect();
        assert_eq!(surges.len(), 1);
        assert_eq!(surges[0].severity, Severity::High);
        assert!(surges[0].multiplier.unwrap() >= 2.0);
    }

    #[test]
    fn test_origin_switching() {
        let engine = CounterpartyIntelligence::new();
        let today = date(2025, 6, 1);

        let records = vec![
            // Earlier half: Ghana
            record(date(2025, 1, 10), "Shifting Buyer", 300.0, "GHANA"),
            // Recent half: Nigeria
            record(date(2025, 5, 10), "Shifting Buyer", 300.0, "NIGERIA"),
        ];

        let switching =
            engine.compute_origin_switching(&records, "Shifting Buyer", 6, today);
        assert!(switching.switching_detected);
        assert!(switching.recent_origins.contains_key("NIGERIA"));
        assert!(switching.earlier_origins.contains_key("GHANA"));

        let stable = vec![
            record(date(2025, 1, 10), "Loyal Buyer", 300.0, "GHANA"),
            record(date(2025, 5, 10), "Loyal Buyer", 300.0, "GHANA"),
        ];
        let switching = engine.compute_origin_switching(&stable, "Loyal Buyer", 6, today);
        assert!(!switching.switching_detected);
    }
}

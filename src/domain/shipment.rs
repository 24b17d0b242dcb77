use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::error::{Result, TradeOpsError};

/// Normalization schema version stamped on every canonical shipment.
pub const NORMALIZATION_VERSION: &str = "1.0";

/// Direction of a customs declaration relative to the trade country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeType {
    Import,
    Export,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Import => "IMPORT",
            TradeType::Export => "EXPORT",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "IMPORT" => Ok(TradeType::Import),
            "EXPORT" => Ok(TradeType::Export),
            other => Err(TradeOpsError::Validation(format!(
                "trade type must be IMPORT or EXPORT, got '{other}'"
            ))),
        }
    }
}

/// Declared pricing basis of a shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Incoterm {
    Fob,
    Cif,
}

impl Incoterm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Incoterm::Fob => "FOB",
            Incoterm::Cif => "CIF",
        }
    }
}

/// Outcome of quantity standardization to metric tonnes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UnitStatus {
    Ok,
    AssumedKg,
    AssumedMt,
    AssumedBagWeight,
    Unresolvable,
    Missing,
}

/// Which raw field (or derivation) the USD total came from.
///
/// The upper-case variants are the extraction ladder rungs; the lower-case
/// variants record a derivation applied on top of the extracted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceSource {
    #[serde(rename = "FOB_USD")]
    FobUsd,
    #[serde(rename = "TOTAL_ASSESS_USD")]
    TotalAssessUsd,
    #[serde(rename = "STD_UNIT_PRICE_x_QTY")]
    StdUnitPriceTimesQty,
    #[serde(rename = "UNIT_PRICE_x_QTY")]
    UnitPriceTimesQty,
    #[serde(rename = "FOB_INR_converted")]
    FobInrConverted,
    #[serde(rename = "ITEM_RATE_INR_converted")]
    ItemRateInrConverted,
    #[serde(rename = "TOTAL_ASSESSABLE_VALUE_INR_converted")]
    AssessableValueInrConverted,
    #[serde(rename = "derived_from_cif")]
    DerivedFromCif,
    #[serde(rename = "assumed_unknown_basis")]
    AssumedUnknownBasis,
    #[serde(rename = "MISSING")]
    Missing,
}

/// Price plausibility flag; the IPC filters on `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PriceStatus {
    Normal,
    Missing,
    SuspectLow,
    SuspectHigh,
}

/// Structured quality attributes parsed from the product description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityEstimate {
    /// Inferred quality grade label
    pub grade: String,

    /// Confidence in the grade, 0.0 to 1.0
    pub confidence: f64,

    /// Detection signals that fired during parsing
    pub signals_used: Vec<String>,

    /// Human-readable summary of extracted attributes
    pub details: String,
}

impl QualityEstimate {
    pub fn unknown() -> Self {
        Self {
            grade: "Unknown".to_string(),
            confidence: 0.0,
            signals_used: Vec::new(),
            details: "No description".to_string(),
        }
    }

    pub fn standard() -> Self {
        Self {
            grade: "Standard".to_string(),
            confidence: 0.3,
            signals_used: Vec::new(),
            details: String::new(),
        }
    }
}

/// The invariant carrier of the whole system: one customs line item,
/// normalized to FOB USD pricing, metric tonnes, and the Hectar commodity
/// taxonomy. Produced exactly once from a raw record and immutable after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalShipment {
    /// Unique within source scope; declaration number joined with item number
    pub record_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub declaration_no: Option<String>,

    /// Opaque auxiliary reference carried through from upstream; uniqueness
    /// is not guaranteed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bill_no: Option<String>,

    /// Required for any time-windowed analytic
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_date: Option<NaiveDate>,

    pub trade_type: TradeType,

    /// Upper-cased country whose customs regime produced the record
    pub trade_country: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub consignee: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub consignor: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_port: Option<String>,

    /// Digit string, zero-padded back to even length
    pub hs_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hs_code_2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hs_code_4: Option<String>,

    /// Taxonomy key; None when the HS code is unclassified
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hct_id: Option<String>,
    pub hct_name: String,
    pub hct_group: String,

    pub product_description: String,

    /// Metric tonnes; None when unit status is MISSING or UNRESOLVABLE
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_mt: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity_original: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_original: Option<String>,
    pub unit_status: UnitStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub fob_usd_total: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fob_usd_per_mt: Option<f64>,

    pub declared_incoterm: Incoterm,
    pub price_source: PriceSource,
    pub price_status: PriceStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency_original: Option<String>,

    pub quality_estimate: QualityEstimate,

    /// Audit trail of the FOB derivation, when a CIF price was decomposed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freight_deducted: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insurance_deducted: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port_charges_deducted: Option<f64>,

    pub normalized_at: DateTime<Utc>,
    pub normalization_version: String,
}

impl CanonicalShipment {
    /// Check the schema invariants that every emitted shipment must satisfy.
    pub fn validate(&self) -> Result<()> {
        if let (Some(total), Some(qty), Some(per_mt)) =
            (self.fob_usd_total, self.quantity_mt, self.fob_usd_per_mt)
        {
            if qty > 0.0 && (per_mt - total / qty).abs() >= 1e-6 {
                return Err(TradeOpsError::Validation(format!(
                    "fob_usd_per_mt {} inconsistent with total {} / qty {}",
                    per_mt, total, qty
                )));
            }
        }

        if self.fob_usd_per_mt.is_none()
            && (self.fob_usd_total.is_some() && self.quantity_mt.is_some())
        {
            let qty = self.quantity_mt.unwrap_or(0.0);
            if qty > 0.0 {
                return Err(TradeOpsError::Validation(
                    "fob_usd_per_mt missing despite known total and quantity".to_string(),
                ));
            }
        }

        if let Some(per_mt) = self.fob_usd_per_mt {
            let expected = if per_mt < 10.0 {
                PriceStatus::SuspectLow
            } else if per_mt > 50_000.0 {
                PriceStatus::SuspectHigh
            } else {
                PriceStatus::Normal
            };
            // A zero total still reads as MISSING even with a per-MT value
            if self.price_status != expected && self.price_status != PriceStatus::Missing {
                return Err(TradeOpsError::Validation(format!(
                    "price_status {:?} inconsistent with per-MT price {}",
                    self.price_status, per_mt
                )));
            }
        }

        Ok(())
    }

    /// Parse the leading ISO date out of an upstream date string, which may
    /// carry a time suffix ("2025-03-10T00:00:00Z").
    pub fn parse_trade_date(raw: &str) -> Option<NaiveDate> {
        let prefix = raw.get(..10)?;
        NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok()
    }
}

//! The nine-step normalization pipeline.
//!
//! Every record entering the system flows through here exactly once. The
//! pipeline is pure: identical raw input and reference data produce an
//! identical canonical shipment (modulo the `normalized_at` stamp).

use chrono::Utc;

use crate::domain::{
    CanonicalShipment, Incoterm, PriceSource, PriceStatus, RawRecord, Result, TradeOpsError,
    TradeType,
};
use crate::domain::shipment::NORMALIZATION_VERSION;
use crate::reference::{
    calc_insurance, classify_by_hs_code, convert_to_mt, infer_incoterm, lookup_freight,
    lookup_port_charges,
};

use super::quality::parse_quality;

/// Below this USD/MT the price is implausibly low for any tracked commodity.
const SUSPECT_LOW_USD_PER_MT: f64 = 10.0;
/// Above this USD/MT the record is almost certainly a data error.
const SUSPECT_HIGH_USD_PER_MT: f64 = 50_000.0;

/// Process raw trade records into normalized, comparable shipments.
#[derive(Debug, Clone, Default)]
pub struct NormalizationPipeline;

impl NormalizationPipeline {
    pub fn new() -> Self {
        Self
    }

    /// Normalize a single raw record, inferring the pricing basis from the
    /// (trade type, trade country) incoterm table.
    pub fn normalize(
        &self,
        raw: &RawRecord,
        trade_type: TradeType,
        trade_country: &str,
    ) -> Result<CanonicalShipment> {
        self.normalize_with_basis(raw, trade_type, trade_country, Some(Basis::Inferred))
    }

    /// Normalize with an explicit pricing basis. `None` means the caller
    /// does not know the declared basis: the extracted price passes through
    /// untouched and is tagged `assumed_unknown_basis`.
    pub fn normalize_with_basis(
        &self,
        raw: &RawRecord,
        trade_type: TradeType,
        trade_country: &str,
        basis: Option<Basis>,
    ) -> Result<CanonicalShipment> {
        let trade_country = trade_country.trim().to_uppercase();

        // Step 1: incoterm basis
        let declared_incoterm = match basis {
            Some(Basis::Declared(incoterm)) => incoterm,
            Some(Basis::Inferred) | None => infer_incoterm(trade_type, &trade_country),
        };

        // Step 2: USD price extraction ladder
        let (price_usd, extraction_source) = extract_price(raw);

        // Step 3: HS normalization
        let hs_code = normalize_hs_code(raw.str_field("HS_CODE").unwrap_or_default());
        let hs_code_2 = raw
            .str_field("HS_CODE_2")
            .or_else(|| hs_code.get(..2).map(str::to_string));
        let hs_code_4 = raw
            .str_field("HS_CODE_4")
            .or_else(|| hs_code.get(..4).map(str::to_string));

        // Step 4: commodity classification
        let classification = classify_by_hs_code(&hs_code, &trade_country);
        let (hct_id, hct_name, hct_group) = match &classification {
            Some(hit) => (
                Some(hit.entry.hct_id.to_string()),
                hit.entry.hct_name.to_string(),
                hit.entry.hct_group.to_string(),
            ),
            None => (None, "Unclassified".to_string(), "Unknown".to_string()),
        };

        // Step 5: quantity standardization, falling back once to the
        // standardized fields when the primary pair is unresolvable
        let quantity_original = raw.f64_field("QUANTITY");
        let unit_original = raw.str_field("UNIT");
        let primary_qty = quantity_original.or_else(|| raw.f64_field("STD_QUANTITY"));
        let primary_unit = unit_original
            .clone()
            .or_else(|| raw.str_field("STD_UNIT"));
        let (mut quantity_mt, mut unit_status) =
            convert_to_mt(primary_qty, primary_unit.as_deref(), Some(&hct_name));
        if unit_status == crate::domain::UnitStatus::Unresolvable {
            let std_qty = raw.f64_field("STD_QUANTITY");
            let std_unit = raw.str_field("STD_UNIT");
            if std_qty.is_some() && std_unit.is_some() {
                let (fallback_qty, fallback_status) =
                    convert_to_mt(std_qty, std_unit.as_deref(), Some(&hct_name));
                quantity_mt = fallback_qty;
                unit_status = fallback_status;
            }
        }

        // Step 6: port determination by trade direction
        let (origin_port, destination_port) = match trade_type {
            TradeType::Import => (
                raw.first_str(&["PORT_OF_SHIPMENT", "FOREIGN_PORT", "ORIGIN_PORT"]),
                raw.first_str(&["INDIAN_PORT", "DESTINATION_PORT"]),
            ),
            TradeType::Export => (
                raw.first_str(&["INDIAN_PORT", "ORIGIN_PORT", "PORT_OF_SHIPMENT"]),
                raw.first_str(&["FOREIGN_PORT", "DESTINATION_PORT"]),
            ),
        };
        let origin_port = origin_port.map(|p| p.to_uppercase());
        let destination_port = destination_port.map(|p| p.to_uppercase());

        // Step 7: FOB-USD derivation
        let mut freight_deducted = None;
        let mut insurance_deducted = None;
        let mut port_charges_deducted = None;

        let (fob_usd_total, price_source) = match (price_usd, basis) {
            (None, _) => (None, PriceSource::Missing),
            (Some(price), None) => (Some(price), PriceSource::AssumedUnknownBasis),
            (Some(price), Some(_)) => match declared_incoterm {
                Incoterm::Fob => (Some(price), extraction_source),
                Incoterm::Cif => {
                    let freight = lookup_freight(origin_port.as_deref(), destination_port.as_deref());
                    let insurance =
                        calc_insurance(price, origin_port.as_deref(), destination_port.as_deref());
                    let port_charges = lookup_port_charges(destination_port.as_deref());

                    // Freight and port charges are per-MT rates; scale them
                    // when the tonnage is known, otherwise apply unscaled.
                    let deductions = match quantity_mt {
                        Some(qty) if qty > 0.0 => {
                            freight.unwrap_or(0.0) * qty + insurance + port_charges * qty
                        }
                        _ => freight.unwrap_or(0.0) + insurance + port_charges,
                    };

                    freight_deducted = freight;
                    insurance_deducted = Some(insurance);
                    port_charges_deducted = Some(port_charges);

                    (
                        Some((price - deductions).max(0.0)),
                        PriceSource::DerivedFromCif,
                    )
                }
            },
        };

        // Step 8: unit price
        let fob_usd_per_mt = match (fob_usd_total, quantity_mt) {
            (Some(total), Some(qty)) if qty > 0.0 => Some(total / qty),
            _ => None,
        };

        // Step 9a: quality parse
        let product_description = raw
            .first_str(&["PRODUCT", "PRODUCT_DESCRIPTION"])
            .unwrap_or_default();
        let quality_estimate = parse_quality(
            if product_description.is_empty() {
                None
            } else {
                Some(&product_description)
            },
            hct_id.as_deref(),
        );

        // Step 9b: price status
        let price_status = match fob_usd_total {
            None => PriceStatus::Missing,
            Some(total) if total == 0.0 => PriceStatus::Missing,
            Some(_) => match fob_usd_per_mt {
                Some(per_mt) if per_mt < SUSPECT_LOW_USD_PER_MT => PriceStatus::SuspectLow,
                Some(per_mt) if per_mt > SUSPECT_HIGH_USD_PER_MT => PriceStatus::SuspectHigh,
                _ => PriceStatus::Normal,
            },
        };

        let declaration_no = raw.str_field("DECLARATION_NO");
        let record_id = record_identity(raw, declaration_no.as_deref())?;

        let trade_date = raw
            .first_str(&["DATE", "EXP_DATE", "IMP_DATE"])
            .and_then(|d| CanonicalShipment::parse_trade_date(&d));

        Ok(CanonicalShipment {
            record_id,
            declaration_no,
            bill_no: raw.str_field("BILL_NO"),
            trade_date,
            trade_type,
            trade_country,
            consignee: raw.first_str(&["CONSIGNEE", "BUYER_NAME"]),
            consignor: raw.first_str(&["CONSIGNOR", "EXPORTER_NAME"]),
            origin_country: raw.str_field("ORIGIN_COUNTRY").map(|c| c.to_uppercase()),
            origin_port,
            destination_country: raw
                .str_field("DESTINATION_COUNTRY")
                .map(|c| c.to_uppercase()),
            destination_port,
            hs_code,
            hs_code_2,
            hs_code_4,
            hct_id,
            hct_name,
            hct_group,
            product_description,
            quantity_mt,
            quantity_original,
            unit_original,
            unit_status,
            fob_usd_total,
            fob_usd_per_mt,
            declared_incoterm,
            price_source,
            price_status,
            currency_original: raw.str_field("CURRENCY"),
            quality_estimate,
            freight_deducted,
            insurance_deducted,
            port_charges_deducted,
            normalized_at: Utc::now(),
            normalization_version: NORMALIZATION_VERSION.to_string(),
        })
    }
}

/// How the caller wants the pricing basis established.
#[derive(Debug, Clone, Copy)]
pub enum Basis {
    /// Look up the (trade type, trade country) incoterm table
    Inferred,
    /// The caller knows the declared basis
    Declared(Incoterm),
}

/// USD price extraction — the priority ladder. Stops at the first rung that
/// yields a positive number.
fn extract_price(raw: &RawRecord) -> (Option<f64>, PriceSource) {
    if let Some(fob) = raw.positive_f64("FOB_USD") {
        return (Some(fob), PriceSource::FobUsd);
    }

    if let Some(total) = raw.positive_f64("TOTAL_ASSESS_USD") {
        return (Some(total), PriceSource::TotalAssessUsd);
    }

    if let (Some(unit_price), Some(qty)) = (
        raw.positive_f64("STD_UNIT_PRICE_USD"),
        raw.positive_f64("STD_QUANTITY"),
    ) {
        return (Some(unit_price * qty), PriceSource::StdUnitPriceTimesQty);
    }

    let qty = raw.positive_f64("QUANTITY");
    if let (Some(unit_price), Some(qty)) = (raw.positive_f64("UNIT_PRICE_USD"), qty) {
        return (Some(unit_price * qty), PriceSource::UnitPriceTimesQty);
    }

    let fx = raw.positive_f64("USD_EXCHANGE_RATE");
    if let (Some(fob_inr), Some(fx)) = (raw.positive_f64("FOB_INR"), fx) {
        return (Some(fob_inr / fx), PriceSource::FobInrConverted);
    }

    let item_rate = raw
        .positive_f64("ITEM_RATE_INR")
        .or_else(|| raw.positive_f64("STD_ITEM_RATE_INR"));
    if let (Some(rate), Some(qty), Some(fx)) = (item_rate, qty, fx) {
        return (Some(rate * qty / fx), PriceSource::ItemRateInrConverted);
    }

    if let (Some(assessable), Some(fx)) = (raw.positive_f64("TOTAL_ASSESSABLE_VALUE_INR"), fx) {
        return (
            Some(assessable / fx),
            PriceSource::AssessableValueInrConverted,
        );
    }

    (None, PriceSource::Missing)
}

/// Restore leading zeros stripped by upstream numeric handling: a purely
/// numeric HS code of odd length below 8 digits gets one prepended.
fn normalize_hs_code(raw_hs: String) -> String {
    let trimmed = raw_hs.trim().to_string();
    if !trimmed.is_empty()
        && trimmed.chars().all(|c| c.is_ascii_digit())
        && trimmed.len() % 2 == 1
        && trimmed.len() < 8
    {
        format!("0{trimmed}")
    } else {
        trimmed
    }
}

/// Stable identity for dedup: the upstream record id when present, otherwise
/// declaration number joined with item number.
fn record_identity(raw: &RawRecord, declaration_no: Option<&str>) -> Result<String> {
    if let Some(id) = raw.str_field("RECORD_ID") {
        return Ok(id);
    }
    if let Some(decl) = declaration_no {
        let item = raw.str_field("ITEM_NO").unwrap_or_default();
        return Ok(format!("{decl}:{item}"));
    }
    Err(TradeOpsError::MalformedRecord(
        "no RECORD_ID or DECLARATION_NO present".to_string(),
    ))
}

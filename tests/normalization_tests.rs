//! End-to-end checks of the normalization pipeline against realistic raw
//! customs lines.

mod helpers;

use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::json;
use trade_intel_ops::domain::{
    Incoterm, PriceSource, PriceStatus, RawRecord, TradeType, UnitStatus,
};
use trade_intel_ops::normalize::NormalizationPipeline;
use trade_intel_ops::reference::classify_by_hs_code;

use helpers::fixtures::{cif_import_raw, fob_export_raw};

#[test]
fn test_fob_export_passthrough() {
    let pipeline = NormalizationPipeline::new();
    let shipment = pipeline
        .normalize(&fob_export_raw("EXP-1"), TradeType::Export, "INDIA")
        .unwrap();

    assert_eq!(shipment.hct_id.as_deref(), Some("HCT-0801-RCN-INSHELL"));
    assert_eq!(shipment.quantity_mt, Some(1000.0));
    assert_eq!(shipment.fob_usd_total, Some(1_500_000.0));
    assert_eq!(shipment.fob_usd_per_mt, Some(1500.0));
    assert_eq!(shipment.price_status, PriceStatus::Normal);
    assert_eq!(shipment.price_source, PriceSource::FobUsd);
    assert_eq!(shipment.declared_incoterm, Incoterm::Fob);
    assert_eq!(shipment.trade_date, NaiveDate::from_ymd_opt(2025, 3, 10));
    assert_eq!(shipment.unit_status, UnitStatus::Ok);
    // Export ports: domestic port is the origin
    assert_eq!(shipment.origin_port.as_deref(), Some("TUTICORIN"));
    assert_eq!(shipment.destination_port.as_deref(), Some("HO CHI MINH"));
    shipment.validate().unwrap();
}

#[test]
fn test_cif_import_derivation() {
    let pipeline = NormalizationPipeline::new();
    let shipment = pipeline
        .normalize(&cif_import_raw("IMP-1"), TradeType::Import, "INDIA")
        .unwrap();

    // 1,600,000 − (42.5×1000 + 2,400 + 4.7×1000) = 1,550,400
    assert!((shipment.fob_usd_total.unwrap() - 1_550_400.0).abs() < 1e-6);
    assert!((shipment.fob_usd_per_mt.unwrap() - 1550.40).abs() < 1e-6);
    assert_eq!(shipment.price_source, PriceSource::DerivedFromCif);
    assert_eq!(shipment.declared_incoterm, Incoterm::Cif);
    assert_eq!(shipment.trade_date, NaiveDate::from_ymd_opt(2025, 4, 2));
    // Audit trail of the derivation
    assert_eq!(shipment.freight_deducted, Some(42.5));
    assert!((shipment.insurance_deducted.unwrap() - 2400.0).abs() < 1e-6);
    assert_eq!(shipment.port_charges_deducted, Some(4.7));
    shipment.validate().unwrap();
}

#[test]
fn test_quality_parsed_from_description() {
    let pipeline = NormalizationPipeline::new();
    let shipment = pipeline
        .normalize(&cif_import_raw("IMP-2"), TradeType::Import, "INDIA")
        .unwrap();

    // Outturn 48 lbs reads as premium raw cashew
    assert_eq!(shipment.quality_estimate.grade, "Premium");
    assert!(shipment
        .quality_estimate
        .signals_used
        .contains(&"outturn_detected".to_string()));
    assert!(shipment.quality_estimate.confidence > 0.3);
}

#[test]
fn test_stripped_leading_zero_restored_and_classified() {
    // Upstream numeric handling turns "08013100" into 8013100
    let raw = RawRecord::from_value(json!({
        "DECLARATION_NO": "D-1",
        "HS_CODE": 8013100,
        "QUANTITY": 50,
        "UNIT": "MT",
    }));

    let shipment = NormalizationPipeline::new()
        .normalize(&raw, TradeType::Import, "INDIA")
        .unwrap();
    assert_eq!(shipment.hs_code, "08013100");
    assert_eq!(shipment.hct_id.as_deref(), Some("HCT-0801-RCN-INSHELL"));

    // And the classification is prefix-grounded
    let hit = classify_by_hs_code("08013100", "INDIA").unwrap();
    assert_eq!(hit.entry.hct_id, "HCT-0801-RCN-INSHELL");
}

#[test]
fn test_magnitude_heuristic_for_missing_unit() {
    let raw = RawRecord::from_value(json!({
        "DECLARATION_NO": "D-2",
        "QUANTITY": 10_000,
        "HS_CODE": "12074000",
    }));

    let shipment = NormalizationPipeline::new()
        .normalize(&raw, TradeType::Export, "INDIA")
        .unwrap();
    assert_eq!(shipment.unit_status, UnitStatus::AssumedKg);
    assert_eq!(shipment.quantity_mt, Some(10.0));
}

#[test]
fn test_unclassified_record_is_retained() {
    let raw = RawRecord::from_value(json!({
        "DECLARATION_NO": "D-3",
        "HS_CODE": "99990000",
        "FOB_USD": 50_000,
        "QUANTITY": 25,
        "UNIT": "MT",
    }));

    let shipment = NormalizationPipeline::new()
        .normalize(&raw, TradeType::Export, "INDIA")
        .unwrap();
    assert_eq!(shipment.hct_id, None);
    assert_eq!(shipment.hct_name, "Unclassified");
    // Price processing still ran
    assert_eq!(shipment.fob_usd_total, Some(50_000.0));
    assert_eq!(shipment.price_status, PriceStatus::Normal);
}

#[test]
fn test_missing_price_record_is_retained() {
    let raw = RawRecord::from_value(json!({
        "DECLARATION_NO": "D-4",
        "HS_CODE": "08013100",
        "QUANTITY": 100,
        "UNIT": "MT",
    }));

    let shipment = NormalizationPipeline::new()
        .normalize(&raw, TradeType::Import, "INDIA")
        .unwrap();
    assert_eq!(shipment.price_source, PriceSource::Missing);
    assert_eq!(shipment.price_status, PriceStatus::Missing);
    assert_eq!(shipment.fob_usd_per_mt, None);
    assert_eq!(shipment.quantity_mt, Some(100.0));
}

#[test]
fn test_normalizer_is_a_function() {
    let pipeline = NormalizationPipeline::new();
    let raw = cif_import_raw("IMP-3");

    let mut first = pipeline.normalize(&raw, TradeType::Import, "INDIA").unwrap();
    let mut second = pipeline.normalize(&raw, TradeType::Import, "INDIA").unwrap();

    // Identical apart from the wall-clock stamp
    first.normalized_at = second.normalized_at;
    assert_eq!(
        serde_json::to_value(&first).unwrap(),
        serde_json::to_value(&second).unwrap()
    );
}

#[test]
fn test_per_mt_consistency_across_fixture_grid() {
    let pipeline = NormalizationPipeline::new();
    let fixtures = [
        fob_export_raw("G-1"),
        cif_import_raw("G-2"),
        RawRecord::from_value(json!({
            "DECLARATION_NO": "G-3",
            "UNIT_PRICE_USD": 1450,
            "QUANTITY": 250,
            "UNIT": "MT",
            "HS_CODE": "12074000",
            "DATE": "2025-02-14",
        })),
        RawRecord::from_value(json!({
            "DECLARATION_NO": "G-4",
            "FOB_INR": 120_000_000,
            "USD_EXCHANGE_RATE": 83.0,
            "QUANTITY": 900,
            "UNIT": "MT",
            "HS_CODE": "10063090",
            "DATE": "2025-02-15",
        })),
    ];

    for (i, raw) in fixtures.iter().enumerate() {
        let trade_type = if i == 1 { TradeType::Import } else { TradeType::Export };
        let shipment = pipeline.normalize(raw, trade_type, "INDIA").unwrap();
        if let (Some(total), Some(qty)) = (shipment.fob_usd_total, shipment.quantity_mt) {
            if qty > 0.0 {
                let per_mt = shipment.fob_usd_per_mt.unwrap();
                assert!(
                    (per_mt - total / qty).abs() < 1e-6,
                    "fixture {i} violates the per-MT invariant"
                );
            }
        }
        shipment.validate().unwrap();
    }
}

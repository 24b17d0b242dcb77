//! Property tests over the normalizer and the analytics invariants.

mod helpers;

use chrono::NaiveDate;
use proptest::prelude::*;
use serde_json::json;
use trade_intel_ops::domain::{PriceStatus, RawRecord, TradeType};
use trade_intel_ops::intelligence::{CounterpartyIntelligence, ImpliedPriceCurve, PartyField};
use trade_intel_ops::normalize::NormalizationPipeline;
use trade_intel_ops::upstream::budget::{BudgetTracker, CallKind};

use helpers::builders::ShipmentBuilder;

proptest! {
    /// The weighted median splits the weight mass: strictly-below weight is
    /// at most half the total, and at-or-below weight is at least half.
    #[test]
    fn weighted_median_splits_the_mass(
        entries in prop::collection::vec((10u32..10_000, 1u32..1_000), 1..40)
    ) {
        let records: Vec<_> = entries
            .iter()
            .enumerate()
            .map(|(i, (price, weight))| {
                ShipmentBuilder::new()
                    .record_id(format!("WM-{i}"))
                    .trade_date(2025, 4, 3)
                    .quantity_mt(*weight as f64)
                    .price_per_mt(*price as f64)
                    .build()
            })
            .collect();

        let ipc = ImpliedPriceCurve::new()
            .compute(&records, NaiveDate::from_ymd_opt(2025, 4, 5));
        let median = ipc.price_usd_per_mt.unwrap();

        let total: f64 = entries.iter().map(|(_, w)| *w as f64).sum();
        let below: f64 = entries
            .iter()
            .filter(|(p, _)| (*p as f64) < median)
            .map(|(_, w)| *w as f64)
            .sum();
        let at_or_below: f64 = entries
            .iter()
            .filter(|(p, _)| (*p as f64) <= median)
            .map(|(_, w)| *w as f64)
            .sum();

        prop_assert!(below <= total / 2.0 + 1e-9);
        prop_assert!(at_or_below >= total / 2.0 - 1e-9);
    }

    /// Normalizing the same raw record twice yields identical output.
    #[test]
    fn normalizer_is_deterministic(
        price in 1u32..10_000_000,
        qty in 1u32..100_000,
        use_kgs in any::<bool>(),
    ) {
        let raw = RawRecord::from_value(json!({
            "DECLARATION_NO": "P-1",
            "ITEM_NO": "1",
            "FOB_USD": price,
            "QUANTITY": qty,
            "UNIT": if use_kgs { "KGS" } else { "MTS" },
            "HS_CODE": "08013100",
            "EXP_DATE": "2025-03-10",
        }));

        let pipeline = NormalizationPipeline::new();
        let mut a = pipeline.normalize(&raw, TradeType::Export, "INDIA").unwrap();
        let mut b = pipeline.normalize(&raw, TradeType::Export, "INDIA").unwrap();
        a.normalized_at = b.normalized_at;
        prop_assert_eq!(
            serde_json::to_value(&a).unwrap(),
            serde_json::to_value(&b).unwrap()
        );
    }

    /// Wherever total and tonnage are both known, the per-MT price is their
    /// ratio, and the suspect flags line up with the thresholds.
    #[test]
    fn price_status_matches_thresholds(
        price in 1u32..100_000_000,
        qty in 1u32..100_000,
    ) {
        let raw = RawRecord::from_value(json!({
            "DECLARATION_NO": "P-2",
            "FOB_USD": price,
            "QUANTITY": qty,
            "UNIT": "MT",
            "HS_CODE": "08013100",
        }));

        let shipment = NormalizationPipeline::new()
            .normalize(&raw, TradeType::Export, "INDIA")
            .unwrap();

        let per_mt = shipment.fob_usd_per_mt.unwrap();
        prop_assert!((per_mt - price as f64 / qty as f64).abs() < 1e-6);

        let expected = if per_mt < 10.0 {
            PriceStatus::SuspectLow
        } else if per_mt > 50_000.0 {
            PriceStatus::SuspectHigh
        } else {
            PriceStatus::Normal
        };
        prop_assert_eq!(shipment.price_status, expected);
    }

    /// Market shares are sorted weakly decreasing and never exceed 100%.
    #[test]
    fn market_shares_are_bounded(
        volumes in prop::collection::vec(1u32..100_000, 1..25)
    ) {
        let records: Vec<_> = volumes
            .iter()
            .enumerate()
            .map(|(i, volume)| {
                ShipmentBuilder::new()
                    .record_id(format!("SH-{i}"))
                    .trade_date(2025, 4, 1)
                    .consignee(format!("Buyer {i}"))
                    .quantity_mt(*volume as f64)
                    .build()
            })
            .collect();

        let shares = CounterpartyIntelligence::new().compute_market_shares(
            &records,
            PartyField::Consignee,
            None,
            None,
            10,
        );

        let listed: Vec<f64> = shares.top_entities.iter().map(|e| e.volume_mt).collect();
        prop_assert!(listed.windows(2).all(|w| w[0] >= w[1]));

        let share_sum: f64 = shares
            .top_entities
            .iter()
            .map(|e| e.market_share_pct)
            .sum();
        prop_assert!(share_sum <= 100.0 + 0.5); // rounding headroom
    }

    /// Budget counters never decrease within a day.
    #[test]
    fn budget_counters_are_monotone(calls in prop::collection::vec(any::<bool>(), 1..60)) {
        let tracker = BudgetTracker::new();
        let mut last_total = 0;
        for is_harvest in calls {
            tracker.record_call(if is_harvest { CallKind::Harvest } else { CallKind::Search });
            let status = tracker.status();
            prop_assert!(status.daily_calls_used > last_total);
            last_total = status.daily_calls_used;
        }
    }
}

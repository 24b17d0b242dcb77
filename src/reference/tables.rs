//! Reference tables for normalization: freight rates, insurance, port
//! charges, unit conversions, and the incoterm map.

use once_cell::sync::Lazy;
use serde::Serialize;

use crate::domain::{Incoterm, TradeType, UnitStatus};

// ── Freight rates (USD per MT) ───────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct FreightRoute {
    pub route_id: &'static str,
    pub origin_port: &'static str,
    pub destination_port: &'static str,
    pub vessel_class: &'static str,
    pub rate_per_mt: f64,
}

const fn route(
    route_id: &'static str,
    origin_port: &'static str,
    destination_port: &'static str,
    vessel_class: &'static str,
    rate_per_mt: f64,
) -> FreightRoute {
    FreightRoute {
        route_id,
        origin_port,
        destination_port,
        vessel_class,
        rate_per_mt,
    }
}

pub static FREIGHT_RATES: &[FreightRoute] = &[
    route("ABIDJAN-TUTICORIN", "ABIDJAN", "TUTICORIN", "HANDYSIZE", 42.50),
    route("ABIDJAN-MANGALORE", "ABIDJAN", "MANGALORE", "HANDYSIZE", 44.00),
    route("TEMA-TUTICORIN", "TEMA", "TUTICORIN", "HANDYSIZE", 40.00),
    route("LAGOS-TUTICORIN", "LAGOS", "TUTICORIN", "HANDYSIZE", 45.00),
    route("DAR-TUTICORIN", "DAR ES SALAAM", "TUTICORIN", "HANDYSIZE", 35.00),
    route("ABIDJAN-HOCHIMINH", "ABIDJAN", "HO CHI MINH", "HANDYSIZE", 55.00),
    route("TEMA-HOCHIMINH", "TEMA", "HO CHI MINH", "HANDYSIZE", 53.00),
    route("DJIBOUTI-KANDLA", "DJIBOUTI", "KANDLA", "HANDYSIZE", 28.00),
    route("LAGOS-TIANJIN", "LAGOS", "TIANJIN", "HANDYSIZE", 60.00),
    route("LAGOS-QINGDAO", "LAGOS", "QINGDAO", "HANDYSIZE", 58.00),
    route("KAKINADA-LAGOS", "KAKINADA", "LAGOS", "SUPRAMAX", 48.00),
    route("KANDLA-LAGOS", "KANDLA", "LAGOS", "SUPRAMAX", 46.00),
    route("KAKINADA-TEMA", "KAKINADA", "TEMA", "SUPRAMAX", 47.00),
];

/// Find the freight rate for a port pair. Port names from customs data are
/// noisy ("NHAVA SHEVA SEA"), so matching is substring-based both ways.
pub fn lookup_freight(origin_port: Option<&str>, dest_port: Option<&str>) -> Option<f64> {
    let o = origin_port?.trim().to_uppercase();
    let d = dest_port?.trim().to_uppercase();
    if o.is_empty() || d.is_empty() {
        return None;
    }

    for entry in FREIGHT_RATES {
        if o.contains(entry.origin_port) && d.contains(entry.destination_port) {
            return Some(entry.rate_per_mt);
        }
        if entry.origin_port.contains(o.as_str()) && entry.destination_port.contains(d.as_str()) {
            return Some(entry.rate_per_mt);
        }
    }
    None
}

// ── Insurance (% of cargo value) ─────────────────────────────────

/// Base marine cargo rate applied to every shipment.
pub const INSURANCE_BASE_RATE: f64 = 0.0015;
/// Additional war-risk loading for Gulf of Guinea calls.
pub const WAR_RISK_GULF_OF_GUINEA: f64 = 0.0025;
/// Additional war-risk loading for Red Sea calls.
pub const WAR_RISK_RED_SEA: f64 = 0.005;

// The listed war-risk area covers the eastern gulf; Abidjan sits outside it
static GULF_OF_GUINEA_PORTS: &[&str] = &["LAGOS", "APAPA", "TEMA", "LOME", "COTONOU"];
static RED_SEA_PORTS: &[&str] = &["ADEN", "HODEIDAH", "DJIBOUTI", "PORT SUDAN"];

fn war_risk_loading(port: &str) -> f64 {
    let upper = port.to_uppercase();
    if RED_SEA_PORTS.iter().any(|p| upper.contains(p)) {
        WAR_RISK_RED_SEA
    } else if GULF_OF_GUINEA_PORTS.iter().any(|p| upper.contains(p)) {
        WAR_RISK_GULF_OF_GUINEA
    } else {
        0.0
    }
}

/// Insurance cost in USD for a cargo value. When origin and destination fall
/// in different risk zones the higher loading applies.
pub fn calc_insurance(
    cargo_value_usd: f64,
    origin_port: Option<&str>,
    dest_port: Option<&str>,
) -> f64 {
    let loading = [origin_port, dest_port]
        .iter()
        .flatten()
        .map(|p| war_risk_loading(p))
        .fold(0.0, f64::max);

    cargo_value_usd * (INSURANCE_BASE_RATE + loading)
}

// ── Port charges (USD per MT) ────────────────────────────────────

static PORT_CHARGES: &[(&str, f64)] = &[
    ("TUTICORIN", 4.70),
    ("MANGALORE", 4.20),
    ("KOCHI", 4.50),
    ("KANDLA", 3.80),
    ("MUMBAI", 5.20),
    ("CHENNAI", 4.80),
    ("KAKINADA", 3.50),
    ("KRISHNAPATNAM", 3.80),
    ("HO CHI MINH", 5.00),
    ("HAI PHONG", 4.50),
    ("LAGOS", 8.50),
    ("APAPA", 8.50),
    ("TEMA", 6.00),
    ("ABIDJAN", 5.50),
    ("DAR ES SALAAM", 6.50),
    ("DJIBOUTI", 7.00),
    ("TIANJIN", 4.00),
    ("QINGDAO", 3.80),
    ("SHANGHAI", 3.50),
];

/// Default applied to ports missing from the table.
pub const DEFAULT_PORT_CHARGE: f64 = 4.0;

/// Total port charges for a port in USD/MT.
pub fn lookup_port_charges(port: Option<&str>) -> f64 {
    let Some(port) = port else { return 0.0 };
    let p = port.trim().to_uppercase();
    if p.is_empty() {
        return 0.0;
    }
    for (name, charge) in PORT_CHARGES {
        if p.contains(name) || name.contains(p.as_str()) {
            return *charge;
        }
    }
    DEFAULT_PORT_CHARGE
}

// ── Unit conversion ──────────────────────────────────────────────

static UNIT_CONVERSIONS: &[(&str, f64)] = &[
    ("KGS", 0.001),
    ("KG", 0.001),
    ("MTS", 1.0),
    ("MT", 1.0),
    ("TON", 1.0),
    ("TONS", 1.0),
    ("TONNE", 1.0),
    ("TONNES", 1.0),
    ("LONG TON", 1.01605),
    ("SHORT TON", 0.907185),
    ("LBS", 0.000453592),
    ("QUINTAL", 0.1),
    ("QTL", 0.1),
];

const BAG_WEIGHT_CASHEW_MT: f64 = 0.08;
const BAG_WEIGHT_RICE_MT: f64 = 0.05;
const BAG_WEIGHT_COCOA_MT: f64 = 0.06;
const BAG_WEIGHT_DEFAULT_MT: f64 = 0.05;

/// Convert a quantity to metric tonnes.
///
/// With no unit string a magnitude heuristic applies: large counts are
/// almost certainly kilograms, small ones tonnes, and the band in between
/// is unresolvable. `commodity_hint` (the HCT name) selects bag weights.
pub fn convert_to_mt(
    quantity: Option<f64>,
    unit: Option<&str>,
    commodity_hint: Option<&str>,
) -> (Option<f64>, UnitStatus) {
    let Some(quantity) = quantity else {
        return (None, UnitStatus::Missing);
    };
    if quantity <= 0.0 {
        return (None, UnitStatus::Missing);
    }

    let Some(unit) = unit else {
        if quantity > 5000.0 {
            return (Some(quantity * 0.001), UnitStatus::AssumedKg);
        } else if quantity < 200.0 {
            return (Some(quantity), UnitStatus::AssumedMt);
        }
        return (None, UnitStatus::Unresolvable);
    };

    let unit_upper = unit.trim().to_uppercase();

    if let Some((_, factor)) = UNIT_CONVERSIONS.iter().find(|(u, _)| *u == unit_upper) {
        return (Some(quantity * factor), UnitStatus::Ok);
    }

    if unit_upper == "BAGS" || unit_upper == "BAG" {
        let hint = commodity_hint.map(|h| h.to_lowercase()).unwrap_or_default();
        if hint.contains("cashew") {
            return (Some(quantity * BAG_WEIGHT_CASHEW_MT), UnitStatus::Ok);
        } else if hint.contains("rice") {
            return (Some(quantity * BAG_WEIGHT_RICE_MT), UnitStatus::Ok);
        } else if hint.contains("cocoa") {
            return (Some(quantity * BAG_WEIGHT_COCOA_MT), UnitStatus::Ok);
        }
        return (
            Some(quantity * BAG_WEIGHT_DEFAULT_MT),
            UnitStatus::AssumedBagWeight,
        );
    }

    // Piece counts (NOS, PCS) and anything else unrecognized
    (None, UnitStatus::Unresolvable)
}

// ── Incoterm map ─────────────────────────────────────────────────

static INCOTERM_MAP: Lazy<Vec<((TradeType, &'static str), Incoterm)>> = Lazy::new(|| {
    use Incoterm::*;
    use TradeType::*;
    vec![
        ((Export, "INDIA"), Fob),
        ((Import, "INDIA"), Cif),
        ((Export, "BRAZIL"), Fob),
        ((Import, "BANGLADESH"), Cif),
        ((Import, "VIETNAM"), Cif),
        ((Export, "VIETNAM"), Fob),
        ((Import, "NIGERIA"), Cif),
        ((Export, "NIGERIA"), Fob),
        ((Export, "ETHIOPIA"), Fob),
        ((Export, "IVORY COAST"), Fob),
        ((Export, "GHANA"), Fob),
        ((Export, "TANZANIA"), Fob),
        ((Import, "USA"), Cif),
        ((Import, "INDONESIA"), Cif),
        ((Export, "INDONESIA"), Fob),
        ((Import, "PAKISTAN"), Cif),
        ((Export, "PAKISTAN"), Fob),
        ((Import, "SRI LANKA"), Cif),
        ((Import, "KENYA"), Cif),
        ((Import, "MEXICO"), Cif),
        ((Export, "MEXICO"), Fob),
        ((Import, "ARGENTINA"), Cif),
        ((Export, "ARGENTINA"), Fob),
        ((Import, "COLOMBIA"), Cif),
        ((Export, "COLOMBIA"), Fob),
        ((Import, "CHILE"), Cif),
        ((Export, "CHILE"), Fob),
        ((Import, "PHILIPPINES"), Cif),
        ((Export, "PERU"), Fob),
        ((Import, "TURKEY"), Cif),
        ((Export, "TURKEY"), Fob),
        ((Import, "KAZAKHSTAN"), Cif),
        ((Export, "KAZAKHSTAN"), Fob),
        ((Import, "URUGUAY"), Cif),
        ((Export, "URUGUAY"), Fob),
        ((Import, "CAMEROON"), Cif),
        ((Export, "CAMEROON"), Fob),
    ]
});

/// Declared incoterm basis for a (trade type, trade country) pair, with the
/// conventional default when the pair is not tabled: exports ship FOB,
/// imports land CIF.
pub fn infer_incoterm(trade_type: TradeType, trade_country: &str) -> Incoterm {
    let country = trade_country.trim().to_uppercase();
    INCOTERM_MAP
        .iter()
        .find(|((t, c), _)| *t == trade_type && *c == country)
        .map(|(_, incoterm)| *incoterm)
        .unwrap_or(match trade_type {
            TradeType::Export => Incoterm::Fob,
            TradeType::Import => Incoterm::Cif,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freight_lookup_exact_and_noisy() {
        assert_eq!(lookup_freight(Some("ABIDJAN"), Some("TUTICORIN")), Some(42.5));
        assert_eq!(
            lookup_freight(Some("ABIDJAN PORT"), Some("TUTICORIN SEA")),
            Some(42.5)
        );
        assert_eq!(lookup_freight(Some("SANTOS"), Some("TUTICORIN")), None);
        assert_eq!(lookup_freight(None, Some("TUTICORIN")), None);
    }

    #[test]
    fn test_insurance_standard_rate() {
        let cost = calc_insurance(1_600_000.0, Some("SANTOS"), Some("TUTICORIN"));
        assert!((cost - 2400.0).abs() < 1e-9);
    }

    #[test]
    fn test_insurance_war_risk_loading() {
        let gog = calc_insurance(1_000_000.0, Some("LAGOS"), Some("TUTICORIN"));
        assert!((gog - 1_000_000.0 * 0.004).abs() < 1e-9);

        // Red Sea outranks Gulf of Guinea when both zones are touched
        let both = calc_insurance(1_000_000.0, Some("LAGOS"), Some("DJIBOUTI"));
        assert!((both - 1_000_000.0 * 0.0065).abs() < 1e-9);
    }

    #[test]
    fn test_port_charges_default() {
        assert_eq!(lookup_port_charges(Some("TUTICORIN")), 4.70);
        assert_eq!(lookup_port_charges(Some("ROTTERDAM")), DEFAULT_PORT_CHARGE);
        assert_eq!(lookup_port_charges(None), 0.0);
    }

    #[test]
    fn test_convert_known_units() {
        assert_eq!(
            convert_to_mt(Some(1000.0), Some("MTS"), None),
            (Some(1000.0), UnitStatus::Ok)
        );
        let (qty, status) = convert_to_mt(Some(10_000.0), Some("KGS"), None);
        assert_eq!(status, UnitStatus::Ok);
        assert!((qty.unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_convert_magnitude_heuristic() {
        assert_eq!(
            convert_to_mt(Some(10_000.0), None, None),
            (Some(10.0), UnitStatus::AssumedKg)
        );
        assert_eq!(
            convert_to_mt(Some(150.0), None, None),
            (Some(150.0), UnitStatus::AssumedMt)
        );
        assert_eq!(
            convert_to_mt(Some(1000.0), None, None),
            (None, UnitStatus::Unresolvable)
        );
    }

    #[test]
    fn test_convert_bags_by_commodity() {
        let (qty, status) = convert_to_mt(Some(100.0), Some("BAGS"), Some("Raw Cashew Nuts"));
        assert_eq!(status, UnitStatus::Ok);
        assert!((qty.unwrap() - 8.0).abs() < 1e-9);

        let (qty, status) = convert_to_mt(Some(100.0), Some("BAGS"), Some("Shea Nuts"));
        assert_eq!(status, UnitStatus::AssumedBagWeight);
        assert!((qty.unwrap() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_convert_piece_counts_unresolvable() {
        assert_eq!(
            convert_to_mt(Some(500.0), Some("NOS"), None),
            (None, UnitStatus::Unresolvable)
        );
    }

    #[test]
    fn test_convert_missing_quantity() {
        assert_eq!(convert_to_mt(None, Some("MT"), None), (None, UnitStatus::Missing));
        assert_eq!(
            convert_to_mt(Some(0.0), Some("MT"), None),
            (None, UnitStatus::Missing)
        );
    }

    #[test]
    fn test_incoterm_table_and_default() {
        assert_eq!(infer_incoterm(TradeType::Export, "INDIA"), Incoterm::Fob);
        assert_eq!(infer_incoterm(TradeType::Import, "INDIA"), Incoterm::Cif);
        // Untabled pairs fall back by trade type
        assert_eq!(infer_incoterm(TradeType::Export, "FRANCE"), Incoterm::Fob);
        assert_eq!(infer_incoterm(TradeType::Import, "FRANCE"), Incoterm::Cif);
    }
}

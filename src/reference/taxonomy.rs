//! Hectar Commodity Taxonomy (HCT) — the unified classification system.
//!
//! Maps HS codes from any country to internal commodity identifiers, so the
//! same product can be compared across different customs regimes.

use once_cell::sync::Lazy;
use serde::Serialize;

/// One (country, HS prefix) mapping into the taxonomy.
#[derive(Debug, Clone, Serialize)]
pub struct HsMapping {
    /// Country the mapping applies to, or "*" for any
    pub country: &'static str,
    pub hs_code: &'static str,
    pub confidence: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaxonomyEntry {
    pub hct_id: &'static str,
    pub hct_name: &'static str,
    pub hct_group: &'static str,
    pub hct_supergroup: &'static str,
    pub standard_unit: &'static str,
    pub hs_mappings: Vec<HsMapping>,
    pub quality_grades: Vec<&'static str>,
}

fn map(country: &'static str, hs_code: &'static str, confidence: &'static str) -> HsMapping {
    HsMapping {
        country,
        hs_code,
        confidence,
    }
}

static TAXONOMY: Lazy<Vec<TaxonomyEntry>> = Lazy::new(|| {
    vec![
        TaxonomyEntry {
            hct_id: "HCT-0801-RCN-INSHELL",
            hct_name: "Raw Cashew Nuts (In Shell)",
            hct_group: "Cashew Complex",
            hct_supergroup: "Tree Nuts",
            standard_unit: "MT",
            hs_mappings: vec![
                map("*", "080131", "HIGH"),
                map("INDIA", "08013110", "HIGH"),
                map("INDIA", "08013120", "HIGH"),
                map("VIETNAM", "08013100", "HIGH"),
                map("IVORY COAST", "080131", "HIGH"),
            ],
            quality_grades: vec!["Grade A (180+ nuts/kg)", "Grade B (180-210)", "Grade C (210+)"],
        },
        TaxonomyEntry {
            hct_id: "HCT-0801-CASHEW-KERNEL",
            hct_name: "Cashew Kernels (Processed)",
            hct_group: "Cashew Complex",
            hct_supergroup: "Tree Nuts",
            standard_unit: "MT",
            hs_mappings: vec![
                map("*", "080132", "HIGH"),
                map("INDIA", "08013200", "HIGH"),
                map("VIETNAM", "08013200", "HIGH"),
            ],
            quality_grades: vec!["W180", "W210", "W240", "W320", "W450", "SW", "LWP", "SWP"],
        },
        TaxonomyEntry {
            hct_id: "HCT-1207-SESAME",
            hct_name: "Sesame Seeds",
            hct_group: "Sesame",
            hct_supergroup: "Oilseeds",
            standard_unit: "MT",
            hs_mappings: vec![
                map("*", "120740", "HIGH"),
                map("INDIA", "12074000", "HIGH"),
                map("ETHIOPIA", "120740", "HIGH"),
                map("NIGERIA", "120740", "HIGH"),
            ],
            quality_grades: vec![
                "Hulled 99.95%",
                "Hulled 99.90%",
                "Natural (unhulled)",
                "Mixed",
            ],
        },
        TaxonomyEntry {
            hct_id: "HCT-1006-RICE-NONBASMATI",
            hct_name: "Rice (Non-Basmati)",
            hct_group: "Rice",
            hct_supergroup: "Grains & Cereals",
            standard_unit: "MT",
            hs_mappings: vec![
                map("*", "1006", "MEDIUM"),
                map("INDIA", "10063010", "HIGH"),
                map("INDIA", "10063090", "HIGH"),
                map("VIETNAM", "100630", "HIGH"),
                map("THAILAND", "100630", "HIGH"),
            ],
            quality_grades: vec![
                "5% Broken",
                "10% Broken",
                "15% Broken",
                "25% Broken",
                "100% Broken",
                "Parboiled",
                "Long Grain White",
            ],
        },
        TaxonomyEntry {
            hct_id: "HCT-1006-RICE-BASMATI",
            hct_name: "Basmati Rice",
            hct_group: "Rice",
            hct_supergroup: "Grains & Cereals",
            standard_unit: "MT",
            hs_mappings: vec![
                map("INDIA", "10063020", "HIGH"),
                map("PAKISTAN", "100630", "MEDIUM"),
            ],
            quality_grades: vec!["1121 Sella", "1121 Steam", "Sugandha", "Pusa", "Traditional"],
        },
        TaxonomyEntry {
            hct_id: "HCT-1201-SOYBEAN",
            hct_name: "Soybeans",
            hct_group: "Soybeans",
            hct_supergroup: "Oilseeds",
            standard_unit: "MT",
            hs_mappings: vec![
                map("*", "120190", "HIGH"),
                map("NIGERIA", "12019000", "HIGH"),
                map("INDIA", "12019000", "HIGH"),
            ],
            quality_grades: vec!["Grade 1", "Grade 2", "Feed Grade"],
        },
        TaxonomyEntry {
            hct_id: "HCT-1801-COCOA",
            hct_name: "Cocoa Beans",
            hct_group: "Cocoa",
            hct_supergroup: "Cocoa",
            standard_unit: "MT",
            hs_mappings: vec![map("*", "180100", "HIGH")],
            quality_grades: vec!["Grade I", "Grade II", "Sub-Grade"],
        },
        TaxonomyEntry {
            hct_id: "HCT-1207-SHEA",
            hct_name: "Shea Nuts/Butter",
            hct_group: "Shea",
            hct_supergroup: "Oilseeds",
            standard_unit: "MT",
            hs_mappings: vec![map("*", "120799", "MEDIUM")],
            quality_grades: vec!["Nuts", "Crude Butter", "Refined Butter"],
        },
        TaxonomyEntry {
            hct_id: "HCT-1511-PALMOIL",
            hct_name: "Palm Oil",
            hct_group: "Palm Oil",
            hct_supergroup: "Vegetable Oils",
            standard_unit: "MT",
            hs_mappings: vec![map("*", "151110", "HIGH"), map("*", "151190", "HIGH")],
            quality_grades: vec!["Crude (CPO)", "Refined (RPO)", "Olein", "Stearin"],
        },
        TaxonomyEntry {
            hct_id: "HCT-5201-COTTON",
            hct_name: "Raw Cotton",
            hct_group: "Cotton",
            hct_supergroup: "Cotton",
            standard_unit: "MT",
            hs_mappings: vec![map("*", "520100", "HIGH")],
            quality_grades: vec!["S-6", "J-34", "MCU-5", "Shankar-6", "CIS"],
        },
    ]
});

/// The full taxonomy, in priority order.
pub fn taxonomy() -> &'static [TaxonomyEntry] {
    &TAXONOMY
}

/// Find a taxonomy entry by its HCT identifier.
pub fn entry_by_id(hct_id: &str) -> Option<&'static TaxonomyEntry> {
    TAXONOMY.iter().find(|e| e.hct_id == hct_id)
}

/// A successful HS-code classification.
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
    pub entry: &'static TaxonomyEntry,
    pub match_confidence: &'static str,
}

/// Resolve an HS code to a taxonomy entry.
///
/// First pass requires an exact country match; second pass falls back to the
/// wildcard mappings. A mapping matches when its HS prefix is a prefix of the
/// record's code.
pub fn classify_by_hs_code(hs_code: &str, country: &str) -> Option<Classification> {
    let hs_code = hs_code.trim();
    let country = country.trim().to_uppercase();

    for entry in TAXONOMY.iter() {
        for mapping in &entry.hs_mappings {
            if mapping.country == country && hs_code.starts_with(mapping.hs_code) {
                return Some(Classification {
                    entry,
                    match_confidence: mapping.confidence,
                });
            }
        }
    }

    for entry in TAXONOMY.iter() {
        for mapping in &entry.hs_mappings {
            if mapping.country == "*" && hs_code.starts_with(mapping.hs_code) {
                return Some(Classification {
                    entry,
                    match_confidence: mapping.confidence,
                });
            }
        }
    }

    None
}

//! Commodity-specific product description parsers.
//!
//! Customs data hides the interesting part of a shipment in the free-text
//! product description. Each parser extracts the structured signals its
//! commodity family actually trades on (outturn for raw cashew, W-grades for
//! kernels, purity for sesame, broken percentage for rice) and scores its own
//! confidence by how many signals fired.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::QualityEstimate;

struct QualityParser {
    applies: fn(&str) -> bool,
    parse: fn(&str) -> QualityEstimate,
}

/// Registry of family parsers, checked in order. The dispatch key is the
/// HCT identifier, not the description text.
static PARSERS: &[QualityParser] = &[
    QualityParser {
        applies: |hct| hct.contains("RCN"),
        parse: parse_cashew_rcn,
    },
    QualityParser {
        applies: |hct| hct.contains("KERNEL"),
        parse: parse_cashew_kernel,
    },
    QualityParser {
        applies: |hct| hct.contains("SESAME"),
        parse: parse_sesame,
    },
    QualityParser {
        applies: |hct| hct.contains("RICE"),
        parse: parse_rice,
    },
    QualityParser {
        applies: |hct| hct.contains("SOYBEAN"),
        parse: parse_soybean,
    },
];

/// Parse a product description into structured quality attributes.
pub fn parse_quality(product_text: Option<&str>, hct_id: Option<&str>) -> QualityEstimate {
    let Some(text) = product_text.map(str::trim).filter(|t| !t.is_empty()) else {
        return QualityEstimate::unknown();
    };
    let upper = text.to_uppercase();

    if let Some(hct_id) = hct_id {
        for parser in PARSERS {
            if (parser.applies)(hct_id) {
                return (parser.parse)(&upper);
            }
        }
    }

    QualityEstimate::standard()
}

fn confidence(signals: usize) -> f64 {
    (0.3 + signals as f64 * 0.2).min(0.95)
}

fn kernel_confidence(signals: usize) -> f64 {
    (0.4 + signals as f64 * 0.25).min(0.95)
}

static OUTTURN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"OUTTURN\s*[:\-]?\s*(\d+\.?\d*)\s*(?:LBS|#)?").unwrap());
static NUT_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*(?:NUTS?|NUT)\s*/?\s*KG").unwrap());

const RCN_ORIGINS: &[&str] = &[
    "IVORY COAST",
    "GHANA",
    "NIGERIA",
    "TANZANIA",
    "MOZAMBIQUE",
    "GUINEA BISSAU",
    "BENIN",
    "COTE D'IVOIRE",
];

fn parse_cashew_rcn(text: &str) -> QualityEstimate {
    let mut signals = Vec::new();
    let mut grade = "Standard".to_string();
    let mut details = Vec::new();

    let state = if text.contains("KERNEL")
        || ["W180", "W240", "W320", "W450"].iter().any(|g| text.contains(g))
    {
        "kernel"
    } else if text.contains("SHELLED") {
        "shelled"
    } else {
        "raw_in_shell"
    };
    details.push(format!("state={state}"));

    // Outturn (KOR) is the quality indicator RCN actually trades on
    if let Some(caps) = OUTTURN_RE.captures(text) {
        if let Ok(outturn) = caps[1].parse::<f64>() {
            signals.push("outturn_detected".to_string());
            details.push(format!("outturn={outturn} lbs"));
            grade = if outturn >= 48.0 {
                "Premium".to_string()
            } else if outturn >= 44.0 {
                "Grade A".to_string()
            } else {
                "Grade B".to_string()
            };
        }
    }

    if let Some(caps) = NUT_COUNT_RE.captures(text) {
        if let Ok(count) = caps[1].parse::<u32>() {
            signals.push("nut_count_detected".to_string());
            details.push(format!("nut_count={count}/kg"));
        }
    }

    if let Some(origin) = RCN_ORIGINS.iter().find(|o| text.contains(*o)) {
        signals.push("origin_claim".to_string());
        details.push(format!("origin={origin}"));
    }

    QualityEstimate {
        grade,
        confidence: confidence(signals.len()),
        signals_used: signals,
        details: details.join("; "),
    }
}

static KERNEL_GRADE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(W\s?180|W\s?210|W\s?240|W\s?320|W\s?450|WW\d+|SW\d+|LWP|SWP|BB|SS)").unwrap()
});

fn parse_cashew_kernel(text: &str) -> QualityEstimate {
    let mut signals = Vec::new();
    let mut grade = "Standard".to_string();
    let mut details = Vec::new();

    if let Some(caps) = KERNEL_GRADE_RE.captures(text) {
        grade = caps[1].replace(' ', "");
        signals.push("kernel_grade_detected".to_string());
        details.push(format!("grade={grade}"));
    }

    if text.contains("SCORCHED") {
        signals.push("processing_note".to_string());
        details.push("scorched".to_string());
    }
    if text.contains("DESSERT") {
        signals.push("processing_note".to_string());
        details.push("dessert".to_string());
    }

    QualityEstimate {
        grade,
        confidence: kernel_confidence(signals.len()),
        signals_used: signals,
        details: details.join("; "),
    }
}

static PURITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2}\.?\d*)\s*%\s*(?:PURITY|PURE)").unwrap());

fn parse_sesame(text: &str) -> QualityEstimate {
    let mut signals = Vec::new();
    let mut grade = "Standard".to_string();
    let mut details = Vec::new();

    if let Some(caps) = PURITY_RE.captures(text) {
        if let Ok(purity) = caps[1].parse::<f64>() {
            signals.push("purity_detected".to_string());
            details.push(format!("purity={purity}%"));
            if purity >= 99.95 {
                grade = "Premium Hulled".to_string();
            } else if purity >= 99.90 {
                grade = "Hulled".to_string();
            }
        }
    }

    if text.contains("HULLED") && !text.contains("UNHULLED") {
        signals.push("processing_state".to_string());
        details.push("hulled".to_string());
        if grade == "Standard" {
            grade = "Hulled".to_string();
        }
    } else if text.contains("NATURAL") || text.contains("UNHULLED") {
        signals.push("processing_state".to_string());
        details.push("natural/unhulled".to_string());
        grade = "Natural".to_string();
    }

    if text.contains("AFLATOXIN") && text.contains("FREE") {
        signals.push("quality_certification".to_string());
        details.push("aflatoxin-free".to_string());
    }

    if let Some(color) = ["WHITE", "BLACK", "BROWN", "MIXED"]
        .iter()
        .find(|c| text.contains(*c))
    {
        signals.push("color_detected".to_string());
        details.push(format!("color={}", color.to_lowercase()));
    }

    QualityEstimate {
        grade,
        confidence: confidence(signals.len()),
        signals_used: signals,
        details: details.join("; "),
    }
}

static BROKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*%?\s*(?:BROKEN|BRKN|PCT)").unwrap());

const RICE_VARIETIES: &[&str] = &["PONNI", "SONA MASURI", "SONA MASOORI", "SUGANDHA", "PUSA"];

fn parse_rice(text: &str) -> QualityEstimate {
    let mut signals = Vec::new();
    let mut grade = "Standard".to_string();
    let mut details = Vec::new();

    if let Some(caps) = BROKEN_RE.captures(text) {
        if let Ok(pct) = caps[1].parse::<u32>() {
            signals.push("broken_pct_detected".to_string());
            details.push(format!("broken={pct}%"));
            grade = if pct <= 5 {
                "5% Broken (Premium)".to_string()
            } else if pct <= 15 {
                format!("{pct}% Broken (Mid)")
            } else if pct <= 25 {
                "25% Broken (Standard)".to_string()
            } else {
                "100% Broken (Value)".to_string()
            };
        }
    }

    if text.contains("BASMATI") {
        grade = "Basmati".to_string();
        signals.push("variety_detected".to_string());
        if text.contains("1121") {
            details.push("variety=1121".to_string());
        }
        if text.contains("SELLA") {
            details.push("processing=sella/parboiled".to_string());
        }
        if text.contains("STEAM") {
            details.push("processing=steamed".to_string());
        }
    }

    if text.contains("LONG GRAIN") {
        signals.push("type_detected".to_string());
        details.push("long grain".to_string());
    }
    if text.contains("PARBOILED") && !text.contains("BASMATI") {
        signals.push("processing_detected".to_string());
        details.push("parboiled".to_string());
    }

    if let Some(var) = RICE_VARIETIES.iter().find(|v| text.contains(*v)) {
        signals.push("variety_detected".to_string());
        details.push(format!("variety={var}"));
    }

    QualityEstimate {
        grade,
        confidence: confidence(signals.len()),
        signals_used: signals,
        details: details.join("; "),
    }
}

static PROTEIN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)\s*%?\s*PROTEIN").unwrap());
static MOISTURE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.?\d*)\s*%?\s*MOISTURE").unwrap());

fn parse_soybean(text: &str) -> QualityEstimate {
    let mut signals = Vec::new();
    let mut grade = "Standard".to_string();
    let mut details = Vec::new();

    if text.contains("FEED") {
        grade = "Feed Grade".to_string();
        signals.push("grade_detected".to_string());
        details.push("feed grade".to_string());
    }

    if text.contains("NON-GMO") || text.contains("NON GMO") {
        signals.push("gmo_status".to_string());
        details.push("non-GMO".to_string());
    }

    if let Some(caps) = PROTEIN_RE.captures(text) {
        if let Ok(protein) = caps[1].parse::<f64>() {
            signals.push("protein_detected".to_string());
            details.push(format!("protein={protein}%"));
        }
    }

    if let Some(caps) = MOISTURE_RE.captures(text) {
        if let Ok(moisture) = caps[1].parse::<f64>() {
            signals.push("moisture_detected".to_string());
            details.push(format!("moisture={moisture}%"));
        }
    }

    QualityEstimate {
        grade,
        confidence: confidence(signals.len()),
        signals_used: signals,
        details: details.join("; "),
    }
}

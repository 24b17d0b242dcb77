//! Seasonal shipment patterns per commodity: crop-year windows and monthly
//! volume weights (each commodity's twelve weights sum to 1.0).

use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CropYear {
    pub name: &'static str,
    pub start_month: u32,
    pub end_month: u32,
    pub peak_months: Vec<u32>,
    pub origins: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeasonalPattern {
    pub hct_id: &'static str,
    pub crop_years: Vec<CropYear>,
    /// Index 0 = January
    pub monthly_weights: [f64; 12],
}

impl SeasonalPattern {
    /// Weight for a calendar month (1–12).
    pub fn monthly_weight(&self, month: u32) -> f64 {
        let idx = month.saturating_sub(1) as usize;
        self.monthly_weights.get(idx).copied().unwrap_or(1.0 / 12.0)
    }
}

static SEASONAL_PATTERNS: Lazy<Vec<SeasonalPattern>> = Lazy::new(|| {
    vec![
        SeasonalPattern {
            hct_id: "HCT-0801-RCN-INSHELL",
            crop_years: vec![
                CropYear {
                    name: "West African Main Crop",
                    start_month: 2,
                    end_month: 7,
                    peak_months: vec![3, 4, 5],
                    origins: vec!["IVORY COAST", "GHANA", "GUINEA BISSAU", "BENIN"],
                },
                CropYear {
                    name: "East African Crop",
                    start_month: 10,
                    end_month: 1,
                    peak_months: vec![11, 12],
                    origins: vec!["TANZANIA", "MOZAMBIQUE"],
                },
            ],
            monthly_weights: [
                0.06, 0.08, 0.14, 0.16, 0.14, 0.10, 0.07, 0.05, 0.04, 0.05, 0.06, 0.05,
            ],
        },
        SeasonalPattern {
            hct_id: "HCT-1207-SESAME",
            crop_years: vec![
                CropYear {
                    name: "Sudan/Ethiopia Main",
                    start_month: 10,
                    end_month: 3,
                    peak_months: vec![11, 12, 1],
                    origins: vec!["SUDAN", "ETHIOPIA"],
                },
                CropYear {
                    name: "Nigeria Multi-crop",
                    start_month: 4,
                    end_month: 9,
                    peak_months: vec![6, 7, 8],
                    origins: vec!["NIGERIA"],
                },
                CropYear {
                    name: "India Rabi",
                    start_month: 2,
                    end_month: 5,
                    peak_months: vec![3, 4],
                    origins: vec!["INDIA"],
                },
            ],
            monthly_weights: [
                0.10, 0.09, 0.09, 0.08, 0.06, 0.07, 0.08, 0.08, 0.07, 0.08, 0.10, 0.10,
            ],
        },
        SeasonalPattern {
            hct_id: "HCT-1201-SOYBEAN",
            crop_years: vec![CropYear {
                name: "Nigeria Main",
                start_month: 10,
                end_month: 3,
                peak_months: vec![11, 12, 1],
                origins: vec!["NIGERIA"],
            }],
            monthly_weights: [
                0.10, 0.09, 0.08, 0.07, 0.06, 0.06, 0.07, 0.07, 0.08, 0.09, 0.12, 0.11,
            ],
        },
        SeasonalPattern {
            hct_id: "HCT-1006-RICE-NONBASMATI",
            crop_years: vec![
                CropYear {
                    name: "India Kharif",
                    start_month: 10,
                    end_month: 9,
                    peak_months: vec![1, 2, 3, 4],
                    origins: vec!["INDIA"],
                },
                CropYear {
                    name: "Vietnam Winter-Spring",
                    start_month: 2,
                    end_month: 5,
                    peak_months: vec![3, 4, 5],
                    origins: vec!["VIETNAM"],
                },
            ],
            monthly_weights: [
                0.10, 0.10, 0.10, 0.09, 0.08, 0.07, 0.07, 0.07, 0.07, 0.08, 0.08, 0.09,
            ],
        },
    ]
});

/// Seasonal pattern for a commodity, if one is tabled.
pub fn seasonal_pattern(hct_id: &str) -> Option<&'static SeasonalPattern> {
    SEASONAL_PATTERNS.iter().find(|p| p.hct_id == hct_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monthly_weights_sum_to_one() {
        for pattern in SEASONAL_PATTERNS.iter() {
            let sum: f64 = pattern.monthly_weights.iter().sum();
            assert!(
                (sum - 1.0).abs() < 1e-9,
                "{} weights sum to {}",
                pattern.hct_id,
                sum
            );
        }
    }

    #[test]
    fn test_lookup_and_month_indexing() {
        let rcn = seasonal_pattern("HCT-0801-RCN-INSHELL").unwrap();
        assert!((rcn.monthly_weight(4) - 0.16).abs() < 1e-9);
        assert!(seasonal_pattern("HCT-9999-NONE").is_none());
    }
}

use serde::{Deserialize, Serialize};

use super::shipment::{CanonicalShipment, TradeType};

/// Declarative specification of one window-bounded ingestion task.
///
/// Jobs are values: the catalog in `reference::jobs` holds the configured
/// set, and ad-hoc jobs are built on the fly for commodity searches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestJob {
    pub name: String,
    pub trade_type: TradeType,
    pub trade_country: String,

    /// Primary search by HS code prefix (padded to ≥4 digits on the wire)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hs_codes: Vec<u32>,

    /// Primary search by product text, used when no HS codes are configured
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub products: Vec<String>,

    pub lookback_days: i64,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub origin_countries: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub destination_countries: Vec<String>,

    /// 1 = bootstrap priority; higher numbers run only on demand
    pub priority: u8,
}

impl HarvestJob {
    pub fn new(
        name: impl Into<String>,
        trade_type: TradeType,
        trade_country: impl Into<String>,
        hs_codes: Vec<u32>,
        lookback_days: i64,
        priority: u8,
    ) -> Self {
        Self {
            name: name.into(),
            trade_type,
            trade_country: trade_country.into().to_uppercase(),
            hs_codes,
            products: Vec::new(),
            lookback_days,
            origin_countries: Vec::new(),
            destination_countries: Vec::new(),
            priority,
        }
    }

    pub fn with_origins(mut self, origins: &[&str]) -> Self {
        self.origin_countries = origins.iter().map(|o| o.to_uppercase()).collect();
        self
    }

    pub fn with_destinations(mut self, destinations: &[&str]) -> Self {
        self.destination_countries = destinations.iter().map(|d| d.to_uppercase()).collect();
        self
    }
}

/// Terminal state of one harvest job run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarvestStatus {
    Success,
    Failed,
    /// Budget exhausted before the job could run; a skip, not a failure
    Skipped,
}

/// Summary returned by every job run. `normalized_records` is drained by the
/// caller before the summary leaves the process boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestSummary {
    pub job_name: String,
    pub status: HarvestStatus,
    pub raw_count: usize,
    pub unique_count: usize,
    pub normalized_count: usize,
    pub error_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_range: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub normalized_records: Vec<CanonicalShipment>,
}

impl HarvestSummary {
    pub fn failed(job_name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            status: HarvestStatus::Failed,
            raw_count: 0,
            unique_count: 0,
            normalized_count: 0,
            error_count: 0,
            date_range: None,
            error: Some(error.into()),
            normalized_records: Vec::new(),
        }
    }

    pub fn skipped(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            status: HarvestStatus::Skipped,
            raw_count: 0,
            unique_count: 0,
            normalized_count: 0,
            error_count: 0,
            date_range: None,
            error: None,
            normalized_records: Vec::new(),
        }
    }

    /// Take the normalized records out, leaving a response-sized summary.
    pub fn drain_records(&mut self) -> Vec<CanonicalShipment> {
        std::mem::take(&mut self.normalized_records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_job_builder_uppercases_countries() {
        let job = HarvestJob::new(
            "rcn_india_imports",
            TradeType::Import,
            "india",
            vec![801],
            30,
            1,
        )
        .with_origins(&["Ivory Coast", "ghana"]);

        assert_eq!(job.trade_country, "INDIA");
        assert_eq!(job.origin_countries, vec!["IVORY COAST", "GHANA"]);
    }

    #[test]
    fn test_skipped_summary_serializes_without_records() {
        let summary = HarvestSummary::skipped("rcn_india_imports");
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "SKIPPED");
        assert!(json.get("normalized_records").is_none());
    }
}

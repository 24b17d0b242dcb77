//! The harvest engine.
//!
//! A job is a value; running one computes its lookback window, pulls every
//! page, deduplicates against the process-lifetime seen set, and normalizes
//! each unique record. Per-record failures are counted, never raised: one
//! malformed line item must not cost the other nine hundred.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{error, info, warn};

use crate::domain::{
    HarvestJob, HarvestStatus, HarvestSummary, RawRecord, Result, TradeOpsError,
};
use crate::normalize::NormalizationPipeline;
use crate::reference::harvest_jobs;
use crate::upstream::{BudgetTracker, CallKind, QueryBuilder, ShipmentQuery, UpstreamClient};

/// Pause between job submissions in bootstrap phase 2.
const INTER_JOB_DELAY: Duration = Duration::from_secs(2);

static DATE_WINDOW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"available from (\d{4}-\d{2}-\d{2}).*?to (\d{4}-\d{2}-\d{2})").unwrap()
});

pub struct HarvestEngine {
    client: Arc<UpstreamClient>,
    budget: Arc<BudgetTracker>,
    normalizer: NormalizationPipeline,
    seen_record_ids: Mutex<HashSet<String>>,
    inter_job_delay: Duration,
}

impl HarvestEngine {
    pub fn new(client: Arc<UpstreamClient>, budget: Arc<BudgetTracker>) -> Self {
        Self {
            client,
            budget,
            normalizer: NormalizationPipeline::new(),
            seen_record_ids: Mutex::new(HashSet::new()),
            inter_job_delay: INTER_JOB_DELAY,
        }
    }

    /// Shrink the bootstrap inter-job delay; intended for tests.
    pub fn with_inter_job_delay(mut self, delay: Duration) -> Self {
        self.inter_job_delay = delay;
        self
    }

    /// Execute one job over its configured lookback window ending today.
    pub async fn run_job(&self, job: &HarvestJob) -> HarvestSummary {
        let end = chrono::Utc::now().date_naive();
        let start = end - Days::new(job.lookback_days.max(0) as u64);
        self.run_job_in_window(job, start, end).await
    }

    /// Execute one job over an explicit window.
    pub async fn run_job_in_window(
        &self,
        job: &HarvestJob,
        start: NaiveDate,
        end: NaiveDate,
    ) -> HarvestSummary {
        if !self.budget.can_harvest() {
            warn!(job = %job.name, "Harvest budget exhausted, skipping job");
            return HarvestSummary::skipped(&job.name);
        }

        info!(job = %job.name, %start, %end, "Starting harvest job");

        let raw_records = match self.fetch_with_date_fallback(job, start, end).await {
            Ok(records) => records,
            Err(e) => {
                error!(job = %job.name, error = %e, "Harvest job failed");
                return HarvestSummary::failed(&job.name, e.to_string());
            }
        };

        // Dedup by declaration + item number against the process-lifetime
        // seen set. Records with no declaration number cannot be deduped and
        // pass through.
        let raw_count = raw_records.len();
        let unique_records = {
            let mut seen = self.seen_record_ids.lock().unwrap_or_else(|e| e.into_inner());
            raw_records
                .into_iter()
                .filter(|record| match raw_identity(record) {
                    Some(id) => seen.insert(id),
                    None => true,
                })
                .collect::<Vec<_>>()
        };

        let mut normalized = Vec::with_capacity(unique_records.len());
        let mut errors = 0usize;
        for record in &unique_records {
            match self
                .normalizer
                .normalize(record, job.trade_type, &job.trade_country)
            {
                Ok(shipment) => normalized.push(shipment),
                Err(e) => {
                    errors += 1;
                    warn!(job = %job.name, error = %e, "Normalization error");
                }
            }
        }

        info!(
            job = %job.name,
            raw = raw_count,
            unique = unique_records.len(),
            normalized = normalized.len(),
            errors,
            "Harvest job complete"
        );

        HarvestSummary {
            job_name: job.name.clone(),
            status: HarvestStatus::Success,
            raw_count,
            unique_count: unique_records.len(),
            normalized_count: normalized.len(),
            error_count: errors,
            date_range: Some(format!("{start} to {end}")),
            error: None,
            normalized_records: normalized,
        }
    }

    /// Fetch all pages, clamping the window and retrying exactly once when
    /// the upstream advertises its available date range in a 400.
    async fn fetch_with_date_fallback(
        &self,
        job: &HarvestJob,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<RawRecord>> {
        let payload = QueryBuilder::shipment_query(&self.job_query(job, start, end));

        match self.client.shipment_all(payload, CallKind::Harvest).await {
            Ok(records) => Ok(records),
            Err(TradeOpsError::UpstreamApi { status: 400, body }) => {
                let Some((available_start, available_end)) = parse_available_window(&body) else {
                    return Err(TradeOpsError::UpstreamApi { status: 400, body });
                };

                let clamped_start = start.max(available_start);
                let clamped_end = end.min(available_end);
                info!(
                    job = %job.name,
                    %clamped_start,
                    %clamped_end,
                    "Date range adjusted to upstream's available window"
                );

                let payload =
                    QueryBuilder::shipment_query(&self.job_query(job, clamped_start, clamped_end));
                self.client.shipment_all(payload, CallKind::Harvest).await
            }
            Err(e) => Err(e),
        }
    }

    fn job_query(&self, job: &HarvestJob, start: NaiveDate, end: NaiveDate) -> ShipmentQuery {
        let mut query = ShipmentQuery::new(start, end, job.trade_type, job.trade_country.clone());
        query.hs_codes = job.hs_codes.clone();
        query.products = job.products.clone();
        query.origin_countries = job.origin_countries.clone();
        query.destination_countries = job.destination_countries.clone();
        query
    }

    /// Run the configured catalog sequentially, optionally keeping only jobs
    /// at or above a priority level (1 is highest).
    pub async fn run_all_jobs(&self, priority: Option<u8>) -> Vec<HarvestSummary> {
        let mut results = Vec::new();
        for job in harvest_jobs() {
            if let Some(max_priority) = priority {
                if job.priority > max_priority {
                    continue;
                }
            }
            results.push(self.run_job(job).await);
        }
        results
    }

    /// Two-phase bootstrap: the India priority-1 jobs first for a fast path
    /// to first data, then the remaining priority-1 jobs with a gap between
    /// submissions. Both phases stop consuming once the harvest budget is
    /// spent; skipped jobs report as SKIPPED.
    pub async fn bootstrap(&self) -> Vec<HarvestSummary> {
        let priority_jobs: Vec<&HarvestJob> =
            harvest_jobs().iter().filter(|j| j.priority == 1).collect();

        let mut results = Vec::new();

        info!("Bootstrap harvest phase 1: India jobs");
        for job in priority_jobs.iter().filter(|j| j.trade_country == "INDIA") {
            results.push(self.run_job(job).await);
        }

        info!("Bootstrap harvest phase 2: remaining priority jobs");
        let mut first = true;
        for job in priority_jobs.iter().filter(|j| j.trade_country != "INDIA") {
            if !first {
                tokio::time::sleep(self.inter_job_delay).await;
            }
            first = false;
            results.push(self.run_job(job).await);
        }

        results
    }
}

fn raw_identity(record: &RawRecord) -> Option<String> {
    let declaration = record.str_field("DECLARATION_NO")?;
    let item = record.str_field("ITEM_NO").unwrap_or_default();
    Some(format!("{declaration}:{item}"))
}

fn parse_available_window(body: &str) -> Option<(NaiveDate, NaiveDate)> {
    let caps = DATE_WINDOW_RE.captures(body)?;
    let start = NaiveDate::parse_from_str(&caps[1], "%Y-%m-%d").ok()?;
    let end = NaiveDate::parse_from_str(&caps[2], "%Y-%m-%d").ok()?;
    Some((start, end))
}

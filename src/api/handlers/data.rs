//! Data-management handlers: direct queries, harvest runs, ground prices,
//! and record statistics.

use axum::extract::{Query, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::warn;

use crate::api::error::{ApiError, ApiResult};
use crate::api::models::{
    CommoditySearchQuery, GroundPriceListQuery, HarvestRunRequest, ShipmentQueryRequest,
};
use crate::api::state::SharedState;
use crate::domain::{
    CanonicalShipment, HarvestJob, HarvestStatus, HarvestSummary, RawRecord, TradeOpsError,
};
use crate::reference::{harvest_jobs, taxonomy};
use crate::store::GroundPriceInput;
use crate::upstream::{CallKind, QueryBuilder, ShipmentQuery};
use validator::Validate;

/// Countries tried for ad-hoc commodity searches, in priority order.
const SEARCH_COUNTRIES: [&str; 13] = [
    "INDIA",
    "VIETNAM",
    "IVORY COAST",
    "GHANA",
    "NIGERIA",
    "TANZANIA",
    "ETHIOPIA",
    "INDONESIA",
    "MALAYSIA",
    "THAILAND",
    "CHINA",
    "BRAZIL",
    "MOZAMBIQUE",
];

const AD_HOC_LOOKBACK_DAYS: i64 = 60;

/// Store a batch of normalized records under their commodities.
async fn store_shipments(state: &SharedState, records: Vec<CanonicalShipment>) -> ApiResult<usize> {
    let mut stored = 0;
    for record in records {
        if let Some(hct_id) = record.hct_id.clone() {
            stored += state.store.append(&hct_id, vec![record]).await?;
        }
    }
    Ok(stored)
}

/// POST /data/query/shipments — one page straight from the upstream, for
/// exploration. Records land in the store like any other ingest path.
pub async fn query_shipments(
    State(state): State<SharedState>,
    Json(request): Json<ShipmentQueryRequest>,
) -> ApiResult<Json<Value>> {
    let trade_type = request.checked_trade_type()?;

    if !state.budget.can_search() {
        return Err(TradeOpsError::BudgetExhausted {
            kind: CallKind::Search.to_string(),
        }
        .into());
    }

    let mut query = ShipmentQuery::new(
        request.start_date,
        request.end_date,
        trade_type,
        request.trade_country.clone(),
    );
    query.hs_codes = request.hs_codes.clone();
    query.products = request.products.clone();
    query.origin_countries = request.origin_countries.clone();
    query.destination_countries = request.destination_countries.clone();
    query.page_size = request.page_size;
    query.page_no = request.page_no;

    let payload = QueryBuilder::shipment_query(&query);
    let response = state.client.shipment_page(&payload, CallKind::Search).await?;

    let raw_records: Vec<RawRecord> = response
        .get("data")
        .and_then(Value::as_array)
        .map(|rows| rows.iter().cloned().map(RawRecord::from_value).collect())
        .unwrap_or_default();

    let normalizer = crate::normalize::NormalizationPipeline::new();
    let mut normalized = Vec::new();
    for raw in &raw_records {
        match normalizer.normalize(raw, trade_type, &request.trade_country) {
            Ok(shipment) => normalized.push(shipment),
            Err(e) => warn!(error = %e, "Skipping malformed record in direct query"),
        }
    }

    store_shipments(&state, normalized.clone()).await?;

    Ok(Json(json!({
        "total_records": response.get("total_records").cloned().unwrap_or(json!(0)),
        "page": request.page_no,
        "raw_count": raw_records.len(),
        "normalized_count": normalized.len(),
        "records": normalized,
    })))
}

/// Drain a summary's records into the store, leaving a response-sized value.
async fn absorb_summary(state: &SharedState, summary: &mut HarvestSummary) -> ApiResult<()> {
    if summary.status == HarvestStatus::Success {
        let records = summary.drain_records();
        store_shipments(state, records).await?;
    }
    Ok(())
}

/// POST /data/harvest/run — run one named job or the catalog by priority.
pub async fn run_harvest(
    State(state): State<SharedState>,
    Json(request): Json<HarvestRunRequest>,
) -> ApiResult<Json<Value>> {
    let mut results = match &request.job_name {
        Some(job_name) => {
            let job = harvest_jobs()
                .iter()
                .find(|j| &j.name == job_name)
                .ok_or_else(|| TradeOpsError::NotFound(format!("harvest job '{job_name}'")))?;
            vec![state.harvester.run_job(job).await]
        }
        None => state.harvester.run_all_jobs(request.priority).await,
    };

    for summary in &mut results {
        absorb_summary(&state, summary).await?;
    }

    Ok(Json(json!({ "harvest_results": results })))
}

/// GET /data/harvest/jobs
pub async fn list_harvest_jobs() -> Json<Value> {
    Json(json!({ "jobs": harvest_jobs() }))
}

/// POST /data/harvest/search — resolve a commodity by name and harvest it,
/// using pre-configured jobs when they exist and ad-hoc country sweeps when
/// they do not. Lets a trader type "cashew" without knowing HS codes.
pub async fn harvest_by_commodity_name(
    State(state): State<SharedState>,
    Query(query): Query<CommoditySearchQuery>,
) -> ApiResult<Json<Value>> {
    query.check()?;
    let needle = query.commodity_name.trim().to_lowercase();

    let matches: Vec<_> = taxonomy()
        .iter()
        .filter(|entry| {
            entry.hct_name.to_lowercase().contains(&needle)
                || entry.hct_group.to_lowercase().contains(&needle)
                || entry.hct_id.to_lowercase().contains(&needle)
        })
        .collect();

    if matches.is_empty() {
        return Ok(Json(json!({
            "status": "NOT_FOUND",
            "message": format!("No commodity matching '{}' found", query.commodity_name),
            "available": taxonomy().iter().map(|e| e.hct_name).collect::<Vec<_>>(),
        })));
    }

    let mut all_results: Vec<HarvestSummary> = Vec::new();
    let mut matched_names = Vec::new();

    for entry in matches {
        matched_names.push(entry.hct_name);

        // The 4-digit HS families of this commodity
        let mut hs_families: Vec<u32> = entry
            .hs_mappings
            .iter()
            .filter_map(|m| m.hs_code.get(..4.min(m.hs_code.len()))?.parse().ok())
            .collect();
        hs_families.sort_unstable();
        hs_families.dedup();

        let configured: Vec<&HarvestJob> = harvest_jobs()
            .iter()
            .filter(|job| job.hs_codes.iter().any(|hs| hs_families.contains(hs)))
            .collect();

        if !configured.is_empty() {
            for job in configured {
                let mut summary = state.harvester.run_job(job).await;
                absorb_summary(&state, &mut summary).await?;
                all_results.push(summary);
            }
            continue;
        }

        // No configured job: sweep the top trading countries both ways
        for country in SEARCH_COUNTRIES.iter().take(5) {
            for trade_type in [crate::domain::TradeType::Import, crate::domain::TradeType::Export]
            {
                let ad_hoc = HarvestJob::new(
                    format!(
                        "search_{}_{}_{}",
                        entry.hct_id.to_lowercase(),
                        country.to_lowercase().replace(' ', "_"),
                        trade_type.as_str().to_lowercase()
                    ),
                    trade_type,
                    *country,
                    hs_families.clone(),
                    AD_HOC_LOOKBACK_DAYS,
                    9,
                );
                let mut summary = state.harvester.run_job(&ad_hoc).await;
                if summary.status == HarvestStatus::Success && summary.normalized_count == 0 {
                    continue;
                }
                absorb_summary(&state, &mut summary).await?;
                all_results.push(summary);
            }
        }
    }

    let total_loaded: usize = all_results.iter().map(|r| r.normalized_count).sum();

    Ok(Json(json!({
        "status": "SUCCESS",
        "commodity_query": query.commodity_name,
        "commodities_matched": matched_names,
        "jobs_executed": all_results.len(),
        "total_records_loaded": total_loaded,
        "results": all_results,
    })))
}

/// POST /data/ground-price
pub async fn submit_ground_price(
    State(state): State<SharedState>,
    Json(input): Json<GroundPriceInput>,
) -> ApiResult<Json<Value>> {
    input
        .validate()
        .map_err(|e| ApiError(TradeOpsError::Validation(e.to_string())))?;

    let observation = state.ground_prices.submit(input).await;
    Ok(Json(json!({
        "status": "accepted",
        "observation": observation,
    })))
}

/// GET /data/ground-prices
pub async fn list_ground_prices(
    State(state): State<SharedState>,
    Query(query): Query<GroundPriceListQuery>,
) -> Json<Value> {
    let limit = query.limit.min(200);
    let (prices, total) = state
        .ground_prices
        .list(query.hct_id.as_deref(), query.location.as_deref(), limit)
        .await;
    Json(json!({ "prices": prices, "total": total }))
}

/// GET /data/records/stats
pub async fn record_stats(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let mut stats = Vec::new();
    let mut total = 0usize;

    for entry in taxonomy() {
        let records = state.store.records(entry.hct_id).await?;
        if records.is_empty() {
            continue;
        }

        let dates: Vec<_> = records.iter().filter_map(|r| r.trade_date).collect();
        let mut origins: Vec<String> = records
            .iter()
            .filter_map(|r| r.origin_country.clone())
            .collect();
        origins.sort();
        origins.dedup();

        total += records.len();
        stats.push(json!({
            "hct_id": entry.hct_id,
            "hct_name": entry.hct_name,
            "record_count": records.len(),
            "date_range": {
                "earliest": dates.iter().min(),
                "latest": dates.iter().max(),
            },
            "origins": origins,
        }));
    }

    Ok(Json(json!({ "record_stats": stats, "total_records": total })))
}

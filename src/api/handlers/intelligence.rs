//! Intelligence handlers: the trader-facing views. Signal feed, commodity
//! deep dive, corridor explorer, counterparty profiles, S&D tracker, and the
//! arbitrage scanner.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Days, NaiveDate, Utc};
use serde_json::{json, Value};
use tracing::warn;

use crate::api::error::ApiResult;
use crate::api::models::{
    CommodityAnalysisRequest, CorridorCompareRequest, CorridorRequest, CounterpartyRequest,
    CounterpartySearchQuery, SdDeltaRequest, SignalsQuery,
};
use crate::api::state::SharedState;
use crate::domain::{CanonicalShipment, RawRecord, TradeType};
use crate::intelligence::{round1, round2, sort_feed, PartyField, TradeSignal};
use crate::normalize::NormalizationPipeline;
use crate::reference::{entry_by_id, priority_corridors, taxonomy};
use crate::upstream::{CallKind, QueryBuilder};

const MAX_SIGNAL_LIMIT: usize = 100;
const ANOMALY_LOOKBACK_MONTHS: u64 = 12;

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn records_for_origin(
    records: &[CanonicalShipment],
    origin: &str,
) -> Vec<CanonicalShipment> {
    records
        .iter()
        .filter(|r| r.origin_country.as_deref() == Some(origin))
        .cloned()
        .collect()
}

// ── Signal feed ──────────────────────────────────────────────────

/// GET /intelligence/signals — the aggregated feed, sorted by severity then
/// recency, truncated to the requested size.
pub async fn get_signals(
    State(state): State<SharedState>,
    Query(query): Query<SignalsQuery>,
) -> ApiResult<Json<Value>> {
    let reference = today();
    let week_ago = reference - Days::new(7);
    let mut feed: Vec<TradeSignal> = Vec::new();

    for entry in taxonomy() {
        let records = state.store.records(entry.hct_id).await?;
        if records.is_empty() {
            continue;
        }

        // Price movement per origin
        let mut origins: Vec<String> = records
            .iter()
            .filter_map(|r| r.origin_country.clone())
            .collect();
        origins.sort();
        origins.dedup();

        for origin in &origins {
            let origin_records = records_for_origin(&records, origin);
            let current = state.ipc.compute(&origin_records, Some(reference));
            let previous = state.ipc.compute(&origin_records, Some(week_ago));
            if let Some(mut signal) =
                state
                    .signals
                    .from_ipc_change(&current, &previous, entry.hct_name, origin, reference)
            {
                signal.hct_id = Some(entry.hct_id.to_string());
                feed.push(signal);
            }
        }

        // Flow velocity per watched corridor
        for corridor in priority_corridors()
            .iter()
            .filter(|c| c.commodity == entry.hct_id)
        {
            let corridor_records: Vec<CanonicalShipment> = records
                .iter()
                .filter(|r| {
                    r.origin_country
                        .as_deref()
                        .map(|o| corridor.origins.iter().any(|c| *c == o))
                        .unwrap_or(false)
                })
                .cloned()
                .collect();
            let fvi = state.fvi.compute_seasonally_adjusted(
                &corridor_records,
                entry.hct_id,
                Some(reference),
            );
            if let Some(mut signal) = state.signals.from_fvi(&fvi, corridor.name, reference) {
                signal.hct_id = Some(entry.hct_id.to_string());
                feed.push(signal);
            }
        }

        // Counterparty anomalies on the buyer side
        let anomalies = state.counterparty.detect_anomalies(
            &records,
            &records,
            PartyField::Consignee,
            ANOMALY_LOOKBACK_MONTHS,
            reference,
        );
        for anomaly in &anomalies {
            let mut signal = state.signals.from_counterparty(anomaly, reference);
            signal.hct_id = Some(entry.hct_id.to_string());
            feed.push(signal);
        }
    }

    sort_feed(&mut feed);
    let total = feed.len();
    feed.truncate(query.limit.min(MAX_SIGNAL_LIMIT));

    Ok(Json(json!({ "signals": feed, "total": total })))
}

// ── Commodity views ──────────────────────────────────────────────

/// GET /intelligence/commodities — all tracked commodities with quick stats.
pub async fn list_commodities(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let reference = today();
    let mut result = Vec::new();

    for entry in taxonomy() {
        let records = state.store.records(entry.hct_id).await?;
        let ipc = if records.is_empty() {
            None
        } else {
            Some(state.ipc.compute(&records, Some(reference)))
        };

        result.push(json!({
            "hct_id": entry.hct_id,
            "hct_name": entry.hct_name,
            "hct_group": entry.hct_group,
            "hct_supergroup": entry.hct_supergroup,
            "record_count": records.len(),
            "current_price_usd": ipc.as_ref().and_then(|i| i.price_usd_per_mt),
            "price_confidence": ipc
                .as_ref()
                .map(|i| i.confidence)
                .unwrap_or(crate::intelligence::PriceConfidence::None),
            "quality_grades": entry.quality_grades,
        }));
    }

    Ok(Json(json!({ "commodities": result })))
}

/// POST /intelligence/commodity/deep-dive — the full single-commodity view:
/// price by grade and origin, week-over-week momentum, enriched top
/// counterparties, the IPC series, and the volume summary.
pub async fn commodity_deep_dive(
    State(state): State<SharedState>,
    Json(request): Json<CommodityAnalysisRequest>,
) -> ApiResult<Json<Value>> {
    request.check()?;

    let records = state.store.records(&request.hct_id).await?;
    let filtered: Vec<CanonicalShipment> = records
        .into_iter()
        .filter(|r| {
            request.origin_countries.is_empty()
                || r.origin_country
                    .as_deref()
                    .map(|o| request.origin_countries.iter().any(|c| c == o))
                    .unwrap_or(false)
        })
        .filter(|r| {
            request.destination_countries.is_empty()
                || r.destination_country
                    .as_deref()
                    .map(|d| request.destination_countries.iter().any(|c| c == d))
                    .unwrap_or(false)
        })
        .collect();

    let entry = entry_by_id(&request.hct_id);
    let in_period: Vec<&CanonicalShipment> = filtered
        .iter()
        .filter(|r| {
            r.trade_date
                .map(|d| d >= request.start_date && d <= request.end_date)
                .unwrap_or(false)
        })
        .collect();

    // Price by grade × origin: volume-weighted where tonnage is known
    #[derive(Default)]
    struct Segment {
        total_value: f64,
        total_mt: f64,
        shipments: usize,
        prices: Vec<f64>,
    }
    let mut segments: HashMap<(String, String), Segment> = HashMap::new();
    for record in &in_period {
        let grade = record.quality_estimate.grade.clone();
        let origin = record
            .origin_country
            .clone()
            .unwrap_or_else(|| "Unknown".to_string());
        let segment = segments.entry((grade, origin)).or_default();
        segment.total_mt += record.quantity_mt.unwrap_or(0.0);
        segment.total_value += record.fob_usd_total.unwrap_or(0.0);
        segment.shipments += 1;
        if let Some(price) = record.fob_usd_per_mt {
            if record.price_status == crate::domain::PriceStatus::Normal {
                segment.prices.push(price);
            }
        }
    }

    let mut segment_rows: Vec<_> = segments.into_iter().collect();
    segment_rows.sort_by(|a, b| b.1.total_mt.total_cmp(&a.1.total_mt));
    let price_by_grade: Vec<Value> = segment_rows
        .into_iter()
        .map(|((grade, origin), seg)| {
            let avg_price = if seg.total_mt > 0.0 && seg.total_value > 0.0 {
                Some(round2(seg.total_value / seg.total_mt))
            } else if !seg.prices.is_empty() {
                Some(round2(seg.prices.iter().sum::<f64>() / seg.prices.len() as f64))
            } else {
                None
            };
            let price_range = if seg.prices.len() >= 2 {
                let min = seg.prices.iter().cloned().fold(f64::INFINITY, f64::min);
                let max = seg.prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
                Some(json!({ "min": round2(min), "max": round2(max) }))
            } else {
                None
            };
            json!({
                "grade": grade,
                "origin": origin,
                "fob_usd_per_mt": avg_price,
                "volume_mt": round2(seg.total_mt),
                "shipments": seg.shipments,
                "price_range": price_range,
            })
        })
        .collect();

    // Week-over-week volume momentum in plain language
    let recent_cutoff = request.end_date - Days::new(7);
    let prior_start = request.end_date - Days::new(14);
    let mut vol_recent = 0.0;
    let mut vol_prior = 0.0;
    let mut ship_recent = 0usize;
    let mut ship_prior = 0usize;
    for record in &filtered {
        let Some(date) = record.trade_date else { continue };
        let qty = record.quantity_mt.unwrap_or(0.0);
        if date > recent_cutoff && date <= request.end_date {
            vol_recent += qty;
            ship_recent += 1;
        } else if date > prior_start && date <= recent_cutoff {
            vol_prior += qty;
            ship_prior += 1;
        }
    }

    let momentum_pct = if vol_prior > 0.0 {
        Some(round1((vol_recent - vol_prior) / vol_prior * 100.0))
    } else {
        None
    };
    let (momentum_signal, momentum_text) = match momentum_pct {
        Some(pct) if pct > 20.0 => (
            "ACCELERATING",
            format!("Shipments surging — up {pct}% vs prior week"),
        ),
        Some(pct) if pct > 5.0 => (
            "PICKING_UP",
            format!("Shipments picking up — {pct}% above prior week"),
        ),
        Some(pct) if pct > -5.0 => (
            "STEADY",
            "Shipment pace steady week-over-week".to_string(),
        ),
        Some(pct) if pct > -20.0 => (
            "SLOWING",
            format!("Shipments slowing — down {}% vs prior week", pct.abs()),
        ),
        Some(pct) => (
            "DROPPING",
            format!("Shipments dropping — down {}% vs prior week", pct.abs()),
        ),
        None => (
            "INSUFFICIENT_DATA",
            "Not enough data to compare week-over-week".to_string(),
        ),
    };

    let volume_momentum = json!({
        "recent_7d_mt": round2(vol_recent),
        "prior_7d_mt": round2(vol_prior),
        "recent_7d_shipments": ship_recent,
        "prior_7d_shipments": ship_prior,
        "change_pct": momentum_pct,
        "signal": momentum_signal,
        "description": momentum_text,
        "recent_period": format!("{} to {}", recent_cutoff, request.end_date),
        "prior_period": format!("{} to {}", prior_start, recent_cutoff),
    });

    let top_buyers = enrich_counterparties(&in_period, PartyField::Consignee);
    let top_sellers = enrich_counterparties(&in_period, PartyField::Consignor);

    let ipc_series =
        state
            .ipc
            .compute_time_series(&filtered, request.start_date, request.end_date);
    let current_ipc = state.ipc.compute(&filtered, Some(request.end_date));
    let volume_summary =
        state
            .sd
            .compute_cumulative_flows(&filtered, request.start_date, request.end_date, None);

    Ok(Json(json!({
        "commodity": {
            "hct_id": request.hct_id,
            "hct_name": entry.map(|e| e.hct_name).unwrap_or("Unknown"),
            "hct_group": entry.map(|e| e.hct_group).unwrap_or("Unknown"),
        },
        "period": { "start": request.start_date, "end": request.end_date },
        "price_by_grade": price_by_grade,
        "volume_momentum": volume_momentum,
        "top_buyers": top_buyers,
        "top_sellers": top_sellers,
        "current_ipc": current_ipc,
        "ipc_series": ipc_series,
        "volume_summary": volume_summary,
    })))
}

/// Counterparty list with the quality grades and origins each party trades.
fn enrich_counterparties(records: &[&CanonicalShipment], party_field: PartyField) -> Vec<Value> {
    #[derive(Default)]
    struct Party {
        volume_mt: f64,
        value_usd: f64,
        shipments: usize,
        grades: HashMap<String, usize>,
        origins: HashMap<String, f64>,
        prices: Vec<f64>,
    }

    let mut parties: HashMap<String, Party> = HashMap::new();
    for record in records {
        let name = match party_field {
            PartyField::Consignee => record.consignee.clone(),
            PartyField::Consignor => record.consignor.clone(),
        }
        .unwrap_or_else(|| "Unknown".to_string());

        let party = parties.entry(name).or_default();
        party.volume_mt += record.quantity_mt.unwrap_or(0.0);
        party.value_usd += record.fob_usd_total.unwrap_or(0.0);
        party.shipments += 1;
        if let Some(price) = record.fob_usd_per_mt {
            if record.price_status == crate::domain::PriceStatus::Normal {
                party.prices.push(price);
            }
        }
        *party
            .grades
            .entry(record.quality_estimate.grade.clone())
            .or_default() += 1;
        if let Some(origin) = &record.origin_country {
            *party.origins.entry(origin.clone()).or_default() +=
                record.quantity_mt.unwrap_or(0.0);
        }
    }

    let total_volume: f64 = parties.values().map(|p| p.volume_mt).sum();

    let mut rows: Vec<(String, Party)> = parties.into_iter().collect();
    rows.sort_by(|a, b| b.1.volume_mt.total_cmp(&a.1.volume_mt));

    rows.into_iter()
        .take(10)
        .map(|(entity, party)| {
            let avg_price = if party.volume_mt > 0.0 && party.value_usd > 0.0 {
                Some(round2(party.value_usd / party.volume_mt))
            } else if !party.prices.is_empty() {
                Some(round2(
                    party.prices.iter().sum::<f64>() / party.prices.len() as f64,
                ))
            } else {
                None
            };

            let mut grades: Vec<_> = party.grades.into_iter().collect();
            grades.sort_by(|a, b| b.1.cmp(&a.1));
            let mut origins: Vec<_> = party.origins.into_iter().collect();
            origins.sort_by(|a, b| b.1.total_cmp(&a.1));

            json!({
                "entity": entity,
                "volume_mt": round2(party.volume_mt),
                "value_usd": round2(party.value_usd),
                "shipments": party.shipments,
                "market_share_pct": if total_volume > 0.0 {
                    round1(party.volume_mt / total_volume * 100.0)
                } else {
                    0.0
                },
                "avg_price_per_mt": avg_price,
                "top_grades": grades
                    .into_iter()
                    .take(3)
                    .map(|(grade, count)| json!({ "grade": grade, "count": count }))
                    .collect::<Vec<_>>(),
                "top_origins": origins
                    .into_iter()
                    .take(3)
                    .map(|(country, volume)| {
                        json!({ "country": country, "volume_mt": round1(volume) })
                    })
                    .collect::<Vec<_>>(),
            })
        })
        .collect()
}

// ── Corridor explorer ────────────────────────────────────────────

/// GET /intelligence/corridors — watched corridors with current FOB.
pub async fn list_corridors(State(state): State<SharedState>) -> ApiResult<Json<Value>> {
    let mut result = Vec::new();

    for corridor in priority_corridors() {
        let records = state.store.records(corridor.commodity).await?;
        let corridor_records: Vec<CanonicalShipment> = records
            .iter()
            .filter(|r| {
                r.origin_country
                    .as_deref()
                    .map(|o| corridor.origins.iter().any(|c| *c == o))
                    .unwrap_or(false)
            })
            .cloned()
            .collect();

        let ipc = if corridor_records.is_empty() {
            None
        } else {
            Some(state.ipc.compute(&corridor_records, None))
        };

        result.push(json!({
            "name": corridor.name,
            "commodity": corridor.commodity,
            "origins": corridor.origins,
            "origin_port": corridor.origin_port,
            "dest_port": corridor.dest_port,
            "record_count": corridor_records.len(),
            "current_fob": ipc.as_ref().and_then(|i| i.price_usd_per_mt),
            "price_confidence": ipc
                .as_ref()
                .map(|i| i.confidence)
                .unwrap_or(crate::intelligence::PriceConfidence::None),
        }));
    }

    Ok(Json(json!({ "corridors": result })))
}

/// POST /intelligence/corridor/analyze — FOB, freight, insurance, port
/// charges, and implied CIF for one corridor.
pub async fn analyze_corridor(
    State(state): State<SharedState>,
    Json(request): Json<CorridorRequest>,
) -> ApiResult<Json<Value>> {
    request.check()?;
    let records = state.store.records(&request.hct_id).await?;
    let fab = state.corridor.compute_fab(
        &records,
        &request.origin_country,
        &request.origin_port,
        &request.dest_port,
        request.target_date,
    );
    Ok(Json(serde_json::to_value(fab)?))
}

/// POST /intelligence/corridor/compare — several origins to one destination.
pub async fn compare_corridors(
    State(state): State<SharedState>,
    Json(request): Json<CorridorCompareRequest>,
) -> ApiResult<Json<Value>> {
    request.check()?;
    let records = state.store.records(&request.hct_id).await?;
    let comparison = state.corridor.compare_origins(
        &records,
        &request.origins,
        &request.dest_port,
        request.target_date,
    );
    Ok(Json(serde_json::to_value(comparison)?))
}

/// GET /intelligence/arbitrage/:hct_id — inter-origin FOB spreads.
pub async fn arbitrage_scan(
    State(state): State<SharedState>,
    Path(hct_id): Path<String>,
) -> ApiResult<Json<Value>> {
    let records = state.store.records(&hct_id).await?;

    let mut origins: Vec<String> = priority_corridors()
        .iter()
        .filter(|c| c.commodity == hct_id)
        .flat_map(|c| c.origins.iter().map(|o| o.to_string()))
        .collect();
    origins.sort();
    origins.dedup();

    let opportunities = state.corridor.find_arbitrage(&records, &origins, None);
    Ok(Json(json!({
        "commodity": hct_id,
        "opportunities": opportunities,
    })))
}

// ── Counterparty intelligence ────────────────────────────────────

/// POST /intelligence/counterparty/market-shares
pub async fn counterparty_market_shares(
    State(state): State<SharedState>,
    Json(request): Json<CounterpartyRequest>,
) -> ApiResult<Json<Value>> {
    request.check()?;
    let records = state.store.records(&request.hct_id).await?;
    let shares = state.counterparty.compute_market_shares(
        &records,
        request.party_type,
        request.start_date,
        request.end_date,
        request.top_n,
    );
    Ok(Json(serde_json::to_value(shares)?))
}

/// POST /intelligence/counterparty/anomalies
pub async fn counterparty_anomalies(
    State(state): State<SharedState>,
    Json(request): Json<CounterpartyRequest>,
) -> ApiResult<Json<Value>> {
    request.check()?;
    let records = state.store.records(&request.hct_id).await?;
    let anomalies = state.counterparty.detect_anomalies(
        &records,
        &records,
        request.party_type,
        ANOMALY_LOOKBACK_MONTHS,
        today(),
    );
    Ok(Json(json!({ "anomalies": anomalies })))
}

/// GET /intelligence/counterparty/search — full intelligence profile for a
/// party name. Cached records first; one budgeted upstream pull when the
/// local data is thin.
pub async fn counterparty_search(
    State(state): State<SharedState>,
    Query(query): Query<CounterpartySearchQuery>,
) -> ApiResult<Json<Value>> {
    let trade_type = query.checked_trade_type()?;
    let name_upper = query.name.trim().to_uppercase();
    let reference = today();
    let start = reference - Days::new(query.months * 30);
    let party_field = match trade_type {
        TradeType::Import => PartyField::Consignee,
        TradeType::Export => PartyField::Consignor,
    };

    // Step 1: everything we already hold on this party
    let mut local_records: Vec<CanonicalShipment> = state
        .store
        .all_records()
        .await?
        .into_iter()
        .filter(|r| {
            let party = match party_field {
                PartyField::Consignee => r.consignee.as_deref(),
                PartyField::Consignor => r.consignor.as_deref(),
            };
            party
                .map(|p| p.to_uppercase().contains(&name_upper))
                .unwrap_or(false)
        })
        .collect();

    // Step 2: thin local data and budget available — one upstream page
    let mut api_fetched = false;
    if local_records.len() < 10 && state.budget.can_search() {
        let payload = QueryBuilder::counterparty_query(
            start,
            reference,
            trade_type,
            &query.trade_country,
            &name_upper,
        );
        match state.client.shipment_page(&payload, CallKind::Search).await {
            Ok(response) => {
                let normalizer = NormalizationPipeline::new();
                let raw_records: Vec<RawRecord> = response
                    .get("data")
                    .and_then(Value::as_array)
                    .map(|rows| rows.iter().cloned().map(RawRecord::from_value).collect())
                    .unwrap_or_default();
                for raw in &raw_records {
                    match normalizer.normalize(raw, trade_type, &query.trade_country) {
                        Ok(shipment) => {
                            if let Some(hct_id) = shipment.hct_id.clone() {
                                state.store.append(&hct_id, vec![shipment.clone()]).await?;
                            }
                            local_records.push(shipment);
                        }
                        Err(e) => warn!(error = %e, "Skipping malformed counterparty record"),
                    }
                }
                api_fetched = true;
            }
            Err(e) => warn!(error = %e, "Counterparty upstream fetch failed, using cache only"),
        }
    }

    if local_records.is_empty() {
        return Ok(Json(json!({
            "status": "NOT_FOUND",
            "query": query.name,
            "message": format!(
                "No shipments found for '{}' in {} {}",
                query.name, query.trade_country, trade_type.as_str()
            ),
            "budget": state.budget.status(),
        })));
    }

    // Step 3: the profile
    local_records.sort_by(|a, b| b.trade_date.cmp(&a.trade_date));
    let recent_shipments: Vec<Value> = local_records
        .iter()
        .take(20)
        .map(|r| {
            json!({
                "date": r.trade_date,
                "commodity": r.hct_name,
                "origin": r.origin_country,
                "destination": r.destination_country,
                "quantity_mt": r.quantity_mt,
                "fob_usd_per_mt": r.fob_usd_per_mt,
                "quality": r.quality_estimate,
                "port": r.origin_port.as_deref().or(r.destination_port.as_deref()),
            })
        })
        .collect();

    let prices_with_date: Vec<(NaiveDate, f64)> = local_records
        .iter()
        .filter_map(|r| Some((r.trade_date?, r.fob_usd_per_mt?)))
        .collect();
    let avg_price = if prices_with_date.is_empty() {
        None
    } else {
        Some(prices_with_date.iter().map(|(_, p)| p).sum::<f64>() / prices_with_date.len() as f64)
    };
    let price_series: Vec<Value> = prices_with_date
        .iter()
        .map(|(date, price)| json!({ "date": date, "price_usd_per_mt": round2(*price) }))
        .collect();

    let mut volume_by_month: HashMap<String, f64> = HashMap::new();
    for record in &local_records {
        if let Some(date) = record.trade_date {
            let key = date.format("%Y-%m").to_string();
            *volume_by_month.entry(key).or_default() += record.quantity_mt.unwrap_or(0.0);
        }
    }
    let mut volume_series: Vec<(String, f64)> = volume_by_month.into_iter().collect();
    volume_series.sort_by(|a, b| a.0.cmp(&b.0));

    // Hunger signal: recent months against the older run rate
    let mut hunger_signal = "STABLE";
    if volume_series.len() >= 3 {
        let recent_avg: f64 =
            volume_series[volume_series.len() - 2..].iter().map(|(_, v)| v).sum::<f64>() / 2.0;
        let older: &[(String, f64)] = &volume_series[..volume_series.len() - 2];
        let older_avg: f64 = older.iter().map(|(_, v)| v).sum::<f64>() / older.len().max(1) as f64;
        if older_avg > 0.0 {
            let ratio = recent_avg / older_avg;
            if ratio > 1.3 {
                hunger_signal = "INCREASING";
            } else if ratio < 0.7 {
                hunger_signal = "DECREASING";
            }
        }
    }

    #[derive(Default)]
    struct CommodityAgg {
        name: String,
        volume_mt: f64,
        value_usd: f64,
        shipments: usize,
    }
    let mut commodity_volumes: HashMap<String, CommodityAgg> = HashMap::new();
    for record in &local_records {
        let key = record.hct_id.clone().unwrap_or_else(|| "UNKNOWN".to_string());
        let agg = commodity_volumes.entry(key).or_default();
        agg.name = record.hct_name.clone();
        agg.volume_mt += record.quantity_mt.unwrap_or(0.0);
        agg.value_usd += record.fob_usd_total.unwrap_or(0.0);
        agg.shipments += 1;
    }
    let mut commodity_breakdown: Vec<(String, CommodityAgg)> =
        commodity_volumes.into_iter().collect();
    commodity_breakdown.sort_by(|a, b| b.1.volume_mt.total_cmp(&a.1.volume_mt));

    let geo_field_is_origin = trade_type == TradeType::Import;
    let mut geo_volumes: HashMap<String, f64> = HashMap::new();
    for record in &local_records {
        let geo = if geo_field_is_origin {
            record.origin_country.clone()
        } else {
            record.destination_country.clone()
        }
        .unwrap_or_else(|| "UNKNOWN".to_string());
        *geo_volumes.entry(geo).or_default() += record.quantity_mt.unwrap_or(0.0);
    }
    let total_volume: f64 = local_records.iter().filter_map(|r| r.quantity_mt).sum();
    let total_value: f64 = local_records.iter().filter_map(|r| r.fob_usd_total).sum();
    let mut geography_breakdown: Vec<(String, f64)> = geo_volumes.into_iter().collect();
    geography_breakdown.sort_by(|a, b| b.1.total_cmp(&a.1));

    // One market comparison is enough for the overview
    let mut market_comparison = Vec::new();
    for record in &local_records {
        let Some(hct_id) = &record.hct_id else { continue };
        let market_records = state.store.records(hct_id).await?;
        if market_records.is_empty() {
            continue;
        }
        let market_ipc = state.ipc.compute(&market_records, None);
        if let Some(market_price) = market_ipc.price_usd_per_mt {
            market_comparison.push(json!({
                "commodity": record.hct_name,
                "hct_id": hct_id,
                "market_price": market_price,
                "party_avg_price": avg_price.map(round2),
            }));
            break;
        }
    }

    let mut quality_counts: HashMap<String, usize> = HashMap::new();
    for record in &local_records {
        *quality_counts
            .entry(record.quality_estimate.grade.clone())
            .or_default() += 1;
    }
    let mut quality_breakdown: Vec<(String, usize)> = quality_counts.into_iter().collect();
    quality_breakdown.sort_by(|a, b| b.1.cmp(&a.1));

    let counterparty_name = local_records
        .first()
        .and_then(|r| match party_field {
            PartyField::Consignee => r.consignee.clone(),
            PartyField::Consignor => r.consignor.clone(),
        })
        .unwrap_or_else(|| query.name.clone());

    Ok(Json(json!({
        "status": "SUCCESS",
        "query": query.name,
        "counterparty_name": counterparty_name,
        "trade_type": trade_type.as_str(),
        "trade_country": query.trade_country,
        "data_source": if api_fetched { "api" } else { "cache" },
        "summary": {
            "total_shipments": local_records.len(),
            "total_volume_mt": round2(total_volume),
            "total_value_usd": round2(total_value),
            "avg_price_per_mt": avg_price.map(round2),
            "date_range": {
                "earliest": local_records.last().and_then(|r| r.trade_date),
                "latest": local_records.first().and_then(|r| r.trade_date),
            },
            "hunger_signal": hunger_signal,
        },
        "price_series": price_series,
        "volume_series": volume_series
            .iter()
            .map(|(month, volume)| json!({ "month": month, "volume_mt": round2(*volume) }))
            .collect::<Vec<_>>(),
        "commodity_breakdown": commodity_breakdown
            .into_iter()
            .map(|(hct_id, agg)| json!({
                "hct_id": hct_id,
                "name": agg.name,
                "volume_mt": round2(agg.volume_mt),
                "value_usd": round2(agg.value_usd),
                "shipments": agg.shipments,
            }))
            .collect::<Vec<_>>(),
        "geography_breakdown": geography_breakdown
            .into_iter()
            .map(|(country, volume)| json!({
                "country": country,
                "volume_mt": round2(volume),
                "share_pct": if total_volume > 0.0 {
                    round1(volume / total_volume * 100.0)
                } else {
                    0.0
                },
            }))
            .collect::<Vec<_>>(),
        "quality_breakdown": quality_breakdown
            .into_iter()
            .map(|(grade, count)| json!({ "grade": grade, "count": count }))
            .collect::<Vec<_>>(),
        "market_comparison": market_comparison,
        "recent_shipments": recent_shipments,
        "budget": state.budget.status(),
    })))
}

// ── S&D tracker ──────────────────────────────────────────────────

/// POST /intelligence/sd/delta
pub async fn sd_delta(
    State(state): State<SharedState>,
    Json(request): Json<SdDeltaRequest>,
) -> ApiResult<Json<Value>> {
    request.check()?;
    let records = state.store.records(&request.hct_id).await?;
    let delta = state.sd.compute_sd_delta(
        &records,
        request.consensus_annual_mt,
        request.crop_year_start,
        request.target_date,
    );
    Ok(Json(serde_json::to_value(delta)?))
}

/// POST /intelligence/sd/flows
pub async fn sd_flows(
    State(state): State<SharedState>,
    Json(request): Json<CommodityAnalysisRequest>,
) -> ApiResult<Json<Value>> {
    request.check()?;
    let records = state.store.records(&request.hct_id).await?;
    let filtered: Vec<CanonicalShipment> = records
        .into_iter()
        .filter(|r| {
            request.origin_countries.is_empty()
                || r.origin_country
                    .as_deref()
                    .map(|o| request.origin_countries.iter().any(|c| c == o))
                    .unwrap_or(false)
        })
        .collect();
    let flows =
        state
            .sd
            .compute_cumulative_flows(&filtered, request.start_date, request.end_date, None);
    Ok(Json(serde_json::to_value(flows)?))
}

// ── Budget ───────────────────────────────────────────────────────

/// GET /intelligence/budget
pub async fn api_budget(State(state): State<SharedState>) -> Json<Value> {
    Json(json!(state.budget.status()))
}

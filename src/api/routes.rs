//! Route table for the dispatch surface.

use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers::{data, intelligence};
use super::state::SharedState;

async fn root() -> Json<serde_json::Value> {
    Json(json!({
        "name": "Hectar Commodity Flow Intelligence",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "operational",
    }))
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}

/// Build the application router.
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        // Data management
        .route("/api/v1/data/query/shipments", post(data::query_shipments))
        .route("/api/v1/data/harvest/run", post(data::run_harvest))
        .route("/api/v1/data/harvest/jobs", get(data::list_harvest_jobs))
        .route(
            "/api/v1/data/harvest/search",
            post(data::harvest_by_commodity_name),
        )
        .route("/api/v1/data/ground-price", post(data::submit_ground_price))
        .route("/api/v1/data/ground-prices", get(data::list_ground_prices))
        .route("/api/v1/data/records/stats", get(data::record_stats))
        // Intelligence
        .route("/api/v1/intelligence/signals", get(intelligence::get_signals))
        .route(
            "/api/v1/intelligence/commodities",
            get(intelligence::list_commodities),
        )
        .route(
            "/api/v1/intelligence/commodity/deep-dive",
            post(intelligence::commodity_deep_dive),
        )
        .route(
            "/api/v1/intelligence/corridors",
            get(intelligence::list_corridors),
        )
        .route(
            "/api/v1/intelligence/corridor/analyze",
            post(intelligence::analyze_corridor),
        )
        .route(
            "/api/v1/intelligence/corridor/compare",
            post(intelligence::compare_corridors),
        )
        .route(
            "/api/v1/intelligence/counterparty/market-shares",
            post(intelligence::counterparty_market_shares),
        )
        .route(
            "/api/v1/intelligence/counterparty/anomalies",
            post(intelligence::counterparty_anomalies),
        )
        .route(
            "/api/v1/intelligence/counterparty/search",
            get(intelligence::counterparty_search),
        )
        .route("/api/v1/intelligence/sd/delta", post(intelligence::sd_delta))
        .route("/api/v1/intelligence/sd/flows", post(intelligence::sd_flows))
        .route(
            "/api/v1/intelligence/arbitrage/:hct_id",
            get(intelligence::arbitrage_scan),
        )
        .route("/api/v1/intelligence/budget", get(intelligence::api_budget))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Rate-limited, retrying, auto-paginating client for the upstream trade API.
//!
//! Concurrency contract: at most N in-flight requests per process, enforced
//! by a semaphore, with a minimum interval between consecutive submissions.
//! The permit is held across retries so a flapping upstream cannot multiply
//! in-flight load.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::{Mutex, Semaphore};
use tracing::{info, warn};

use crate::config::Config;
use crate::domain::{RawRecord, Result, TradeOpsError};

use super::budget::{BudgetTracker, CallKind};
use super::token::TokenManager;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const MAX_ATTEMPTS: u32 = 4;

/// Fields the upstream variously uses for the total record count.
const TOTAL_FIELDS: [&str; 3] = [
    "total_search_records",
    "total_response_records",
    "total_records",
];

pub struct UpstreamClient {
    http: reqwest::Client,
    base_url: String,
    tokens: Arc<TokenManager>,
    budget: Arc<BudgetTracker>,
    semaphore: Semaphore,
    min_interval: Duration,
    page_size: usize,
    /// One "second" of backoff; shrunk in tests
    backoff_unit: Duration,
    pace_gate: Mutex<Option<Instant>>,
}

impl UpstreamClient {
    pub fn new(
        config: &Config,
        tokens: Arc<TokenManager>,
        budget: Arc<BudgetTracker>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(config.api_max_concurrent_requests)
            .build()
            .map_err(|e| TradeOpsError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.eximpedia_base_url.clone(),
            tokens,
            budget,
            semaphore: Semaphore::new(config.api_max_concurrent_requests.max(1)),
            min_interval: Duration::from_secs_f64(config.api_min_request_interval.max(0.0)),
            page_size: config.page_size(),
            backoff_unit: Duration::from_secs(1),
            pace_gate: Mutex::new(None),
        })
    }

    /// Shrink the backoff unit so retry schedules run in milliseconds.
    /// Intended for tests against a mock upstream.
    pub fn with_backoff_unit(mut self, unit: Duration) -> Self {
        self.backoff_unit = unit;
        self
    }

    /// Fetch a single page of shipment records.
    pub async fn shipment_page(&self, payload: &Value, kind: CallKind) -> Result<Value> {
        self.request("/trade/shipment", payload, kind).await
    }

    /// Fetch every page of shipment records for a query, repaginating until
    /// the accumulated count reaches the advertised total or a page comes
    /// back empty.
    pub async fn shipment_all(&self, mut payload: Value, kind: CallKind) -> Result<Vec<RawRecord>> {
        let mut all_records: Vec<RawRecord> = Vec::new();
        let mut total_expected: Option<u64> = None;
        let mut page: u64 = 1;

        loop {
            payload["page_no"] = Value::from(page);
            payload["page_size"] = Value::from(self.page_size as u64);

            let response = self.request("/trade/shipment", &payload, kind).await?;

            let records: Vec<RawRecord> = response
                .get("data")
                .and_then(Value::as_array)
                .map(|rows| rows.iter().cloned().map(RawRecord::from_value).collect())
                .unwrap_or_default();

            if total_expected.is_none() {
                total_expected = Some(
                    TOTAL_FIELDS
                        .iter()
                        .find_map(|field| response.get(*field).and_then(value_as_u64))
                        .unwrap_or(0),
                );
            }

            let fetched = records.len();
            all_records.extend(records);

            info!(
                page,
                fetched,
                accumulated = all_records.len(),
                total = total_expected.unwrap_or(0),
                "Fetched shipment page"
            );

            if all_records.len() as u64 >= total_expected.unwrap_or(0) || fetched == 0 {
                break;
            }
            page += 1;
        }

        Ok(all_records)
    }

    /// One authenticated request with the full recovery ladder: 401 refreshes
    /// the token inside the same attempt slot, 429 and transport errors back
    /// off exponentially, anything else non-200 is terminal.
    async fn request(&self, endpoint: &str, payload: &Value, kind: CallKind) -> Result<Value> {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| TradeOpsError::UpstreamApi {
                status: 0,
                body: "client semaphore closed".to_string(),
            })?;

        self.pace().await;

        let url = format!("{}{}", self.base_url, endpoint);
        let mut token = self.tokens.get_token().await?;
        let mut attempt: u32 = 1;
        let mut consecutive_unauthorized: u32 = 0;
        let mut rate_limit_body: Option<String> = None;

        while attempt <= MAX_ATTEMPTS {
            let send_result = self
                .http
                .post(&url)
                .bearer_auth(&token)
                .json(payload)
                .send()
                .await;

            match send_result {
                Ok(response) => {
                    let status = response.status().as_u16();

                    if status == 401 {
                        consecutive_unauthorized += 1;
                        if consecutive_unauthorized >= 2 {
                            return Err(TradeOpsError::TokenRefreshFailed {
                                attempts: consecutive_unauthorized,
                            });
                        }
                        // Token expired mid-flight: refresh and retry without
                        // consuming the attempt budget
                        warn!(endpoint, "Unauthorized upstream response, refreshing token");
                        self.tokens.invalidate().await;
                        token = self.tokens.get_token().await?;
                        continue;
                    }
                    consecutive_unauthorized = 0;

                    if status == 429 {
                        let body = response.text().await.unwrap_or_default();
                        let backoff = self.backoff_unit * (1u32 << (attempt + 1));
                        warn!(
                            endpoint,
                            attempt,
                            backoff_ms = backoff.as_millis() as u64,
                            "Rate limited by upstream, backing off"
                        );
                        rate_limit_body = Some(body);
                        tokio::time::sleep(backoff).await;
                        attempt += 1;
                        continue;
                    }

                    if status != 200 {
                        let body = response.text().await.unwrap_or_default();
                        return Err(TradeOpsError::UpstreamApi { status, body });
                    }

                    self.budget.record_call(kind);
                    return Ok(response.json::<Value>().await?);
                }
                Err(transport) => {
                    if attempt >= MAX_ATTEMPTS {
                        return Err(TradeOpsError::UpstreamApi {
                            status: 0,
                            body: format!("transport error after {attempt} attempts: {transport}"),
                        });
                    }
                    let backoff = self.backoff_unit * (1u32 << attempt);
                    warn!(
                        endpoint,
                        attempt,
                        error = %transport,
                        "Upstream request failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        }

        Err(TradeOpsError::UpstreamApi {
            status: 429,
            body: rate_limit_body.unwrap_or_else(|| "rate limit retries exhausted".to_string()),
        })
    }

    /// Enforce the minimum gap between consecutive request submissions.
    /// Holding the gate across the sleep serializes submission times.
    async fn pace(&self) {
        let mut gate = self.pace_gate.lock().await;
        if let Some(last) = *gate {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *gate = Some(Instant::now());
    }
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_token(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/oauth2/token"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "AccessToken": "test-token" })),
            )
            .mount(server)
            .await;
    }

    fn client(server: &MockServer, budget: Arc<BudgetTracker>) -> UpstreamClient {
        let config = Config {
            eximpedia_base_url: server.uri(),
            eximpedia_client_id: "id".to_string(),
            eximpedia_client_secret: "secret".to_string(),
            api_min_request_interval: 0.0,
            ..Config::default()
        };
        let tokens = Arc::new(
            TokenManager::new(
                server.uri(),
                "id",
                "secret",
                Duration::from_secs(300),
                budget.clone(),
            )
            .unwrap(),
        );
        UpstreamClient::new(&config, tokens, budget)
            .unwrap()
            .with_backoff_unit(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_auto_pagination_until_total() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        for page in 1..=3u64 {
            let rows: Vec<_> = (0..2)
                .map(|i| json!({ "DECLARATION_NO": format!("D{page}-{i}") }))
                .collect();
            Mock::given(method("POST"))
                .and(path("/trade/shipment"))
                .and(body_partial_json(json!({ "page_no": page })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "data": rows,
                    "total_search_records": 6,
                })))
                .mount(&server)
                .await;
        }

        let budget = Arc::new(BudgetTracker::new());
        let client = client(&server, budget.clone());
        let records = client
            .shipment_all(json!({ "TradeType": "IMPORT" }), CallKind::Harvest)
            .await
            .unwrap();

        assert_eq!(records.len(), 6);
        assert_eq!(budget.status().harvest_calls_used, 3);
    }

    #[tokio::test]
    async fn test_pagination_stops_on_empty_page() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/trade/shipment"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [],
                "total_response_records": 500,
            })))
            .mount(&server)
            .await;

        let client = client(&server, Arc::new(BudgetTracker::new()));
        let records = client
            .shipment_all(json!({}), CallKind::Search)
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[tokio::test]
    async fn test_unauthorized_refreshes_within_attempt() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/trade/shipment"))
            .respond_with(ResponseTemplate::new(401))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/trade/shipment"))
            .and(header("authorization", "Bearer test-token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": [], "total_records": 0 })),
            )
            .mount(&server)
            .await;

        let client = client(&server, Arc::new(BudgetTracker::new()));
        let page = client
            .shipment_page(&json!({}), CallKind::Harvest)
            .await
            .unwrap();
        assert_eq!(page["total_records"], 0);
    }

    #[tokio::test]
    async fn test_two_consecutive_unauthorized_is_terminal() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/trade/shipment"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = client(&server, Arc::new(BudgetTracker::new()));
        let err = client
            .shipment_page(&json!({}), CallKind::Harvest)
            .await
            .unwrap_err();
        assert!(matches!(err, TradeOpsError::TokenRefreshFailed { .. }));
    }

    #[tokio::test]
    async fn test_rate_limit_backs_off_and_recovers() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/trade/shipment"))
            .respond_with(ResponseTemplate::new(429))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/trade/shipment"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": [], "total_records": 0 })),
            )
            .mount(&server)
            .await;

        let client = client(&server, Arc::new(BudgetTracker::new()));
        assert!(client.shipment_page(&json!({}), CallKind::Harvest).await.is_ok());
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion_surfaces_429() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/trade/shipment"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let client = client(&server, Arc::new(BudgetTracker::new()));
        let err = client
            .shipment_page(&json!({}), CallKind::Harvest)
            .await
            .unwrap_err();
        match err {
            TradeOpsError::UpstreamApi { status, body } => {
                assert_eq!(status, 429);
                assert_eq!(body, "slow down");
            }
            other => panic!("expected UpstreamApi, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_other_non_200_is_terminal() {
        let server = MockServer::start().await;
        mount_token(&server).await;

        Mock::given(method("POST"))
            .and(path("/trade/shipment"))
            .respond_with(ResponseTemplate::new(400).set_body_string(
                "Data for India IMPORT is available from 2016-01-01T00:00:00Z to 2026-02-10T00:00:00Z",
            ))
            .mount(&server)
            .await;

        let client = client(&server, Arc::new(BudgetTracker::new()));
        let err = client
            .shipment_page(&json!({}), CallKind::Harvest)
            .await
            .unwrap_err();
        match err {
            TradeOpsError::UpstreamApi { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("available from"));
            }
            other => panic!("expected UpstreamApi, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_min_interval_paces_submissions() {
        let server = MockServer::start().await;
        mount_token(&server).await;
        Mock::given(method("POST"))
            .and(path("/trade/shipment"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": [], "total_records": 0 })),
            )
            .mount(&server)
            .await;

        let budget = Arc::new(BudgetTracker::new());
        let config = Config {
            eximpedia_base_url: server.uri(),
            api_min_request_interval: 0.05,
            ..Config::default()
        };
        let tokens = Arc::new(
            TokenManager::new(
                server.uri(),
                "id",
                "secret",
                Duration::from_secs(300),
                budget.clone(),
            )
            .unwrap(),
        );
        let client = UpstreamClient::new(&config, tokens, budget).unwrap();

        let started = Instant::now();
        client.shipment_page(&json!({}), CallKind::Harvest).await.unwrap();
        client.shipment_page(&json!({}), CallKind::Harvest).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));
    }
}

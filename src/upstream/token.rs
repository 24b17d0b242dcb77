//! OAuth token lifecycle for the upstream provider.
//!
//! One token manager exists per process. Tokens refresh shortly before
//! expiry so no request fails mid-flight, and at most one refresh runs at a
//! time — concurrent callers wait on the critical section and reuse the
//! fresh token.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::domain::{Result, TradeOpsError};

use super::budget::BudgetTracker;

const TOKEN_TTL: Duration = Duration::from_secs(3600);
const REFRESH_TIMEOUT: Duration = Duration::from_secs(30);
const REFRESH_ATTEMPTS: u32 = 3;

/// Plan constraints carried in the token payload; forwarded to the budget
/// tracker as the authoritative call counters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanConstraints {
    pub credit_points: Option<CreditPoints>,
    pub daily_limit_api: Option<DailyLimitApi>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreditPoints {
    pub total_consumed_credits: Option<u64>,
    pub total_alloted_credits: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DailyLimitApi {
    pub consumed_daily_limit_api: Option<u32>,
    pub daily_limit_api: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(rename = "AccessToken")]
    access_token: String,
    #[serde(default)]
    plan_constraints: Option<PlanConstraints>,
}

#[derive(Debug, Default)]
struct TokenState {
    token: Option<String>,
    expires_at: Option<Instant>,
}

impl TokenState {
    fn current(&self, buffer: Duration) -> Option<String> {
        let expires_at = self.expires_at?;
        let token = self.token.as_ref()?;
        if Instant::now() + buffer < expires_at {
            Some(token.clone())
        } else {
            None
        }
    }
}

/// Holds the one access credential for the process.
pub struct TokenManager {
    http: reqwest::Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    refresh_buffer: Duration,
    budget: Arc<BudgetTracker>,
    state: RwLock<TokenState>,
    refresh_lock: Mutex<()>,
}

impl TokenManager {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        refresh_buffer: Duration,
        budget: Arc<BudgetTracker>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REFRESH_TIMEOUT)
            .build()
            .map_err(|e| TradeOpsError::Config(format!("failed to build token client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            refresh_buffer,
            budget,
            state: RwLock::new(TokenState::default()),
            refresh_lock: Mutex::new(()),
        })
    }

    /// Return a valid access token, refreshing if necessary.
    pub async fn get_token(&self) -> Result<String> {
        if let Some(token) = self.state.read().await.current(self.refresh_buffer) {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;
        // Another caller may have refreshed while we waited
        if let Some(token) = self.state.read().await.current(self.refresh_buffer) {
            return Ok(token);
        }

        self.refresh_token().await
    }

    /// Force a refresh on the next `get_token` call.
    pub async fn invalidate(&self) {
        let mut state = self.state.write().await;
        state.token = None;
        state.expires_at = None;
    }

    async fn refresh_token(&self) -> Result<String> {
        info!("Refreshing upstream API token");

        for attempt in 1..=REFRESH_ATTEMPTS {
            match self.request_token().await {
                Ok(response) => {
                    if let Some(constraints) = &response.plan_constraints {
                        self.budget.update_from_token(constraints);
                    }

                    let mut state = self.state.write().await;
                    state.token = Some(response.access_token.clone());
                    state.expires_at = Some(Instant::now() + TOKEN_TTL);

                    info!("Token refreshed successfully");
                    return Ok(response.access_token);
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts = REFRESH_ATTEMPTS,
                        error = %e,
                        "Token refresh attempt failed"
                    );
                    if attempt < REFRESH_ATTEMPTS {
                        let backoff = Duration::from_secs(1 << attempt);
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }

        Err(TradeOpsError::TokenRefreshFailed {
            attempts: REFRESH_ATTEMPTS,
        })
    }

    async fn request_token(&self) -> Result<TokenResponse> {
        let response = self
            .http
            .post(format!("{}/oauth2/token", self.base_url))
            .json(&serde_json::json!({
                "client_id": self.client_id,
                "client_secret": self.client_secret,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TradeOpsError::UpstreamApi { status, body });
        }

        Ok(response.json::<TokenResponse>().await?)
    }
}

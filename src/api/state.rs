use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::domain::Result;
use crate::harvest::HarvestEngine;
use crate::intelligence::{
    CorridorAnalyzer, CounterpartyIntelligence, FlowVelocityIndex, ImpliedPriceCurve,
    SignalGenerator, SupplyDemandTracker,
};
use crate::store::{GroundPriceStore, InMemoryShipmentStore, ShipmentStore};
use crate::upstream::{BudgetTracker, TokenManager, UpstreamClient};

/// Everything the dispatch surface needs: the process singletons, the record
/// stores, and one instance of each stateless analytics engine.
pub struct AppState {
    pub config: Config,
    pub budget: Arc<BudgetTracker>,
    pub tokens: Arc<TokenManager>,
    pub client: Arc<UpstreamClient>,
    pub harvester: Arc<HarvestEngine>,
    pub store: Arc<dyn ShipmentStore>,
    pub ground_prices: GroundPriceStore,
    pub ipc: ImpliedPriceCurve,
    pub fvi: FlowVelocityIndex,
    pub sd: SupplyDemandTracker,
    pub counterparty: CounterpartyIntelligence,
    pub corridor: CorridorAnalyzer,
    pub signals: SignalGenerator,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    /// Wire the process: singletons first, then the client and harvester on
    /// top of them, then the engines.
    pub fn build(config: Config) -> Result<SharedState> {
        let budget = Arc::new(BudgetTracker::new());
        let tokens = Arc::new(TokenManager::new(
            config.eximpedia_base_url.clone(),
            config.eximpedia_client_id.clone(),
            config.eximpedia_client_secret.clone(),
            Duration::from_secs(config.token_refresh_buffer_seconds),
            budget.clone(),
        )?);
        let client = Arc::new(UpstreamClient::new(&config, tokens.clone(), budget.clone())?);
        let harvester = Arc::new(HarvestEngine::new(client.clone(), budget.clone()));

        Ok(Arc::new(Self {
            config,
            budget,
            tokens,
            client,
            harvester,
            store: Arc::new(InMemoryShipmentStore::new()),
            ground_prices: GroundPriceStore::new(),
            ipc: ImpliedPriceCurve::new(),
            fvi: FlowVelocityIndex::new(),
            sd: SupplyDemandTracker::new(),
            counterparty: CounterpartyIntelligence::new(),
            corridor: CorridorAnalyzer::new(),
            signals: SignalGenerator::new(),
        }))
    }
}

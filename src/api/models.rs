//! Request payloads for the dispatch surface. Validation happens at the
//! boundary; handlers receive already-checked values.

use chrono::NaiveDate;
use serde::Deserialize;
use validator::Validate;

use crate::domain::{Result, TradeOpsError, TradeType};
use crate::intelligence::{OriginSpec, PartyField};

fn validate<T: Validate>(value: &T) -> Result<()> {
    value
        .validate()
        .map_err(|e| TradeOpsError::Validation(e.to_string()))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ShipmentQueryRequest {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trade_type: String,
    #[validate(length(min = 2))]
    pub trade_country: String,
    #[serde(default)]
    pub hs_codes: Vec<u32>,
    #[serde(default)]
    pub products: Vec<String>,
    #[serde(default)]
    pub origin_countries: Vec<String>,
    #[serde(default)]
    pub destination_countries: Vec<String>,
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, max = 1000))]
    pub page_size: usize,
    #[serde(default = "default_page_no")]
    #[validate(range(min = 1))]
    pub page_no: usize,
}

fn default_page_size() -> usize {
    1000
}

fn default_page_no() -> usize {
    1
}

impl ShipmentQueryRequest {
    pub fn checked_trade_type(&self) -> Result<TradeType> {
        validate(self)?;
        TradeType::parse(&self.trade_type)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommodityAnalysisRequest {
    #[validate(length(min = 1))]
    pub hct_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub origin_countries: Vec<String>,
    #[serde(default)]
    pub destination_countries: Vec<String>,
}

impl CommodityAnalysisRequest {
    pub fn check(&self) -> Result<()> {
        validate(self)?;
        if self.end_date < self.start_date {
            return Err(TradeOpsError::Validation(
                "end_date must not precede start_date".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CorridorRequest {
    #[validate(length(min = 1))]
    pub hct_id: String,
    #[validate(length(min = 2))]
    pub origin_country: String,
    #[validate(length(min = 2))]
    pub origin_port: String,
    #[validate(length(min = 2))]
    pub dest_port: String,
    pub target_date: Option<NaiveDate>,
}

impl CorridorRequest {
    pub fn check(&self) -> Result<()> {
        validate(self)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CorridorCompareRequest {
    #[validate(length(min = 1))]
    pub hct_id: String,
    #[validate(length(min = 1))]
    pub origins: Vec<OriginSpec>,
    #[validate(length(min = 2))]
    pub dest_port: String,
    pub target_date: Option<NaiveDate>,
}

impl CorridorCompareRequest {
    pub fn check(&self) -> Result<()> {
        validate(self)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SdDeltaRequest {
    #[validate(length(min = 1))]
    pub hct_id: String,
    #[validate(range(min = 0.0))]
    pub consensus_annual_mt: f64,
    pub crop_year_start: NaiveDate,
    pub target_date: Option<NaiveDate>,
}

impl SdDeltaRequest {
    pub fn check(&self) -> Result<()> {
        validate(self)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CounterpartyRequest {
    #[validate(length(min = 1))]
    pub hct_id: String,
    #[serde(default = "default_party_type")]
    pub party_type: PartyField,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default = "default_top_n")]
    #[validate(range(min = 1, max = 50))]
    pub top_n: usize,
}

fn default_party_type() -> PartyField {
    PartyField::Consignee
}

fn default_top_n() -> usize {
    20
}

impl CounterpartyRequest {
    pub fn check(&self) -> Result<()> {
        validate(self)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HarvestRunRequest {
    pub job_name: Option<String>,
    pub priority: Option<u8>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CommoditySearchQuery {
    #[validate(length(min = 2))]
    pub commodity_name: String,
}

impl CommoditySearchQuery {
    pub fn check(&self) -> Result<()> {
        validate(self)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignalsQuery {
    #[serde(default = "default_signal_limit")]
    pub limit: usize,
}

fn default_signal_limit() -> usize {
    20
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroundPriceListQuery {
    pub hct_id: Option<String>,
    pub location: Option<String>,
    #[serde(default = "default_ground_price_limit")]
    pub limit: usize,
}

fn default_ground_price_limit() -> usize {
    50
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CounterpartySearchQuery {
    #[validate(length(min = 2))]
    pub name: String,
    #[serde(default = "default_search_country")]
    pub trade_country: String,
    #[serde(default = "default_search_trade_type")]
    pub trade_type: String,
    #[serde(default = "default_search_months")]
    #[validate(range(min = 1, max = 12))]
    pub months: u64,
}

fn default_search_country() -> String {
    "INDIA".to_string()
}

fn default_search_trade_type() -> String {
    "IMPORT".to_string()
}

fn default_search_months() -> u64 {
    6
}

impl CounterpartySearchQuery {
    pub fn checked_trade_type(&self) -> Result<TradeType> {
        validate(self)?;
        TradeType::parse(&self.trade_type)
    }
}

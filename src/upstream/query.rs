//! Builds well-formed upstream query payloads from high-level parameters.
//!
//! The upstream API is strict: at most five values per filter, page size
//! capped at 1000, and HS codes serialized as strings with their leading
//! zeros intact.

use chrono::NaiveDate;
use serde_json::{json, Value};

use crate::domain::TradeType;

const MAX_FILTER_VALUES: usize = 5;
const MAX_PAGE_SIZE: usize = 1000;

/// High-level parameters for a shipment query.
#[derive(Debug, Clone)]
pub struct ShipmentQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub trade_type: TradeType,
    pub trade_country: String,
    pub hs_codes: Vec<u32>,
    pub products: Vec<String>,
    pub origin_countries: Vec<String>,
    pub destination_countries: Vec<String>,
    pub origin_ports: Vec<String>,
    pub destination_ports: Vec<String>,
    pub consignees: Vec<String>,
    pub consignors: Vec<String>,
    pub page_size: usize,
    pub page_no: usize,
}

impl ShipmentQuery {
    pub fn new(
        start_date: NaiveDate,
        end_date: NaiveDate,
        trade_type: TradeType,
        trade_country: impl Into<String>,
    ) -> Self {
        Self {
            start_date,
            end_date,
            trade_type,
            trade_country: trade_country.into().to_uppercase(),
            hs_codes: Vec::new(),
            products: Vec::new(),
            origin_countries: Vec::new(),
            destination_countries: Vec::new(),
            origin_ports: Vec::new(),
            destination_ports: Vec::new(),
            consignees: Vec::new(),
            consignors: Vec::new(),
            page_size: MAX_PAGE_SIZE,
            page_no: 1,
        }
    }

}

/// Constructs upstream API payloads.
pub struct QueryBuilder;

impl QueryBuilder {
    /// Build the `/trade/shipment` payload.
    pub fn shipment_query(query: &ShipmentQuery) -> Value {
        let mut payload = json!({
            "DateRange": {
                "start_date": query.start_date.to_string(),
                "end_date": query.end_date.to_string(),
            },
            "TradeType": query.trade_type.as_str(),
            "TradeCountry": query.trade_country.to_uppercase(),
            "page_size": query.page_size.min(MAX_PAGE_SIZE),
            "page_no": query.page_no.max(1),
            "sort": "DATE",
            "sort_type": "desc",
        });

        // Primary search: HS codes when configured, product text otherwise
        if !query.hs_codes.is_empty() {
            payload["PrimarySearch"] = json!({
                "FILTER": "HS_CODE",
                "VALUES": query
                    .hs_codes
                    .iter()
                    .take(MAX_FILTER_VALUES)
                    .map(|c| Self::pad_hs_code(*c))
                    .collect::<Vec<_>>(),
                "SearchType": "CONTAIN",
            });
        } else if !query.products.is_empty() {
            payload["PrimarySearch"] = json!({
                "FILTER": "PRODUCT",
                "VALUES": query
                    .products
                    .iter()
                    .take(MAX_FILTER_VALUES)
                    .collect::<Vec<_>>(),
                "SearchType": "CONTAIN",
            });
        }

        let filters: [(&str, &Vec<String>); 6] = [
            ("ORIGIN_COUNTRY", &query.origin_countries),
            ("DESTINATION_COUNTRY", &query.destination_countries),
            ("ORIGIN_PORT", &query.origin_ports),
            ("DESTINATION_PORT", &query.destination_ports),
            ("CONSIGNEE", &query.consignees),
            ("CONSIGNOR", &query.consignors),
        ];

        let advance: Vec<Value> = filters
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(filter, values)| {
                json!({
                    "FILTER": filter,
                    "VALUES": values
                        .iter()
                        .take(MAX_FILTER_VALUES)
                        .map(|v| v.to_uppercase())
                        .collect::<Vec<_>>(),
                    "OPERATOR": "AND",
                })
            })
            .collect();

        if !advance.is_empty() {
            payload["AdvanceSearch"] = Value::Array(advance);
        }

        payload
    }

    /// Build a counterparty search payload: the party name is the primary
    /// filter instead of a commodity key.
    pub fn counterparty_query(
        start_date: NaiveDate,
        end_date: NaiveDate,
        trade_type: TradeType,
        trade_country: &str,
        party_name: &str,
    ) -> Value {
        let filter = match trade_type {
            TradeType::Import => "CONSIGNEE",
            TradeType::Export => "CONSIGNOR",
        };
        json!({
            "DateRange": {
                "start_date": start_date.to_string(),
                "end_date": end_date.to_string(),
            },
            "TradeType": trade_type.as_str(),
            "TradeCountry": trade_country.to_uppercase(),
            "page_size": MAX_PAGE_SIZE,
            "page_no": 1,
            "sort": "DATE",
            "sort_type": "desc",
            "PrimarySearch": {
                "FILTER": filter,
                "VALUES": [party_name.to_uppercase()],
                "SearchType": "CONTAIN",
            },
        })
    }

    /// HS codes as strings, zero-padded back to at least four digits.
    fn pad_hs_code(code: u32) -> String {
        if code < 1000 {
            format!("{code:04}")
        } else {
            code.to_string()
        }
    }
}

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;
use validator::Validate;

/// A ground-collected price observation submitted through the API, as
/// received from the field (broker quote, mandi price, port survey).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct GroundPriceInput {
    #[validate(length(min = 1))]
    pub hct_id: String,
    #[validate(range(min = 0.0))]
    pub price: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_unit")]
    pub unit: String,
    #[serde(default = "default_incoterm")]
    pub incoterm: String,
    #[validate(length(min = 1))]
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_grade: Option<String>,
    pub source_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    pub observation_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

fn default_currency() -> String {
    "USD".to_string()
}

fn default_unit() -> String {
    "MT".to_string()
}

fn default_incoterm() -> String {
    "FOB".to_string()
}

/// A stored observation: the input plus an assigned id and verification flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundPriceObservation {
    pub observation_id: String,
    #[serde(flatten)]
    pub input: GroundPriceInput,
    pub verified: bool,
}

/// In-memory list of ground price observations, newest last.
#[derive(Debug, Default)]
pub struct GroundPriceStore {
    inner: RwLock<Vec<GroundPriceObservation>>,
}

impl GroundPriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept an observation, assigning its id. Observations enter
    /// unverified; verification is a manual follow-up.
    pub async fn submit(&self, input: GroundPriceInput) -> GroundPriceObservation {
        let observation = GroundPriceObservation {
            observation_id: format!("GP-{}", &Uuid::new_v4().simple().to_string()[..12]),
            input,
            verified: false,
        };
        self.inner.write().await.push(observation.clone());
        observation
    }

    /// The most recent observations matching the filters, up to `limit`.
    pub async fn list(
        &self,
        hct_id: Option<&str>,
        location: Option<&str>,
        limit: usize,
    ) -> (Vec<GroundPriceObservation>, usize) {
        let inner = self.inner.read().await;
        let filtered: Vec<_> = inner
            .iter()
            .filter(|obs| hct_id.map_or(true, |id| obs.input.hct_id == id))
            .filter(|obs| {
                location.map_or(true, |loc| {
                    obs.input
                        .location
                        .to_uppercase()
                        .contains(&loc.to_uppercase())
                })
            })
            .cloned()
            .collect();

        let total = filtered.len();
        let start = total.saturating_sub(limit);
        (filtered[start..].to_vec(), total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(hct_id: &str, location: &str) -> GroundPriceInput {
        GroundPriceInput {
            hct_id: hct_id.to_string(),
            price: 1450.0,
            currency: default_currency(),
            unit: default_unit(),
            incoterm: default_incoterm(),
            location: location.to_string(),
            quality_grade: None,
            source_type: "broker".to_string(),
            source_name: None,
            observation_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_submit_assigns_id_and_unverified() {
        let store = GroundPriceStore::new();
        let obs = store.submit(input("HCT-0801-RCN-INSHELL", "ABIDJAN")).await;
        assert!(obs.observation_id.starts_with("GP-"));
        assert_eq!(obs.observation_id.len(), 15);
        assert!(!obs.verified);
    }

    #[tokio::test]
    async fn test_list_filters_and_limits() {
        let store = GroundPriceStore::new();
        for i in 0..5 {
            let mut price = input("HCT-0801-RCN-INSHELL", "ABIDJAN");
            price.price = 1400.0 + i as f64;
            store.submit(price).await;
        }
        store.submit(input("HCT-1207-SESAME", "LAGOS")).await;

        let (rcn, total) = store.list(Some("HCT-0801-RCN-INSHELL"), None, 3).await;
        assert_eq!(total, 5);
        assert_eq!(rcn.len(), 3);
        // Newest observations survive the limit
        assert_eq!(rcn.last().unwrap().input.price, 1404.0);

        let (lagos, _) = store.list(None, Some("lagos"), 50).await;
        assert_eq!(lagos.len(), 1);
    }
}

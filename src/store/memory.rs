use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{CanonicalShipment, Result};

use super::ShipmentStore;

#[derive(Debug, Default)]
struct CommodityRecords {
    records: Vec<CanonicalShipment>,
    seen_ids: HashSet<String>,
}

/// The in-memory record store. One entry per commodity, append-only, with
/// dedup on insertion.
#[derive(Debug, Default)]
pub struct InMemoryShipmentStore {
    inner: RwLock<HashMap<String, CommodityRecords>>,
}

impl InMemoryShipmentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ShipmentStore for InMemoryShipmentStore {
    async fn append(&self, hct_id: &str, records: Vec<CanonicalShipment>) -> Result<usize> {
        let mut inner = self.inner.write().await;
        let entry = inner.entry(hct_id.to_string()).or_default();

        let mut inserted = 0;
        for record in records {
            if entry.seen_ids.insert(record.record_id.clone()) {
                entry.records.push(record);
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn records(&self, hct_id: &str) -> Result<Vec<CanonicalShipment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .get(hct_id)
            .map(|entry| entry.records.clone())
            .unwrap_or_default())
    }

    async fn all_records(&self) -> Result<Vec<CanonicalShipment>> {
        let inner = self.inner.read().await;
        Ok(inner
            .values()
            .flat_map(|entry| entry.records.iter().cloned())
            .collect())
    }

    async fn counts(&self) -> Result<HashMap<String, usize>> {
        let inner = self.inner.read().await;
        Ok(inner
            .iter()
            .map(|(hct_id, entry)| (hct_id.clone(), entry.records.len()))
            .collect())
    }
}

//! In-process stores: the shipment record store keyed by commodity, and the
//! ground-price observation list.
//!
//! `ShipmentStore` is the adapter seam for durable storage: append-only by
//! commodity, dedup-by-record-id, full-range scan. The in-memory
//! implementation is the current production configuration.

pub mod ground;
pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::{CanonicalShipment, Result};

#[async_trait]
pub trait ShipmentStore: Send + Sync {
    /// Append records for a commodity, dropping any whose `record_id` is
    /// already present (first write wins). Returns the number actually
    /// inserted. The append is atomic: a cancelled caller never leaves a
    /// partial batch.
    async fn append(&self, hct_id: &str, records: Vec<CanonicalShipment>) -> Result<usize>;

    /// Every stored record for a commodity, in insertion order.
    async fn records(&self, hct_id: &str) -> Result<Vec<CanonicalShipment>>;

    /// Records across all commodities.
    async fn all_records(&self) -> Result<Vec<CanonicalShipment>>;

    /// Per-commodity record counts.
    async fn counts(&self) -> Result<HashMap<String, usize>>;
}

pub use ground::{GroundPriceInput, GroundPriceObservation, GroundPriceStore};
pub use memory::InMemoryShipmentStore;

use std::collections::HashMap;

use async_trait::async_trait;
use colisage_core::context::CheckoutContext;
use colisage_core::error::ShippingError;
use colisage_core::models::{OrderLineItem, ShipmentRecord};
use colisage_core::repository::{OrderStore, TrackingStore};
use tokio::sync::RwLock;
use uuid::Uuid;

/// In-memory order store with optimistic revision checking on save.
pub struct InMemoryOrderStore {
    line_items: RwLock<HashMap<Uuid, Vec<OrderLineItem>>>,
    records: RwLock<HashMap<Uuid, ShipmentRecord>>,
    contexts: RwLock<HashMap<Uuid, CheckoutContext>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self {
            line_items: RwLock::new(HashMap::new()),
            records: RwLock::new(HashMap::new()),
            contexts: RwLock::new(HashMap::new()),
        }
    }

    /// Seed one order with its lines, checkout context and a fresh shipment
    /// record.
    pub async fn seed_order(
        &self,
        order_id: Uuid,
        lines: Vec<OrderLineItem>,
        ctx: CheckoutContext,
    ) {
        self.line_items.write().await.insert(order_id, lines);
        self.contexts.write().await.insert(order_id, ctx);
        self.records
            .write()
            .await
            .insert(order_id, ShipmentRecord::new(order_id));
    }
}

impl Default for InMemoryOrderStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn load_order_line_items(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<OrderLineItem>, ShippingError> {
        self.line_items
            .read()
            .await
            .get(&order_id)
            .cloned()
            .ok_or(ShippingError::OrderNotFound(order_id))
    }

    async fn load_shipment_record(&self, order_id: Uuid) -> Result<ShipmentRecord, ShippingError> {
        self.records
            .read()
            .await
            .get(&order_id)
            .cloned()
            .ok_or(ShippingError::OrderNotFound(order_id))
    }

    async fn save_shipment_record(&self, record: &ShipmentRecord) -> Result<(), ShippingError> {
        let mut records = self.records.write().await;
        let stored = records
            .get(&record.order_id)
            .ok_or(ShippingError::OrderNotFound(record.order_id))?;

        if stored.revision != record.revision {
            return Err(ShippingError::RevisionConflict {
                order_id: record.order_id,
                expected: record.revision,
                found: stored.revision,
            });
        }

        let mut saved = record.clone();
        saved.revision += 1;
        records.insert(record.order_id, saved);
        Ok(())
    }

    async fn load_checkout_context(
        &self,
        order_id: Uuid,
    ) -> Result<CheckoutContext, ShippingError> {
        self.contexts
            .read()
            .await
            .get(&order_id)
            .cloned()
            .ok_or(ShippingError::OrderNotFound(order_id))
    }
}

/// In-memory label tracking store.
pub struct InMemoryTrackingStore {
    entries: RwLock<HashMap<String, TrackingEntry>>,
}

#[derive(Debug, Clone)]
struct TrackingEntry {
    #[allow(dead_code)]
    order_id: Uuid,
    status: Option<String>,
}

impl InMemoryTrackingStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// All label ids registered so far, in no particular order.
    pub async fn registered_labels(&self) -> Vec<String> {
        self.entries.read().await.keys().cloned().collect()
    }
}

impl Default for InMemoryTrackingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackingStore for InMemoryTrackingStore {
    async fn register_label(&self, order_id: Uuid, label_id: &str) -> Result<(), ShippingError> {
        self.entries.write().await.insert(
            label_id.to_string(),
            TrackingEntry {
                order_id,
                status: None,
            },
        );
        Ok(())
    }

    async fn get_status(&self, label_id: &str) -> Result<Option<String>, ShippingError> {
        Ok(self
            .entries
            .read()
            .await
            .get(label_id)
            .and_then(|entry| entry.status.clone()))
    }

    async fn update_status(&self, label_id: &str, status: &str) -> Result<(), ShippingError> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .get_mut(label_id)
            .ok_or_else(|| ShippingError::LabelNotRegistered(label_id.to_string()))?;
        entry.status = Some(status.to_string());
        Ok(())
    }
}

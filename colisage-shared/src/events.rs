use uuid::Uuid;

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ItemsDistributedEvent {
    pub order_id: Uuid,
    pub package_count: usize,
    pub unallocatable_items: Vec<Uuid>,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct LabelPlacedEvent {
    pub order_id: Uuid,
    pub package_id: Uuid,
    pub label_id: String,
    pub timestamp: i64,
}

#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub struct ManifestGeneratedEvent {
    pub order_ids: Vec<Uuid>,
    pub way_bill: String,
    pub timestamp: i64,
}

/// Envelope fanned out on the shipment service broadcast channel.
#[derive(Debug, serde::Serialize, serde::Deserialize, Clone)]
pub enum ShipmentEvent {
    ItemsDistributed(ItemsDistributedEvent),
    LabelPlaced(LabelPlacedEvent),
    ManifestGenerated(ManifestGeneratedEvent),
}

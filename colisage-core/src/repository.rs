use async_trait::async_trait;
use uuid::Uuid;

use crate::context::CheckoutContext;
use crate::error::ShippingError;
use crate::models::{OrderLineItem, ShipmentRecord};

/// Access to the host platform's order data. The engine never touches the
/// underlying storage format directly.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn load_order_line_items(
        &self,
        order_id: Uuid,
    ) -> Result<Vec<OrderLineItem>, ShippingError>;

    async fn load_shipment_record(&self, order_id: Uuid) -> Result<ShipmentRecord, ShippingError>;

    /// Persist the record. Implementations must reject the save when the
    /// stored revision no longer matches the record's.
    async fn save_shipment_record(&self, record: &ShipmentRecord) -> Result<(), ShippingError>;

    /// Delivery mode and carrier-facing context captured at checkout.
    async fn load_checkout_context(&self, order_id: Uuid)
        -> Result<CheckoutContext, ShippingError>;
}

/// Decouples label issuance from later asynchronous tracking polling.
#[async_trait]
pub trait TrackingStore: Send + Sync {
    async fn register_label(&self, order_id: Uuid, label_id: &str) -> Result<(), ShippingError>;

    async fn get_status(&self, label_id: &str) -> Result<Option<String>, ShippingError>;

    async fn update_status(&self, label_id: &str, status: &str) -> Result<(), ShippingError>;
}

use std::sync::Arc;

use colisage_core::carrier::{CarrierAccount, CarrierApi};
use colisage_core::error::{ShippingError, ShippingResult};
use colisage_core::models::{FulfillmentState, Item, OrderLineItem, Package, ShipmentRecord};
use colisage_core::repository::{OrderStore, TrackingStore};
use colisage_shared::events::{
    ItemsDistributedEvent, LabelPlacedEvent, ManifestGeneratedEvent,
};
use colisage_shared::{Dimensions, ShipmentEvent};
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::allocator;
use crate::labels::LabelOrchestrator;
use crate::manifest::ManifestOrchestrator;
use crate::tiers;

/// Outcome of one distribution run, as handed back to the invoking layer.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DistributionReport {
    pub record: ShipmentRecord,
    pub items: Vec<Item>,
    /// Items no package could take; see `AllocationOutcome::unallocatable`.
    pub unallocatable: Vec<Uuid>,
}

/// Facade over the whole engine: loads through the `OrderStore`, applies the
/// state-machine guards, runs the allocator and the orchestrators, and saves
/// with optimistic revision checking. Wired once at process start with its
/// collaborators injected.
pub struct ShipmentService {
    orders: Arc<dyn OrderStore>,
    carrier: Arc<dyn CarrierApi>,
    tracking: Arc<dyn TrackingStore>,
    labels: LabelOrchestrator,
    manifests: ManifestOrchestrator,
    account: CarrierAccount,
    events: broadcast::Sender<ShipmentEvent>,
}

impl ShipmentService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        carrier: Arc<dyn CarrierApi>,
        tracking: Arc<dyn TrackingStore>,
        account: CarrierAccount,
    ) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            labels: LabelOrchestrator::new(carrier.clone(), tracking.clone(), account.clone()),
            manifests: ManifestOrchestrator::new(carrier.clone()),
            orders,
            carrier,
            tracking,
            account,
            events,
        }
    }

    /// Subscribe to shipment lifecycle events.
    pub fn subscribe(&self) -> broadcast::Receiver<ShipmentEvent> {
        self.events.subscribe()
    }

    /// Current derived item view for an order.
    pub async fn items(&self, order_id: Uuid) -> ShippingResult<Vec<Item>> {
        let lines = self.orders.load_order_line_items(order_id).await?;
        let record = self.orders.load_shipment_record(order_id).await?;
        Ok(Item::derive(&lines, &record.packages))
    }

    /// Run the greedy allocator over the order's remaining quantities.
    pub async fn distribute(&self, order_id: Uuid) -> ShippingResult<DistributionReport> {
        let lines = self.orders.load_order_line_items(order_id).await?;
        let mut record = self.orders.load_shipment_record(order_id).await?;
        let ctx = self.orders.load_checkout_context(order_id).await?;

        record.ensure_packages_editable()?;

        let items = Item::derive(&lines, &record.packages);
        let ceiling = tiers::resolve_ceiling(&items, &ctx.delivery_mode);
        let outcome = allocator::allocate(items, std::mem::take(&mut record.packages), ceiling);
        record.packages = outcome.packages;

        if !outcome.unallocatable.is_empty() {
            tracing::warn!(
                order_id = %order_id,
                items = ?outcome.unallocatable,
                ceiling_g = ceiling,
                "items too heavy for any package remain undistributed"
            );
        }

        let fully_distributed = outcome.items.iter().all(|i| i.remaining_quantity == 0);
        if fully_distributed {
            record.advance(FulfillmentState::ItemsDistributed);
        }

        record.touch();
        self.orders.save_shipment_record(&record).await?;

        if fully_distributed {
            let _ = self.events.send(ShipmentEvent::ItemsDistributed(ItemsDistributedEvent {
                order_id,
                package_count: record.packages.len(),
                unallocatable_items: outcome.unallocatable.clone(),
                timestamp: chrono::Utc::now().timestamp(),
            }));
        }

        Ok(DistributionReport {
            record,
            items: outcome.items,
            unallocatable: outcome.unallocatable,
        })
    }

    /// Open a new, empty package by hand.
    pub async fn add_package(&self, order_id: Uuid) -> ShippingResult<ShipmentRecord> {
        let mut record = self.orders.load_shipment_record(order_id).await?;
        record.ensure_packages_editable()?;

        record.packages.push(Package::new());
        record.touch();
        self.orders.save_shipment_record(&record).await?;
        Ok(record)
    }

    /// Delete a package. Only legal while it carries no label.
    pub async fn remove_package(
        &self,
        order_id: Uuid,
        package_id: Uuid,
    ) -> ShippingResult<ShipmentRecord> {
        let mut record = self.orders.load_shipment_record(order_id).await?;
        record.ensure_packages_editable()?;

        let package = record.package(&package_id)?;
        if package.is_labeled() {
            return Err(ShippingError::PackageLocked(package_id));
        }
        record.packages.retain(|p| p.id != package_id);
        record.touch();
        self.orders.save_shipment_record(&record).await?;
        Ok(record)
    }

    /// Set package dimensions, rejecting physically oversize parcels before
    /// anything is persisted.
    pub async fn set_package_dimensions(
        &self,
        order_id: Uuid,
        package_id: Uuid,
        dimensions: Dimensions,
    ) -> ShippingResult<ShipmentRecord> {
        let mut record = self.orders.load_shipment_record(order_id).await?;
        record.ensure_packages_editable()?;

        let side = dimensions.longest_side_cm();
        if side >= self.account.max_side_cm {
            return Err(ShippingError::OversizePackage {
                package_id,
                side_cm: side,
                limit_cm: self.account.max_side_cm,
            });
        }

        let package = record.package_mut(&package_id)?;
        if package.is_labeled() {
            return Err(ShippingError::PackageLocked(package_id));
        }
        package.dimensions = dimensions;
        record.touch();
        self.orders.save_shipment_record(&record).await?;
        Ok(record)
    }

    /// Manually place units of one item into one package.
    pub async fn move_item_into_package(
        &self,
        order_id: Uuid,
        package_id: Uuid,
        item_id: Uuid,
        quantity: u32,
    ) -> ShippingResult<ShipmentRecord> {
        let lines = self.orders.load_order_line_items(order_id).await?;
        let mut record = self.orders.load_shipment_record(order_id).await?;
        record.ensure_packages_editable()?;

        let items = Item::derive(&lines, &record.packages);
        let item = items
            .iter()
            .find(|i| i.id == item_id)
            .ok_or(ShippingError::ItemNotFound(item_id))?;
        if item.remaining_quantity < quantity {
            return Err(ShippingError::QuantityUnavailable {
                item_id,
                requested: quantity,
                available: item.remaining_quantity,
            });
        }
        let unit_weight_g = item.unit_weight_g;

        let package = record.package_mut(&package_id)?;
        if package.is_labeled() {
            return Err(ShippingError::PackageLocked(package_id));
        }
        package.place(item_id, unit_weight_g, quantity);

        self.finish_manual_edit(order_id, &lines, &mut record).await?;
        Ok(record)
    }

    /// Manually take units of one item back out of a package.
    pub async fn take_item_out_of_package(
        &self,
        order_id: Uuid,
        package_id: Uuid,
        item_id: Uuid,
        quantity: u32,
    ) -> ShippingResult<ShipmentRecord> {
        let lines = self.orders.load_order_line_items(order_id).await?;
        let mut record = self.orders.load_shipment_record(order_id).await?;
        record.ensure_packages_editable()?;

        let items = Item::derive(&lines, &record.packages);
        let unit_weight_g = items
            .iter()
            .find(|i| i.id == item_id)
            .map(|i| i.unit_weight_g)
            .ok_or(ShippingError::ItemNotFound(item_id))?;

        let package = record.package_mut(&package_id)?;
        if package.is_labeled() {
            return Err(ShippingError::PackageLocked(package_id));
        }
        package.take(&item_id, unit_weight_g, quantity)?;

        self.finish_manual_edit(order_id, &lines, &mut record).await?;
        Ok(record)
    }

    /// Reserve labels for every package and persist the result.
    pub async fn place_labels(&self, order_id: Uuid) -> ShippingResult<ShipmentRecord> {
        let mut record = self.orders.load_shipment_record(order_id).await?;
        let ctx = self.orders.load_checkout_context(order_id).await?;

        self.labels.place_labels(&mut record, &ctx).await?;
        self.orders.save_shipment_record(&record).await?;

        let timestamp = chrono::Utc::now().timestamp();
        for package in &record.packages {
            if let Some(label_id) = &package.shipping_label {
                let _ = self.events.send(ShipmentEvent::LabelPlaced(LabelPlacedEvent {
                    order_id,
                    package_id: package.id,
                    label_id: label_id.clone(),
                    timestamp,
                }));
            }
        }
        Ok(record)
    }

    /// Generate the transport manifest for one labeled order.
    pub async fn generate_manifest(&self, order_id: Uuid) -> ShippingResult<String> {
        let mut record = self.orders.load_shipment_record(order_id).await?;
        let ctx = self.orders.load_checkout_context(order_id).await?;

        let way_bill = self.manifests.generate(&mut record, &ctx).await?;
        self.orders.save_shipment_record(&record).await?;

        let _ = self
            .events
            .send(ShipmentEvent::ManifestGenerated(ManifestGeneratedEvent {
                order_ids: vec![order_id],
                way_bill: way_bill.clone(),
                timestamp: chrono::Utc::now().timestamp(),
            }));
        Ok(way_bill)
    }

    /// Bulk manifest: validates every order up front, issues one combined
    /// carrier request, then persists each record sequentially.
    pub async fn generate_manifest_bulk(&self, order_ids: &[Uuid]) -> ShippingResult<String> {
        let mut batch = Vec::with_capacity(order_ids.len());
        for &order_id in order_ids {
            let record = self.orders.load_shipment_record(order_id).await?;
            let ctx = self.orders.load_checkout_context(order_id).await?;
            batch.push((record, ctx));
        }

        let way_bill = self.manifests.generate_bulk(&mut batch).await?;

        for (record, _) in &batch {
            self.orders.save_shipment_record(record).await?;
        }

        let _ = self
            .events
            .send(ShipmentEvent::ManifestGenerated(ManifestGeneratedEvent {
                order_ids: order_ids.to_vec(),
                way_bill: way_bill.clone(),
                timestamp: chrono::Utc::now().timestamp(),
            }));
        Ok(way_bill)
    }

    /// Pull current carrier tracking statuses onto the order's packages and
    /// into the tracking store.
    pub async fn refresh_tracking(&self, order_id: Uuid) -> ShippingResult<ShipmentRecord> {
        let mut record = self.orders.load_shipment_record(order_id).await?;
        let label_ids = record.label_ids();
        if label_ids.is_empty() {
            return Ok(record);
        }

        let statuses = self.carrier.fetch_tracking_statuses(&label_ids).await?;
        for package in record.packages.iter_mut() {
            if let Some(label_id) = &package.shipping_label {
                if let Some(status) = statuses.get(label_id) {
                    package.shipping_status = Some(status.clone());
                    self.tracking.update_status(label_id, status).await?;
                }
            }
        }

        record.touch();
        self.orders.save_shipment_record(&record).await?;
        Ok(record)
    }

    /// Shared tail of the manual-edit operations: transition when nothing
    /// remains to distribute, then persist.
    async fn finish_manual_edit(
        &self,
        order_id: Uuid,
        lines: &[OrderLineItem],
        record: &mut ShipmentRecord,
    ) -> ShippingResult<()> {
        let items = Item::derive(lines, &record.packages);
        let fully_distributed = items.iter().all(|i| i.remaining_quantity == 0);
        if fully_distributed {
            record.advance(FulfillmentState::ItemsDistributed);
        }

        record.touch();
        self.orders.save_shipment_record(record).await?;

        if fully_distributed {
            let _ = self.events.send(ShipmentEvent::ItemsDistributed(ItemsDistributedEvent {
                order_id,
                package_count: record.packages.len(),
                unallocatable_items: Vec::new(),
                timestamp: chrono::Utc::now().timestamp(),
            }));
        }
        Ok(())
    }
}

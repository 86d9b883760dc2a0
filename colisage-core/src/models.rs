use chrono::{DateTime, Utc};
use colisage_shared::{weight, Dimensions};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::error::{ShippingError, ShippingResult};

/// Shipment lifecycle state. The derived ordering is the lifecycle ordering;
/// state only ever moves forward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FulfillmentState {
    ItemsPendingDistribution,
    ItemsDistributed,
    LabelsPlaced,
    ManifestGenerated,
}

impl FulfillmentState {
    pub fn label(&self) -> &'static str {
        match self {
            FulfillmentState::ItemsPendingDistribution => "ITEMS_PENDING_DISTRIBUTION",
            FulfillmentState::ItemsDistributed => "ITEMS_DISTRIBUTED",
            FulfillmentState::LabelsPlaced => "LABELS_PLACED",
            FulfillmentState::ManifestGenerated => "MANIFEST_GENERATED",
        }
    }
}

/// A raw order line as stored by the host platform, weight in whatever unit
/// the catalog uses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineItem {
    pub id: Uuid,
    pub name: String,
    pub unit_weight: f64,
    pub weight_unit: String,
    pub ordered_quantity: u32,
}

/// Allocation view of an order line: canonical unit weight plus the quantity
/// not yet placed into any package.
///
/// Items are never stored; they are recomputed from the order lines and the
/// current package contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: Uuid,
    pub name: String,
    pub unit_weight_g: f64,
    pub ordered_quantity: u32,
    pub remaining_quantity: u32,
}

impl Item {
    /// Rebuild the item view: remaining = ordered minus quantity already
    /// placed across all packages, never below zero.
    pub fn derive(lines: &[OrderLineItem], packages: &[Package]) -> Vec<Item> {
        lines
            .iter()
            .map(|line| {
                let placed: u32 = packages.iter().map(|p| p.quantity_of(&line.id)).sum();
                Item {
                    id: line.id,
                    name: line.name.clone(),
                    unit_weight_g: weight::to_grams(line.unit_weight, &line.weight_unit),
                    ordered_quantity: line.ordered_quantity,
                    remaining_quantity: line.ordered_quantity.saturating_sub(placed),
                }
            })
            .collect()
    }
}

/// One physical shipment unit grouping some of an order's items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Package {
    pub id: Uuid,
    /// item id -> unit count. BTreeMap keeps iteration deterministic.
    pub items: BTreeMap<Uuid, u32>,
    pub weight_g: f64,
    pub dimensions: Dimensions,
    pub shipping_label: Option<String>,
    pub shipping_label_document_url: Option<String>,
    pub shipping_status: Option<String>,
    pub estimated_shipping_price: Option<f64>,
}

impl Package {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            items: BTreeMap::new(),
            weight_g: 0.0,
            dimensions: Dimensions::default(),
            shipping_label: None,
            shipping_label_document_url: None,
            shipping_status: None,
            estimated_shipping_price: None,
        }
    }

    /// Once a label exists the package contents and dimensions are frozen.
    pub fn is_labeled(&self) -> bool {
        self.shipping_label.is_some()
    }

    pub fn quantity_of(&self, item_id: &Uuid) -> u32 {
        self.items.get(item_id).copied().unwrap_or(0)
    }

    /// Place `quantity` units of an item. Callers enforce the label freeze
    /// and the weight ceiling.
    pub fn place(&mut self, item_id: Uuid, unit_weight_g: f64, quantity: u32) {
        *self.items.entry(item_id).or_insert(0) += quantity;
        self.weight_g += unit_weight_g * f64::from(quantity);
    }

    /// Take `quantity` units of an item back out.
    pub fn take(&mut self, item_id: &Uuid, unit_weight_g: f64, quantity: u32) -> ShippingResult<()> {
        let held = self.quantity_of(item_id);
        if held < quantity {
            return Err(ShippingError::QuantityUnavailable {
                item_id: *item_id,
                requested: quantity,
                available: held,
            });
        }
        if held == quantity {
            self.items.remove(item_id);
        } else if let Some(count) = self.items.get_mut(item_id) {
            *count -= quantity;
        }
        self.weight_g -= unit_weight_g * f64::from(quantity);
        Ok(())
    }
}

impl Default for Package {
    fn default() -> Self {
        Self::new()
    }
}

/// The shipment side of one order: its packages, lifecycle state and way
/// bill, owned 1:1 by the order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipmentRecord {
    pub order_id: Uuid,
    pub state: FulfillmentState,
    pub packages: Vec<Package>,
    pub way_bill: Option<String>,
    /// Optimistic concurrency counter, incremented by the store on save.
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShipmentRecord {
    pub fn new(order_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            order_id,
            state: FulfillmentState::ItemsPendingDistribution,
            packages: Vec::new(),
            way_bill: None,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move the lifecycle forward. Regressions are ignored: state is
    /// monotonic by construction.
    pub fn advance(&mut self, to: FulfillmentState) {
        if to > self.state {
            self.state = to;
            self.touch();
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Allocation and manual package edits are only legal before
    /// distribution completes.
    pub fn ensure_packages_editable(&self) -> ShippingResult<()> {
        if self.state != FulfillmentState::ItemsPendingDistribution {
            return Err(ShippingError::StateIncoherency {
                state: self.state.label().to_string(),
                operation: "EDIT_PACKAGES".to_string(),
            });
        }
        Ok(())
    }

    /// Labels can only be placed once items are distributed and no labels
    /// exist yet.
    pub fn ensure_labels_placeable(&self) -> ShippingResult<()> {
        if self.state != FulfillmentState::ItemsDistributed {
            return Err(ShippingError::StateIncoherency {
                state: self.state.label().to_string(),
                operation: "PLACE_LABELS".to_string(),
            });
        }
        Ok(())
    }

    /// Manifest generation requires exactly the labeled state.
    pub fn ensure_manifest_ready(&self) -> ShippingResult<()> {
        if self.state != FulfillmentState::LabelsPlaced {
            return Err(ShippingError::StateIncoherency {
                state: self.state.label().to_string(),
                operation: "GENERATE_MANIFEST".to_string(),
            });
        }
        Ok(())
    }

    pub fn package(&self, package_id: &Uuid) -> ShippingResult<&Package> {
        self.packages
            .iter()
            .find(|p| p.id == *package_id)
            .ok_or(ShippingError::PackageNotFound(*package_id))
    }

    pub fn package_mut(&mut self, package_id: &Uuid) -> ShippingResult<&mut Package> {
        self.packages
            .iter_mut()
            .find(|p| p.id == *package_id)
            .ok_or(ShippingError::PackageNotFound(*package_id))
    }

    /// Label ids of every labeled package, in package order.
    pub fn label_ids(&self) -> Vec<String> {
        self.packages
            .iter()
            .filter_map(|p| p.shipping_label.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(weight: f64, unit: &str, qty: u32) -> OrderLineItem {
        OrderLineItem {
            id: Uuid::new_v4(),
            name: "Test item".to_string(),
            unit_weight: weight,
            weight_unit: unit.to_string(),
            ordered_quantity: qty,
        }
    }

    #[test]
    fn test_item_view_normalizes_weight() {
        let lines = vec![line(2.5, "kg", 4)];
        let items = Item::derive(&lines, &[]);

        assert_eq!(items[0].unit_weight_g, 2500.0);
        assert_eq!(items[0].remaining_quantity, 4);
    }

    #[test]
    fn test_item_view_subtracts_placed_quantity() {
        let lines = vec![line(500.0, "g", 3)];
        let mut package = Package::new();
        package.place(lines[0].id, 500.0, 2);

        let items = Item::derive(&lines, &[package]);
        assert_eq!(items[0].remaining_quantity, 1);
    }

    #[test]
    fn test_package_take_rejects_more_than_held() {
        let item_id = Uuid::new_v4();
        let mut package = Package::new();
        package.place(item_id, 100.0, 2);

        let result = package.take(&item_id, 100.0, 3);
        assert!(matches!(
            result,
            Err(ShippingError::QuantityUnavailable { .. })
        ));
        assert_eq!(package.quantity_of(&item_id), 2);
    }

    #[test]
    fn test_state_is_monotonic() {
        let mut record = ShipmentRecord::new(Uuid::new_v4());

        record.advance(FulfillmentState::LabelsPlaced);
        assert_eq!(record.state, FulfillmentState::LabelsPlaced);

        // Regression attempts are ignored.
        record.advance(FulfillmentState::ItemsPendingDistribution);
        assert_eq!(record.state, FulfillmentState::LabelsPlaced);
    }

    #[test]
    fn test_guards_reject_out_of_state_operations() {
        let mut record = ShipmentRecord::new(Uuid::new_v4());

        // Nothing distributed yet: labels forbidden, edits allowed.
        assert!(record.ensure_labels_placeable().is_err());
        assert!(record.ensure_packages_editable().is_ok());

        record.advance(FulfillmentState::LabelsPlaced);
        assert!(record.ensure_packages_editable().is_err());
        assert!(record.ensure_labels_placeable().is_err());
        assert!(record.ensure_manifest_ready().is_ok());

        record.advance(FulfillmentState::ManifestGenerated);
        assert!(record.ensure_manifest_ready().is_err());
    }
}

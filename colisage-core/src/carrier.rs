use async_trait::async_trait;
use colisage_shared::Dimensions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::context::{HomePlusServices, Party};
use crate::error::ShippingError;

/// Delivery-type code transmitted to the carrier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryTypeCode {
    RelayStandard,
    /// Alternate relay code for 20-40 kg parcels on accounts that support it.
    RelayOversize,
    HomeStandard,
    HomePlus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LabelFormat {
    Pdf,
    Zpl,
}

/// One package as declared inside a label request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageDeclaration {
    pub package_id: Uuid,
    pub weight_g: f64,
    pub dimensions: Dimensions,
    pub oversize: bool,
}

/// Logical label reservation request. The carrier's wire schema is the
/// adapter's concern; the engine only guarantees these fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRequest {
    pub order_id: Uuid,
    pub delivery_type: DeliveryTypeCode,
    pub sender: Party,
    pub recipient: Party,
    pub relay_id: Option<String>,
    /// Aggregate shipment weight: the single package for per-package
    /// requests, the sum of all packages for batched ones.
    pub total_weight_g: f64,
    pub packages: Vec<PackageDeclaration>,
    pub home_plus: Option<HomePlusServices>,
    /// Set when a HomePlus order carries no captured service selections.
    pub no_extra_services: bool,
}

/// Carrier answer to a reservation: one label, or one per package index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LabelReservation {
    Single {
        label_id: String,
        estimated_price: Option<f64>,
    },
    PerPackage(HashMap<usize, String>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestRequest {
    pub order_ids: Vec<Uuid>,
    pub label_ids: Vec<String>,
    pub sender: Party,
}

/// Carrier account capabilities and physical limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CarrierAccount {
    #[serde(default)]
    pub oversize_relay_supported: bool,
    #[serde(default = "default_max_side_cm")]
    pub max_side_cm: f64,
    #[serde(default = "default_label_format")]
    pub label_format: LabelFormat,
}

fn default_max_side_cm() -> f64 {
    170.0
}

fn default_label_format() -> LabelFormat {
    LabelFormat::Pdf
}

impl Default for CarrierAccount {
    fn default() -> Self {
        Self {
            oversize_relay_supported: false,
            max_side_cm: default_max_side_cm(),
            label_format: default_label_format(),
        }
    }
}

/// Adapter seam for the parcel carrier's API.
#[async_trait]
pub trait CarrierApi: Send + Sync {
    /// Reserve shipping label(s) for one logical request.
    async fn reserve_label(&self, request: &LabelRequest)
        -> Result<LabelReservation, ShippingError>;

    /// Fetch the printable document URL for an issued label.
    async fn fetch_label_document(
        &self,
        label_id: &str,
        format: LabelFormat,
    ) -> Result<String, ShippingError>;

    /// Aggregate already-labeled shipments into one transport manifest.
    async fn generate_manifest(&self, request: &ManifestRequest) -> Result<String, ShippingError>;

    /// Current tracking status for each known label.
    async fn fetch_tracking_statuses(
        &self,
        label_ids: &[String],
    ) -> Result<HashMap<String, String>, ShippingError>;
}

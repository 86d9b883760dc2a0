use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use colisage_core::carrier::{
    CarrierAccount, CarrierApi, DeliveryTypeCode, LabelFormat, LabelRequest, LabelReservation,
    ManifestRequest, PackageDeclaration,
};
use colisage_core::context::{CheckoutContext, DeliveryMode, InteractionMode};
use colisage_core::error::{ShippingError, ShippingResult};
use colisage_core::models::{FulfillmentState, Package, ShipmentRecord};
use colisage_core::repository::TrackingStore;

/// Weight band unlocking the alternate relay delivery-type code.
pub const OVERSIZE_MIN_G: f64 = 20_000.0;
pub const OVERSIZE_MAX_G: f64 = 40_000.0;

/// Carrier requests for one shipment: one per package, or one batch.
enum RequestPlan {
    PerPackage(Vec<LabelRequest>),
    Batched(LabelRequest),
}

/// Assembles carrier label requests from package, order and checkout data,
/// submits them, and folds the carrier's response back onto the packages.
pub struct LabelOrchestrator {
    carrier: Arc<dyn CarrierApi>,
    tracking: Arc<dyn TrackingStore>,
    account: CarrierAccount,
}

impl LabelOrchestrator {
    pub fn new(
        carrier: Arc<dyn CarrierApi>,
        tracking: Arc<dyn TrackingStore>,
        account: CarrierAccount,
    ) -> Self {
        Self {
            carrier,
            tracking,
            account,
        }
    }

    /// Reserve a label for every package and write the identifiers back.
    ///
    /// On success the record advances to `LabelsPlaced`. Any failure
    /// propagates and the caller skips the save, leaving persisted state
    /// exactly as it was before the call.
    pub async fn place_labels(
        &self,
        record: &mut ShipmentRecord,
        ctx: &CheckoutContext,
    ) -> ShippingResult<()> {
        record.ensure_labels_placeable()?;
        self.check_dimensions(record)?;

        match self.build_requests(record, ctx)? {
            RequestPlan::PerPackage(requests) => {
                let mut labels = Vec::with_capacity(requests.len());
                for request in &requests {
                    match self.carrier.reserve_label(request).await? {
                        LabelReservation::Single {
                            label_id,
                            estimated_price,
                        } => labels.push((label_id, estimated_price)),
                        LabelReservation::PerPackage(_) => {
                            return Err(ShippingError::CarrierInvalidResponse(
                                "expected one label per package request".to_string(),
                            ))
                        }
                    }
                }
                for (package, (label_id, price)) in record.packages.iter_mut().zip(labels) {
                    package.shipping_label = Some(label_id);
                    package.estimated_shipping_price = price;
                }
            }
            RequestPlan::Batched(request) => {
                match self.carrier.reserve_label(&request).await? {
                    // One expedition number covering every package.
                    LabelReservation::Single { label_id, .. } => {
                        for package in record.packages.iter_mut() {
                            package.shipping_label = Some(label_id.clone());
                        }
                    }
                    LabelReservation::PerPackage(map) => {
                        for (index, label_id) in map {
                            let package = record.packages.get_mut(index).ok_or_else(|| {
                                ShippingError::CarrierInvalidResponse(format!(
                                    "label returned for unknown package index {index}"
                                ))
                            })?;
                            package.shipping_label = Some(label_id);
                        }
                    }
                }
            }
        }

        if let Some(unlabeled) = record.packages.iter().find(|p| !p.is_labeled()) {
            return Err(ShippingError::CarrierInvalidResponse(format!(
                "carrier returned no label for package {}",
                unlabeled.id
            )));
        }

        // Fetch every document before registering anything, so a failed
        // round-trip leaves no orphan tracking entries behind.
        let mut registrations = Vec::with_capacity(record.packages.len());
        for package in record.packages.iter_mut() {
            // is_labeled() checked above
            if let Some(label_id) = package.shipping_label.clone() {
                let url = self
                    .carrier
                    .fetch_label_document(&label_id, self.account.label_format)
                    .await?;
                package.shipping_label_document_url = Some(url);
                registrations.push(label_id);
            }
        }
        for label_id in &registrations {
            self.tracking.register_label(record.order_id, label_id).await?;
        }

        record.advance(FulfillmentState::LabelsPlaced);
        tracing::info!(
            order_id = %record.order_id,
            packages = record.packages.len(),
            "shipping labels placed"
        );
        Ok(())
    }

    /// Physical size limit, enforced before any carrier call.
    fn check_dimensions(&self, record: &ShipmentRecord) -> ShippingResult<()> {
        for package in &record.packages {
            let side = package.dimensions.longest_side_cm();
            if side >= self.account.max_side_cm {
                return Err(ShippingError::OversizePackage {
                    package_id: package.id,
                    side_cm: side,
                    limit_cm: self.account.max_side_cm,
                });
            }
        }
        Ok(())
    }

    /// The one place the delivery-mode/interaction-mode pair is dispatched.
    fn build_requests(
        &self,
        record: &ShipmentRecord,
        ctx: &CheckoutContext,
    ) -> ShippingResult<RequestPlan> {
        match (&ctx.delivery_mode, ctx.interaction_mode) {
            (DeliveryMode::Relay { relay_id }, InteractionMode::PeerToPeer) => {
                let requests = record
                    .packages
                    .iter()
                    .map(|package| LabelRequest {
                        order_id: record.order_id,
                        delivery_type: DeliveryTypeCode::RelayStandard,
                        sender: ctx.sender.clone(),
                        recipient: ctx.recipient.clone(),
                        relay_id: Some(relay_id.clone()),
                        total_weight_g: package.weight_g,
                        packages: vec![self.declare(package)],
                        home_plus: None,
                        no_extra_services: false,
                    })
                    .collect();
                Ok(RequestPlan::PerPackage(requests))
            }
            (DeliveryMode::Relay { relay_id }, InteractionMode::Business) => {
                let declarations: Vec<PackageDeclaration> =
                    record.packages.iter().map(|p| self.declare(p)).collect();
                let delivery_type = if declarations.iter().any(|d| d.oversize) {
                    DeliveryTypeCode::RelayOversize
                } else {
                    DeliveryTypeCode::RelayStandard
                };
                Ok(RequestPlan::Batched(LabelRequest {
                    order_id: record.order_id,
                    delivery_type,
                    sender: ctx.sender.clone(),
                    recipient: ctx.recipient.clone(),
                    relay_id: Some(relay_id.clone()),
                    total_weight_g: record.packages.iter().map(|p| p.weight_g).sum(),
                    packages: declarations,
                    home_plus: None,
                    no_extra_services: false,
                }))
            }
            (mode @ (DeliveryMode::Home | DeliveryMode::HomePlus), InteractionMode::PeerToPeer) => {
                Err(ShippingError::UnsupportedModeCombination {
                    delivery: mode.label().to_string(),
                    interaction: InteractionMode::PeerToPeer.label().to_string(),
                })
            }
            (mode @ (DeliveryMode::Home | DeliveryMode::HomePlus), InteractionMode::Business) => {
                let home_plus = if *mode == DeliveryMode::HomePlus {
                    ctx.home_plus_services.clone()
                } else {
                    None
                };
                let no_extra_services =
                    *mode == DeliveryMode::HomePlus && home_plus.is_none();
                let delivery_type = if *mode == DeliveryMode::HomePlus {
                    DeliveryTypeCode::HomePlus
                } else {
                    DeliveryTypeCode::HomeStandard
                };
                Ok(RequestPlan::Batched(LabelRequest {
                    order_id: record.order_id,
                    delivery_type,
                    sender: ctx.sender.clone(),
                    recipient: ctx.recipient.clone(),
                    relay_id: None,
                    total_weight_g: record.packages.iter().map(|p| p.weight_g).sum(),
                    packages: record.packages.iter().map(|p| self.declare(p)).collect(),
                    home_plus,
                    no_extra_services,
                }))
            }
        }
    }

    fn declare(&self, package: &Package) -> PackageDeclaration {
        PackageDeclaration {
            package_id: package.id,
            weight_g: package.weight_g,
            dimensions: package.dimensions,
            oversize: self.account.oversize_relay_supported
                && package.weight_g >= OVERSIZE_MIN_G
                && package.weight_g <= OVERSIZE_MAX_G,
        }
    }
}

/// In-process carrier double for tests and local wiring.
///
/// Failure triggers: a recipient named `fail-no-response` simulates a
/// network timeout, `fail-rejected` a business-level rejection.
pub struct MockCarrier {
    counter: AtomicU64,
    reserve_calls: AtomicU64,
    manifest_calls: AtomicU64,
    fail_documents: AtomicBool,
    requests: Mutex<Vec<LabelRequest>>,
}

impl MockCarrier {
    pub fn new() -> Self {
        Self {
            counter: AtomicU64::new(0),
            reserve_calls: AtomicU64::new(0),
            manifest_calls: AtomicU64::new(0),
            fail_documents: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Make subsequent document fetches fail like a carrier timeout.
    pub fn fail_document_fetch(&self) {
        self.fail_documents.store(true, Ordering::SeqCst);
    }

    pub fn reserve_call_count(&self) -> u64 {
        self.reserve_calls.load(Ordering::SeqCst)
    }

    pub fn manifest_call_count(&self) -> u64 {
        self.manifest_calls.load(Ordering::SeqCst)
    }

    pub fn recorded_requests(&self) -> Vec<LabelRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    fn next_label(&self) -> String {
        format!("MOCK-LB-{:06}", self.counter.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for MockCarrier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CarrierApi for MockCarrier {
    async fn reserve_label(
        &self,
        request: &LabelRequest,
    ) -> Result<LabelReservation, ShippingError> {
        self.reserve_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }

        match request.recipient.name.as_str() {
            "fail-no-response" => {
                return Err(ShippingError::CarrierNoResponse(
                    "simulated carrier timeout".to_string(),
                ))
            }
            "fail-rejected" => {
                return Err(ShippingError::CarrierInvalidResponse(
                    "simulated carrier rejection".to_string(),
                ))
            }
            _ => {}
        }

        if request.packages.len() == 1 {
            Ok(LabelReservation::Single {
                label_id: self.next_label(),
                estimated_price: Some(4.90),
            })
        } else {
            let map: HashMap<usize, String> = (0..request.packages.len())
                .map(|index| (index, self.next_label()))
                .collect();
            Ok(LabelReservation::PerPackage(map))
        }
    }

    async fn fetch_label_document(
        &self,
        label_id: &str,
        format: LabelFormat,
    ) -> Result<String, ShippingError> {
        if self.fail_documents.load(Ordering::SeqCst) {
            return Err(ShippingError::CarrierNoResponse(
                "simulated carrier timeout".to_string(),
            ));
        }
        let extension = match format {
            LabelFormat::Pdf => "pdf",
            LabelFormat::Zpl => "zpl",
        };
        Ok(format!(
            "https://carrier.example/labels/{label_id}.{extension}"
        ))
    }

    async fn generate_manifest(&self, request: &ManifestRequest) -> Result<String, ShippingError> {
        self.manifest_calls.fetch_add(1, Ordering::SeqCst);
        if request.label_ids.is_empty() {
            return Err(ShippingError::CarrierInvalidResponse(
                "manifest request without labels".to_string(),
            ));
        }
        Ok(format!(
            "MOCK-WB-{:06}",
            self.counter.fetch_add(1, Ordering::SeqCst)
        ))
    }

    async fn fetch_tracking_statuses(
        &self,
        label_ids: &[String],
    ) -> Result<HashMap<String, String>, ShippingError> {
        Ok(label_ids
            .iter()
            .map(|id| (id.clone(), "IN_TRANSIT".to_string()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colisage_core::context::{HomePlusServices, Party};
    use colisage_shared::Dimensions;
    use colisage_store::InMemoryTrackingStore;
    use uuid::Uuid;

    fn party(name: &str) -> Party {
        Party {
            name: name.to_string(),
            email: None,
            phone: None,
            street: "1 rue des Colis".to_string(),
            postcode: "75001".to_string(),
            city: "Paris".to_string(),
            country_code: "FR".to_string(),
        }
    }

    fn context(delivery: DeliveryMode, interaction: InteractionMode) -> CheckoutContext {
        CheckoutContext {
            delivery_mode: delivery,
            interaction_mode: interaction,
            sender: party("Store"),
            recipient: party("Alice"),
            home_plus_services: None,
        }
    }

    fn relay() -> DeliveryMode {
        DeliveryMode::Relay {
            relay_id: "R-001".to_string(),
        }
    }

    fn distributed_record(weights: &[f64]) -> ShipmentRecord {
        let mut record = ShipmentRecord::new(Uuid::new_v4());
        for &weight in weights {
            let mut package = Package::new();
            package.place(Uuid::new_v4(), weight, 1);
            package.dimensions = Dimensions::new(30.0, 40.0, 50.0);
            record.packages.push(package);
        }
        record.advance(FulfillmentState::ItemsDistributed);
        record
    }

    fn orchestrator(account: CarrierAccount) -> (Arc<MockCarrier>, LabelOrchestrator) {
        let carrier = Arc::new(MockCarrier::new());
        let tracking = Arc::new(InMemoryTrackingStore::new());
        let orchestrator = LabelOrchestrator::new(carrier.clone(), tracking, account);
        (carrier, orchestrator)
    }

    #[tokio::test]
    async fn test_relay_peer_to_peer_labels_each_package() {
        let (carrier, orchestrator) = orchestrator(CarrierAccount::default());
        let mut record = distributed_record(&[1_500.0, 2_500.0]);
        let ctx = context(relay(), InteractionMode::PeerToPeer);

        orchestrator.place_labels(&mut record, &ctx).await.unwrap();

        assert_eq!(carrier.reserve_call_count(), 2);
        assert_eq!(record.state, FulfillmentState::LabelsPlaced);
        for package in &record.packages {
            assert!(package.shipping_label.is_some());
            assert!(package.shipping_label_document_url.is_some());
            assert_eq!(package.estimated_shipping_price, Some(4.90));
        }
        assert_ne!(
            record.packages[0].shipping_label,
            record.packages[1].shipping_label
        );
    }

    #[tokio::test]
    async fn test_relay_business_batches_with_aggregate_weight() {
        let (carrier, orchestrator) = orchestrator(CarrierAccount::default());
        let mut record = distributed_record(&[1_500.0, 2_500.0]);
        let ctx = context(relay(), InteractionMode::Business);

        orchestrator.place_labels(&mut record, &ctx).await.unwrap();

        assert_eq!(carrier.reserve_call_count(), 1);
        let request = &carrier.recorded_requests()[0];
        assert_eq!(request.total_weight_g, 4_000.0);
        assert_eq!(request.packages.len(), 2);
        assert_eq!(request.packages[0].weight_g, 1_500.0);
        assert!(record.packages.iter().all(|p| p.shipping_label.is_some()));
    }

    #[tokio::test]
    async fn test_oversize_flag_switches_delivery_type() {
        let account = CarrierAccount {
            oversize_relay_supported: true,
            ..CarrierAccount::default()
        };
        let (carrier, orchestrator) = orchestrator(account);
        let mut record = distributed_record(&[25_000.0, 1_000.0]);
        let ctx = context(relay(), InteractionMode::Business);

        orchestrator.place_labels(&mut record, &ctx).await.unwrap();

        let request = &carrier.recorded_requests()[0];
        assert_eq!(request.delivery_type, DeliveryTypeCode::RelayOversize);
        assert!(request.packages[0].oversize);
        assert!(!request.packages[1].oversize);
    }

    #[tokio::test]
    async fn test_oversize_flag_requires_account_support() {
        let (carrier, orchestrator) = orchestrator(CarrierAccount::default());
        let mut record = distributed_record(&[25_000.0]);
        let ctx = context(relay(), InteractionMode::Business);

        orchestrator.place_labels(&mut record, &ctx).await.unwrap();

        let request = &carrier.recorded_requests()[0];
        assert_eq!(request.delivery_type, DeliveryTypeCode::RelayStandard);
        assert!(!request.packages[0].oversize);
    }

    #[tokio::test]
    async fn test_home_peer_to_peer_fails_before_carrier_call() {
        let (carrier, orchestrator) = orchestrator(CarrierAccount::default());
        let mut record = distributed_record(&[1_500.0]);
        let ctx = context(DeliveryMode::Home, InteractionMode::PeerToPeer);

        let result = orchestrator.place_labels(&mut record, &ctx).await;

        assert!(matches!(
            result,
            Err(ShippingError::UnsupportedModeCombination { .. })
        ));
        assert_eq!(carrier.reserve_call_count(), 0);
        assert!(record.packages[0].shipping_label.is_none());
    }

    #[tokio::test]
    async fn test_home_plus_without_selections_sets_flag() {
        let (carrier, orchestrator) = orchestrator(CarrierAccount::default());
        let mut record = distributed_record(&[1_500.0]);
        let ctx = context(DeliveryMode::HomePlus, InteractionMode::Business);

        orchestrator.place_labels(&mut record, &ctx).await.unwrap();

        let request = &carrier.recorded_requests()[0];
        assert!(request.no_extra_services);
        assert!(request.home_plus.is_none());
        assert_eq!(request.delivery_type, DeliveryTypeCode::HomePlus);
    }

    #[tokio::test]
    async fn test_home_plus_carries_service_selections() {
        let (carrier, orchestrator) = orchestrator(CarrierAccount::default());
        let mut record = distributed_record(&[1_500.0]);
        let mut ctx = context(DeliveryMode::HomePlus, InteractionMode::Business);
        ctx.home_plus_services = Some(HomePlusServices {
            access_code: Some("A123".to_string()),
            floor: Some(3),
            housing_type: Some("APARTMENT".to_string()),
            has_elevator: true,
        });

        orchestrator.place_labels(&mut record, &ctx).await.unwrap();

        let request = &carrier.recorded_requests()[0];
        assert!(!request.no_extra_services);
        let services = request.home_plus.as_ref().unwrap();
        assert_eq!(services.floor, Some(3));
        assert!(services.has_elevator);
    }

    #[tokio::test]
    async fn test_place_labels_rejected_before_distribution() {
        let (carrier, orchestrator) = orchestrator(CarrierAccount::default());
        let mut record = ShipmentRecord::new(Uuid::new_v4());
        let ctx = context(relay(), InteractionMode::Business);

        let result = orchestrator.place_labels(&mut record, &ctx).await;

        assert!(matches!(result, Err(ShippingError::StateIncoherency { .. })));
        assert_eq!(carrier.reserve_call_count(), 0);
        assert_eq!(record.state, FulfillmentState::ItemsPendingDistribution);
    }

    #[tokio::test]
    async fn test_oversize_dimensions_rejected_before_carrier_call() {
        let (carrier, orchestrator) = orchestrator(CarrierAccount::default());
        let mut record = distributed_record(&[1_500.0]);
        record.packages[0].dimensions = Dimensions::new(180.0, 40.0, 50.0);
        let ctx = context(relay(), InteractionMode::Business);

        let result = orchestrator.place_labels(&mut record, &ctx).await;

        assert!(matches!(result, Err(ShippingError::OversizePackage { .. })));
        assert_eq!(carrier.reserve_call_count(), 0);
    }

    #[tokio::test]
    async fn test_document_fetch_failure_registers_no_labels() {
        let carrier = Arc::new(MockCarrier::new());
        carrier.fail_document_fetch();
        let tracking = Arc::new(InMemoryTrackingStore::new());
        let orchestrator =
            LabelOrchestrator::new(carrier.clone(), tracking.clone(), CarrierAccount::default());
        let mut record = distributed_record(&[1_500.0, 2_500.0]);
        let ctx = context(relay(), InteractionMode::PeerToPeer);

        let result = orchestrator.place_labels(&mut record, &ctx).await;

        assert!(matches!(result, Err(ShippingError::CarrierNoResponse(_))));
        // No orphan tracking entries from the packages processed first.
        assert!(tracking.registered_labels().await.is_empty());
        assert_eq!(record.state, FulfillmentState::ItemsDistributed);
    }

    #[tokio::test]
    async fn test_carrier_failure_leaves_record_unchanged() {
        let (_, orchestrator) = orchestrator(CarrierAccount::default());
        let mut record = distributed_record(&[1_500.0]);
        let mut ctx = context(relay(), InteractionMode::Business);
        ctx.recipient = party("fail-no-response");

        let result = orchestrator.place_labels(&mut record, &ctx).await;

        assert!(matches!(result, Err(ShippingError::CarrierNoResponse(_))));
        assert!(record.packages[0].shipping_label.is_none());
        assert_eq!(record.state, FulfillmentState::ItemsDistributed);
    }
}

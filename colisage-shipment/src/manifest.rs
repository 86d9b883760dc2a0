use std::sync::Arc;

use colisage_core::carrier::{CarrierApi, ManifestRequest};
use colisage_core::context::{CheckoutContext, InteractionMode};
use colisage_core::error::{ShippingError, ShippingResult};
use colisage_core::models::{FulfillmentState, ShipmentRecord};

/// Aggregates already-labeled orders into a single transport manifest
/// ("way bill") request.
pub struct ManifestOrchestrator {
    carrier: Arc<dyn CarrierApi>,
}

impl ManifestOrchestrator {
    pub fn new(carrier: Arc<dyn CarrierApi>) -> Self {
        Self { carrier }
    }

    /// Generate the way bill for one order.
    pub async fn generate(
        &self,
        record: &mut ShipmentRecord,
        ctx: &CheckoutContext,
    ) -> ShippingResult<String> {
        Self::ensure_eligible(record, ctx)?;

        let request = ManifestRequest {
            order_ids: vec![record.order_id],
            label_ids: record.label_ids(),
            sender: ctx.sender.clone(),
        };
        let way_bill = self.carrier.generate_manifest(&request).await?;

        record.way_bill = Some(way_bill.clone());
        record.advance(FulfillmentState::ManifestGenerated);
        tracing::info!(order_id = %record.order_id, way_bill = %way_bill, "manifest generated");
        Ok(way_bill)
    }

    /// Bulk variant: every order must pass the guard before one combined
    /// request is issued; a single failure aborts the whole batch without
    /// calling the carrier.
    pub async fn generate_bulk(
        &self,
        batch: &mut [(ShipmentRecord, CheckoutContext)],
    ) -> ShippingResult<String> {
        let Some((_, first_ctx)) = batch.first() else {
            return Err(ShippingError::EmptyManifestBatch);
        };
        let sender = first_ctx.sender.clone();

        for (record, ctx) in batch.iter() {
            Self::ensure_eligible(record, ctx)?;
        }

        let request = ManifestRequest {
            order_ids: batch.iter().map(|(record, _)| record.order_id).collect(),
            label_ids: batch
                .iter()
                .flat_map(|(record, _)| record.label_ids())
                .collect(),
            sender,
        };
        let way_bill = self.carrier.generate_manifest(&request).await?;

        for (record, _) in batch.iter_mut() {
            record.way_bill = Some(way_bill.clone());
            record.advance(FulfillmentState::ManifestGenerated);
        }
        tracing::info!(orders = batch.len(), way_bill = %way_bill, "bulk manifest generated");
        Ok(way_bill)
    }

    /// Manifest generation is only defined for labeled, business-mode
    /// shipments.
    fn ensure_eligible(record: &ShipmentRecord, ctx: &CheckoutContext) -> ShippingResult<()> {
        record.ensure_manifest_ready()?;
        if ctx.interaction_mode != InteractionMode::Business {
            return Err(ShippingError::UnsupportedModeCombination {
                delivery: ctx.delivery_mode.label().to_string(),
                interaction: ctx.interaction_mode.label().to_string(),
            });
        }
        Ok(())
    }
}

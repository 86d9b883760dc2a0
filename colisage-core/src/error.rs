use uuid::Uuid;

/// Error taxonomy for the allocation and fulfillment engine.
#[derive(Debug, thiserror::Error)]
pub enum ShippingError {
    #[error("Operation {operation} not allowed while shipment is {state}")]
    StateIncoherency { state: String, operation: String },

    #[error("No carrier behavior defined for {delivery} delivery in {interaction} mode")]
    UnsupportedModeCombination {
        delivery: String,
        interaction: String,
    },

    #[error("Carrier returned no usable response: {0}")]
    CarrierNoResponse(String),

    #[error("Carrier rejected the request: {0}")]
    CarrierInvalidResponse(String),

    #[error("Package {package_id} side of {side_cm} cm exceeds the {limit_cm} cm limit")]
    OversizePackage {
        package_id: Uuid,
        side_cm: f64,
        limit_cm: f64,
    },

    #[error("Package {0} already carries a shipping label")]
    PackageLocked(Uuid),

    #[error("Package not found: {0}")]
    PackageNotFound(Uuid),

    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    #[error("Item not found: {0}")]
    ItemNotFound(Uuid),

    #[error("Item {item_id}: requested {requested} units, {available} available")]
    QuantityUnavailable {
        item_id: Uuid,
        requested: u32,
        available: u32,
    },

    #[error("Label not registered for tracking: {0}")]
    LabelNotRegistered(String),

    #[error("Manifest batch contains no orders")]
    EmptyManifestBatch,

    #[error("Shipment record for order {order_id} was modified concurrently (expected revision {expected}, found {found})")]
    RevisionConflict {
        order_id: Uuid,
        expected: u64,
        found: u64,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type ShippingResult<T> = Result<T, ShippingError>;

pub mod allocator;
pub mod labels;
pub mod manifest;
pub mod service;
pub mod tiers;

pub use allocator::{allocate, AllocationOutcome};
pub use labels::{LabelOrchestrator, MockCarrier};
pub use manifest::ManifestOrchestrator;
pub use service::{DistributionReport, ShipmentService};

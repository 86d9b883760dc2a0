pub mod carrier;
pub mod context;
pub mod error;
pub mod models;
pub mod repository;

pub use carrier::{
    CarrierAccount, CarrierApi, DeliveryTypeCode, LabelFormat, LabelRequest, LabelReservation,
    ManifestRequest, PackageDeclaration,
};
pub use context::{CheckoutContext, DeliveryMode, HomePlusServices, InteractionMode, Party};
pub use error::{ShippingError, ShippingResult};
pub use models::{FulfillmentState, Item, OrderLineItem, Package, ShipmentRecord};
pub use repository::{OrderStore, TrackingStore};

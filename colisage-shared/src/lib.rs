pub mod dimensions;
pub mod events;
pub mod weight;

pub use dimensions::Dimensions;
pub use events::ShipmentEvent;

use serde::{Deserialize, Serialize};

/// How the parcel reaches the recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryMode {
    /// Drop-off at a third-party pickup point identified by a relay code.
    Relay { relay_id: String },
    /// Direct-to-residence delivery.
    Home,
    /// Home delivery with installation/placement services.
    HomePlus,
}

impl DeliveryMode {
    /// Home variants always ship on the heavy-freight weight tier.
    pub fn is_home_variant(&self) -> bool {
        matches!(self, DeliveryMode::Home | DeliveryMode::HomePlus)
    }

    pub fn label(&self) -> &'static str {
        match self {
            DeliveryMode::Relay { .. } => "RELAY",
            DeliveryMode::Home => "HOME",
            DeliveryMode::HomePlus => "HOME_PLUS",
        }
    }
}

/// Whether the shipment's sender is the store itself (business) or an
/// individual customer (peer to peer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InteractionMode {
    Business,
    PeerToPeer,
}

impl InteractionMode {
    pub fn label(&self) -> &'static str {
        match self {
            InteractionMode::Business => "BUSINESS",
            InteractionMode::PeerToPeer => "PEER_TO_PEER",
        }
    }
}

/// Identity and address of one side of the shipment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Party {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub street: String,
    pub postcode: String,
    pub city: String,
    pub country_code: String,
}

/// Service selections captured at checkout for the "plus" home tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomePlusServices {
    pub access_code: Option<String>,
    pub floor: Option<i32>,
    pub housing_type: Option<String>,
    pub has_elevator: bool,
}

/// Per-order carrier-facing context captured at checkout.
///
/// Loaded once through the `OrderStore` collaborator and passed by reference
/// into the orchestrators; never read from ambient session state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutContext {
    pub delivery_mode: DeliveryMode,
    pub interaction_mode: InteractionMode,
    pub sender: Party,
    pub recipient: Party,
    pub home_plus_services: Option<HomePlusServices>,
}

use colisage_core::context::DeliveryMode;
use colisage_core::models::Item;

/// Default package weight ceiling.
pub const STANDARD_CEILING_G: f64 = 20_000.0;

/// Ceiling for orders whose heaviest unit sits in the 20-40 kg band.
pub const HEAVY_CEILING_G: f64 = 40_000.0;

/// Freight ceiling: heaviest-tier items and all home deliveries.
pub const FREIGHT_CEILING_G: f64 = 1_300_000.0;

/// Resolve the maximum package weight for one allocation run.
///
/// Precedence is explicit and total: home-delivery variants always ship on
/// the freight tier; otherwise the heaviest single unit weight selects the
/// smallest tier that admits it.
pub fn resolve_ceiling(items: &[Item], mode: &DeliveryMode) -> f64 {
    if mode.is_home_variant() {
        return FREIGHT_CEILING_G;
    }
    let heaviest = items
        .iter()
        .map(|item| item.unit_weight_g)
        .fold(0.0, f64::max);
    if heaviest <= STANDARD_CEILING_G {
        STANDARD_CEILING_G
    } else if heaviest <= HEAVY_CEILING_G {
        HEAVY_CEILING_G
    } else {
        FREIGHT_CEILING_G
    }
}

use colisage_core::models::{Item, Package};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Result of one allocation run: the full package list in creation order,
/// the recomputed item view, and the items that fit no package at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationOutcome {
    pub packages: Vec<Package>,
    pub items: Vec<Item>,
    /// Items with remaining quantity that no package can take (a single
    /// unit alone exceeds the ceiling). Surfaced, never silently dropped.
    pub unallocatable: Vec<Uuid>,
}

/// Greedily distribute remaining item quantities into packages.
///
/// Deterministic and order-of-iteration sensitive by design: existing
/// packages are saturated first in stored order, items are considered in
/// input order, units are never split and a unit heavier than the ceiling
/// is never placed. New packages open one at a time until everything is
/// placed or a fresh package receives nothing.
///
/// Pure: persistence and the state transition are the caller's concern.
pub fn allocate(
    mut items: Vec<Item>,
    mut packages: Vec<Package>,
    ceiling_g: f64,
) -> AllocationOutcome {
    for package in packages.iter_mut().filter(|p| !p.is_labeled()) {
        fill_package(package, &mut items, ceiling_g);
    }

    while items.iter().any(|item| item.remaining_quantity > 0) {
        let mut package = Package::new();
        if fill_package(&mut package, &mut items, ceiling_g) == 0 {
            // Zero progress: whatever is left fits no package. Stop early
            // and discard the untouched package.
            break;
        }
        packages.push(package);
    }

    let unallocatable = items
        .iter()
        .filter(|item| item.remaining_quantity > 0)
        .map(|item| item.id)
        .collect();

    AllocationOutcome {
        packages,
        items,
        unallocatable,
    }
}

/// Add as many whole units as possible to one package without its running
/// weight exceeding the ceiling. Returns the number of units placed.
fn fill_package(package: &mut Package, items: &mut [Item], ceiling_g: f64) -> u32 {
    let mut placed = 0;
    for item in items.iter_mut() {
        if item.unit_weight_g > ceiling_g {
            // A single unit already exceeds the ceiling; skip entirely.
            continue;
        }
        while item.remaining_quantity > 0 && package.weight_g + item.unit_weight_g <= ceiling_g {
            package.place(item.id, item.unit_weight_g, 1);
            item.remaining_quantity -= 1;
            placed += 1;
        }
    }
    placed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(unit_weight_g: f64, qty: u32) -> Item {
        Item {
            id: Uuid::new_v4(),
            name: "Test item".to_string(),
            unit_weight_g,
            ordered_quantity: qty,
            remaining_quantity: qty,
        }
    }

    fn total_placed(packages: &[Package], item_id: &Uuid) -> u32 {
        packages.iter().map(|p| p.quantity_of(item_id)).sum()
    }

    #[test]
    fn test_single_package_takes_everything() {
        // 3 x 500 g, ceiling 20 kg: one package, weight 1500 g, nothing left.
        let items = vec![item(500.0, 3)];
        let outcome = allocate(items, Vec::new(), 20_000.0);

        assert_eq!(outcome.packages.len(), 1);
        assert_eq!(outcome.packages[0].weight_g, 1500.0);
        assert_eq!(outcome.items[0].remaining_quantity, 0);
        assert!(outcome.unallocatable.is_empty());
    }

    #[test]
    fn test_heavy_unit_fits_raised_ceiling() {
        let items = vec![item(25_000.0, 1)];
        let outcome = allocate(items, Vec::new(), 40_000.0);

        assert_eq!(outcome.packages.len(), 1);
        assert_eq!(outcome.packages[0].weight_g, 25_000.0);
        assert_eq!(outcome.items[0].remaining_quantity, 0);
    }

    #[test]
    fn test_overflow_opens_new_packages() {
        // 5 x 8 kg against a 20 kg ceiling: 2 + 2 + 1.
        let items = vec![item(8_000.0, 5)];
        let outcome = allocate(items, Vec::new(), 20_000.0);

        assert_eq!(outcome.packages.len(), 3);
        for package in &outcome.packages {
            assert!(package.weight_g <= 20_000.0);
        }
        assert_eq!(total_placed(&outcome.packages, &outcome.items[0].id), 5);
    }

    #[test]
    fn test_existing_packages_saturated_first() {
        let items = vec![item(6_000.0, 3)];
        let mut existing = Package::new();
        existing.place(Uuid::new_v4(), 10_000.0, 1);

        let outcome = allocate(items, vec![existing], 20_000.0);

        // 10 kg + 6 kg fits, the other two units spill into a new package.
        assert_eq!(outcome.packages.len(), 2);
        assert_eq!(outcome.packages[0].weight_g, 16_000.0);
        assert_eq!(outcome.packages[1].weight_g, 12_000.0);
    }

    #[test]
    fn test_labeled_package_is_never_touched() {
        let mut labeled = Package::new();
        labeled.place(Uuid::new_v4(), 1_000.0, 1);
        labeled.shipping_label = Some("LB-1".to_string());
        let frozen_items = labeled.items.clone();

        let items = vec![item(500.0, 2)];
        let outcome = allocate(items, vec![labeled], 20_000.0);

        // The labeled package keeps its contents despite ceiling headroom.
        assert_eq!(outcome.packages[0].items, frozen_items);
        assert_eq!(outcome.packages[0].weight_g, 1_000.0);
        assert_eq!(outcome.packages.len(), 2);
        assert_eq!(outcome.packages[1].weight_g, 1_000.0);
    }

    #[test]
    fn test_too_heavy_item_reported_unallocatable() {
        let heavy = item(25_000.0, 1);
        let heavy_id = heavy.id;
        let outcome = allocate(vec![heavy, item(500.0, 2)], Vec::new(), 20_000.0);

        // The light units are placed, the heavy one is surfaced.
        assert_eq!(outcome.unallocatable, vec![heavy_id]);
        assert_eq!(outcome.packages.len(), 1);
        assert_eq!(outcome.packages[0].weight_g, 1_000.0);
        // No empty trailing package from the zero-progress stop.
        assert!(outcome.packages.iter().all(|p| !p.items.is_empty()));
    }

    #[test]
    fn test_conservation() {
        let items = vec![item(3_000.0, 7), item(9_500.0, 4), item(50_000.0, 2)];
        let ids: Vec<Uuid> = items.iter().map(|i| i.id).collect();
        let outcome = allocate(items, Vec::new(), 20_000.0);

        for (idx, id) in ids.iter().enumerate() {
            let placed = total_placed(&outcome.packages, id);
            let item = &outcome.items[idx];
            assert_eq!(item.ordered_quantity, item.remaining_quantity + placed);
        }
    }

    #[test]
    fn test_reallocation_is_idempotent() {
        let items = vec![item(8_000.0, 5)];
        let first = allocate(items, Vec::new(), 20_000.0);
        let before: Vec<f64> = first.packages.iter().map(|p| p.weight_g).collect();

        let second = allocate(first.items, first.packages, 20_000.0);
        let after: Vec<f64> = second.packages.iter().map(|p| p.weight_g).collect();

        assert_eq!(before, after);
        assert!(second.items.iter().all(|i| i.remaining_quantity == 0));
    }
}

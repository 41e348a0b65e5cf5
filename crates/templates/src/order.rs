use std::collections::HashSet;

use crate::Container;

/// Boundary repair pass for child order lists. Runs depth-first over every
/// container and makes each order list an exact permutation of the child
/// names: surviving entries keep their position, duplicate entries keep their
/// first occurrence, ghost entries are dropped, and names missing from the
/// list are appended in ascending lexicographic order. Idempotent.
///
/// Legacy and foreign snapshots may arrive without an order list, or with one
/// that went stale while children were edited around it; this pass is the one
/// place that heals them. It runs where a tree enters the system (decode,
/// load, receive) and is never mixed into mutation logic.
pub fn repair_order(container: &mut Container) {
    if let Container::Mixed {
        children,
        sort_order,
        ..
    } = container
    {
        let mut seen = HashSet::new();
        sort_order.retain(|name| children.contains_key(name) && seen.insert(name.clone()));
        for name in children.keys() {
            if !seen.contains(name) {
                sort_order.push(name.clone());
            }
        }
        for child in children.values_mut() {
            repair_order(child);
        }
    }
}

/// True when every container reachable from `container` has an order list
/// that is exactly a permutation of its child names.
pub fn order_is_consistent(container: &Container) -> bool {
    match container {
        Container::Leaf(_) => true,
        Container::Mixed {
            children,
            sort_order,
            ..
        } => {
            if sort_order.len() != children.len() {
                return false;
            }
            let mut seen = HashSet::new();
            for name in sort_order {
                if !children.contains_key(name) || !seen.insert(name) {
                    return false;
                }
            }
            children.values().all(order_is_consistent)
        }
    }
}

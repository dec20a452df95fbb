//! Rehash engine: when to move to the next capacity stage, and how.

use crate::chain::{self, Buckets};
use slotmap::DefaultKey;

/// Growth predicate, evaluated once before every insertion.
///
/// A threshold of exactly `1.0` disables growth, and nothing grows past the
/// last stage of the schedule.
#[inline]
pub(crate) fn should_grow(
    growth_threshold: f64,
    stage: usize,
    stages: usize,
    unique: usize,
    capacity: usize,
) -> bool {
    growth_threshold < 1.0
        && stage + 1 < stages
        && (unique as f64) / (capacity as f64) > growth_threshold
}

/// Build a fresh array of `new_capacity` slots holding every entry key of
/// `old`. The caller swaps it in once it is complete, so `old` stays intact
/// if a hash callback panics part way.
///
/// Old slots are visited in order and each chain front to back, so entries
/// that land in the same new slot keep their relative order.
///
/// Only keys move; `hash_of` is asked for each entry's raw hash and the
/// payloads themselves are neither copied nor compared.
pub(crate) fn relocate(
    old: &Buckets,
    new_capacity: usize,
    mut hash_of: impl FnMut(DefaultKey) -> u64,
) -> Buckets {
    let mut fresh = chain::empty_buckets(new_capacity);
    for key in old.iter().flatten().flat_map(|c| c.keys()) {
        let slot = chain::slot_for(hash_of(key), new_capacity);
        chain::append(&mut fresh, slot, key);
    }
    fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    #[test]
    fn grows_only_past_threshold() {
        // 3/7 > 0.4 but 2/7 is not.
        assert!(!should_grow(0.4, 0, 2, 2, 7));
        assert!(should_grow(0.4, 0, 2, 3, 7));
        // Equal ratio is not "exceeded".
        assert!(!should_grow(0.5, 0, 2, 5, 10));
    }

    #[test]
    fn never_grows_at_last_stage_or_with_unit_threshold() {
        assert!(!should_grow(0.4, 1, 2, 1000, 11));
        assert!(!should_grow(0.4, 0, 1, 1000, 7));
        assert!(!should_grow(1.0, 0, 3, 1000, 7));
    }

    #[test]
    fn relocate_keeps_every_key_and_per_slot_order() {
        let mut arena: SlotMap<DefaultKey, u64> = SlotMap::new();
        let mut old = chain::empty_buckets(2);
        let values = [0u64, 2, 4, 1, 3, 5, 6];
        for v in values {
            let k = arena.insert(v);
            chain::append(&mut old, chain::slot_for(v, 2), k);
        }

        let fresh = relocate(&old, 3, |k| arena[k]);
        assert_eq!(fresh.len(), 3);

        let by_slot: Vec<Vec<u64>> = fresh
            .iter()
            .map(|c| {
                c.as_ref()
                    .map(|c| c.keys().map(|k| arena[k]).collect())
                    .unwrap_or_default()
            })
            .collect();
        // Old slot 0 held [0, 2, 4, 6], slot 1 held [1, 3, 5].
        assert_eq!(by_slot[0], vec![0, 6, 3]);
        assert_eq!(by_slot[1], vec![4, 1]);
        assert_eq!(by_slot[2], vec![2, 5]);
    }

    #[test]
    fn relocating_empty_array_yields_empty_slots() {
        let fresh = relocate(&chain::empty_buckets(4), 9, |_| unreachable!());
        assert_eq!(fresh.len(), 9);
        assert!(fresh.iter().all(Option::is_none));
    }
}

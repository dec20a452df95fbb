//! ChainTable: bucket array, staged growth and duplicate counting.

use crate::chain::{self, Buckets, Chain};
use crate::config::{ConfigError, TableConfig};
use crate::metrics::Metrics;
use crate::ops::{DefaultOps, EntryOps};
use crate::rehash;
use core::fmt;
use core::hash::Hash;
use slotmap::{DefaultKey, SlotMap};
use tracing::{debug, trace};

#[derive(Debug)]
struct Entry<T> {
    data: T,
    frequency: usize,
}

/// Borrowed view of one stored entry: the first-inserted representative of
/// its duplicate group and how many equal values were added.
#[derive(Debug, PartialEq, Eq)]
pub struct EntryRef<'a, T> {
    pub data: &'a T,
    pub frequency: usize,
}

impl<T> Clone for EntryRef<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for EntryRef<'_, T> {}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Counters {
    capacity: usize,
    stage: usize,
    total_entries: usize,
    unique_entries: usize,
}

/// Mutable state, kept apart from the callbacks so both can be borrowed at
/// once.
struct Store<T> {
    buckets: Buckets,
    entries: SlotMap<DefaultKey, Entry<T>>,
    counters: Counters,
}

impl<T> Store<T> {
    fn find<O: EntryOps<T>>(&self, ops: &O, data: &T) -> Option<DefaultKey> {
        let slot = chain::slot_for(ops.hash(data), self.counters.capacity);
        self.buckets[slot]
            .as_ref()?
            .find(|k| ops.equivalent(&self.entries[k].data, data))
    }

    /// Advance one stage and relocate every entry if the growth condition
    /// holds. Returns whether a rehash happened.
    fn grow_if_needed<O: EntryOps<T>>(
        &mut self,
        ops: &O,
        schedule: &[usize],
        threshold: f64,
    ) -> bool {
        let Counters {
            capacity,
            stage,
            unique_entries,
            ..
        } = self.counters;
        if !rehash::should_grow(threshold, stage, schedule.len(), unique_entries, capacity) {
            return false;
        }

        let stage = stage + 1;
        let new_capacity = schedule[stage];
        let entries = &self.entries;
        self.buckets = rehash::relocate(&self.buckets, new_capacity, |k| {
            ops.hash(&entries[k].data)
        });
        self.counters.stage = stage;
        self.counters.capacity = new_capacity;

        debug!(
            stage,
            old_capacity = capacity,
            new_capacity,
            moved = unique_entries,
            "rehashed chain table"
        );
        if stage + 1 == schedule.len() {
            debug!(capacity = new_capacity, "chain table reached its final capacity stage");
        }
        true
    }

    /// Insert `data` as a new unique entry or merge it into an equal one.
    /// On a merge the passed value is handed back for release.
    fn insert_or_merge<O: EntryOps<T>>(&mut self, ops: &O, data: T) -> (usize, Option<T>) {
        let slot = chain::slot_for(ops.hash(&data), self.counters.capacity);
        let existing = self.buckets[slot]
            .as_ref()
            .and_then(|c| c.find(|k| ops.equivalent(&self.entries[k].data, &data)));

        self.counters.total_entries += 1;
        match existing {
            Some(k) => {
                let entry = &mut self.entries[k];
                entry.frequency += 1;
                (entry.frequency, Some(data))
            }
            None => {
                let k = self.entries.insert(Entry { data, frequency: 1 });
                chain::append(&mut self.buckets, slot, k);
                self.counters.unique_entries += 1;
                (1, None)
            }
        }
    }

    fn view(&self, k: DefaultKey) -> EntryRef<'_, T> {
        let e = &self.entries[k];
        EntryRef {
            data: &e.data,
            frequency: e.frequency,
        }
    }
}

/// Separately chained hash table that counts duplicates instead of storing
/// them, growing through a fixed schedule of capacities.
///
/// The table owns every value passed to [`add`](Self::add). Values are
/// released through [`EntryOps::destroy`] when the table is dropped, or
/// immediately when an `add` turns out to be a duplicate.
pub struct ChainTable<T, O = DefaultOps>
where
    O: EntryOps<T>,
{
    ops: O,
    schedule: Box<[usize]>,
    growth_threshold: f64,
    store: Store<T>,
}

impl<T> ChainTable<T>
where
    T: Hash + Eq,
{
    /// Create a table for `Hash + Eq` values with the given capacity schedule
    /// and growth threshold.
    pub fn new(schedule: &[usize], growth_threshold: f64) -> Result<Self, ConfigError> {
        Self::with_ops(DefaultOps::default(), schedule, growth_threshold)
    }
}

impl<T> Default for ChainTable<T>
where
    T: Hash + Eq,
{
    fn default() -> Self {
        Self::from_config(DefaultOps::default(), TableConfig::default())
            .expect("default table configuration must be valid")
    }
}

impl<T, O> ChainTable<T, O>
where
    O: EntryOps<T>,
{
    pub fn with_ops(
        ops: O,
        schedule: &[usize],
        growth_threshold: f64,
    ) -> Result<Self, ConfigError> {
        Self::from_config(ops, TableConfig::new(schedule, growth_threshold))
    }

    /// Validate `config` and allocate the first-stage bucket array.
    pub fn from_config(ops: O, config: TableConfig) -> Result<Self, ConfigError> {
        let (schedule, growth_threshold) = config.into_parts()?;
        let capacity = schedule[0];
        trace!(capacity, stages = schedule.len(), growth_threshold, "creating chain table");
        Ok(Self {
            ops,
            schedule,
            growth_threshold,
            store: Store {
                buckets: chain::empty_buckets(capacity),
                entries: SlotMap::with_key(),
                counters: Counters {
                    capacity,
                    ..Counters::default()
                },
            },
        })
    }

    /// Add one occurrence of `data` and return its frequency afterwards.
    ///
    /// Growth is checked first; if due, the whole table is rehashed into the
    /// next stage before `data` is placed. A value equal to one already
    /// stored bumps that entry's frequency, and the passed `data` is released
    /// through [`EntryOps::destroy`] before this returns.
    pub fn add(&mut self, data: T) -> usize {
        self.store
            .grow_if_needed(&self.ops, &self.schedule, self.growth_threshold);
        let (frequency, duplicate) = self.store.insert_or_merge(&self.ops, data);
        // Released only once the table is consistent again.
        if let Some(dup) = duplicate {
            self.ops.destroy(dup);
        }
        frequency
    }

    /// Find the stored entry equal to `data`. Never changes frequencies and
    /// never triggers growth.
    pub fn lookup(&self, data: &T) -> Option<EntryRef<'_, T>> {
        let k = self.store.find(&self.ops, data)?;
        Some(self.store.view(k))
    }

    /// Frequency of `data`, or 0 when absent.
    pub fn frequency(&self, data: &T) -> usize {
        self.lookup(data).map_or(0, |e| e.frequency)
    }

    pub fn contains(&self, data: &T) -> bool {
        self.lookup(data).is_some()
    }

    /// Every unique entry in slot order, chain insertion order within a slot.
    /// Empty tables return an empty, unallocated `Vec`.
    pub fn to_array(&self) -> Vec<EntryRef<'_, T>> {
        let out: Vec<_> = self.iter().collect();
        debug_assert_eq!(out.len(), self.store.counters.unique_entries);
        out
    }

    /// Lazily yields what [`to_array`](Self::to_array) collects.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            store: &self.store,
            buckets: self.store.buckets.iter(),
            chain: <&[DefaultKey]>::default().iter(),
            remaining: self.store.counters.unique_entries,
        }
    }

    /// Hand every stored value back with its frequency, in export order.
    /// `destroy` is not called for values returned this way.
    pub fn into_entries(mut self) -> Vec<(T, usize)> {
        let buckets = core::mem::take(&mut self.store.buckets);
        let mut entries = core::mem::take(&mut self.store.entries);
        buckets
            .into_iter()
            .flatten()
            .flat_map(Chain::into_keys)
            .filter_map(|k| entries.remove(k))
            .map(|e| (e.data, e.frequency))
            .collect()
    }

    pub fn capacity(&self) -> usize {
        self.store.counters.capacity
    }

    pub fn unique_entries(&self) -> usize {
        self.store.counters.unique_entries
    }

    pub fn total_entries(&self) -> usize {
        self.store.counters.total_entries
    }

    pub fn len(&self) -> usize {
        self.unique_entries()
    }

    pub fn is_empty(&self) -> bool {
        self.unique_entries() == 0
    }

    /// Index into [`schedule`](Self::schedule) of the current capacity.
    pub fn stage(&self) -> usize {
        self.store.counters.stage
    }

    pub fn schedule(&self) -> &[usize] {
        &self.schedule
    }

    pub fn growth_threshold(&self) -> f64 {
        self.growth_threshold
    }

    pub fn ops(&self) -> &O {
        &self.ops
    }

    pub fn metrics(&self) -> Metrics {
        Metrics::of(&self.store.buckets)
    }
}

impl<T, O> Drop for ChainTable<T, O>
where
    O: EntryOps<T>,
{
    fn drop(&mut self) {
        let buckets = core::mem::take(&mut self.store.buckets);
        for k in buckets.into_iter().flatten().flat_map(Chain::into_keys) {
            if let Some(e) = self.store.entries.remove(k) {
                self.ops.destroy(e.data);
            }
        }
    }
}

impl<T, O> fmt::Debug for ChainTable<T, O>
where
    O: EntryOps<T>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = &self.store.counters;
        f.debug_struct("ChainTable")
            .field("capacity", &c.capacity)
            .field("stage", &c.stage)
            .field("unique_entries", &c.unique_entries)
            .field("total_entries", &c.total_entries)
            .field("growth_threshold", &self.growth_threshold)
            .finish_non_exhaustive()
    }
}

/// Iterator over the entries of a `ChainTable`.
pub struct Iter<'a, T> {
    store: &'a Store<T>,
    buckets: core::slice::Iter<'a, Option<Chain>>,
    chain: core::slice::Iter<'a, DefaultKey>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = EntryRef<'a, T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(&k) = self.chain.next() {
                self.remaining -= 1;
                return Some(self.store.view(k));
            }
            self.chain = self.buckets.by_ref().flatten().next()?.as_slice().iter();
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> core::iter::FusedIterator for Iter<'_, T> {}

impl<'a, T, O> IntoIterator for &'a ChainTable<T, O>
where
    O: EntryOps<T>,
{
    type Item = EntryRef<'a, T>;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::{string_hash, Callbacks};
    use std::cell::RefCell;
    use std::rc::Rc;

    type Tagged = (&'static str, u32);

    // Hash and compare on the name only, so the tag tells representatives
    // apart from later duplicates.
    fn tagged_ops(released: Rc<RefCell<Vec<Tagged>>>) -> impl EntryOps<Tagged> {
        Callbacks::new(
            |t: &Tagged| string_hash(t.0),
            |a: &Tagged, b: &Tagged| a.0.cmp(b.0),
        )
        .with_destroy(move |t: Tagged| released.borrow_mut().push(t))
    }

    fn modulo_ops() -> impl EntryOps<u64> {
        Callbacks::new(|v: &u64| *v, |a: &u64, b: &u64| a.cmp(b))
    }

    #[test]
    fn fresh_table_reports_first_stage() {
        let t: ChainTable<String> = ChainTable::new(&[31], 0.73).unwrap();
        assert_eq!(t.capacity(), 31);
        assert_eq!(t.unique_entries(), 0);
        assert_eq!(t.total_entries(), 0);
        assert_eq!(t.stage(), 0);
        assert!(t.is_empty());
        assert!(t.to_array().is_empty());
        assert_eq!(t.to_array().capacity(), 0);
    }

    #[test]
    fn invalid_configuration_rejects_construction() {
        assert_eq!(
            ChainTable::<String>::new(&[], 0.5).unwrap_err(),
            ConfigError::EmptySchedule
        );
        assert!(ChainTable::<String>::new(&[7, 7], 0.5).is_err());
        assert!(ChainTable::<String>::new(&[7, 11], 0.0).is_err());
    }

    #[test]
    fn duplicate_keeps_first_representative_and_releases_new_value() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let mut t = ChainTable::with_ops(tagged_ops(released.clone()), &[11, 23], 0.73).unwrap();

        assert_eq!(t.add(("a", 1)), 1);
        assert_eq!(t.add(("a", 2)), 2);
        assert_eq!(t.add(("a", 3)), 3);
        assert_eq!(*released.borrow(), vec![("a", 2), ("a", 3)]);

        let e = t.lookup(&("a", 99)).unwrap();
        assert_eq!(*e.data, ("a", 1));
        assert_eq!(e.frequency, 3);
        assert_eq!(t.unique_entries(), 1);
        assert_eq!(t.total_entries(), 3);

        drop(t);
        assert_eq!(*released.borrow(), vec![("a", 2), ("a", 3), ("a", 1)]);
    }

    #[test]
    fn drop_releases_every_stored_value_once() {
        let released = Rc::new(RefCell::new(Vec::new()));
        {
            let ops = tagged_ops(released.clone());
            let mut t = ChainTable::with_ops(ops, &[3, 5, 7], 0.5).unwrap();
            for (i, name) in ["a", "b", "c", "d", "e", "f"].into_iter().enumerate() {
                t.add((name, i as u32));
            }
            assert!(released.borrow().is_empty());
        }
        let mut names: Vec<_> = released.borrow().iter().map(|t| t.0).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["a", "b", "c", "d", "e", "f"]);
    }

    #[test]
    fn into_entries_returns_ownership_without_destroy() {
        let released = Rc::new(RefCell::new(Vec::new()));
        let mut t = ChainTable::with_ops(tagged_ops(released.clone()), &[7], 1.0).unwrap();
        t.add(("x", 1));
        t.add(("y", 2));
        t.add(("x", 3));
        assert_eq!(released.borrow().len(), 1);

        let mut out = t.into_entries();
        out.sort_unstable();
        assert_eq!(out, vec![(("x", 1), 2), (("y", 2), 1)]);
        assert_eq!(released.borrow().len(), 1, "into_entries must not destroy");
    }

    #[test]
    fn chains_keep_insertion_order_and_lookup_scans_them() {
        // Identity hash over capacity 4: 1, 5, 9 share slot 1.
        let mut t = ChainTable::with_ops(modulo_ops(), &[4], 1.0).unwrap();
        for v in [1, 5, 2, 9, 5] {
            t.add(v);
        }
        let exported: Vec<u64> = t.iter().map(|e| *e.data).collect();
        assert_eq!(exported, vec![1, 5, 9, 2]);
        assert_eq!(t.frequency(&5), 2);
        assert_eq!(t.frequency(&9), 1);
        assert_eq!(t.frequency(&13), 0);
        assert!(!t.contains(&13));
        assert!(t.lookup(&3).is_none());
    }

    #[test]
    fn lookup_never_bumps_frequency() {
        let mut t: ChainTable<&str> = ChainTable::new(&[11, 23], 0.73).unwrap();
        t.add("k");
        t.add("k");
        for _ in 0..3 {
            assert_eq!(t.lookup(&"k").unwrap().frequency, 2);
        }
        assert_eq!(t.total_entries(), 2);
    }

    #[test]
    fn growth_happens_on_the_add_after_threshold_is_exceeded() {
        let mut t = ChainTable::with_ops(modulo_ops(), &[7, 11], 0.4).unwrap();
        t.add(100);
        t.add(200);
        t.add(300);
        assert_eq!(t.capacity(), 7);
        t.add(300);
        assert_eq!(t.capacity(), 11);
        assert_eq!(t.stage(), 1);
        for v in [100, 200] {
            assert_eq!(t.frequency(&v), 1);
        }
        assert_eq!(t.frequency(&300), 2);
    }

    #[test]
    fn rehash_relocates_by_new_capacity() {
        let mut t = ChainTable::with_ops(modulo_ops(), &[2, 5], 0.5).unwrap();
        // 0 and 2 share slot 0 at capacity 2.
        t.add(0);
        t.add(2);
        assert_eq!(t.metrics().chains, 1);
        t.add(4);
        assert_eq!(t.capacity(), 5);
        let exported: Vec<u64> = t.iter().map(|e| *e.data).collect();
        assert_eq!(exported, vec![0, 2, 4]);
        assert_eq!(t.metrics().chains, 3);
    }

    #[test]
    fn metrics_report_chain_shape() {
        let mut t = ChainTable::with_ops(modulo_ops(), &[10], 1.0).unwrap();
        assert_eq!(
            t.metrics(),
            Metrics {
                chains: 0,
                max_chain_length: 0,
                avg_chain_length: 0.0
            }
        );
        for v in [1, 3, 13, 23, 7] {
            t.add(v);
        }
        let m = t.metrics();
        assert_eq!(m.chains, 3);
        assert_eq!(m.max_chain_length, 3);
        assert!((m.avg_chain_length - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn iter_is_exact_size() {
        let mut t: ChainTable<u32> = ChainTable::new(&[3, 7, 17], 0.6).unwrap();
        for v in 0..20 {
            t.add(v % 8);
        }
        let it = t.iter();
        assert_eq!(it.len(), 8);
        assert_eq!((&t).into_iter().count(), 8);
        let sum: usize = t.iter().map(|e| e.frequency).sum();
        assert_eq!(sum, t.total_entries());
    }

    #[test]
    fn debug_output_shows_counters() {
        let mut t: ChainTable<u8> = ChainTable::new(&[5], 1.0).unwrap();
        t.add(1);
        let s = format!("{:?}", t);
        assert!(s.contains("capacity: 5"));
        assert!(s.contains("unique_entries: 1"));
    }

    #[test]
    fn default_table_uses_default_config() {
        let t: ChainTable<String> = ChainTable::default();
        assert_eq!(t.schedule(), crate::config::DEFAULT_SCHEDULE);
        assert_eq!(t.growth_threshold(), crate::config::DEFAULT_GROWTH_THRESHOLD);
    }

    #[test]
    fn table_is_send_and_sync_when_contents_are() {
        fn assert_send_sync<X: Send + Sync>() {}
        assert_send_sync::<ChainTable<String>>();
        assert_send_sync::<ChainTable<u64, DefaultOps>>();
        assert_send_sync::<Iter<'static, String>>();
    }
}

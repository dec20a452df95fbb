//! Chain: the ordered entries sharing one bucket slot.

use slotmap::DefaultKey;

/// Keys of the entries in one slot, in insertion order. Payloads live in the
/// table's entry arena; a chain only orders them.
#[derive(Clone, Debug, Default)]
pub(crate) struct Chain {
    keys: Vec<DefaultKey>,
}

impl Chain {
    pub(crate) fn with_first(key: DefaultKey) -> Self {
        Self { keys: vec![key] }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    #[inline]
    pub(crate) fn push(&mut self, key: DefaultKey) {
        self.keys.push(key);
    }

    /// First key (in insertion order) satisfying `matches`.
    pub(crate) fn find(&self, mut matches: impl FnMut(DefaultKey) -> bool) -> Option<DefaultKey> {
        self.keys.iter().copied().find(|&k| matches(k))
    }

    #[inline]
    pub(crate) fn as_slice(&self) -> &[DefaultKey] {
        &self.keys
    }

    pub(crate) fn keys(&self) -> impl Iterator<Item = DefaultKey> + '_ {
        self.keys.iter().copied()
    }

    pub(crate) fn into_keys(self) -> impl Iterator<Item = DefaultKey> {
        self.keys.into_iter()
    }
}

/// One optional chain per slot; `buckets.len()` is the table capacity.
pub(crate) type Buckets = Vec<Option<Chain>>;

pub(crate) fn empty_buckets(capacity: usize) -> Buckets {
    let mut buckets = Vec::with_capacity(capacity);
    buckets.resize_with(capacity, || None);
    buckets
}

/// Reduce a raw callback hash to a slot index.
#[inline]
pub(crate) fn slot_for(hash: u64, capacity: usize) -> usize {
    // capacity fits in u64 on every supported target, and the remainder is
    // below capacity, so it fits back in usize.
    (hash % capacity as u64) as usize
}

/// Append `key` to the chain at `slot`, creating the chain if the slot is empty.
pub(crate) fn append(buckets: &mut Buckets, slot: usize, key: DefaultKey) {
    match &mut buckets[slot] {
        Some(chain) => chain.push(key),
        empty @ None => *empty = Some(Chain::with_first(key)),
    }
}

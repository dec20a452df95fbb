//! Caller-supplied hashing, equality and release behavior.
//!
//! The table never hashes, compares or frees payloads on its own; it goes
//! through an `EntryOps<T>` value stored inside the table at construction.

use core::cmp::Ordering;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::marker::PhantomData;
use hashbrown::hash_map::DefaultHashBuilder;

/// The callback set a `ChainTable` is parameterized over.
///
/// - `hash` must be a deterministic function of the payload's logical value.
///   Its output is unbounded; the table reduces it modulo the capacity.
/// - `equivalent` decides logical equality. Two payloads that are
///   equivalent must hash identically.
/// - `destroy` releases one payload the table owns. The default drops it.
pub trait EntryOps<T> {
    fn hash(&self, data: &T) -> u64;

    fn equivalent(&self, a: &T, b: &T) -> bool;

    #[inline]
    fn destroy(&self, data: T) {
        drop(data);
    }
}

/// `EntryOps` for payloads that already implement `Hash + Eq`.
#[derive(Clone, Debug, Default)]
pub struct DefaultOps<S = DefaultHashBuilder> {
    hasher: S,
}

impl<S> DefaultOps<S> {
    pub fn with_hasher(hasher: S) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }
}

impl<T, S> EntryOps<T> for DefaultOps<S>
where
    T: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, data: &T) -> u64 {
        self.hasher.hash_one(data)
    }

    #[inline]
    fn equivalent(&self, a: &T, b: &T) -> bool {
        a == b
    }
}

/// `EntryOps` assembled from plain closures.
///
/// `compare` follows the three-way convention; only `Ordering::Equal` versus
/// anything else is significant. Without `with_destroy`, payloads are dropped.
pub struct Callbacks<T, H, C, D = fn(T)> {
    hash: H,
    compare: C,
    destroy: D,
    _pd: PhantomData<fn(&T)>,
}

impl<T, H, C> Callbacks<T, H, C>
where
    H: Fn(&T) -> u64,
    C: Fn(&T, &T) -> Ordering,
{
    pub fn new(hash: H, compare: C) -> Self {
        Self {
            hash,
            compare,
            destroy: drop::<T>,
            _pd: PhantomData,
        }
    }
}

impl<T, H, C, D> Callbacks<T, H, C, D> {
    /// Replace the release callback.
    pub fn with_destroy<D2>(self, destroy: D2) -> Callbacks<T, H, C, D2>
    where
        D2: Fn(T),
    {
        Callbacks {
            hash: self.hash,
            compare: self.compare,
            destroy,
            _pd: PhantomData,
        }
    }
}

impl<T, H, C, D> EntryOps<T> for Callbacks<T, H, C, D>
where
    H: Fn(&T) -> u64,
    C: Fn(&T, &T) -> Ordering,
    D: Fn(T),
{
    #[inline]
    fn hash(&self, data: &T) -> u64 {
        (self.hash)(data)
    }

    #[inline]
    fn equivalent(&self, a: &T, b: &T) -> bool {
        (self.compare)(a, b) == Ordering::Equal
    }

    #[inline]
    fn destroy(&self, data: T) {
        (self.destroy)(data)
    }
}

impl<T, H, C, D> fmt::Debug for Callbacks<T, H, C, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callbacks").finish_non_exhaustive()
    }
}

/// Multiplicative string hash (K&R style): `h = c + 31 * h` over the bytes.
///
/// Handy as the `hash` half of a `Callbacks` set for string payloads when a
/// stable, seed-free hash is wanted.
pub fn string_hash<S: AsRef<str> + ?Sized>(s: &S) -> u64 {
    s.as_ref()
        .bytes()
        .fold(0u64, |h, b| u64::from(b).wrapping_add(h.wrapping_mul(31)))
}

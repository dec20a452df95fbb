//! chain-table: a single-threaded, separately chained hash table that
//! counts duplicate insertions and grows through a fixed capacity schedule.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: an embeddable associative container whose hashing, equality and
//!   payload release are supplied by the caller, with frequency counting
//!   for logically equal values and chain-length metrics.
//! - Layers:
//!   - `EntryOps<T>`: the callback set (`hash`, `equivalent`, `destroy`).
//!     `DefaultOps` covers `T: Hash + Eq`; `Callbacks` wraps closures.
//!   - Chains: each bucket slot holds an optional `Vec` of entry keys in
//!     insertion order. Payloads live in a `SlotMap` arena.
//!   - Rehash engine: before every `add`, decides whether to advance one
//!     stage in the schedule and, if so, rebuilds the bucket array.
//!   - `ChainTable<T, O>`: owns all of the above plus the counters.
//!
//! Constraints
//! - No internal locking. The table is `Send`/`Sync` whenever `T` and the
//!   ops are; callers sharing it across threads wrap it in a `Mutex`.
//! - No removal of individual values; the table only grows.
//! - Capacity is always `schedule[stage]`; once the last stage is reached
//!   chains grow without bound.
//! - Within one chain no two entries are `equivalent`.
//!
//! Growth
//! - Checked once at the start of every `add`: grow iff
//!   `threshold < 1.0`, there is a next stage, and
//!   `unique / capacity > threshold`.
//! - Relocation moves arena keys only, re-asking `hash` for each entry;
//!   payloads are never copied or compared during a rehash. The new array
//!   is fully built before it replaces the old one.
//!
//! Ownership
//! - `add` takes the value by value. A value equal to a stored one is not
//!   kept: the stored entry's frequency goes up and the passed value goes
//!   to `EntryOps::destroy` right away, after the table is consistent.
//! - Dropping the table sends every stored value to `destroy`;
//!   `into_entries` hands them back instead.
//!
//! Errors
//! - Bad schedules and thresholds are rejected at construction with
//!   `ConfigError`; nothing is repaired. There is no null payload to
//!   reject, and allocation failure aborts as usual.

mod chain;
pub mod config;
mod metrics;
pub mod ops;
mod rehash;
mod table;
mod table_proptest;

// Public surface
pub use config::{ConfigError, TableConfig};
pub use metrics::Metrics;
pub use ops::{Callbacks, DefaultOps, EntryOps};
pub use table::{ChainTable, EntryRef, Iter};

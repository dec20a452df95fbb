//! Chain-distribution metrics.

use crate::chain::Buckets;

/// Shape of the chains in a table.
///
/// `avg_chain_length` is exactly `0.0` (not NaN) when there are no chains.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Metrics {
    /// Number of non-empty slots.
    pub chains: usize,
    pub max_chain_length: usize,
    pub avg_chain_length: f64,
}

impl Metrics {
    pub(crate) fn from_lengths(lengths: impl IntoIterator<Item = usize>) -> Self {
        let (chains, max, total) = lengths
            .into_iter()
            .fold((0usize, 0usize, 0usize), |(n, max, total), len| {
                (n + 1, max.max(len), total + len)
            });
        let avg_chain_length = if chains == 0 {
            0.0
        } else {
            total as f64 / chains as f64
        };
        Self {
            chains,
            max_chain_length: max,
            avg_chain_length,
        }
    }

    pub(crate) fn of(buckets: &Buckets) -> Self {
        Self::from_lengths(buckets.iter().flatten().map(|c| c.len()))
    }
}

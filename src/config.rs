//! Table configuration: the capacity schedule and the growth threshold.

use thiserror::Error;

/// Capacities a default-configured table grows through.
pub const DEFAULT_SCHEDULE: &[usize] = &[
    7, 17, 37, 79, 163, 331, 673, 1361, 2729, 5471, 10949, 21911, 43853, 87719,
];

/// Unique-entries-to-capacity ratio that must be exceeded before growing.
pub const DEFAULT_GROWTH_THRESHOLD: f64 = 0.75;

/// Rejected table configuration. Construction fails outright; the input is
/// never repaired.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("capacity schedule is empty")]
    EmptySchedule,

    #[error("first capacity in the schedule must be greater than zero")]
    ZeroCapacity,

    #[error("schedule not ascending at index {index}: {previous} then {next}")]
    NotAscending {
        index: usize,
        previous: usize,
        next: usize,
    },

    #[error("growth threshold {0} is outside (0, 1]")]
    InvalidThreshold(f64),
}

/// Schedule and threshold for a `ChainTable`.
#[derive(Clone, Debug, PartialEq)]
pub struct TableConfig {
    schedule: Vec<usize>,
    growth_threshold: f64,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            schedule: DEFAULT_SCHEDULE.to_vec(),
            growth_threshold: DEFAULT_GROWTH_THRESHOLD,
        }
    }
}

impl TableConfig {
    pub fn new(schedule: impl Into<Vec<usize>>, growth_threshold: f64) -> Self {
        Self {
            schedule: schedule.into(),
            growth_threshold,
        }
    }

    pub fn with_schedule(mut self, schedule: impl Into<Vec<usize>>) -> Self {
        self.schedule = schedule.into();
        self
    }

    pub fn with_growth_threshold(mut self, growth_threshold: f64) -> Self {
        self.growth_threshold = growth_threshold;
        self
    }

    pub fn schedule(&self) -> &[usize] {
        &self.schedule
    }

    pub fn growth_threshold(&self) -> f64 {
        self.growth_threshold
    }

    /// Check the schedule is non-empty, starts above zero and is strictly
    /// ascending, and that the threshold lies in `(0, 1]`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let first = *self.schedule.first().ok_or(ConfigError::EmptySchedule)?;
        if first == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if let Some((i, w)) = self
            .schedule
            .windows(2)
            .enumerate()
            .find(|(_, w)| w[0] >= w[1])
        {
            return Err(ConfigError::NotAscending {
                index: i + 1,
                previous: w[0],
                next: w[1],
            });
        }
        // Written so that NaN fails as well.
        if !(self.growth_threshold > 0.0 && self.growth_threshold <= 1.0) {
            return Err(ConfigError::InvalidThreshold(self.growth_threshold));
        }
        Ok(())
    }

    /// Validate and split into the pieces a table stores.
    pub(crate) fn into_parts(self) -> Result<(Box<[usize]>, f64), ConfigError> {
        self.validate()?;
        Ok((self.schedule.into_boxed_slice(), self.growth_threshold))
    }
}

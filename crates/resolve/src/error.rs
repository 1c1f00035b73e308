use thiserror::Error;

/// Invalid resolution settings. Raised before any record is processed.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("fuzzy_threshold must be within [0, 1], got {0}")]
    ThresholdOutOfRange(f64),

    #[error("field weight `{field}` must be a finite non-negative number, got {value}")]
    InvalidWeight { field: &'static str, value: f64 },

    #[error("field weights sum to zero")]
    ZeroWeightSum,

    #[error("max_block_size must be at least 2, got {0}")]
    BlockCapacityTooSmall(usize),
}

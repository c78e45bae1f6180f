//! Batch configuration.

use serde::{Deserialize, Serialize};
use sqlbridge_core::{Error, Result};

/// Default flush threshold: rows held before the pending batch is executed.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 200_000;

/// Batch configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Flush threshold. Must be positive.
    pub max_batch_size: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

impl BatchConfig {
    /// Create a configuration with the default threshold.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the flush threshold.
    pub fn max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size;
        self
    }

    /// Reject a zero threshold.
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(Error::config("max batch size must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold() {
        assert_eq!(BatchConfig::new().max_batch_size, 200_000);
        assert!(BatchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let err = BatchConfig::new().max_batch_size(0).validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}

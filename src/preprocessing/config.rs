//! Cleaning configuration

use serde::{Deserialize, Serialize};

/// Configuration for the data cleaner
///
/// Every step is enabled by default. Disabling a step can leave values the
/// numeric representation cannot hold; such columns are kept as categorical.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CleaningConfig {
    /// Remove exact duplicate rows, keeping the first occurrence
    pub drop_duplicates: bool,

    /// Fill missing numeric values with the mean and categorical values with the mode
    pub fill_missing: bool,

    /// Trim leading and trailing whitespace from text cells
    pub strip_whitespace: bool,

    /// Coerce every value in a numeric column to a number
    pub coerce_types: bool,

    /// Drop columns whose values are all identical
    pub drop_constant_columns: bool,

    /// Minimum share of parseable non-missing cells for a column to be numeric
    pub numeric_threshold: f64,
}

impl Default for CleaningConfig {
    fn default() -> Self {
        Self {
            drop_duplicates: true,
            fill_missing: true,
            strip_whitespace: true,
            coerce_types: true,
            drop_constant_columns: true,
            numeric_threshold: 0.5,
        }
    }
}

impl CleaningConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to toggle row deduplication
    pub fn with_drop_duplicates(mut self, enabled: bool) -> Self {
        self.drop_duplicates = enabled;
        self
    }

    /// Builder method to toggle missing value filling
    pub fn with_fill_missing(mut self, enabled: bool) -> Self {
        self.fill_missing = enabled;
        self
    }

    /// Builder method to toggle whitespace trimming
    pub fn with_strip_whitespace(mut self, enabled: bool) -> Self {
        self.strip_whitespace = enabled;
        self
    }

    /// Builder method to toggle numeric coercion
    pub fn with_coerce_types(mut self, enabled: bool) -> Self {
        self.coerce_types = enabled;
        self
    }

    /// Builder method to toggle zero-variance pruning
    pub fn with_drop_constant_columns(mut self, enabled: bool) -> Self {
        self.drop_constant_columns = enabled;
        self
    }

    /// Builder method to set the numeric detection threshold
    pub fn with_numeric_threshold(mut self, threshold: f64) -> Self {
        self.numeric_threshold = threshold.clamp(0.0, 1.0);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CleaningConfig::default();
        assert!(config.drop_duplicates);
        assert!(config.fill_missing);
        assert!(config.drop_constant_columns);
        assert_eq!(config.numeric_threshold, 0.5);
    }

    #[test]
    fn test_builder_pattern() {
        let config = CleaningConfig::new()
            .with_drop_duplicates(false)
            .with_coerce_types(false)
            .with_numeric_threshold(1.5);

        assert!(!config.drop_duplicates);
        assert!(!config.coerce_types);
        assert_eq!(config.numeric_threshold, 1.0);
    }
}

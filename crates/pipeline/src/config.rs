use graph::Vocabulary;
use merge::MergeConfig;
use normalize::LocaleTable;
use resolve::{ResolutionConfig, RunBudget};
use serde::{Deserialize, Serialize};

use crate::error::PipelineError;

/// Everything a run needs to know up front. Every section has defaults, so
/// `{}` is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub resolution: ResolutionConfig,
    pub merge: MergeConfig,
    pub vocabulary: Vocabulary,
    pub budget: RunBudget,
    pub locale: LocaleTable,
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), PipelineError> {
        self.resolution.validate()?;
        self.merge.validate()?;
        self.vocabulary.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use resolve::{BlockingStrategy, ConfigError, LinkageMode};

    #[test]
    fn test_empty_object_is_default() {
        let config: PipelineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections() {
        let config: PipelineConfig = serde_json::from_str(
            r#"{
                "resolution": {
                    "fuzzy_threshold": 0.9,
                    "blocking_strategy": "first-token",
                    "linkage": "complete-linkage"
                },
                "merge": { "low_confidence_threshold": 0.6 },
                "budget": { "max_blocks": 10 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.resolution.fuzzy_threshold, 0.9);
        assert_eq!(config.resolution.blocking_strategy, BlockingStrategy::FirstToken);
        assert_eq!(config.resolution.linkage, LinkageMode::CompleteLinkage);
        assert_eq!(config.resolution.max_block_size, 500);
        assert_eq!(config.merge.low_confidence_threshold, 0.6);
        assert_eq!(config.budget.max_blocks, Some(10));
    }

    #[test]
    fn test_validation_surfaces_first_error() {
        let mut config = PipelineConfig::default();
        config.resolution.fuzzy_threshold = 1.5;
        assert_eq!(
            config.validate(),
            Err(PipelineError::Resolution(ConfigError::ThresholdOutOfRange(1.5)))
        );
    }
}

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::similarity::Field;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Minimum similarity for two records to be linked
    pub fuzzy_threshold: f64,
    pub field_weights: FieldWeights,
    pub blocking_strategy: BlockingStrategy,
    pub linkage: LinkageMode,
    /// Below this many records every pair is compared regardless of blocking
    pub full_comparison_below: usize,
    /// Blocks larger than this are reported and compared within a sliding window
    pub max_block_size: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: 0.85,
            field_weights: FieldWeights::default(),
            blocking_strategy: BlockingStrategy::Phonetic,
            linkage: LinkageMode::ConnectedComponents,
            full_comparison_below: 50,
            max_block_size: 500,
        }
    }
}

impl ResolutionConfig {
    pub fn with_threshold(mut self, fuzzy_threshold: f64) -> Self {
        self.fuzzy_threshold = fuzzy_threshold;
        self
    }

    pub fn with_linkage(mut self, linkage: LinkageMode) -> Self {
        self.linkage = linkage;
        self
    }

    pub fn with_blocking(mut self, blocking_strategy: BlockingStrategy) -> Self {
        self.blocking_strategy = blocking_strategy;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(ConfigError::ThresholdOutOfRange(self.fuzzy_threshold));
        }
        self.field_weights.validate()?;
        if self.max_block_size < 2 {
            return Err(ConfigError::BlockCapacityTooSmall(self.max_block_size));
        }
        Ok(())
    }
}

/// Weights of the per-field similarities. Name dominates by default: it is
/// the one field every source reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FieldWeights {
    pub name_weight: f64,
    pub birth_date_weight: f64,
    pub birth_place_weight: f64,
    pub nationality_overlap_weight: f64,
}

impl Default for FieldWeights {
    fn default() -> Self {
        Self {
            name_weight: 0.6,
            birth_date_weight: 0.2,
            birth_place_weight: 0.1,
            nationality_overlap_weight: 0.1,
        }
    }
}

impl FieldWeights {
    pub fn weight(&self, field: Field) -> f64 {
        match field {
            Field::Name => self.name_weight,
            Field::BirthDate => self.birth_date_weight,
            Field::BirthPlace => self.birth_place_weight,
            Field::NationalityOverlap => self.nationality_overlap_weight,
        }
    }

    pub fn total(&self) -> f64 {
        Field::ALL.iter().map(|f| self.weight(*f)).sum()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for field in Field::ALL {
            let value = self.weight(field);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidWeight {
                    field: field.weight_key(),
                    value,
                });
            }
        }
        if self.total() <= 0.0 {
            return Err(ConfigError::ZeroWeightSum);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum BlockingStrategy {
    /// First folded name token
    FirstToken,
    /// Soundex code of the first folded name token
    Phonetic,
    /// Single block: every pair is compared
    None,
}

impl BlockingStrategy {
    /// The next strategy producing smaller blocks, if any
    pub fn stricter(self) -> Option<BlockingStrategy> {
        match self {
            BlockingStrategy::None => Some(BlockingStrategy::Phonetic),
            BlockingStrategy::Phonetic => Some(BlockingStrategy::FirstToken),
            BlockingStrategy::FirstToken => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BlockingStrategy::FirstToken => "first-token",
            BlockingStrategy::Phonetic => "phonetic",
            BlockingStrategy::None => "none",
        }
    }
}

/// How qualifying edges turn into clusters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum LinkageMode {
    /// Connected components: chains of similar records merge transitively
    #[default]
    ConnectedComponents,
    /// Every pair inside a cluster must qualify on its own
    CompleteLinkage,
}

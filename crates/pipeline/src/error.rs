use graph::VocabularyError;
use merge::MergeConfigError;
use resolve::ConfigError;
use thiserror::Error;

/// Raised while building a pipeline, before any record is touched
#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("invalid resolution config: {0}")]
    Resolution(#[from] ConfigError),
    #[error("invalid merge config: {0}")]
    Merge(#[from] MergeConfigError),
    #[error("invalid predicate vocabulary: {0}")]
    Vocabulary(#[from] VocabularyError),
}

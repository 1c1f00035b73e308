pub mod audit;
pub mod entity;
pub mod merger;
pub mod strategy;

pub use audit::AuditEntry;
pub use entity::{entity_id_for, CanonicalEntity, FieldValue, MergedField};
pub use merger::{EntityMerger, MergeConfig, MergeConfigError};
pub use strategy::{FieldKind, FieldStrategy, Member, StrategyTable};

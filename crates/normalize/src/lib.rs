pub mod locale;
pub mod normalizer;
pub mod schema;

pub use locale::LocaleTable;
pub use normalizer::{fold_text, fold_tokens, parse_date, RecordNormalizer};
pub use schema::{BirthDate, NormalizedRecord, Place};

pub mod reader;
pub mod record;

pub use reader::{record_from_map, RecordReader};
pub use record::{generate_record_id, CandidateRecord, RecordId, CURRENT_CLUB_FIELD};

use anyhow::Result;
use std::path::Path;

/// Read candidate records from a single file
pub async fn ingest_file(file_path: &Path, max_rows: Option<usize>) -> Result<Vec<CandidateRecord>> {
    RecordReader::new(max_rows).read_file(file_path).await
}

/// Ingest every supported file under a directory
pub async fn ingest_directory(dir_path: &Path, max_rows: Option<usize>) -> Result<Vec<CandidateRecord>> {
    RecordReader::new(max_rows).read_directory(dir_path).await
}

/// Ingest a path that may be either a file or a directory
pub async fn ingest_path(path: &Path, max_rows: Option<usize>) -> Result<Vec<CandidateRecord>> {
    if path.is_dir() {
        ingest_directory(path, max_rows).await
    } else {
        ingest_file(path, max_rows).await
    }
}

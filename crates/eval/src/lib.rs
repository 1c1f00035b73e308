pub mod test_set;
pub mod benchmark;
pub mod plots;

pub use test_set::{get_test_set, labeled_records, LabeledRecord};
pub use benchmark::{score_partition, Benchmarker, BenchmarkResults, PairwiseScores};
pub use plots::generate_plots;

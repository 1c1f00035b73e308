use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

pub struct Metrics {
    // Counters
    total_requests: AtomicUsize,
    successful_requests: AtomicUsize,
    failed_requests: AtomicUsize,

    // Timing (in microseconds)
    total_run_time_us: AtomicU64,

    // Counts
    total_runs: AtomicUsize,
    incomplete_runs: AtomicUsize,
    total_records_processed: AtomicUsize,
    total_entities_produced: AtomicUsize,
    total_low_confidence_entities: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            total_run_time_us: AtomicU64::new(0),
            total_runs: AtomicUsize::new(0),
            incomplete_runs: AtomicUsize::new(0),
            total_records_processed: AtomicUsize::new(0),
            total_entities_produced: AtomicUsize::new(0),
            total_low_confidence_entities: AtomicUsize::new(0),
        })
    }

    pub fn record_request(&self, success: bool) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_run(&self, duration: Duration, output: &pipeline::RunOutput) {
        self.total_run_time_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.total_runs.fetch_add(1, Ordering::Relaxed);
        if !output.complete {
            self.incomplete_runs.fetch_add(1, Ordering::Relaxed);
        }
        self.total_records_processed
            .fetch_add(output.stats.resolution.records, Ordering::Relaxed);
        self.total_entities_produced
            .fetch_add(output.stats.entities, Ordering::Relaxed);
        self.total_low_confidence_entities
            .fetch_add(output.stats.low_confidence_entities, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            total_runs: self.total_runs.load(Ordering::Relaxed),
            incomplete_runs: self.incomplete_runs.load(Ordering::Relaxed),
            avg_run_time_ms: self.avg_time_ms(&self.total_run_time_us, &self.total_runs),
            total_records_processed: self.total_records_processed.load(Ordering::Relaxed),
            total_entities_produced: self.total_entities_produced.load(Ordering::Relaxed),
            total_low_confidence_entities: self.total_low_confidence_entities.load(Ordering::Relaxed),
        }
    }

    fn avg_time_ms(&self, total_us: &AtomicU64, count: &AtomicUsize) -> f64 {
        let total = total_us.load(Ordering::Relaxed) as f64;
        let cnt = count.load(Ordering::Relaxed) as f64;
        if cnt > 0.0 {
            total / cnt / 1000.0 // Convert to ms
        } else {
            0.0
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub total_runs: usize,
    pub incomplete_runs: usize,
    pub avg_run_time_ms: f64,
    pub total_records_processed: usize,
    pub total_entities_produced: usize,
    pub total_low_confidence_entities: usize,
}

pub struct TimedOperation {
    start: Instant,
}

impl TimedOperation {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

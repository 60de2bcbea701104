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
    total_processing_time_us: AtomicU64,
    total_query_time_us: AtomicU64,

    // Counts
    documents_processed: AtomicUsize,
    documents_failed: AtomicUsize,
    total_chunks_created: AtomicUsize,
    questions_answered: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total_requests: AtomicUsize::new(0),
            successful_requests: AtomicUsize::new(0),
            failed_requests: AtomicUsize::new(0),
            total_processing_time_us: AtomicU64::new(0),
            total_query_time_us: AtomicU64::new(0),
            documents_processed: AtomicUsize::new(0),
            documents_failed: AtomicUsize::new(0),
            total_chunks_created: AtomicUsize::new(0),
            questions_answered: AtomicUsize::new(0),
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

    /// `chunks` is `None` when processing failed
    pub fn record_processing(&self, duration: Duration, chunks: Option<usize>) {
        self.total_processing_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        match chunks {
            Some(n) => {
                self.documents_processed.fetch_add(1, Ordering::Relaxed);
                self.total_chunks_created.fetch_add(n, Ordering::Relaxed);
            }
            None => {
                self.documents_failed.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn record_question(&self, duration: Duration) {
        self.total_query_time_us.fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
        self.questions_answered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let documents_processed = self.documents_processed.load(Ordering::Relaxed);
        let documents_failed = self.documents_failed.load(Ordering::Relaxed);
        let questions_answered = self.questions_answered.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            successful_requests: self.successful_requests.load(Ordering::Relaxed),
            failed_requests: self.failed_requests.load(Ordering::Relaxed),
            documents_processed,
            documents_failed,
            total_chunks_created: self.total_chunks_created.load(Ordering::Relaxed),
            questions_answered,
            avg_processing_time_ms: avg_time_ms(
                &self.total_processing_time_us,
                documents_processed + documents_failed,
            ),
            avg_query_time_ms: avg_time_ms(&self.total_query_time_us, questions_answered),
        }
    }
}

fn avg_time_ms(total_us: &AtomicU64, count: usize) -> f64 {
    let total = total_us.load(Ordering::Relaxed) as f64;
    if count > 0 {
        total / count as f64 / 1000.0 // Convert to ms
    } else {
        0.0
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub total_requests: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub documents_processed: usize,
    pub documents_failed: usize,
    pub total_chunks_created: usize,
    pub questions_answered: usize,
    pub avg_processing_time_ms: f64,
    pub avg_query_time_ms: f64,
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_averages() {
        let metrics = Metrics::new();
        metrics.record_request(true);
        metrics.record_request(false);
        metrics.record_processing(Duration::from_millis(4), Some(3));
        metrics.record_processing(Duration::from_millis(2), None);
        metrics.record_question(Duration::from_millis(10));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 2);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.documents_processed, 1);
        assert_eq!(snapshot.documents_failed, 1);
        assert_eq!(snapshot.total_chunks_created, 3);
        assert_eq!(snapshot.avg_processing_time_ms, 3.0);
        assert_eq!(snapshot.avg_query_time_ms, 10.0);
    }

    #[test]
    fn test_empty_snapshot() {
        let snapshot = Metrics::new().snapshot();
        assert_eq!(snapshot.avg_query_time_ms, 0.0);
        assert_eq!(snapshot.questions_answered, 0);
    }
}

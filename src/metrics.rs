//! Request and scoring statistics for the recommendation service.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tracing::info;

/// Kind of scoring request being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Predict,
    Recommend,
}

/// Metrics collector for the service
pub struct ServiceMetrics {
    /// Successful single-card predictions
    pub predictions_served: AtomicU64,
    /// Successful multi-card recommendation requests
    pub recommendations_served: AtomicU64,
    /// Cards scored across all recommendation requests
    pub cards_scored: AtomicU64,
    /// Cards that fell back to the neutral placeholder
    pub card_failures: AtomicU64,
    /// Requests that ended in an error response
    pub request_errors: AtomicU64,
    /// Completed retrain requests
    pub retrains: AtomicU64,
    /// Processing times (in microseconds)
    processing_times: RwLock<Vec<u64>>,
    /// Score distribution buckets
    score_buckets: RwLock<[u64; 10]>,
    start_time: Instant,
}

impl ServiceMetrics {
    pub fn new() -> Self {
        Self {
            predictions_served: AtomicU64::new(0),
            recommendations_served: AtomicU64::new(0),
            cards_scored: AtomicU64::new(0),
            card_failures: AtomicU64::new(0),
            request_errors: AtomicU64::new(0),
            retrains: AtomicU64::new(0),
            processing_times: RwLock::new(Vec::with_capacity(1000)),
            score_buckets: RwLock::new([0; 10]),
            start_time: Instant::now(),
        }
    }

    /// Record a completed scoring request
    pub fn record_request(&self, kind: RequestKind, processing_time: Duration) {
        match kind {
            RequestKind::Predict => self.predictions_served.fetch_add(1, Ordering::Relaxed),
            RequestKind::Recommend => self.recommendations_served.fetch_add(1, Ordering::Relaxed),
        };

        if let Ok(mut times) = self.processing_times.write() {
            times.push(processing_time.as_micros() as u64);
            // Keep only the most recent samples
            if times.len() > 10000 {
                times.drain(0..5000);
            }
        }
    }

    /// Record one card score
    pub fn record_score(&self, score: f64) {
        self.cards_scored.fetch_add(1, Ordering::Relaxed);

        let bucket = (score.clamp(0.0, 1.0) * 10.0).min(9.0) as usize;
        if let Ok(mut buckets) = self.score_buckets.write() {
            buckets[bucket] += 1;
        }
    }

    pub fn record_card_failure(&self) {
        self.card_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.request_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retrain(&self) {
        self.retrains.fetch_add(1, Ordering::Relaxed);
    }

    /// Get processing time statistics
    pub fn get_processing_stats(&self) -> ProcessingStats {
        let mut sorted = match self.processing_times.read() {
            Ok(times) if !times.is_empty() => times.clone(),
            _ => return ProcessingStats::default(),
        };
        sorted.sort_unstable();

        let sum: u64 = sorted.iter().sum();
        let count = sorted.len();
        let percentile = |p: f64| sorted[((count as f64 * p) as usize).min(count - 1)];

        ProcessingStats {
            count: count as u64,
            mean_us: sum / count as u64,
            p50_us: sorted[count / 2],
            p95_us: percentile(0.95),
            p99_us: percentile(0.99),
            max_us: sorted[count - 1],
        }
    }

    /// Requests per second since startup
    pub fn get_throughput(&self) -> f64 {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        let total = self.predictions_served.load(Ordering::Relaxed)
            + self.recommendations_served.load(Ordering::Relaxed);
        if elapsed > 0.0 {
            total as f64 / elapsed
        } else {
            0.0
        }
    }

    pub fn get_score_distribution(&self) -> [u64; 10] {
        self.score_buckets.read().map(|b| *b).unwrap_or([0; 10])
    }

    /// Point-in-time view of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uptime_secs: self.start_time.elapsed().as_secs(),
            predictions_served: self.predictions_served.load(Ordering::Relaxed),
            recommendations_served: self.recommendations_served.load(Ordering::Relaxed),
            cards_scored: self.cards_scored.load(Ordering::Relaxed),
            card_failures: self.card_failures.load(Ordering::Relaxed),
            request_errors: self.request_errors.load(Ordering::Relaxed),
            retrains: self.retrains.load(Ordering::Relaxed),
            throughput_rps: self.get_throughput(),
            processing: self.get_processing_stats(),
            score_distribution: self.get_score_distribution(),
        }
    }

    /// Log summary statistics
    pub fn print_summary(&self) {
        let s = self.snapshot();

        info!(
            predictions = s.predictions_served,
            recommendations = s.recommendations_served,
            cards_scored = s.cards_scored,
            card_failures = s.card_failures,
            errors = s.request_errors,
            retrains = s.retrains,
            throughput = format!("{:.2} req/s", s.throughput_rps),
            "Service metrics summary"
        );
        info!(
            mean_us = s.processing.mean_us,
            p50_us = s.processing.p50_us,
            p95_us = s.processing.p95_us,
            p99_us = s.processing.p99_us,
            max_us = s.processing.max_us,
            "Request latency"
        );

        let total: u64 = s.score_distribution.iter().sum();
        for (i, &count) in s.score_distribution.iter().enumerate() {
            if count == 0 {
                continue;
            }
            let pct = (count as f64 / total as f64) * 100.0;
            info!(
                "Score {:.1}-{:.1}: {:>6} ({:>5.1}%) {}",
                i as f64 / 10.0,
                (i + 1) as f64 / 10.0,
                count,
                pct,
                "█".repeat(((pct / 5.0) as usize).min(20))
            );
        }
    }
}

impl Default for ServiceMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Processing time statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProcessingStats {
    pub count: u64,
    pub mean_us: u64,
    pub p50_us: u64,
    pub p95_us: u64,
    pub p99_us: u64,
    pub max_us: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub predictions_served: u64,
    pub recommendations_served: u64,
    pub cards_scored: u64,
    pub card_failures: u64,
    pub request_errors: u64,
    pub retrains: u64,
    pub throughput_rps: f64,
    pub processing: ProcessingStats,
    pub score_distribution: [u64; 10],
}

/// Periodically logs a metrics summary
pub struct MetricsReporter {
    metrics: Arc<ServiceMetrics>,
    interval_secs: u64,
}

impl MetricsReporter {
    pub fn new(metrics: Arc<ServiceMetrics>, interval_secs: u64) -> Self {
        Self {
            metrics,
            interval_secs,
        }
    }

    /// Start the periodic reporting task
    pub async fn start(self) {
        let mut interval = tokio::time::interval(Duration::from_secs(self.interval_secs.max(1)));
        // First tick completes immediately
        interval.tick().await;
        loop {
            interval.tick().await;
            self.metrics.print_summary();
        }
    }
}

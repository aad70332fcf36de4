//! Metrics and observability for media_frame

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use serde::{Deserialize, Serialize};

/// Global metrics collector
#[derive(Default)]
pub struct Metrics {
    pub total_requests: AtomicU64,
    pub successful_requests: AtomicU64,
    pub failed_requests: AtomicU64,
    pub total_latency_ms: AtomicU64,

    // Per-operation counters
    pub frame_read_count: AtomicU64,
    pub frame_probe_count: AtomicU64,
    pub archive_read_count: AtomicU64,
    pub frame_bytes_out: AtomicU64,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn record_request(&self, op: &str, success: bool, latency_ms: u64) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        if success {
            self.successful_requests.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failed_requests.fetch_add(1, Ordering::Relaxed);
        }

        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);

        match op {
            "frame.read" => self.frame_read_count.fetch_add(1, Ordering::Relaxed),
            "frame.probe" => self.frame_probe_count.fetch_add(1, Ordering::Relaxed),
            "archive.read" => self.archive_read_count.fetch_add(1, Ordering::Relaxed),
            _ => 0,
        };
    }

    pub fn record_frame_bytes(&self, bytes: u64) {
        self.frame_bytes_out.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let total = self.total_requests.load(Ordering::Relaxed);
        let successful = self.successful_requests.load(Ordering::Relaxed);
        let failed = self.failed_requests.load(Ordering::Relaxed);
        let total_latency = self.total_latency_ms.load(Ordering::Relaxed);

        MetricsSnapshot {
            total_requests: total,
            successful_requests: successful,
            failed_requests: failed,
            error_rate: if total > 0 { failed as f64 / total as f64 } else { 0.0 },
            avg_latency_ms: if total > 0 { total_latency / total } else { 0 },
            frame_bytes_out: self.frame_bytes_out.load(Ordering::Relaxed),
            operations: OperationMetrics {
                frame_read: self.frame_read_count.load(Ordering::Relaxed),
                frame_probe: self.frame_probe_count.load(Ordering::Relaxed),
                archive_read: self.archive_read_count.load(Ordering::Relaxed),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub error_rate: f64,
    pub avg_latency_ms: u64,
    pub frame_bytes_out: u64,
    pub operations: OperationMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationMetrics {
    pub frame_read: u64,
    pub frame_probe: u64,
    pub archive_read: u64,
}

/// Timer for tracking operation latency
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts_by_operation() {
        let metrics = Metrics::new();
        metrics.record_request("frame.read", true, 30);
        metrics.record_request("frame.read", false, 10);
        metrics.record_request("archive.read", true, 20);
        metrics.record_request("media.capabilities", true, 0);
        metrics.record_frame_bytes(1024);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.total_requests, 4);
        assert_eq!(snapshot.failed_requests, 1);
        assert_eq!(snapshot.avg_latency_ms, 15);
        assert_eq!(snapshot.error_rate, 0.25);
        assert_eq!(snapshot.frame_bytes_out, 1024);
        assert_eq!(snapshot.operations.frame_read, 2);
        assert_eq!(snapshot.operations.frame_probe, 0);
        assert_eq!(snapshot.operations.archive_read, 1);
    }
}

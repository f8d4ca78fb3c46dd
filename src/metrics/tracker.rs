use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// How many recent samples feed each rolling average.
const ROLLING_WINDOW: usize = 100;

/// Rolling window of duration samples. Bounded; pushing past capacity drops
/// the oldest sample.
struct RollingWindow {
    samples: VecDeque<f64>,
}

impl RollingWindow {
    fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(ROLLING_WINDOW),
        }
    }

    fn push(&mut self, sample_ms: f64) {
        if self.samples.len() == ROLLING_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(sample_ms);
    }

    fn average(&self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        self.samples.iter().sum::<f64>() / self.samples.len() as f64
    }
}

/// Point-in-time view of the tracker, safe to serialize.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsSnapshot {
    pub admitted: u64,
    pub rejected: u64,
    pub completed: u64,
    pub failed: u64,
    pub avg_scan_ms: f64,
    pub avg_query_ms: f64,
    pub data_files_loaded: u64,
}

/// Per-node metrics tracker.
pub struct MetricsTracker {
    admitted: AtomicU64,
    rejected: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    scan_ms: Mutex<RollingWindow>,
    query_ms: Mutex<RollingWindow>,
    data_files_loaded: AtomicU64,
}

impl MetricsTracker {
    pub fn new() -> Self {
        Self {
            admitted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            scan_ms: Mutex::new(RollingWindow::new()),
            query_ms: Mutex::new(RollingWindow::new()),
            data_files_loaded: AtomicU64::new(0),
        }
    }

    pub fn record_admitted(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records one end-to-end query duration and bumps the completion count.
    pub fn record_completion(&self, elapsed_ms: f64) {
        self.completed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut window) = self.query_ms.try_lock() {
            window.push(elapsed_ms);
        }
    }

    /// Records one local scan duration. Uses `try_lock` so a contended
    /// window drops the sample instead of stalling the query path.
    pub fn record_scan(&self, elapsed_ms: f64) {
        if let Ok(mut window) = self.scan_ms.try_lock() {
            window.push(elapsed_ms);
        }
    }

    pub fn set_data_files_loaded(&self, files: u64) {
        self.data_files_loaded.store(files, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            admitted: self.admitted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            avg_scan_ms: self.scan_ms.lock().map(|w| w.average()).unwrap_or(0.0),
            avg_query_ms: self.query_ms.lock().map(|w| w.average()).unwrap_or(0.0),
            data_files_loaded: self.data_files_loaded.load(Ordering::Relaxed),
        }
    }
}

impl Default for MetricsTracker {
    fn default() -> Self {
        Self::new()
    }
}

use crate::classifier::SizeParseError;
use crate::interfaces::ApiError;
use crate::types::Detection;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;
use thiserror::Error;

/// Recoverable failure recorded during a sweep.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanError {
    #[error("Failed to retrieve instances: {0}")]
    ListInstances(ApiError),

    #[error("Failed to retrieve files for instance {instance_id} at path '{path}': {source}")]
    ListFiles {
        instance_id: String,
        path: String,
        source: ApiError,
    },

    #[error("Unknown size format for instance {instance_id} at path '{path}': {source}")]
    UnparseableSize {
        instance_id: String,
        path: String,
        source: SizeParseError,
    },

    #[error("Failed to suspend instance {instance_id}: {source}")]
    Suspend {
        instance_id: String,
        source: ApiError,
    },

    #[error("Failed to send alert for instance {instance_id}: {source}")]
    Notify {
        instance_id: String,
        source: ApiError,
    },

    #[error("Depth limit {max_depth} reached for instance {instance_id} at path '{path}'")]
    DepthLimit {
        instance_id: String,
        path: String,
        max_depth: usize,
    },

    #[error("Scan of instance {instance_id} aborted: {reason}")]
    InstanceAborted { instance_id: String, reason: String },
}

impl ScanError {
    pub fn instance_id(&self) -> Option<&str> {
        match self {
            ScanError::ListInstances(_) => None,
            ScanError::ListFiles { instance_id, .. }
            | ScanError::UnparseableSize { instance_id, .. }
            | ScanError::Suspend { instance_id, .. }
            | ScanError::Notify { instance_id, .. }
            | ScanError::DepthLimit { instance_id, .. }
            | ScanError::InstanceAborted { instance_id, .. } => Some(instance_id),
        }
    }
}

/// Shared sweep accounting, safe to update from concurrent instance tasks.
#[derive(Debug)]
pub struct ScanProgress {
    pub instances_scanned: AtomicUsize,
    pub instances_failed: AtomicUsize,
    pub directories_listed: AtomicUsize,
    pub files_visited: AtomicUsize,
    pub suspensions: AtomicUsize,
    pub notifications: AtomicUsize,
    detections: Mutex<Vec<Detection>>,
    errors: Mutex<Vec<ScanError>>,
    start_time: Instant,
}

impl ScanProgress {
    pub fn new() -> Self {
        Self {
            instances_scanned: AtomicUsize::new(0),
            instances_failed: AtomicUsize::new(0),
            directories_listed: AtomicUsize::new(0),
            files_visited: AtomicUsize::new(0),
            suspensions: AtomicUsize::new(0),
            notifications: AtomicUsize::new(0),
            detections: Mutex::new(Vec::new()),
            errors: Mutex::new(Vec::new()),
            start_time: Instant::now(),
        }
    }

    pub fn increment_instances(&self) {
        self.instances_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed_instances(&self) {
        self.instances_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_dirs(&self) {
        self.directories_listed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_files(&self) {
        self.files_visited.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_suspensions(&self) {
        self.suspensions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_notifications(&self) {
        self.notifications.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_detection(&self, detection: Detection) {
        self.detections.lock().push(detection);
    }

    pub fn add_error(&self, error: ScanError) {
        self.errors.lock().push(error);
    }

    pub fn get_stats(&self) -> ScanStats {
        ScanStats {
            instances_scanned: self.instances_scanned.load(Ordering::Relaxed),
            instances_failed: self.instances_failed.load(Ordering::Relaxed),
            directories_listed: self.directories_listed.load(Ordering::Relaxed),
            files_visited: self.files_visited.load(Ordering::Relaxed),
            detections: self.detections.lock().len(),
            suspensions: self.suspensions.load(Ordering::Relaxed),
            notifications: self.notifications.load(Ordering::Relaxed),
            errors: self.errors.lock().len(),
            elapsed_ms: self.start_time.elapsed().as_millis() as u64,
        }
    }

    /// Snapshot everything recorded so far into a result.
    pub fn finish(&self) -> ScanResult {
        ScanResult {
            stats: self.get_stats(),
            detections: self.detections.lock().clone(),
            errors: self.errors.lock().clone(),
        }
    }
}

impl Default for ScanProgress {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub instances_scanned: usize,
    pub instances_failed: usize,
    pub directories_listed: usize,
    pub files_visited: usize,
    pub detections: usize,
    pub suspensions: usize,
    pub notifications: usize,
    pub errors: usize,
    pub elapsed_ms: u64,
}

/// Outcome of one sweep over the fleet.
#[derive(Debug, Clone, Default)]
pub struct ScanResult {
    pub stats: ScanStats,
    pub detections: Vec<Detection>,
    pub errors: Vec<ScanError>,
}

impl ScanResult {
    pub fn is_clean(&self) -> bool {
        self.detections.is_empty() && self.errors.is_empty()
    }

    pub fn errors_for<'a>(&'a self, instance_id: &'a str) -> impl Iterator<Item = &'a ScanError> {
        self.errors
            .iter()
            .filter(move |e| e.instance_id() == Some(instance_id))
    }

    pub fn summary(&self) -> String {
        format!(
            "{} instances ({} failed), {} dirs, {} files, {} detections, {} errors in {} ms",
            self.stats.instances_scanned,
            self.stats.instances_failed,
            self.stats.directories_listed,
            self.stats.files_visited,
            self.stats.detections,
            self.stats.errors,
            self.stats.elapsed_ms
        )
    }
}

/// What one instance walk produced.
#[derive(Debug, Clone, Default)]
pub struct InstanceReport {
    pub instance_id: String,
    pub directories_listed: usize,
    pub files_visited: usize,
    pub detections: Vec<Detection>,
    pub errors: Vec<ScanError>,
    /// The root listing failed, so nothing on this instance was inspected.
    pub root_failed: bool,
}

impl InstanceReport {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ..Self::default()
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::types::Rule;
    use std::sync::Arc;

    #[test]
    fn test_scan_progress_new() {
        let progress = ScanProgress::new();
        let stats = progress.get_stats();
        assert_eq!(stats.instances_scanned, 0);
        assert_eq!(stats.files_visited, 0);
        assert_eq!(stats.errors, 0);
    }

    #[test]
    fn test_scan_progress_increment() {
        let progress = ScanProgress::new();
        progress.increment_instances();
        progress.increment_files();
        progress.increment_files();
        progress.increment_dirs();
        progress.add_detection(Detection::new("a", "xmrig", Rule::MoneroMiner));
        progress.add_error(ScanError::ListInstances(ApiError::Status(500)));

        let stats = progress.get_stats();
        assert_eq!(stats.instances_scanned, 1);
        assert_eq!(stats.files_visited, 2);
        assert_eq!(stats.directories_listed, 1);
        assert_eq!(stats.detections, 1);
        assert_eq!(stats.errors, 1);
    }

    #[test]
    fn test_concurrent_updates() {
        let progress = Arc::new(ScanProgress::new());
        let mut handles = vec![];

        for i in 0..8 {
            let progress = Arc::clone(&progress);
            handles.push(std::thread::spawn(move || {
                for _ in 0..100 {
                    progress.increment_files();
                }
                progress.add_detection(Detection::new(
                    format!("instance{}", i),
                    "start.sh",
                    Rule::SuspiciousScript,
                ));
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        let result = progress.finish();
        assert_eq!(result.stats.files_visited, 800);
        assert_eq!(result.detections.len(), 8);
    }

    #[test]
    fn test_errors_for_instance() {
        let progress = ScanProgress::new();
        progress.add_error(ScanError::ListFiles {
            instance_id: "a".into(),
            path: "".into(),
            source: ApiError::Status(502),
        });
        progress.add_error(ScanError::ListInstances(ApiError::Timeout(
            std::time::Duration::from_secs(1),
        )));

        let result = progress.finish();
        assert_eq!(result.errors_for("a").count(), 1);
        assert_eq!(result.errors_for("b").count(), 0);
        assert!(!result.is_clean());
    }

    #[test]
    fn test_error_messages() {
        let err = ScanError::Suspend {
            instance_id: "abc".into(),
            source: ApiError::Status(403),
        };
        assert_eq!(
            err.to_string(),
            "Failed to suspend instance abc: Unexpected HTTP status 403"
        );
    }
}

//! Depth-first walk of one instance's remote file tree.

use crate::classifier::classify;
use crate::interfaces::{ApiError, FilesystemApi, Notifier, PanelApi};
use crate::metrics::{self, MetricTimer};
use crate::policy::{join_path, ScanPolicy};
use crate::progress::{InstanceReport, ScanError, ScanProgress};
use crate::types::{Detection, Rule};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lists directories through the filesystem API, classifies every entry and
/// suspends + alerts on each detection.
pub struct TreeWalker {
    filesystem: Arc<dyn FilesystemApi>,
    panel: Arc<dyn PanelApi>,
    notifier: Arc<dyn Notifier>,
    policy: ScanPolicy,
}

impl TreeWalker {
    pub fn new(
        filesystem: Arc<dyn FilesystemApi>,
        panel: Arc<dyn PanelApi>,
        notifier: Arc<dyn Notifier>,
        policy: ScanPolicy,
    ) -> Self {
        Self {
            filesystem,
            panel,
            notifier,
            policy,
        }
    }

    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    /// Walk an instance from the policy's root path.
    pub async fn walk(&self, instance_id: &str, progress: &ScanProgress) -> InstanceReport {
        let root = self.policy.root_path.clone();
        self.walk_path(instance_id, &root, progress).await
    }

    /// Walk an instance starting at `path`.
    pub async fn walk_path(
        &self,
        instance_id: &str,
        path: &str,
        progress: &ScanProgress,
    ) -> InstanceReport {
        let mut report = InstanceReport::new(instance_id);

        if self
            .walk_dir(instance_id, path, 0, &mut report, progress)
            .await
            .is_err()
        {
            report.root_failed = true;
        }

        debug!(
            "Finished instance {}: {} dirs, {} files, {} detections, {} errors",
            instance_id,
            report.directories_listed,
            report.files_visited,
            report.detections.len(),
            report.errors.len()
        );
        report
    }

    #[async_recursion::async_recursion]
    async fn walk_dir(
        &self,
        instance_id: &str,
        path: &str,
        depth: usize,
        report: &mut InstanceReport,
        progress: &ScanProgress,
    ) -> Result<(), ApiError> {
        let entries = {
            let _timer = MetricTimer::new("file_listing_latency");
            self.bounded(self.filesystem.list_files(instance_id, path))
                .await
        };

        let entries = match entries {
            Ok(entries) => entries,
            Err(source) => {
                warn!(
                    "Failed to retrieve files for instance with ID: {} at path: '{}': {}",
                    instance_id, path, source
                );
                self.record(
                    report,
                    progress,
                    ScanError::ListFiles {
                        instance_id: instance_id.to_string(),
                        path: path.to_string(),
                        source: source.clone(),
                    },
                );
                return Err(source);
            }
        };

        report.directories_listed += 1;
        progress.increment_dirs();

        for entry in &entries {
            report.files_visited += 1;
            progress.increment_files();

            let entry_path = join_path(path, &entry.name);
            debug!(
                "File: {} Extension: {} Purpose: {:?}",
                entry_path, entry.extension, entry.purpose
            );

            match classify(entry) {
                Ok(Some(rule)) => {
                    self.react(instance_id, &entry_path, rule, report, progress)
                        .await
                }
                Ok(None) => {}
                Err(source) => {
                    warn!(
                        "Unknown size format '{}' for {} on instance {}: {}",
                        entry.size, entry_path, instance_id, source
                    );
                    self.record(
                        report,
                        progress,
                        ScanError::UnparseableSize {
                            instance_id: instance_id.to_string(),
                            path: entry_path.clone(),
                            source,
                        },
                    );
                }
            }

            if !entry.should_descend() {
                continue;
            }

            if depth + 1 > self.policy.max_depth {
                warn!(
                    "Not descending into '{}' on instance {}: depth limit {} reached",
                    entry_path, instance_id, self.policy.max_depth
                );
                self.record(
                    report,
                    progress,
                    ScanError::DepthLimit {
                        instance_id: instance_id.to_string(),
                        path: entry_path,
                        max_depth: self.policy.max_depth,
                    },
                );
                continue;
            }

            // Already recorded; siblings are still walked.
            let _ = self
                .walk_dir(instance_id, &entry_path, depth + 1, report, progress)
                .await;
        }

        Ok(())
    }

    /// Suspend the instance and send one alert for a single detection.
    async fn react(
        &self,
        instance_id: &str,
        path: &str,
        rule: Rule,
        report: &mut InstanceReport,
        progress: &ScanProgress,
    ) {
        warn!(
            "Detection on instance {} at '{}': {} ({})",
            instance_id,
            path,
            rule.reason(),
            rule.id()
        );
        metrics::increment_detection(rule);

        let detection = Detection::new(instance_id, path, rule);
        report.detections.push(detection.clone());
        progress.add_detection(detection);

        match self.bounded(self.panel.suspend(instance_id)).await {
            Ok(()) => {
                info!("Server with ID: {} has been suspended successfully.", instance_id);
                progress.increment_suspensions();
            }
            Err(source) => {
                warn!("Failed to suspend server with ID: {}: {}", instance_id, source);
                self.record(
                    report,
                    progress,
                    ScanError::Suspend {
                        instance_id: instance_id.to_string(),
                        source,
                    },
                );
            }
        }

        match self
            .bounded(self.notifier.notify(instance_id, rule.reason()))
            .await
        {
            Ok(()) => {
                info!("Sent public alert for container {}", instance_id);
                progress.increment_notifications();
            }
            Err(source) => {
                warn!("Error sending public alert for container {}: {}", instance_id, source);
                self.record(
                    report,
                    progress,
                    ScanError::Notify {
                        instance_id: instance_id.to_string(),
                        source,
                    },
                );
            }
        }
    }

    async fn bounded<T, F>(&self, call: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        with_timeout(self.policy.request_timeout, call).await
    }

    fn record(&self, report: &mut InstanceReport, progress: &ScanProgress, error: ScanError) {
        report.errors.push(error.clone());
        progress.add_error(error);
    }
}

/// Run a remote call, mapping an elapsed deadline to [`ApiError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ApiError::Timeout(limit)),
    }
}

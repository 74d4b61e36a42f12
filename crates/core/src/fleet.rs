//! One sweep over every active instance.

use crate::interfaces::{FilesystemApi, Notifier, PanelApi};
use crate::metrics::{self, MetricTimer};
use crate::policy::ScanPolicy;
use crate::progress::{InstanceReport, ScanError, ScanProgress, ScanResult};
use crate::types::Instance;
use crate::walker::{with_timeout, TreeWalker};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// A unit of work the scheduler loop can repeat.
#[async_trait]
pub trait Sweep: Send + Sync {
    async fn sweep(&self) -> ScanResult;
}

pub struct FleetScanner {
    panel: Arc<dyn PanelApi>,
    walker: Arc<TreeWalker>,
    concurrency_limiter: Arc<Semaphore>,
}

impl FleetScanner {
    pub fn new(
        panel: Arc<dyn PanelApi>,
        filesystem: Arc<dyn FilesystemApi>,
        notifier: Arc<dyn Notifier>,
        policy: ScanPolicy,
    ) -> Self {
        let walker = TreeWalker::new(filesystem, Arc::clone(&panel), notifier, policy);
        Self::with_walker(panel, walker)
    }

    pub fn with_walker(panel: Arc<dyn PanelApi>, walker: TreeWalker) -> Self {
        let permits = walker.policy().max_concurrent_instances.max(1);
        Self {
            panel,
            walker: Arc::new(walker),
            concurrency_limiter: Arc::new(Semaphore::new(permits)),
        }
    }

    /// Fetch active instances and walk each of them. Never fails: every
    /// problem ends up in the returned result.
    pub async fn scan_all(&self) -> ScanResult {
        let _timer = MetricTimer::new("sweep_duration");
        let progress = Arc::new(ScanProgress::new());

        let instances = match with_timeout(
            self.walker.policy().request_timeout,
            self.panel.list_instances(),
        )
        .await
        {
            Ok(instances) => instances,
            Err(source) => {
                error!("Error retrieving instances: {}", source);
                progress.add_error(ScanError::ListInstances(source));
                return self.finish(&progress);
            }
        };

        let active = active_instances(instances);
        info!("Sweeping {} active instances", active.len());

        let handles: Vec<(String, JoinHandle<InstanceReport>)> = active
            .into_iter()
            .map(|instance| {
                let walker = Arc::clone(&self.walker);
                let progress = Arc::clone(&progress);
                let limiter = Arc::clone(&self.concurrency_limiter);
                let id = instance.id.clone();

                let handle = tokio::spawn(async move {
                    // The limiter is never closed.
                    let _permit = limiter.acquire_owned().await.ok();
                    info!("Processing instance with ID: {}", instance.id);
                    walker.walk(&instance.id, &progress).await
                });

                (id, handle)
            })
            .collect();

        for (instance_id, handle) in handles {
            progress.increment_instances();
            match handle.await {
                Ok(report) => {
                    if report.root_failed {
                        warn!("Instance {} could not be listed", report.instance_id);
                        progress.increment_failed_instances();
                    }
                }
                Err(join_error) => {
                    error!("Scan task for instance {} aborted: {}", instance_id, join_error);
                    progress.increment_failed_instances();
                    progress.add_error(ScanError::InstanceAborted {
                        instance_id,
                        reason: join_error.to_string(),
                    });
                }
            }
        }

        self.finish(&progress)
    }

    fn finish(&self, progress: &ScanProgress) -> ScanResult {
        let result = progress.finish();
        metrics::record_sweep_stats(&result.stats);
        info!("Completed scan: {}", result.summary());
        result
    }
}

#[async_trait]
impl Sweep for FleetScanner {
    async fn sweep(&self) -> ScanResult {
        self.scan_all().await
    }
}

/// Suspended instances are left alone.
pub fn active_instances(instances: Vec<Instance>) -> Vec<Instance> {
    instances.into_iter().filter(|i| !i.suspended).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_instances_filters_suspended() {
        let instances = vec![
            Instance::new("a", false),
            Instance::new("b", true),
            Instance::new("c", false),
        ];

        let active: Vec<String> = active_instances(instances)
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(active, vec!["a".to_string(), "c".to_string()]);
    }
}

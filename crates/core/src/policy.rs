use std::time::Duration;

/// Limits applied to one sweep.
#[derive(Debug, Clone)]
pub struct ScanPolicy {
    /// Path the walk starts from on every instance.
    pub root_path: String,
    /// Directories nested deeper than this are reported, not listed.
    pub max_depth: usize,
    /// Upper bound on instances walked at the same time.
    pub max_concurrent_instances: usize,
    /// Applied to every remote call the walker makes.
    pub request_timeout: Duration,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self {
            root_path: String::new(),
            max_depth: 32,
            max_concurrent_instances: 4,
            request_timeout: Duration::from_secs(30),
        }
    }
}

impl ScanPolicy {
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_max_concurrent_instances(mut self, limit: usize) -> Self {
        self.max_concurrent_instances = limit.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Path of `name` inside `parent`, using `/` separators.
pub fn join_path(parent: &str, name: &str) -> String {
    let parent = parent.trim_end_matches('/');
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", parent, name)
    }
}

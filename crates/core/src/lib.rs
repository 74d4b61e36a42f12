//! Sedar scan engine
//!
//! Walks the file tree of every active instance through a remote filesystem
//! API, classifies each entry against a fixed set of abuse heuristics and
//! suspends + reports offending instances.

pub mod classifier;
pub mod fleet;
pub mod interfaces;
pub mod metrics;
pub mod policy;
pub mod progress;
pub mod scheduler;
pub mod types;
pub mod walker;

pub use classifier::{classify, parse_size, SizeParseError, SERVER_JAR_MIN_BYTES};
pub use fleet::{FleetScanner, Sweep};
pub use interfaces::{ApiError, FilesystemApi, Notifier, PanelApi};
pub use policy::ScanPolicy;
pub use progress::{InstanceReport, ScanError, ScanProgress, ScanResult, ScanStats};
pub use scheduler::{LoopState, Sleeper, SweepLoop, TokioSleeper, DEFAULT_SCAN_INTERVAL};
pub use types::{Detection, FileEntry, FilePurpose, Instance, Rule};
pub use walker::TreeWalker;

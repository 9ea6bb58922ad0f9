use std::{path::PathBuf, thread, time::Duration};

use cdump_check::CheckRegistry;
use cdump_core::PoolConfig;
use cdump_model::CheckId;

use crate::error::DumpError;

/// Everything a dump run needs to know, resolved from the command line.
#[derive(Debug, Clone)]
pub struct DumpConfig {
    /// Maximum number of collection tasks running at once.
    pub parallelism: usize,
    /// Tail length for every log fetch.
    pub max_log_lines: u32,
    /// Deadline of a single task.
    pub task_timeout: Duration,
    /// Directory receiving the archive (or the dump tree).
    pub output_dir: PathBuf,
    /// Write a `.tar.gz` archive; otherwise a plain directory tree.
    pub archive: bool,
    /// Resource types whose definitions are collected.
    pub resources: Vec<String>,
    /// Resource types whose logs are collected.
    pub log_resources: Vec<String>,
    /// Checks run after collection.
    pub checks: Vec<CheckId>,
    /// Bound of the task queue and the archive queue.
    pub queue_capacity: usize,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            parallelism: thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            max_log_lines: 1000,
            task_timeout: Duration::from_secs(120),
            output_dir: PathBuf::from("rhmap-dumps"),
            archive: true,
            resources: ["deploymentconfigs", "pods", "services", "events"]
                .map(String::from)
                .to_vec(),
            log_resources: vec!["pods".to_string()],
            checks: CheckRegistry::builtin().ids(),
            queue_capacity: 64,
        }
    }
}

impl DumpConfig {
    pub fn validate(&self, registry: &CheckRegistry) -> Result<(), DumpError> {
        if self.parallelism == 0 {
            return Err(DumpError::InvalidConfig("parallelism must be at least 1".into()));
        }
        if self.resources.is_empty() {
            return Err(DumpError::InvalidConfig("no resource types to collect".into()));
        }
        if self.max_log_lines == 0 {
            return Err(DumpError::InvalidConfig("max log lines must be at least 1".into()));
        }
        if self.task_timeout.is_zero() {
            return Err(DumpError::InvalidConfig("task timeout must be positive".into()));
        }
        registry.validate(&self.checks)?;
        Ok(())
    }

    pub fn pool(&self) -> PoolConfig {
        PoolConfig {
            parallelism: self.parallelism,
            task_timeout: Some(self.task_timeout),
        }
    }
}

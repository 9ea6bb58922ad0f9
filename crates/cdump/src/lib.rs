//! Cluster diagnostic dump and analysis.
//!
//! [`run_dump`] discovers the cluster, collects definitions, logs, platform
//! diagnostics and Nagios data through a bounded worker pool into one archive
//! (or directory), then runs the configured checks per project.
//! [`analyse_path`] runs checks over an existing dump.
pub mod analysis;
pub mod commands;
pub use commands::{AnalyseOutput, DumpSummary, analyse_path, archive_name, run_dump};

mod config;
pub use config::DumpConfig;

mod error;
pub use error::DumpError;

pub mod plan;

//! The [`Check`] contract and the built-in checks.
use std::io::Read;

use cdump_model::CheckResult;

use crate::error::CheckError;

mod event;
pub use event::{EventCheck, EventList};

/// One pluggable analysis over dump files.
///
/// A check starts with a "not detected" result, is fed every file whose path
/// ends with one of [`Check::required_files`], and is then asked for its
/// [`Check::result`].
pub trait Check: Send {
    fn name(&self) -> &str;

    /// File name suffixes this check wants to examine.
    fn required_files(&self) -> &[&str];

    /// Consumes one input file. On error the accumulated result is unchanged.
    fn examine(&mut self, file: &str, reader: &mut dyn Read) -> Result<(), CheckError>;

    /// Snapshot of the accumulated result.
    fn result(&self) -> CheckResult;
}

/// Flags pods stuck pulling their image.
pub fn image_pull_back_off() -> Box<dyn Check> {
    Box::new(EventCheck::new("ImagePullBackOff", "FailedSync", "ImagePullBackOff"))
}

/// Flags pods whose containers keep crashing on start.
pub fn crash_loop_back_off() -> Box<dyn Check> {
    Box::new(EventCheck::new("CrashLoopBackOff", "FailedSync", "CrashLoopBackOff"))
}

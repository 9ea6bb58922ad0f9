use cdump_model::{CheckId, Report};
use tracing::{debug, instrument, warn};

use crate::{dump::Dump, error::CheckError, registry::CheckRegistry};

/// Outcome of an analysis run.
///
/// `errors` lists per-file failures; the corresponding checks still report
/// whatever they accumulated from the other files.
#[derive(Debug, Default)]
pub struct Analysis {
    pub report: Report,
    pub errors: Vec<CheckError>,
}

impl Analysis {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Files whose path ends with one of `required`, grouped by suffix in
/// declaration order and listed once each.
pub fn matching_files(required: &[&str], files: &[String]) -> Vec<String> {
    let mut matched: Vec<String> = Vec::new();
    for suffix in required {
        for file in files {
            if file.ends_with(suffix) && !matched.contains(file) {
                matched.push(file.clone());
            }
        }
    }
    matched
}

/// Runs the checks named by `ids` over `dump`.
///
/// Every identifier is resolved before any file is read; an unknown one
/// fails the whole run. A required file that is absent is not an error.
#[instrument(level = "debug", target = "cdump.check", skip_all, fields(checks = ids.len()))]
pub fn analyse(dump: &dyn Dump, ids: &[CheckId], registry: &CheckRegistry) -> Result<Analysis, CheckError> {
    registry.validate(ids)?;
    let files = dump.files()?;
    let mut analysis = Analysis::default();

    for id in ids {
        let mut check = registry.create(id)?;
        let inputs = matching_files(check.required_files(), &files);
        debug!(target: "cdump.check", check = check.name(), files = inputs.len(), "running check");

        for file in inputs {
            let res = dump
                .open(&file)
                .and_then(|mut reader| check.examine(&file, &mut reader));
            if let Err(e) = res {
                warn!(target: "cdump.check", check = check.name(), %file, error = %e, "examine failed");
                analysis.errors.push(e);
            }
        }
        analysis.report.results.push(check.result());
    }
    Ok(analysis)
}

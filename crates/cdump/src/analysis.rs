//! Analysis phase of a dump run: one task per project, run after collection.
use std::sync::Arc;

use cdump_check::{CheckRegistry, Dump, Scoped, analyse};
use cdump_core::{ErrorList, ProjectOutput, Task, TaskError};
use cdump_model::CheckId;
use tracing::debug;

use crate::error::DumpError;

/// File suffixes the given checks will ask for, without duplicates.
pub fn required_suffixes(registry: &CheckRegistry, ids: &[CheckId]) -> Result<Vec<String>, DumpError> {
    let mut suffixes: Vec<String> = Vec::new();
    for id in ids {
        let check = registry.create(id)?;
        for suffix in check.required_files() {
            if !suffixes.iter().any(|s| s == suffix) {
                suffixes.push(suffix.to_string());
            }
        }
    }
    Ok(suffixes)
}

/// Runs `ids` over the files of `project` and stores each result as
/// `projects/<project>/analysis/<checkName>.json`.
pub fn project_analysis(
    project: String,
    dump: Arc<dyn Dump + Send + Sync>,
    registry: Arc<CheckRegistry>,
    ids: Vec<CheckId>,
    out: ProjectOutput,
) -> Task {
    Task::new(format!("analysis {project}"), move |_| async move {
        let scoped = Scoped::new(dump, format!("projects/{project}/"));
        let analysis = tokio::task::spawn_blocking(move || analyse(&scoped, &ids, &registry))
            .await
            .map_err(|e| TaskError::Panicked(e.to_string()))?
            .map_err(TaskError::fail)?;

        let mut errors: ErrorList = analysis.errors.iter().collect();
        for result in &analysis.report.results {
            debug!(target: "cdump.analysis", %project, check = %result.check_name, detected = result.is_detected(), "check finished");
            let body = match serde_json::to_vec_pretty(result) {
                Ok(body) => body,
                Err(e) => {
                    errors.push(e);
                    continue;
                }
            };
            let written = async {
                let mut sink = out.open(&project, &result.check_name)?;
                sink.write(&body);
                sink.close().await
            };
            if let Err(e) = written.await {
                errors.push(e);
            }
        }
        Ok(errors.into_result()?)
    })
}

use std::path::Path;

use cdump_check::{Analysis, CheckRegistry, Format, analyse, open_path, render};
use cdump_model::CheckId;
use tracing::info;

use crate::error::DumpError;

/// Rendered report plus the raw analysis behind it.
#[derive(Debug)]
pub struct AnalyseOutput {
    pub rendered: String,
    pub analysis: Analysis,
}

/// Analyses an existing dump: a directory or a `.tar.gz` archive.
///
/// Check identifiers are resolved before the dump is opened.
pub fn analyse_path(
    path: &Path,
    ids: &[CheckId],
    registry: &CheckRegistry,
    format: Format,
    pretty: bool,
) -> Result<AnalyseOutput, DumpError> {
    registry.validate(ids)?;
    let dump = open_path(path)?;
    let analysis = analyse(&*dump, ids, registry)?;
    info!(
        target: "cdump.analysis",
        path = %path.display(),
        results = analysis.report.results.len(),
        errors = analysis.errors.len(),
        "analysis finished"
    );
    let rendered = render(&analysis.report, format, pretty)?;
    Ok(AnalyseOutput { rendered, analysis })
}

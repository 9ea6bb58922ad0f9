use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use cdump_check::{CheckRegistry, DirDump, Dump, MemoryDump};
use cdump_core::{
    Archive, ArchiveOptions, ArchiveWriter, ErrorList, RunReport, SinkFactory, TaskOutcome, pool,
    sink::FileSinkFactory, task_stream,
};
use cdump_exec::{Cluster, CommandFactory};
use time::{OffsetDateTime, macros::format_description};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use crate::{
    analysis::{project_analysis, required_suffixes},
    config::DumpConfig,
    error::DumpError,
    plan::{self, Outputs},
};

/// What a finished dump run produced.
#[derive(Debug)]
pub struct DumpSummary {
    /// The archive file, or the dump directory.
    pub location: PathBuf,
    pub collection: RunReport,
    pub analysis: RunReport,
}

impl DumpSummary {
    pub fn errors(&self) -> ErrorList {
        let mut errors = self.collection.errors();
        for e in self.analysis.errors().iter() {
            errors.push(e);
        }
        errors
    }
}

/// UTC timestamp of `at`, formatted for use as a file name.
pub fn archive_name(at: OffsetDateTime) -> Result<String, DumpError> {
    at.format(format_description!(
        "[year]-[month]-[day]T[hour]-[minute]-[second]Z"
    ))
    .map_err(|e| DumpError::Timestamp(e.to_string()))
}

/// Collects everything, then analyses what was collected.
///
/// `progress` sees every finished task of both phases. Task failures are
/// reported in the summary; only configuration, discovery and archive
/// failures abort the run.
#[instrument(level = "debug", target = "cdump.dump", skip_all, fields(archive = cfg.archive))]
pub async fn run_dump<F>(
    cfg: &DumpConfig,
    commands: Arc<dyn CommandFactory>,
    registry: Arc<CheckRegistry>,
    cancel: &CancellationToken,
    mut progress: F,
) -> Result<DumpSummary, DumpError>
where
    F: FnMut(&TaskOutcome),
{
    cfg.validate(&registry)?;
    create_dir(&cfg.output_dir).await?;
    let stamp = archive_name(OffsetDateTime::now_utc())?;

    let summary = if cfg.archive {
        let location = cfg.output_dir.join(format!("{stamp}.tar.gz"));
        let file = File::create(&location).map_err(|source| DumpError::Io {
            path: location.clone(),
            source,
        })?;
        let archive = Archive::with_options(
            BufWriter::new(file),
            ArchiveOptions {
                queue_capacity: cfg.queue_capacity,
                retain_suffixes: required_suffixes(&registry, &cfg.checks)?,
                ..Default::default()
            },
        );
        let writer = archive.writer();
        let phases = run_phases(
            cfg,
            Cluster::new(commands),
            registry,
            Arc::new(writer.clone()),
            Snapshot::Archive(writer),
            cancel,
            &mut progress,
        )
        .await;

        let closed = archive.close().await;
        let (collection, analysis) = phases?;
        closed?.flush().map_err(|source| DumpError::Io {
            path: location.clone(),
            source,
        })?;
        DumpSummary {
            location,
            collection,
            analysis,
        }
    } else {
        let location = cfg.output_dir.join(&stamp);
        create_dir(&location).await?;
        let (collection, analysis) = run_phases(
            cfg,
            Cluster::new(commands),
            registry,
            Arc::new(FileSinkFactory::new(&location)),
            Snapshot::Dir(location.clone()),
            cancel,
            &mut progress,
        )
        .await?;
        DumpSummary {
            location,
            collection,
            analysis,
        }
    };

    info!(
        target: "cdump.dump",
        location = %summary.location.display(),
        tasks = summary.collection.outcomes.len() + summary.analysis.outcomes.len(),
        failed = summary.errors().len(),
        "dump finished"
    );
    Ok(summary)
}

/// Source of the collected files for the analysis phase.
enum Snapshot {
    /// Entries retained by the archive while it was written.
    Archive(ArchiveWriter),
    Dir(PathBuf),
}

impl Snapshot {
    async fn dump(&self) -> Result<Arc<dyn Dump + Send + Sync>, DumpError> {
        Ok(match self {
            Snapshot::Archive(writer) => Arc::new(MemoryDump::new(writer.retained().await?)),
            Snapshot::Dir(root) => Arc::new(DirDump::new(root)),
        })
    }
}

async fn run_phases<F>(
    cfg: &DumpConfig,
    cluster: Cluster,
    registry: Arc<CheckRegistry>,
    factory: Arc<dyn SinkFactory>,
    snapshot: Snapshot,
    cancel: &CancellationToken,
    progress: &mut F,
) -> Result<(RunReport, RunReport), DumpError>
where
    F: FnMut(&TaskOutcome),
{
    let outputs = Outputs::new(factory);
    let pool_cfg = cfg.pool();

    let (tx, rx) = mpsc::channel(cfg.queue_capacity.max(1));
    let (planned, collection) = tokio::join!(
        plan::enumerate(&cluster, cfg, &outputs, tx, cancel),
        pool::run(rx, &pool_cfg, cancel, &mut *progress),
    );
    let projects = planned?;
    info!(target: "cdump.dump", tasks = collection.outcomes.len(), "collection finished");

    if cfg.checks.is_empty() {
        return Ok((collection, RunReport::default()));
    }
    let dump = snapshot.dump().await?;
    let tasks = projects
        .into_iter()
        .map(|project| {
            project_analysis(
                project,
                Arc::clone(&dump),
                Arc::clone(&registry),
                cfg.checks.clone(),
                outputs.analysis.clone(),
            )
        })
        .collect();
    let analysis = pool::run(task_stream(tasks), &pool_cfg, cancel, &mut *progress).await;
    Ok((collection, analysis))
}

async fn create_dir(path: &Path) -> Result<(), DumpError> {
    tokio::fs::create_dir_all(path)
        .await
        .map_err(|source| DumpError::Io {
            path: path.to_path_buf(),
            source,
        })
}

//! Turns cluster topology into a stream of collection tasks.
use std::sync::Arc;

use cdump_core::{PlatformOutput, ProjectOutput, SinkFactory, Task, TaskError};
use cdump_exec::{Cluster, collect};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::{config::DumpConfig, error::DumpError};

const NAGIOS_POD: &str = "nagios";

/// Where every kind of collected data goes.
#[derive(Clone)]
pub struct Outputs {
    pub definitions: ProjectOutput,
    pub logs: ProjectOutput,
    pub nagios_status: ProjectOutput,
    pub nagios_history: ProjectOutput,
    pub diagnostics: PlatformOutput,
    pub analysis: ProjectOutput,
}

impl Outputs {
    pub fn new(factory: Arc<dyn SinkFactory>) -> Self {
        Self {
            definitions: ProjectOutput::new(factory.clone(), "definitions", "json"),
            logs: ProjectOutput::new(factory.clone(), "logs", "logs"),
            nagios_status: ProjectOutput::new(factory.clone(), "nagios", "dat"),
            nagios_history: ProjectOutput::new(factory.clone(), "nagios", "tar"),
            diagnostics: PlatformOutput::new(factory.clone(), "diagnostics", "stdout"),
            analysis: ProjectOutput::new(factory, "analysis", "json"),
        }
    }
}

/// Discovers projects, then emits collection tasks onto `tasks` as they are
/// composed. Returns the discovered projects.
///
/// Failing to list projects, or finding none, is terminal. Narrower
/// discovery failures are emitted as failing tasks instead.
#[instrument(level = "debug", target = "cdump.plan", skip_all)]
pub async fn enumerate(
    cluster: &Cluster,
    cfg: &DumpConfig,
    outputs: &Outputs,
    tasks: mpsc::Sender<Task>,
    cancel: &CancellationToken,
) -> Result<Vec<String>, DumpError> {
    let projects = cluster.projects(cancel).await.map_err(DumpError::Discovery)?;
    if projects.is_empty() {
        return Err(DumpError::NoProjects);
    }
    info!(target: "cdump.plan", projects = projects.len(), "projects discovered");

    let emitter = Emitter(tasks);
    for project in &projects {
        emitter
            .send(collect::resource_definitions(
                cluster.clone(),
                project.clone(),
                cfg.resources.clone(),
                outputs.definitions.clone(),
            ))
            .await;
    }
    emitter
        .send(collect::adm_diagnostics(cluster.clone(), outputs.diagnostics.clone()))
        .await;

    tokio::join!(
        logs(cluster, cfg, outputs, &projects, &emitter, cancel),
        nagios(cluster, outputs, &projects, &emitter, cancel),
    );
    Ok(projects)
}

async fn logs(
    cluster: &Cluster,
    cfg: &DumpConfig,
    outputs: &Outputs,
    projects: &[String],
    emitter: &Emitter,
    cancel: &CancellationToken,
) {
    let (resources, errors) = cluster
        .loggable_resources(projects, &cfg.log_resources, cancel)
        .await;
    if !errors.is_empty() {
        emitter
            .send(Task::failed("discover loggable resources", errors.into()))
            .await;
    }
    for resource in resources {
        for previous in [false, true] {
            emitter
                .send(collect::fetch_logs(
                    cluster.clone(),
                    resource.clone(),
                    cfg.max_log_lines,
                    previous,
                    outputs.logs.clone(),
                ))
                .await;
        }
    }
}

async fn nagios(
    cluster: &Cluster,
    outputs: &Outputs,
    projects: &[String],
    emitter: &Emitter,
    cancel: &CancellationToken,
) {
    let mut found = false;
    for project in projects {
        let pods = match cluster
            .resource_names_matching(project, "pods", NAGIOS_POD, cancel)
            .await
        {
            Ok(pods) => pods,
            Err(e) => {
                emitter
                    .send(Task::failed(format!("discover nagios {project}"), TaskError::fail(e)))
                    .await;
                continue;
            }
        };
        for pod in pods {
            found = true;
            debug!(target: "cdump.plan", %project, %pod, "nagios pod found");
            emitter
                .send(collect::nagios_status(
                    cluster.clone(),
                    project.clone(),
                    pod.clone(),
                    outputs.nagios_status.clone(),
                ))
                .await;
            emitter
                .send(collect::nagios_history(
                    cluster.clone(),
                    project.clone(),
                    pod,
                    outputs.nagios_history.clone(),
                ))
                .await;
        }
    }
    if !found {
        emitter
            .send(Task::failed(
                "discover nagios",
                TaskError::fail(
                    "a Nagios pod could not be found in any project; for a more thorough \
                     analysis, ensure Nagios is running in all projects",
                ),
            ))
            .await;
    }
}

/// Task sender that stops quietly once the pool has gone away.
struct Emitter(mpsc::Sender<Task>);

impl Emitter {
    async fn send(&self, task: Task) {
        let name = task.name().to_string();
        if self.0.send(task).await.is_err() {
            debug!(target: "cdump.plan", task = %name, "pool gone; task dropped");
        }
    }
}

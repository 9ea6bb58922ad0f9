//! Collection task library.
//!
//! Each function builds one [`Task`] for a logical collection operation.
//! Tasks capture everything they need by value and write through the output
//! destinations they are given.
use cdump_core::{ErrorList, PlatformOutput, ProjectOutput, Task, TaskError};
use cdump_model::LoggableResource;
use tokio_util::sync::CancellationToken;

use crate::{
    cluster::Cluster,
    command::Invocation,
    error::ExecError,
    proc::capture,
};

impl From<ExecError> for TaskError {
    fn from(e: ExecError) -> Self {
        match e {
            ExecError::Cancelled => TaskError::Cancelled,
            ExecError::Multiple(list) => TaskError::Multiple(list),
            other => TaskError::fail(other),
        }
    }
}

/// JSON definitions of every resource type in `project`, one entry per type.
///
/// A failing type does not stop the others; failures are reported together.
pub fn resource_definitions(
    cluster: Cluster,
    project: String,
    types: Vec<String>,
    out: ProjectOutput,
) -> Task {
    Task::new(format!("definitions {project}"), move |cancel| async move {
        let mut errors = ErrorList::new();
        for rtype in types {
            let inv = Invocation::GetDefinitions {
                project: project.clone(),
                rtype: rtype.clone(),
            };
            let res = run_into(&cluster, &inv, &out, &project, &rtype, &cancel).await;
            match res {
                Ok(()) => {}
                Err(ExecError::Cancelled) => return Err(TaskError::Cancelled),
                Err(e) => errors.push(e),
            }
        }
        Ok(errors.into_result()?)
    })
}

/// Current or previous logs of one resource, trimmed to `max_lines`.
pub fn fetch_logs(
    cluster: Cluster,
    resource: LoggableResource,
    max_lines: u32,
    previous: bool,
    out: ProjectOutput,
) -> Task {
    let mut entry = resource.log_name();
    if previous {
        entry.push_str("-previous");
    }
    Task::new(format!("logs {}/{entry}", resource.id().project), move |cancel| async move {
        let id = resource.id();
        let inv = Invocation::Logs {
            project: id.project.clone(),
            rtype: id.kind.clone(),
            name: id.name.clone(),
            container: id.container.clone(),
            previous,
            max_lines,
        };
        run_into(&cluster, &inv, &out, &id.project, &entry, &cancel).await?;
        Ok(())
    })
}

/// Cluster-wide platform diagnostics.
pub fn adm_diagnostics(cluster: Cluster, out: PlatformOutput) -> Task {
    Task::new("adm diagnostics", move |cancel| async move {
        let cmd = cluster.command(&Invocation::AdmDiagnostics);
        let sink = out.open("diagnostics").map_err(ExecError::from)?;
        let err = out.stderr().open("diagnostics").map_err(ExecError::from)?;
        capture(cmd, sink, err, &cancel).await?;
        Ok(())
    })
}

/// Current status file of a Nagios pod.
pub fn nagios_status(cluster: Cluster, project: String, pod: String, out: ProjectOutput) -> Task {
    Task::new(format!("nagios status {project}/{pod}"), move |cancel| async move {
        let inv = Invocation::NagiosStatus {
            project: project.clone(),
            pod: pod.clone(),
        };
        run_into(&cluster, &inv, &out, &project, &pod, &cancel).await?;
        Ok(())
    })
}

/// Archived history of a Nagios pod, as a tarball.
pub fn nagios_history(cluster: Cluster, project: String, pod: String, out: ProjectOutput) -> Task {
    Task::new(format!("nagios history {project}/{pod}"), move |cancel| async move {
        let inv = Invocation::NagiosHistory {
            project: project.clone(),
            pod: pod.clone(),
        };
        run_into(&cluster, &inv, &out, &project, &pod, &cancel).await?;
        Ok(())
    })
}

async fn run_into(
    cluster: &Cluster,
    inv: &Invocation,
    out: &ProjectOutput,
    project: &str,
    resource: &str,
    cancel: &CancellationToken,
) -> Result<(), ExecError> {
    let sink = out.open(project, resource)?;
    let err = out.stderr().open(project, resource)?;
    capture(cluster.command(inv), sink, err, cancel).await
}

#[cfg(all(test, unix))]
mod tests {
    use std::sync::Arc;

    use cdump_core::{pool, sink::MemorySinks, task_stream, PoolConfig};
    use cdump_model::ResourceId;
    use tokio::process::Command;

    use super::*;
    use crate::command::{CommandFactory, OcCli};

    /// Echoes the `oc` argument vector instead of running it.
    struct EchoOc;

    impl CommandFactory for EchoOc {
        fn command(&self, inv: &Invocation) -> Command {
            let mut cmd = Command::new("sh");
            let args = OcCli::args(inv).join(" ");
            let script = if args.contains(" events ") {
                "echo 'forbidden: events' >&2; exit 1".to_string()
            } else {
                format!("printf '%s' '{args}'")
            };
            cmd.arg("-c").arg(script);
            cmd
        }
    }

    fn setup() -> (Cluster, MemorySinks) {
        (Cluster::new(Arc::new(EchoOc)), MemorySinks::new())
    }

    async fn run_one(task: Task) -> Result<(), TaskError> {
        let report = pool::run(
            task_stream(vec![task]),
            &PoolConfig::default(),
            &CancellationToken::new(),
            |_| {},
        )
        .await;
        report.outcomes.into_iter().next().map(|o| o.result).unwrap()
    }

    fn text(sinks: &MemorySinks, path: &str) -> String {
        String::from_utf8(sinks.get(path).unwrap_or_default()).unwrap()
    }

    #[tokio::test]
    async fn definitions_continue_past_failing_type() {
        let (cluster, sinks) = setup();
        let out = ProjectOutput::new(Arc::new(sinks.clone()), "definitions", "json");
        let task = resource_definitions(
            cluster,
            "core".into(),
            vec!["pods".into(), "events".into(), "services".into()],
            out,
        );
        assert_eq!(task.name(), "definitions core");

        let err = run_one(task).await.unwrap_err();
        assert!(err.to_string().contains("forbidden: events"));
        assert_eq!(
            text(&sinks, "projects/core/definitions/pods.json"),
            "-n core get pods -o=json"
        );
        assert_eq!(
            text(&sinks, "projects/core/definitions/services.json"),
            "-n core get services -o=json"
        );
        assert_eq!(
            text(&sinks, "projects/core/definitions/events.stderr"),
            "forbidden: events\n"
        );
    }

    #[tokio::test]
    async fn previous_logs_get_their_own_entry() {
        let (cluster, sinks) = setup();
        let out = ProjectOutput::new(Arc::new(sinks.clone()), "logs", "logs");
        let resource = LoggableResource::new(
            ResourceId::new("core", "pods", "fh-aaa-8-v7m10").with_container("fh-aaa"),
        );
        run_one(fetch_logs(cluster, resource, 20, true, out)).await.unwrap();
        assert_eq!(
            text(&sinks, "projects/core/logs/pods-fh-aaa-8-v7m10-fh-aaa-previous.logs"),
            "-n core logs --tail=20 pods/fh-aaa-8-v7m10 -c fh-aaa --previous"
        );
    }

    #[tokio::test]
    async fn diagnostics_and_nagios_layout() {
        let (cluster, sinks) = setup();
        let factory = Arc::new(sinks.clone());
        run_one(adm_diagnostics(
            cluster.clone(),
            PlatformOutput::new(factory.clone(), "diagnostics", "stdout"),
        ))
        .await
        .unwrap();
        run_one(nagios_status(
            cluster.clone(),
            "core".into(),
            "nagios-1-x9".into(),
            ProjectOutput::new(factory.clone(), "nagios", "dat"),
        ))
        .await
        .unwrap();
        run_one(nagios_history(
            cluster,
            "core".into(),
            "nagios-1-x9".into(),
            ProjectOutput::new(factory, "nagios", "tar"),
        ))
        .await
        .unwrap();

        assert_eq!(text(&sinks, "diagnostics/diagnostics.stdout"), "adm diagnostics");
        assert!(text(&sinks, "projects/core/nagios/nagios-1-x9.dat").ends_with("cat /var/log/nagios/status.dat"));
        assert!(text(&sinks, "projects/core/nagios/nagios-1-x9.tar").ends_with("-C /var/log/nagios archives"));
    }
}

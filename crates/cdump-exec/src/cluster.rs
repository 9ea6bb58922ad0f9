use std::sync::Arc;

use cdump_core::ErrorList;
use cdump_model::{LoggableResource, ResourceId};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::{
    command::{CommandFactory, Invocation},
    error::ExecError,
    proc::{run_command, words},
};

/// Topology queries against the cluster.
#[derive(Clone)]
pub struct Cluster {
    commands: Arc<dyn CommandFactory>,
}

impl Cluster {
    pub fn new(commands: Arc<dyn CommandFactory>) -> Self {
        Self { commands }
    }

    pub fn command(&self, inv: &Invocation) -> Command {
        self.commands.command(inv)
    }

    /// Projects visible to the current user.
    pub async fn projects(&self, cancel: &CancellationToken) -> Result<Vec<String>, ExecError> {
        self.list(&Invocation::GetProjects, cancel).await
    }

    pub async fn resource_names(
        &self,
        project: &str,
        rtype: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExecError> {
        let inv = Invocation::GetNames {
            project: project.to_string(),
            rtype: rtype.to_string(),
        };
        self.list(&inv, cancel).await
    }

    /// Names of `rtype` resources in `project` that contain `needle`.
    pub async fn resource_names_matching(
        &self,
        project: &str,
        rtype: &str,
        needle: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExecError> {
        let mut names = self.resource_names(project, rtype, cancel).await?;
        names.retain(|n| n.contains(needle));
        Ok(names)
    }

    pub async fn containers(
        &self,
        id: &ResourceId,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>, ExecError> {
        let inv = Invocation::Containers {
            project: id.project.clone(),
            rtype: id.kind.clone(),
            name: id.name.clone(),
        };
        self.list(&inv, cancel).await
    }

    /// Everything whose logs can be fetched, across `projects` and `types`.
    ///
    /// A resource with several containers yields one container-scoped entry
    /// per container. Discovery continues past failures; whatever was found
    /// is returned together with the collected errors.
    #[instrument(level = "debug", target = "cdump.exec.cluster", skip_all, fields(projects = projects.len()))]
    pub async fn loggable_resources(
        &self,
        projects: &[String],
        types: &[String],
        cancel: &CancellationToken,
    ) -> (Vec<LoggableResource>, ErrorList) {
        let mut found = Vec::new();
        let mut errors = ErrorList::new();

        for project in projects {
            for rtype in types {
                let names = match self.resource_names(project, rtype, cancel).await {
                    Ok(names) => names,
                    Err(e) => {
                        errors.push(e);
                        continue;
                    }
                };
                for name in names {
                    let id = ResourceId::new(project.as_str(), rtype.as_str(), name);
                    match self.containers(&id, cancel).await {
                        Ok(containers) if containers.len() > 1 => {
                            found.extend(containers.into_iter().map(|c| {
                                LoggableResource::new(id.clone().with_container(c))
                            }));
                        }
                        Ok(_) => found.push(LoggableResource::new(id)),
                        Err(e) => errors.push(e),
                    }
                }
            }
        }
        debug!(target: "cdump.exec.cluster", found = found.len(), errors = errors.len(), "loggable resources discovered");
        (found, errors)
    }

    async fn list(&self, inv: &Invocation, cancel: &CancellationToken) -> Result<Vec<String>, ExecError> {
        let captured = run_command(self.command(inv), cancel).await?.check()?;
        Ok(words(&captured.stdout))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    /// Answers every invocation with a canned shell script.
    struct Scripted(fn(&Invocation) -> String);

    impl CommandFactory for Scripted {
        fn command(&self, inv: &Invocation) -> Command {
            let mut cmd = Command::new("sh");
            cmd.arg("-c").arg((self.0)(inv));
            cmd
        }
    }

    fn cluster(script: fn(&Invocation) -> String) -> Cluster {
        Cluster::new(Arc::new(Scripted(script)))
    }

    #[tokio::test]
    async fn lists_projects() {
        let c = cluster(|_| "echo 'core mbaas  rhmap-3-node'".into());
        let projects = c.projects(&CancellationToken::new()).await.unwrap();
        assert_eq!(projects, ["core", "mbaas", "rhmap-3-node"]);
    }

    #[tokio::test]
    async fn failing_query_is_error() {
        let c = cluster(|_| "echo 'not logged in' >&2; exit 1".into());
        let err = c.projects(&CancellationToken::new()).await.unwrap_err();
        assert!(err.to_string().contains("not logged in"));
    }

    #[tokio::test]
    async fn filters_names_by_substring() {
        let c = cluster(|_| "echo fh-aaa-1 nagios-1-x9 fh-ngui-2".into());
        let pods = c
            .resource_names_matching("core", "pod", "nagios", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(pods, ["nagios-1-x9"]);
    }

    #[tokio::test]
    async fn splits_multi_container_resources() {
        let c = cluster(|inv| match inv {
            Invocation::GetNames { project, .. } if project == "broken" => "exit 1".into(),
            Invocation::GetNames { .. } => "echo single multi".into(),
            Invocation::Containers { name, .. } if name == "multi" => "echo app sidecar".into(),
            Invocation::Containers { .. } => "echo app".into(),
            _ => "exit 2".into(),
        });
        let (found, errors) = c
            .loggable_resources(
                &["core".into(), "broken".into()],
                &["pods".into()],
                &CancellationToken::new(),
            )
            .await;

        let names: Vec<_> = found.iter().map(LoggableResource::log_name).collect();
        assert_eq!(names, ["pods-single", "pods-multi-app", "pods-multi-sidecar"]);
        assert!(found[1].is_container_scoped());
        assert_eq!(errors.len(), 1);
    }
}

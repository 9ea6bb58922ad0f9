use std::{fmt, path::PathBuf};

use tokio::process::Command;

/// Every question or collection request the dump tool sends to the cluster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    /// Names of all projects visible to the current user.
    GetProjects,
    /// Names of all resources of `rtype` in `project`.
    GetNames { project: String, rtype: String },
    /// Full JSON definitions of all resources of `rtype` in `project`.
    GetDefinitions { project: String, rtype: String },
    /// Container names of one resource.
    Containers {
        project: String,
        rtype: String,
        name: String,
    },
    /// Tail of the (current or previous) logs of one resource or container.
    Logs {
        project: String,
        rtype: String,
        name: String,
        container: Option<String>,
        previous: bool,
        max_lines: u32,
    },
    /// Cluster-wide platform diagnostics.
    AdmDiagnostics,
    /// Current Nagios status file of a pod.
    NagiosStatus { project: String, pod: String },
    /// Tarball of the Nagios history of a pod.
    NagiosHistory { project: String, pod: String },
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invocation::GetProjects => f.write_str("get projects"),
            Invocation::GetNames { project, rtype } => write!(f, "{project}: get {rtype} names"),
            Invocation::GetDefinitions { project, rtype } => write!(f, "{project}: get {rtype}"),
            Invocation::Containers {
                project,
                rtype,
                name,
            } => write!(f, "{project}: containers of {rtype}/{name}"),
            Invocation::Logs {
                project,
                rtype,
                name,
                container,
                previous,
                ..
            } => {
                write!(f, "{project}: logs {rtype}/{name}")?;
                if let Some(c) = container {
                    write!(f, " -c {c}")?;
                }
                if *previous {
                    f.write_str(" (previous)")?;
                }
                Ok(())
            }
            Invocation::AdmDiagnostics => f.write_str("adm diagnostics"),
            Invocation::NagiosStatus { project, pod } => write!(f, "{project}: nagios status {pod}"),
            Invocation::NagiosHistory { project, pod } => write!(f, "{project}: nagios history {pod}"),
        }
    }
}

/// Turns an [`Invocation`] into a ready-to-spawn process.
pub trait CommandFactory: Send + Sync {
    fn command(&self, inv: &Invocation) -> Command;
}

/// The OpenShift `oc` client.
#[derive(Debug, Clone)]
pub struct OcCli {
    program: PathBuf,
}

impl Default for OcCli {
    fn default() -> Self {
        Self::new("oc")
    }
}

impl OcCli {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Argument vector for `inv`, without the program name.
    pub fn args(inv: &Invocation) -> Vec<String> {
        let ns = |project: &str| vec!["-n".to_string(), project.to_string()];
        match inv {
            Invocation::GetProjects => vec![
                "get".into(),
                "projects".into(),
                "-o=jsonpath={.items[*].metadata.name}".into(),
            ],
            Invocation::GetNames { project, rtype } => {
                let mut args = ns(project);
                args.extend([
                    "get".into(),
                    rtype.clone(),
                    "-o=jsonpath={.items[*].metadata.name}".into(),
                ]);
                args
            }
            Invocation::GetDefinitions { project, rtype } => {
                let mut args = ns(project);
                args.extend(["get".into(), rtype.clone(), "-o=json".into()]);
                args
            }
            Invocation::Containers {
                project,
                rtype,
                name,
            } => {
                let mut args = ns(project);
                args.extend([
                    "get".into(),
                    rtype.clone(),
                    name.clone(),
                    "-o=jsonpath={.spec.containers[*].name}".into(),
                ]);
                args
            }
            Invocation::Logs {
                project,
                rtype,
                name,
                container,
                previous,
                max_lines,
            } => {
                let mut args = ns(project);
                args.extend([
                    "logs".into(),
                    format!("--tail={max_lines}"),
                    format!("{rtype}/{name}"),
                ]);
                if let Some(c) = container {
                    args.extend(["-c".into(), c.clone()]);
                }
                if *previous {
                    args.push("--previous".into());
                }
                args
            }
            Invocation::AdmDiagnostics => vec!["adm".into(), "diagnostics".into()],
            Invocation::NagiosStatus { project, pod } => {
                let mut args = ns(project);
                args.extend([
                    "exec".into(),
                    pod.clone(),
                    "--".into(),
                    "cat".into(),
                    "/var/log/nagios/status.dat".into(),
                ]);
                args
            }
            Invocation::NagiosHistory { project, pod } => {
                let mut args = ns(project);
                args.extend([
                    "exec".into(),
                    pod.clone(),
                    "--".into(),
                    "tar".into(),
                    "-c".into(),
                    "-C".into(),
                    "/var/log/nagios".into(),
                    "archives".into(),
                ]);
                args
            }
        }
    }
}

impl CommandFactory for OcCli {
    fn command(&self, inv: &Invocation) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(Self::args(inv));
        cmd
    }
}

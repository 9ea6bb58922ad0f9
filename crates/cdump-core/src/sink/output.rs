use std::sync::Arc;

use super::{Sink, SinkError, SinkFactory};

/// Destination for per-project data: `projects/<project>/<scope>/<resource>.<ext>`.
#[derive(Clone)]
pub struct ProjectOutput {
    factory: Arc<dyn SinkFactory>,
    scope: String,
    extension: String,
}

impl ProjectOutput {
    pub fn new(
        factory: Arc<dyn SinkFactory>,
        scope: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            factory,
            scope: scope.into(),
            extension: extension.into(),
        }
    }

    /// Sibling destination for the stderr of the same command.
    pub fn stderr(&self) -> Self {
        Self {
            extension: "stderr".into(),
            ..self.clone()
        }
    }

    pub fn path(&self, project: &str, resource: &str) -> String {
        join(
            &["projects", project, &self.scope],
            resource,
            &self.extension,
        )
    }

    pub fn open(&self, project: &str, resource: &str) -> Result<Box<dyn Sink>, SinkError> {
        self.factory.open(&self.path(project, resource))
    }
}

/// Destination for cluster-wide data: `<scope>/<resource>.<ext>`.
#[derive(Clone)]
pub struct PlatformOutput {
    factory: Arc<dyn SinkFactory>,
    scope: String,
    extension: String,
}

impl PlatformOutput {
    pub fn new(
        factory: Arc<dyn SinkFactory>,
        scope: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            factory,
            scope: scope.into(),
            extension: extension.into(),
        }
    }

    pub fn stderr(&self) -> Self {
        Self {
            extension: "stderr".into(),
            ..self.clone()
        }
    }

    pub fn path(&self, resource: &str) -> String {
        join(&[&self.scope], resource, &self.extension)
    }

    pub fn open(&self, resource: &str) -> Result<Box<dyn Sink>, SinkError> {
        self.factory.open(&self.path(resource))
    }
}

fn join(dirs: &[&str], resource: &str, extension: &str) -> String {
    let mut path: Vec<&str> = dirs.iter().copied().filter(|d| !d.is_empty()).collect();
    path.push(resource);
    let mut path = path.join("/");
    if !extension.is_empty() {
        path.push('.');
        path.push_str(extension);
    }
    path
}

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of one collectible object in the cluster.
///
/// Immutable once discovered; tasks capture it by value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    /// Project (namespace) the object lives in.
    pub project: String,
    /// Resource type as understood by the cluster CLI (e.g. `pods`).
    pub kind: String,
    /// Object name.
    pub name: String,
    /// Container inside the object, when the identity is container-scoped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<String>,
}

impl ResourceId {
    pub fn new(project: impl Into<String>, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            project: project.into(),
            kind: kind.into(),
            name: name.into(),
            container: None,
        }
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = Some(container.into());
        self
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.project, self.kind, self.name)?;
        if let Some(container) = &self.container {
            write!(f, "[{container}]")?;
        }
        Ok(())
    }
}

/// A resource whose logs can be fetched.
///
/// Objects with several containers are split into one loggable resource per
/// container; single-container objects are not container-scoped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoggableResource(pub ResourceId);

impl LoggableResource {
    pub fn new(id: ResourceId) -> Self {
        Self(id)
    }

    #[inline]
    pub fn id(&self) -> &ResourceId {
        &self.0
    }

    #[inline]
    pub fn is_container_scoped(&self) -> bool {
        self.0.container.is_some()
    }

    /// File stem used for log entries: `<type>-<name>[-<container>]`.
    pub fn log_name(&self) -> String {
        let id = &self.0;
        match &id.container {
            Some(container) => format!("{}-{}-{}", id.kind, id.name, container),
            None => format!("{}-{}", id.kind, id.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_name_without_container() {
        let r = LoggableResource::new(ResourceId::new("core", "pods", "fh-aaa-8-v7m10"));
        assert!(!r.is_container_scoped());
        assert_eq!(r.log_name(), "pods-fh-aaa-8-v7m10");
    }

    #[test]
    fn log_name_with_container() {
        let r = LoggableResource::new(
            ResourceId::new("core", "pods", "fh-aaa-8-v7m10").with_container("fh-aaa"),
        );
        assert!(r.is_container_scoped());
        assert_eq!(r.log_name(), "pods-fh-aaa-8-v7m10-fh-aaa");
    }

    #[test]
    fn display_includes_container() {
        let id = ResourceId::new("core", "pods", "mongo-0").with_container("mongo");
        assert_eq!(id.to_string(), "core/pods/mongo-0[mongo]");
    }
}

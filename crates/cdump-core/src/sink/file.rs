use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::trace;

use super::{Sink, SinkError, SinkFactory, path};

/// Writes each sink as a plain file below `root`.
#[derive(Debug, Clone)]
pub struct FileSinkFactory {
    root: PathBuf,
}

impl FileSinkFactory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl SinkFactory for FileSinkFactory {
    fn open(&self, requested: &str) -> Result<Box<dyn Sink>, SinkError> {
        let name = path::sanitize(requested).unwrap_or_else(path::placeholder_name);
        Ok(Box::new(FileSink {
            target: self.root.join(&name),
            name,
            buf: Vec::new(),
        }))
    }
}

struct FileSink {
    name: String,
    target: PathBuf,
    buf: Vec<u8>,
}

#[async_trait]
impl Sink for FileSink {
    fn path(&self) -> &str {
        &self.name
    }

    fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    async fn close(self: Box<Self>) -> Result<(), SinkError> {
        let io_err = |source| SinkError::Io {
            path: self.name.clone(),
            source,
        };
        if let Some(parent) = self.target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        tokio::fs::write(&self.target, &self.buf).await.map_err(io_err)?;
        trace!(target: "cdump.core.sink", path = %self.name, bytes = self.buf.len(), "file written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn close_creates_parents_and_commits() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FileSinkFactory::new(dir.path());

        let mut sink = factory.open("projects/core/definitions/pods.json").unwrap();
        sink.write(b"{\"items\":");
        sink.write(b"[]}");
        sink.close().await.unwrap();

        let body = std::fs::read_to_string(dir.path().join("projects/core/definitions/pods.json")).unwrap();
        assert_eq!(body, "{\"items\":[]}");
    }

    #[tokio::test]
    async fn dropped_sink_leaves_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FileSinkFactory::new(dir.path());

        let mut sink = factory.open("oadm-diagnostics.log").unwrap();
        sink.write(b"partial");
        drop(sink);

        assert!(!dir.path().join("oadm-diagnostics.log").exists());
    }

    #[tokio::test]
    async fn escaping_paths_stay_below_root() {
        let dir = tempfile::tempdir().unwrap();
        let factory = FileSinkFactory::new(dir.path());

        let sink = factory.open("../../outside.txt").unwrap();
        assert_eq!(sink.path(), "outside.txt");
        sink.close().await.unwrap();
        assert!(dir.path().join("outside.txt").exists());
    }
}

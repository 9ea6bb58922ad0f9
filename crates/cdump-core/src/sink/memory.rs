use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use super::{Sink, SinkError, SinkFactory, path};

/// Keeps committed sinks in memory, keyed by path.
///
/// Later commits to the same path replace earlier ones.
#[derive(Debug, Clone, Default)]
pub struct MemorySinks {
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemorySinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything committed so far.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<u8>> {
        self.files.lock().map(|f| f.clone()).unwrap_or_default()
    }

    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.files.lock().ok()?.get(path).cloned()
    }
}

impl SinkFactory for MemorySinks {
    fn open(&self, requested: &str) -> Result<Box<dyn Sink>, SinkError> {
        Ok(Box::new(MemorySink {
            name: path::sanitize(requested).unwrap_or_else(path::placeholder_name),
            buf: Vec::new(),
            files: Arc::clone(&self.files),
        }))
    }
}

struct MemorySink {
    name: String,
    buf: Vec<u8>,
    files: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

#[async_trait]
impl Sink for MemorySink {
    fn path(&self) -> &str {
        &self.name
    }

    fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    async fn close(self: Box<Self>) -> Result<(), SinkError> {
        let MemorySink { name, buf, files } = *self;
        let mut files = files.lock().map_err(|_| SinkError::Io {
            path: name.clone(),
            source: std::io::Error::other("memory sink poisoned"),
        })?;
        files.insert(name, buf);
        Ok(())
    }
}

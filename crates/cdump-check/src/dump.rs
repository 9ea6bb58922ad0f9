//! Read access to a captured dump.
use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, Read},
    path::{Path, PathBuf},
    sync::Arc,
};

use flate2::read::GzDecoder;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::CheckError;

/// A set of named files produced by a dump run.
pub trait Dump {
    /// Every file path, relative to the dump root, using `/` separators.
    fn files(&self) -> Result<Vec<String>, CheckError>;

    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, CheckError>;
}

/// A dump written to a directory.
#[derive(Debug, Clone)]
pub struct DirDump {
    root: PathBuf,
}

impl DirDump {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl Dump for DirDump {
    fn files(&self) -> Result<Vec<String>, CheckError> {
        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root).sort_by_file_name() {
            let entry = entry.map_err(|e| CheckError::Io {
                file: self.root.display().to_string(),
                source: e.into(),
            })?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&self.root) {
                let parts: Vec<_> = rel.iter().map(|p| p.to_string_lossy()).collect();
                files.push(parts.join("/"));
            }
        }
        Ok(files)
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, CheckError> {
        let file = File::open(self.root.join(path)).map_err(|source| CheckError::Io {
            file: path.to_string(),
            source,
        })?;
        Ok(Box::new(io::BufReader::new(file)))
    }
}

/// A dump held in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemoryDump {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryDump {
    pub fn new(files: BTreeMap<String, Vec<u8>>) -> Self {
        Self { files }
    }

    /// Loads every regular file of a `.tar.gz` stream.
    pub fn from_tar_gz<R: Read>(reader: R, name: &str) -> Result<Self, CheckError> {
        let io_err = |source| CheckError::Io {
            file: name.to_string(),
            source,
        };
        let mut archive = tar::Archive::new(GzDecoder::new(reader));
        let mut files = BTreeMap::new();
        for entry in archive.entries().map_err(io_err)? {
            let mut entry = entry.map_err(io_err)?;
            if !entry.header().entry_type().is_file() {
                continue;
            }
            let path = entry.path().map_err(io_err)?.to_string_lossy().into_owned();
            let mut body = Vec::new();
            entry.read_to_end(&mut body).map_err(io_err)?;
            files.insert(path, body);
        }
        debug!(target: "cdump.check", archive = name, files = files.len(), "archive loaded");
        Ok(Self { files })
    }

    pub fn insert(&mut self, path: impl Into<String>, body: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), body.into());
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl Dump for MemoryDump {
    fn files(&self) -> Result<Vec<String>, CheckError> {
        Ok(self.files.keys().cloned().collect())
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, CheckError> {
        let body = self.files.get(path).ok_or_else(|| CheckError::Io {
            file: path.to_string(),
            source: io::Error::from(io::ErrorKind::NotFound),
        })?;
        Ok(Box::new(body.as_slice()))
    }
}

/// View of another dump restricted to paths starting with `prefix`.
///
/// Paths are reported unchanged, prefix included.
#[derive(Clone)]
pub struct Scoped {
    inner: Arc<dyn Dump + Send + Sync>,
    prefix: String,
}

impl Scoped {
    pub fn new(inner: Arc<dyn Dump + Send + Sync>, prefix: impl Into<String>) -> Self {
        Self {
            inner,
            prefix: prefix.into(),
        }
    }
}

impl Dump for Scoped {
    fn files(&self) -> Result<Vec<String>, CheckError> {
        let mut files = self.inner.files()?;
        files.retain(|f| f.starts_with(&self.prefix));
        Ok(files)
    }

    fn open(&self, path: &str) -> Result<Box<dyn Read + '_>, CheckError> {
        self.inner.open(path)
    }
}

/// Opens `path` as a dump: a directory as-is, anything else as a `.tar.gz`.
pub fn open_path(path: &Path) -> Result<Arc<dyn Dump + Send + Sync>, CheckError> {
    if path.is_dir() {
        return Ok(Arc::new(DirDump::new(path)));
    }
    let name = path.display().to_string();
    let file = File::open(path).map_err(|source| CheckError::Io {
        file: name.clone(),
        source,
    })?;
    Ok(Arc::new(MemoryDump::from_tar_gz(io::BufReader::new(file), &name)?))
}

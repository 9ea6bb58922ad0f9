//! Single-consumer `.tar.gz` multiplexer.
//!
//! Any number of producers open [`ArchiveEntry`] handles, buffer into them
//! and submit them on close. Submitted entries are queued on a bounded
//! channel and written one at a time by a consumer running on a blocking
//! thread, so the tar stream never sees interleaved headers or bodies.
//!
//! ```text
//! entry.close() ──┐
//! entry.close() ──┼──► mpsc (bounded) ──► consumer ──► tar ──► gzip ──► W
//! entry.close() ──┘
//! ```
//!
//! [`Archive::close`] stops intake, drains the queue and finalizes the tar
//! stream and then the gzip stream. Entries submitted after that point are
//! rejected with [`ArchiveError::Closed`].
mod consumer;
mod error;
mod names;

pub use error::ArchiveError;

use std::{
    collections::BTreeMap,
    io::Write,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{trace, warn};

use crate::sink::{Sink, SinkError, SinkFactory};
use consumer::Request;

#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    /// Bound of the submission queue.
    pub queue_capacity: usize,
    /// Permission bits stamped on every entry.
    pub mode: u32,
    /// Modification time (unix seconds) stamped on every entry.
    pub mtime: u64,
    /// Entries whose path ends with one of these suffixes are also kept in
    /// memory and served by [`ArchiveWriter::retained`].
    pub retain_suffixes: Vec<String>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            queue_capacity: 64,
            mode: 0o775,
            mtime: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or_default(),
            retain_suffixes: Vec::new(),
        }
    }
}

impl ArchiveOptions {
    pub(crate) fn retains(&self, path: &str) -> bool {
        self.retain_suffixes.iter().any(|s| path.ends_with(s.as_str()))
    }
}

#[derive(Debug, Default)]
struct Shared {
    open: AtomicUsize,
    closed: AtomicBool,
}

/// Owner of a compressed archive being written to `W`.
pub struct Archive<W> {
    writer: ArchiveWriter,
    consumer: JoinHandle<Result<W, ArchiveError>>,
}

impl<W> Archive<W>
where
    W: Write + Send + 'static,
{
    pub fn new(out: W) -> Self {
        Self::with_options(out, ArchiveOptions::default())
    }

    /// Starts the consumer. Must be called from within a tokio runtime.
    pub fn with_options(out: W, opts: ArchiveOptions) -> Self {
        let (tx, rx) = mpsc::channel(opts.queue_capacity.max(1));
        let consumer = tokio::task::spawn_blocking(move || consumer::consume(rx, out, opts));
        Self {
            writer: ArchiveWriter {
                tx,
                shared: Arc::new(Shared::default()),
            },
            consumer,
        }
    }

    /// Cloneable producer handle.
    pub fn writer(&self) -> ArchiveWriter {
        self.writer.clone()
    }

    pub fn open(&self, path: &str) -> ArchiveEntry {
        self.writer.open(path)
    }

    /// Stops intake, writes every queued entry and finalizes the archive.
    ///
    /// If entry handles are still open the archive is finalized anyway and
    /// [`ArchiveError::EntriesStillOpen`] is returned; those handles fail on
    /// close instead of being silently dropped.
    pub async fn close(self) -> Result<W, ArchiveError> {
        let shared = Arc::clone(&self.writer.shared);
        shared.closed.store(true, Ordering::SeqCst);
        let open = shared.open.load(Ordering::SeqCst);

        // A failed send means the consumer already exited; its result says why.
        let _ = self.writer.tx.send(Request::Finish).await;
        let out = self
            .consumer
            .await
            .map_err(|e| ArchiveError::Consumer(e.to_string()))??;

        if open > 0 {
            warn!(target: "cdump.core.archive", open, "archive finalized with open entries");
            return Err(ArchiveError::EntriesStillOpen { open });
        }
        Ok(out)
    }
}

/// Producer side of an [`Archive`].
#[derive(Clone)]
pub struct ArchiveWriter {
    tx: mpsc::Sender<Request>,
    shared: Arc<Shared>,
}

impl ArchiveWriter {
    pub fn open(&self, path: &str) -> ArchiveEntry {
        self.shared.open.fetch_add(1, Ordering::SeqCst);
        ArchiveEntry {
            name: path.to_string(),
            buf: Vec::new(),
            writer: self.clone(),
            done: false,
        }
    }

    /// Copies of every retained entry written so far.
    ///
    /// Entries closed before this call are always included.
    pub async fn retained(&self) -> Result<BTreeMap<String, Vec<u8>>, ArchiveError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(Request::Retained(reply))
            .await
            .map_err(|_| ArchiveError::Consumer("queue closed".into()))?;
        rx.await
            .map_err(|_| ArchiveError::Consumer("no reply".into()))
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::SeqCst)
    }
}

impl SinkFactory for ArchiveWriter {
    fn open(&self, path: &str) -> Result<Box<dyn Sink>, SinkError> {
        if self.is_closed() {
            return Err(ArchiveError::Closed {
                name: path.to_string(),
            }
            .into());
        }
        Ok(Box::new(ArchiveWriter::open(self, path)))
    }
}

/// One logical file being buffered for the archive.
///
/// Nothing reaches the archive until [`ArchiveEntry::submit`] (or
/// [`Sink::close`]) is called.
pub struct ArchiveEntry {
    name: String,
    buf: Vec<u8>,
    writer: ArchiveWriter,
    done: bool,
}

impl ArchiveEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn write(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Queues the buffered content for writing.
    ///
    /// Waits while the queue is full.
    pub async fn submit(mut self) -> Result<(), ArchiveError> {
        self.release();
        let name = std::mem::take(&mut self.name);
        let content = std::mem::take(&mut self.buf);

        if self.writer.is_closed() {
            return Err(ArchiveError::Closed { name });
        }
        trace!(target: "cdump.core.archive", entry = %name, bytes = content.len(), "entry submitted");
        self.writer
            .tx
            .send(Request::Write { name, content })
            .await
            .map_err(|e| match e.0 {
                Request::Write { name, .. } => ArchiveError::Closed { name },
                _ => ArchiveError::Consumer("queue closed".into()),
            })
    }

    fn release(&mut self) {
        if !self.done {
            self.done = true;
            self.writer.shared.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for ArchiveEntry {
    fn drop(&mut self) {
        if !self.done {
            trace!(target: "cdump.core.archive", entry = %self.name, "entry dropped without close");
        }
        self.release();
    }
}

#[async_trait]
impl Sink for ArchiveEntry {
    fn path(&self) -> &str {
        &self.name
    }

    fn write(&mut self, bytes: &[u8]) {
        ArchiveEntry::write(self, bytes);
    }

    async fn close(self: Box<Self>) -> Result<(), SinkError> {
        Ok((*self).submit().await?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use flate2::read::GzDecoder;

    use super::*;

    fn entries(bytes: &[u8]) -> Vec<(String, u32, Vec<u8>)> {
        let mut archive = tar::Archive::new(GzDecoder::new(bytes));
        archive
            .entries()
            .unwrap()
            .map(|e| {
                let mut e = e.unwrap();
                let name = e.path().unwrap().to_string_lossy().into_owned();
                let mode = e.header().mode().unwrap();
                let mut body = Vec::new();
                e.read_to_end(&mut body).unwrap();
                (name, mode, body)
            })
            .collect()
    }

    #[tokio::test]
    async fn writes_entries_in_submission_order() {
        let archive = Archive::new(Vec::new());
        let mut a = archive.open("projects/core/definitions/pods.json");
        a.write(b"{\"items\":[]}");
        let mut b = archive.open("oadm-diagnostics.log");
        b.write(b"[Note] Running diagnostic");
        a.submit().await.unwrap();
        b.submit().await.unwrap();

        let out = archive.close().await.unwrap();
        let got = entries(&out);
        assert_eq!(got.len(), 2);
        assert_eq!(got[0].0, "projects/core/definitions/pods.json");
        assert_eq!(got[0].1, 0o775);
        assert_eq!(got[0].2, b"{\"items\":[]}");
        assert_eq!(got[1].0, "oadm-diagnostics.log");
    }

    #[tokio::test]
    async fn empty_archive_is_valid() {
        let archive = Archive::new(Vec::new());
        let out = archive.close().await.unwrap();
        assert!(entries(&out).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_concurrent_producers() {
        let archive = Archive::with_options(
            Vec::new(),
            ArchiveOptions {
                queue_capacity: 4,
                ..Default::default()
            },
        );
        let mut handles = Vec::new();
        for i in 0..100 {
            let writer = archive.writer();
            handles.push(tokio::spawn(async move {
                let mut entry = writer.open(&format!("logs/file-{i}.log"));
                for _ in 0..10 {
                    entry.write(format!("line {i}\n").as_bytes());
                }
                entry.submit().await
            }));
        }
        for h in handles {
            h.await.unwrap().unwrap();
        }

        let out = archive.close().await.unwrap();
        let got = entries(&out);
        assert_eq!(got.len(), 100);
        for (name, _, body) in got {
            let i: usize = name
                .trim_start_matches("logs/file-")
                .trim_end_matches(".log")
                .parse()
                .unwrap();
            assert_eq!(body, format!("line {i}\n").repeat(10).into_bytes());
        }
    }

    #[tokio::test]
    async fn utf8_names_and_content_survive() {
        let name = "logs/projects/phils-core/pods-fh-aaa-8-v7m10-fh-aaa.logs ✓";
        let archive = Archive::new(Vec::new());
        let mut e = archive.open(name);
        e.write("répertoire ✓ 日本".as_bytes());
        e.submit().await.unwrap();

        let got = entries(&archive.close().await.unwrap());
        assert_eq!(got[0].0, name);
        assert_eq!(String::from_utf8(got[0].2.clone()).unwrap(), "répertoire ✓ 日本");
    }

    #[tokio::test]
    async fn duplicate_and_blank_names_are_kept_apart() {
        let archive = Archive::new(Vec::new());
        for body in [&b"one"[..], b"two"] {
            let mut e = archive.open("events.json");
            e.write(body);
            e.submit().await.unwrap();
        }
        archive.open("   ").submit().await.unwrap();

        let got = entries(&archive.close().await.unwrap());
        let names: Vec<_> = got.iter().map(|(n, _, _)| n.as_str()).collect();
        assert_eq!(names[..2], ["events.json", "events.json.1"]);
        assert!(names[2].starts_with("unnamed-"));
    }

    #[tokio::test]
    async fn close_with_open_entry_rejects_late_writes() {
        let archive = Archive::new(Vec::new());
        let mut late = archive.open("late.txt");
        late.write(b"too late");

        let err = archive.close().await.unwrap_err();
        assert!(matches!(err, ArchiveError::EntriesStillOpen { open: 1 }));
        assert!(matches!(
            late.submit().await,
            Err(ArchiveError::Closed { name }) if name == "late.txt"
        ));
    }

    #[tokio::test]
    async fn dropped_entry_is_not_counted_open() {
        let archive = Archive::new(Vec::new());
        drop(archive.open("abandoned.txt"));
        let got = entries(&archive.close().await.unwrap());
        assert!(got.is_empty());
    }

    #[tokio::test]
    async fn retains_matching_entries() {
        let archive = Archive::with_options(
            Vec::new(),
            ArchiveOptions {
                retain_suffixes: vec!["events.json".into()],
                ..Default::default()
            },
        );
        let writer = archive.writer();
        for path in ["projects/core/definitions/events.json", "projects/core/definitions/pods.json"] {
            let mut sink = SinkFactory::open(&writer, path).unwrap();
            sink.write(b"{}");
            sink.close().await.unwrap();
        }

        let retained = writer.retained().await.unwrap();
        assert_eq!(
            retained.keys().collect::<Vec<_>>(),
            ["projects/core/definitions/events.json"]
        );
        archive.close().await.unwrap();
        assert!(SinkFactory::open(&writer, "x").is_err());
    }
}

use std::{collections::BTreeMap, io::Write};

use flate2::{Compression, write::GzEncoder};
use tar::{Builder, EntryType, Header};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error};

use super::{ArchiveError, ArchiveOptions, names::EntryNames};

pub(super) enum Request {
    Write { name: String, content: Vec<u8> },
    Retained(oneshot::Sender<BTreeMap<String, Vec<u8>>>),
    Finish,
}

/// Sole owner of the tar and gzip writers.
///
/// Runs on a blocking thread until `Finish` arrives, then drains whatever is
/// still queued and finalizes the tar stream before the gzip stream.
pub(super) fn consume<W: Write>(
    mut rx: mpsc::Receiver<Request>,
    out: W,
    opts: ArchiveOptions,
) -> Result<W, ArchiveError> {
    let mut builder = Builder::new(GzEncoder::new(out, Compression::default()));
    let mut names = EntryNames::default();
    let mut retained = BTreeMap::new();
    let mut failure: Option<ArchiveError> = None;
    let mut written = 0usize;

    while let Some(req) = rx.blocking_recv() {
        match req {
            Request::Write { name, content } => {
                if failure.is_some() {
                    continue;
                }
                let name = names.assign(&name);
                match append(&mut builder, &name, &content, &opts) {
                    Ok(()) => {
                        written += 1;
                        if opts.retains(&name) {
                            retained.insert(name, content);
                        }
                    }
                    Err(e) => {
                        error!(target: "cdump.core.archive", entry = %name, error = %e, "archive write failed");
                        failure = Some(ArchiveError::Write { name, source: e });
                    }
                }
            }
            Request::Retained(reply) => {
                let _ = reply.send(retained.clone());
            }
            Request::Finish => rx.close(),
        }
    }

    if let Some(e) = failure {
        return Err(e);
    }
    let gz = builder.into_inner().map_err(ArchiveError::Finish)?;
    let out = gz.finish().map_err(ArchiveError::Finish)?;
    debug!(target: "cdump.core.archive", entries = written, "archive finalized");
    Ok(out)
}

fn append<W: Write>(
    builder: &mut Builder<W>,
    name: &str,
    content: &[u8],
    opts: &ArchiveOptions,
) -> std::io::Result<()> {
    let mut header = Header::new_gnu();
    header.set_entry_type(EntryType::Regular);
    header.set_size(content.len() as u64);
    header.set_mode(opts.mode);
    header.set_mtime(opts.mtime);
    builder.append_data(&mut header, name, content)
}

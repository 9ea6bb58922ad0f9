//! Output destinations for collected data.
//!
//! A [`SinkFactory`] hands out one [`Sink`] per logical file. Data written to
//! a sink is only committed by [`Sink::close`]; a sink dropped without being
//! closed leaves nothing behind.
mod error;
pub use error::SinkError;

mod file;
pub use file::FileSinkFactory;

mod memory;
pub use memory::MemorySinks;

mod output;
pub use output::{PlatformOutput, ProjectOutput};

mod path;
pub use path::{placeholder_name, sanitize};

use async_trait::async_trait;

#[async_trait]
pub trait Sink: Send {
    /// Logical path the data is committed under.
    fn path(&self) -> &str;

    fn write(&mut self, bytes: &[u8]);

    /// Commits the buffered data.
    async fn close(self: Box<Self>) -> Result<(), SinkError>;
}

pub trait SinkFactory: Send + Sync {
    fn open(&self, path: &str) -> Result<Box<dyn Sink>, SinkError>;
}

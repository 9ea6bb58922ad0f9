use std::{fmt, future::Future, pin::Pin, time::Duration};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::TaskError;

/// Boxed future produced by a [`Task`].
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<(), TaskError>> + Send + 'static>>;

type TaskFn = Box<dyn FnOnce(CancellationToken) -> TaskFuture + Send + 'static>;

/// A named, self-contained unit of collection or analysis work.
///
/// A task runs at most once. It receives a cancellation token that fires
/// when its deadline expires or the whole run is aborted.
pub struct Task {
    name: String,
    run: TaskFn,
}

impl Task {
    pub fn new<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), TaskError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Box::new(move |cancel| Box::pin(f(cancel))),
        }
    }

    /// A task that fails immediately with `err`.
    ///
    /// Used to surface planning problems through the normal error channel.
    pub fn failed(name: impl Into<String>, err: TaskError) -> Self {
        Self::new(name, move |_| async move { Err(err) })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, TaskFn) {
        (self.name, self.run)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task").field("name", &self.name).finish()
    }
}

/// Result of one executed task.
#[derive(Debug)]
pub struct TaskOutcome {
    pub name: String,
    pub result: Result<(), TaskError>,
    pub elapsed: Duration,
}

impl TaskOutcome {
    #[inline]
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Wraps an already-known list of tasks as a closed stream.
pub fn task_stream(tasks: Vec<Task>) -> mpsc::Receiver<Task> {
    let (tx, rx) = mpsc::channel(tasks.len().max(1));
    for task in tasks {
        // capacity covers every task
        let _ = tx.try_send(task);
    }
    rx
}

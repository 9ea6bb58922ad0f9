//! Bounded concurrent execution of a task stream.
//!
//! Tasks are pulled from a channel as they are planned. With a parallelism of
//! one they run strictly in arrival order; otherwise at most `parallelism`
//! tasks run at once, gated by a semaphore. Every task gets its own deadline
//! and a child of the run-wide cancellation token.
use std::{collections::HashMap, sync::Arc, time::Duration};

use tokio::{
    sync::{OwnedSemaphorePermit, Semaphore, mpsc},
    task::{Id, JoinError, JoinSet},
    time::Instant,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::{
    error::{ErrorList, TaskError},
    task::{Task, TaskOutcome},
};

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Upper bound on concurrently running tasks. Zero is treated as one.
    pub parallelism: usize,
    /// Per-task deadline. `None` lets tasks run until they finish.
    pub task_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            parallelism: 1,
            task_timeout: None,
        }
    }
}

/// Outcomes of every task in a run, in completion order.
#[derive(Debug, Default)]
pub struct RunReport {
    pub outcomes: Vec<TaskOutcome>,
}

impl RunReport {
    pub fn failures(&self) -> impl Iterator<Item = &TaskOutcome> {
        self.outcomes.iter().filter(|o| !o.is_ok())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Collapses failures into one list, each prefixed with its task name.
    pub fn errors(&self) -> ErrorList {
        self.failures()
            .filter_map(|o| o.result.as_ref().err().map(|e| format!("{}: {e}", o.name)))
            .collect()
    }
}

/// Runs every task received on `tasks` until the sender side is dropped.
///
/// `on_complete` is invoked once per finished task, from the calling task.
pub async fn run<F>(
    tasks: mpsc::Receiver<Task>,
    cfg: &PoolConfig,
    cancel: &CancellationToken,
    mut on_complete: F,
) -> RunReport
where
    F: FnMut(&TaskOutcome),
{
    let mut report = RunReport::default();
    let mut record = |outcome: TaskOutcome| {
        if let Err(e) = &outcome.result {
            debug!(target: "cdump.core.pool", task = %outcome.name, error = %e, "task failed");
        } else {
            trace!(target: "cdump.core.pool", task = %outcome.name, elapsed = ?outcome.elapsed, "task done");
        }
        on_complete(&outcome);
        report.outcomes.push(outcome);
    };

    if cfg.parallelism <= 1 {
        run_sequential(tasks, cfg.task_timeout, cancel, &mut record).await;
    } else {
        run_parallel(tasks, cfg, cancel, &mut record).await;
    }
    report
}

async fn run_sequential(
    mut tasks: mpsc::Receiver<Task>,
    timeout: Option<Duration>,
    cancel: &CancellationToken,
    record: &mut impl FnMut(TaskOutcome),
) {
    while let Some(task) = tasks.recv().await {
        let name = task.name().to_string();
        let joined = tokio::spawn(execute(task, timeout, cancel.child_token())).await;
        record(joined.unwrap_or_else(|e| panicked(name, e)));
    }
}

async fn run_parallel(
    mut tasks: mpsc::Receiver<Task>,
    cfg: &PoolConfig,
    cancel: &CancellationToken,
    record: &mut impl FnMut(TaskOutcome),
) {
    let slots = Arc::new(Semaphore::new(cfg.parallelism));
    let mut running: JoinSet<TaskOutcome> = JoinSet::new();
    let mut names: HashMap<Id, String> = HashMap::new();
    let mut open = true;

    while open || !running.is_empty() {
        tokio::select! {
            Some(joined) = running.join_next_with_id(), if !running.is_empty() => {
                match joined {
                    Ok((id, outcome)) => {
                        names.remove(&id);
                        record(outcome);
                    }
                    Err(e) => {
                        let name = names.remove(&e.id()).unwrap_or_default();
                        record(panicked(name, e));
                    }
                }
            }
            next = next_slot(&mut tasks, &slots), if open => match next {
                Some((task, permit)) => {
                    let name = task.name().to_string();
                    let child = cancel.child_token();
                    let timeout = cfg.task_timeout;
                    let handle = running.spawn(async move {
                        let outcome = execute(task, timeout, child).await;
                        drop(permit);
                        outcome
                    });
                    names.insert(handle.id(), name);
                }
                None => open = false,
            },
        }
    }
}

/// Waits for a free slot, then for the next task.
///
/// Cancel safe: dropping the future releases the permit and loses no task.
async fn next_slot(
    tasks: &mut mpsc::Receiver<Task>,
    slots: &Arc<Semaphore>,
) -> Option<(Task, OwnedSemaphorePermit)> {
    let permit = Arc::clone(slots).acquire_owned().await.ok()?;
    let task = tasks.recv().await?;
    Some((task, permit))
}

async fn execute(task: Task, timeout: Option<Duration>, cancel: CancellationToken) -> TaskOutcome {
    let started = Instant::now();
    let (name, run) = task.into_parts();
    let fut = run(cancel.clone());

    let result = tokio::select! {
        res = async {
            match timeout {
                Some(limit) => tokio::time::timeout(limit, fut)
                    .await
                    .unwrap_or(Err(TaskError::Timeout(limit))),
                None => fut.await,
            }
        } => res,
        _ = cancel.cancelled() => Err(TaskError::Cancelled),
    };
    if matches!(result, Err(TaskError::Timeout(_))) {
        warn!(target: "cdump.core.pool", task = %name, "deadline exceeded");
        cancel.cancel();
    }

    TaskOutcome {
        name,
        result,
        elapsed: started.elapsed(),
    }
}

fn panicked(name: String, e: JoinError) -> TaskOutcome {
    let result = if e.is_cancelled() {
        Err(TaskError::Cancelled)
    } else {
        let payload = e.into_panic();
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "task panicked".to_string());
        Err(TaskError::Panicked(reason))
    };
    TaskOutcome {
        name,
        result,
        elapsed: Duration::ZERO,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::task::task_stream;

    fn cfg(parallelism: usize) -> PoolConfig {
        PoolConfig {
            parallelism,
            task_timeout: Some(Duration::from_secs(5)),
        }
    }

    #[tokio::test]
    async fn sequential_runs_in_arrival_order() {
        let (tx, rx) = mpsc::channel(4);
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        for i in 0..4 {
            let order = Arc::clone(&order);
            tx.send(Task::new(format!("t{i}"), move |_| async move {
                tokio::time::sleep(Duration::from_millis(5 * (4 - i))).await;
                order.lock().unwrap().push(i);
                Ok(())
            }))
            .await
            .unwrap();
        }
        drop(tx);

        let report = run(rx, &cfg(1), &CancellationToken::new(), |_| {}).await;
        assert_eq!(report.outcomes.len(), 4);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn parallel_respects_bound() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let tasks = (0..12)
            .map(|i| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                Task::new(format!("t{i}"), move |_| async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
            })
            .collect();

        let mut seen = 0;
        let report = run(task_stream(tasks), &cfg(3), &CancellationToken::new(), |_| seen += 1).await;
        assert_eq!(seen, 12);
        assert!(!report.has_failures());
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn one_failure_does_not_stop_others() {
        let tasks = vec![
            Task::new("ok-1", |_| async { Ok(()) }),
            Task::failed("broken", TaskError::fail("exit status 1")),
            Task::new("ok-2", |_| async { Ok(()) }),
        ];
        let report = run(task_stream(tasks), &cfg(2), &CancellationToken::new(), |_| {}).await;
        assert_eq!(report.outcomes.len(), 3);
        let errors = report.errors();
        assert_eq!(errors.iter().collect::<Vec<_>>(), ["broken: exit status 1"]);
    }

    #[tokio::test]
    async fn deadline_stops_slow_task() {
        let tasks = vec![Task::new("slow", |_| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })];
        let cfg = PoolConfig {
            parallelism: 1,
            task_timeout: Some(Duration::from_millis(30)),
        };
        let report = run(task_stream(tasks), &cfg, &CancellationToken::new(), |_| {}).await;
        assert!(matches!(
            report.outcomes[0].result,
            Err(TaskError::Timeout(_))
        ));
    }

    #[tokio::test]
    async fn aborted_run_reports_cancelled() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let tasks = vec![Task::new("pending", |_| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(())
        })];
        let report = run(task_stream(tasks), &cfg(2), &cancel, |_| {}).await;
        assert!(matches!(report.outcomes[0].result, Err(TaskError::Cancelled)));
    }

    #[tokio::test]
    async fn panic_is_reported_with_task_name() {
        let tasks = vec![Task::new("boom", |_| async {
            let input: Option<u8> = None;
            input.expect("bad input");
            Ok(())
        })];
        let report = run(task_stream(tasks), &cfg(2), &CancellationToken::new(), |_| {}).await;
        let outcome = &report.outcomes[0];
        assert_eq!(outcome.name, "boom");
        assert!(matches!(&outcome.result, Err(TaskError::Panicked(m)) if m.contains("bad input")));
    }
}

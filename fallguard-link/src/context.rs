//! The main execution context.
//!
//! Sensor callbacks arrive on threads owned by the motion engine and
//! transport events on the session loop. Anything observed by the UI layer
//! is handed to the [`MainContext`] first: a single task that runs jobs one
//! at a time, in submission order.

use crate::error::{LinkError, LinkResult};
use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

tokio::task_local! {
    static ON_MAIN_CONTEXT: ();
}

type Job = BoxFuture<'static, ()>;

/// Handle to the serial main-context executor. Cheap to clone.
#[derive(Clone)]
pub struct MainContext {
    jobs: mpsc::UnboundedSender<Job>,
    runner: Arc<JoinHandle<()>>,
}

impl std::fmt::Debug for MainContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainContext")
            .field("closed", &self.jobs.is_closed())
            .finish()
    }
}

impl MainContext {
    /// Spawns the executor on the current tokio runtime.
    ///
    /// Must be called from within a runtime.
    pub fn spawn() -> Self {
        let (jobs, mut rx) = mpsc::unbounded_channel::<Job>();
        let runner = tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                let outcome = ON_MAIN_CONTEXT
                    .scope((), AssertUnwindSafe(job).catch_unwind())
                    .await;
                if outcome.is_err() {
                    warn!("main context job panicked; continuing");
                }
            }
            debug!("main context stopped");
        });

        Self {
            jobs,
            runner: Arc::new(runner),
        }
    }

    /// Returns whether the caller is running on a main context.
    pub fn is_current() -> bool {
        ON_MAIN_CONTEXT.try_with(|_| ()).is_ok()
    }

    /// Queues a job without waiting for it.
    ///
    /// If the context is closed the job is dropped, which runs the
    /// destructors of everything it captured.
    pub fn dispatch<F>(&self, job: F) -> LinkResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.jobs
            .send(Box::pin(job))
            .map_err(|_| LinkError::ContextClosed)
    }

    /// Runs `f` on the main context and returns its result.
    pub async fn run<F, R>(&self, f: F) -> LinkResult<R>
    where
        F: FnOnce() -> R + Send + 'static,
        R: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        self.dispatch(async move {
            let _ = tx.send(f());
        })?;
        rx.await.map_err(|_| LinkError::ContextClosed)
    }

    /// Waits until every job queued before this call has finished.
    pub async fn flush(&self) -> LinkResult<()> {
        self.run(|| ()).await
    }

    /// Returns whether the executor has stopped.
    pub fn is_closed(&self) -> bool {
        self.jobs.is_closed()
    }

    /// Stops the executor. Queued jobs are dropped.
    pub fn shutdown(&self) {
        self.runner.abort();
    }
}

//! Bounded FIFO queue with a single draining worker
//!
//! `enqueue` only performs a capacity check: when there is room the task is
//! buffered and the caller continues; when the queue is full (or already shut
//! down) the task is processed inline on the caller instead of being dropped.
//! Task failures and handler panics are logged and never stop the worker.

use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::error::DispatchError;
use crate::routes::metrics;

/// Processing applied to every task taken off a queue
#[async_trait]
pub trait TaskHandler<T>: Send + Sync {
    async fn handle(&self, task: &T) -> Result<(), DispatchError>;
}

/// Short, log-safe description of a task
pub trait TaskSummary {
    fn summary(&self) -> String;
}

/// Where an enqueued task ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Buffered for the worker
    Queued,
    /// Processed on the caller because the queue was full or closed
    Inline,
}

/// Bounded queue drained by one background worker
pub struct BoundedTaskQueue<T> {
    name: &'static str,
    capacity: usize,
    sender: RwLock<Option<mpsc::Sender<T>>>,
    receiver: Mutex<Option<mpsc::Receiver<T>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    handler: Arc<dyn TaskHandler<T>>,
}

impl<T> BoundedTaskQueue<T>
where
    T: TaskSummary + Send + Sync + 'static,
{
    /// Create a queue; the worker is not running until [`start`](Self::start)
    pub fn new(name: &'static str, capacity: usize, handler: Arc<dyn TaskHandler<T>>) -> Self {
        let capacity = capacity.max(1);
        let (sender, receiver) = mpsc::channel(capacity);

        Self {
            name,
            capacity,
            sender: RwLock::new(Some(sender)),
            receiver: Mutex::new(Some(receiver)),
            worker: Mutex::new(None),
            handler,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Tasks currently buffered
    pub fn pending(&self) -> usize {
        let guard = self.sender.read().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .map(|tx| self.capacity - tx.capacity())
            .unwrap_or(0)
    }

    /// Spawn the worker. Only the first call has an effect.
    pub fn start(&self) -> bool {
        // Held across take-and-spawn so `shutdown` sees either the receiver or the handle
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);

        let receiver = self
            .receiver
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(receiver) = receiver else {
            warn!(queue = self.name, "Dispatch worker already started");
            return false;
        };

        *worker = Some(tokio::spawn(Self::run_worker(
            self.name,
            receiver,
            self.handler.clone(),
        )));
        true
    }

    /// Hand a task to the queue
    pub async fn enqueue(&self, task: T) -> EnqueueOutcome {
        let rejected = {
            let guard = self.sender.read().unwrap_or_else(PoisonError::into_inner);
            let result = match guard.as_ref() {
                Some(tx) => match tx.try_send(task) {
                    Ok(()) => None,
                    Err(TrySendError::Full(task)) => Some((task, "full")),
                    Err(TrySendError::Closed(task)) => Some((task, "closed")),
                },
                None => Some((task, "closed")),
            };
            result
        };

        match rejected {
            None => {
                metrics::record_dispatch(self.name, "queued");
                EnqueueOutcome::Queued
            }
            Some((task, reason)) => {
                warn!(
                    queue = self.name,
                    reason,
                    task = %task.summary(),
                    "Queue not accepting, processing task inline"
                );
                metrics::record_dispatch(self.name, "inline");
                process(self.handler.as_ref(), self.name, &task).await;
                EnqueueOutcome::Inline
            }
        }
    }

    /// Worker loop: process tasks in FIFO order until the channel closes
    pub async fn run_worker(
        name: &'static str,
        mut receiver: mpsc::Receiver<T>,
        handler: Arc<dyn TaskHandler<T>>,
    ) {
        info!(queue = name, "Starting dispatch worker");

        while let Some(task) = receiver.recv().await {
            process(handler.as_ref(), name, &task).await;
        }

        info!(queue = name, "Dispatch worker stopped");
    }

    /// Stop accepting tasks and drain what is buffered, up to `timeout`.
    ///
    /// Returns `false` if the drain had to be abandoned.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        // Dropping the only sender closes the channel once it is empty
        let sender = self
            .sender
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if sender.is_none() {
            return true;
        }
        drop(sender);

        // Same lock order as `start`: worker, then receiver
        let (worker, receiver) = {
            let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
            let mut receiver = self.receiver.lock().unwrap_or_else(PoisonError::into_inner);
            (worker.take(), receiver.take())
        };

        let drained = match (worker, receiver) {
            (Some(mut handle), _) => match tokio::time::timeout(timeout, &mut handle).await {
                Ok(_) => true,
                Err(_) => {
                    handle.abort();
                    false
                }
            },
            // Never started: drain on the caller
            (None, Some(receiver)) => tokio::time::timeout(
                timeout,
                Self::run_worker(self.name, receiver, self.handler.clone()),
            )
            .await
            .is_ok(),
            (None, None) => true,
        };

        if drained {
            info!(queue = self.name, "Dispatch queue drained");
        } else {
            error!(
                queue = self.name,
                timeout_ms = timeout.as_millis() as u64,
                "Dispatch queue did not drain before timeout, remaining tasks abandoned"
            );
        }
        drained
    }
}

/// Run one task, containing any failure
async fn process<T: TaskSummary + Sync>(handler: &dyn TaskHandler<T>, queue: &'static str, task: &T) {
    match AssertUnwindSafe(handler.handle(task)).catch_unwind().await {
        Ok(Ok(())) => {
            debug!(queue, task = %task.summary(), "Task processed");
            metrics::record_dispatch(queue, "ok");
        }
        Ok(Err(e)) => {
            error!(queue, task = %task.summary(), error = %e, "Task failed");
            metrics::record_dispatch(queue, "failed");
        }
        Err(_) => {
            error!(queue, task = %task.summary(), "Task handler panicked");
            metrics::record_dispatch(queue, "panicked");
        }
    }
}

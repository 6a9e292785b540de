//! The execution scope a store is launched into.

use core::future::Future;
use core::pin::Pin;
use core::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{AbortHandle, Aborted};
use spin::Mutex;

use crate::error::CommandHandlerError;
use crate::latch::Latch;

/// A spawner trait for executing futures on an async runtime.
///
/// This abstraction allows you to use whatever concurrency model you want
/// (tokio, async-std, a thread pool, a single-threaded executor, etc.). The
/// store never chooses threads itself.
///
/// Function pointers and closures automatically implement this trait via the
/// blanket implementation.
pub trait Spawner {
    /// Spawn a future on the async runtime.
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>);
}

impl<F> Spawner for F
where
    F: Fn(Pin<Box<dyn Future<Output = ()> + Send>>),
{
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) {
        self(future)
    }
}

struct Shared {
    cancelled: AtomicBool,
    next_task: AtomicU64,
    /// Tasks still running, by id. A task removes itself when it completes.
    tasks: Mutex<HashMap<u64, AbortHandle>>,
    fault: Mutex<Option<Arc<CommandHandlerError>>>,
    faulted: Latch,
}

impl Shared {
    fn cancel(&self) {
        let tasks = {
            let mut tasks = self.tasks.lock();
            self.cancelled.store(true, Ordering::Release);
            core::mem::take(&mut *tasks)
        };
        for task in tasks.into_values() {
            task.abort();
        }
    }

    fn fail(&self, error: CommandHandlerError) {
        tracing::error!(handler = error.handler(), cause = %error.reason(), "{error}");
        {
            let mut fault = self.fault.lock();
            if fault.is_none() {
                *fault = Some(Arc::new(error));
            }
        }
        self.faulted.count_down();
        self.cancel();
    }
}

/// Owns every task a store launches.
///
/// A failing task is fatal to the whole scope: the first
/// [`CommandHandlerError`] is recorded, every task is cancelled, and
/// [`failed`](Self::failed) resolves. Cancelling the scope ends the event
/// loop and all handlers; state already published stays published.
///
/// ```rust
/// use futures::future::BoxFuture;
/// use mvu_store::Scope;
///
/// // e.g. `|fut| { tokio::spawn(fut); }` with a real runtime
/// let scope = Scope::new(|_fut: BoxFuture<'static, ()>| {});
/// assert!(!scope.is_cancelled());
/// scope.cancel();
/// assert!(scope.is_cancelled());
/// ```
pub struct Scope<Sp> {
    spawner: Sp,
    shared: Arc<Shared>,
}

impl<Sp: Clone> Clone for Scope<Sp> {
    fn clone(&self) -> Self {
        Self {
            spawner: self.spawner.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<Sp: Spawner> Scope<Sp> {
    pub fn new(spawner: Sp) -> Self {
        Self {
            spawner,
            shared: Arc::new(Shared {
                cancelled: AtomicBool::new(false),
                next_task: AtomicU64::new(0),
                tasks: Mutex::new(HashMap::new()),
                fault: Mutex::new(None),
                faulted: Latch::new(1),
            }),
        }
    }

    /// Run `task` until it completes or the scope is cancelled.
    ///
    /// An `Err` from the task faults the scope. Tasks spawned on a cancelled
    /// scope are cancelled before they first run.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = Result<(), CommandHandlerError>> + Send + 'static,
    {
        let (task, handle) = futures::future::abortable(task);
        let id = self.shared.next_task.fetch_add(1, Ordering::Relaxed);
        {
            let mut tasks = self.shared.tasks.lock();
            if self.shared.cancelled.load(Ordering::Acquire) {
                handle.abort();
            } else {
                tasks.insert(id, handle);
            }
        }

        let shared = self.shared.clone();
        self.spawner.spawn(Box::pin(async move {
            let outcome = task.await;
            shared.tasks.lock().remove(&id);
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(error)) => shared.fail(error),
                Err(Aborted) => tracing::trace!("task cancelled"),
            }
        }));
    }
}

impl<Sp> Scope<Sp> {
    pub fn cancel(&self) {
        self.shared.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// The failure that ended this scope, if any.
    pub fn fault(&self) -> Option<Arc<CommandHandlerError>> {
        self.shared.fault.lock().clone()
    }

    /// Resolves once a task has faulted the scope.
    ///
    /// Never resolves for a scope that is only cancelled.
    pub async fn failed(&self) -> Option<Arc<CommandHandlerError>> {
        self.shared.faulted.wait().await;
        self.fault()
    }
}

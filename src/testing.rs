//! Deterministic test harness.
//!
//! Only available with the `testing` feature or during tests.

use core::future::Future;
use core::pin::Pin;
use std::sync::Arc;

use futures::executor::{LocalPool, LocalSpawner};
use futures::task::SpawnExt;
use futures::{future, Stream, StreamExt};
use spin::Mutex;

use crate::{Scope, Spawner};

/// Single-threaded executor that only runs when told to.
///
/// Launch a store on [`scope`](Self::scope), dispatch events, then call
/// [`run_until_stalled`](Self::run_until_stalled) to process everything that
/// can make progress.
///
/// ```rust
/// use mvu_store::{Next, Store, TestExecutor, Update};
///
/// struct Counter;
///
/// impl Update for Counter {
///     type State = i32;
///     type Event = i32;
///     type Command = ();
///     type Effect = ();
///
///     fn update(&self, state: &i32, event: i32) -> Next<i32, (), ()> {
///         Next::new(state + event)
///     }
/// }
///
/// let mut executor = TestExecutor::new();
/// let store = Store::<Counter, i32>::builder(0, Counter).build();
/// store.launch(&executor.scope()).unwrap();
///
/// store.dispatch(2).unwrap();
/// store.dispatch(3).unwrap();
/// executor.run_until_stalled();
///
/// assert_eq!(store.state(), 5);
/// ```
pub struct TestExecutor {
    pool: LocalPool,
}

impl Default for TestExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl TestExecutor {
    pub fn new() -> Self {
        Self {
            pool: LocalPool::new(),
        }
    }

    pub fn spawner(&self) -> TestSpawner {
        TestSpawner(self.pool.spawner())
    }

    /// A fresh scope whose tasks run on this executor.
    pub fn scope(&self) -> Scope<TestSpawner> {
        Scope::new(self.spawner())
    }

    /// Run every task until none of them can make progress.
    pub fn run_until_stalled(&mut self) {
        self.pool.run_until_stalled();
    }
}

/// [`Spawner`] for a [`TestExecutor`].
#[derive(Clone)]
pub struct TestSpawner(LocalSpawner);

impl Spawner for TestSpawner {
    fn spawn(&self, future: Pin<Box<dyn Future<Output = ()> + Send>>) {
        if let Err(error) = self.0.spawn(future) {
            tracing::warn!(%error, "test executor is gone, task dropped");
        }
    }
}

/// Captures every item of a stream for assertions.
///
/// Attach it to [`Store::states`](crate::Store::states),
/// [`Store::effects`](crate::Store::effects) or any other stream.
pub struct Recorder<T> {
    values: Arc<Mutex<Vec<T>>>,
}

impl<T> Clone for Recorder<T> {
    fn clone(&self) -> Self {
        Self {
            values: self.values.clone(),
        }
    }
}

impl<T: Send + 'static> Recorder<T> {
    /// Record `stream` on `scope` until the stream ends or the scope is cancelled.
    pub fn attach<S, Sp>(stream: S, scope: &Scope<Sp>) -> Self
    where
        S: Stream<Item = T> + Send + 'static,
        Sp: Spawner,
    {
        let values = Arc::new(Mutex::new(Vec::new()));
        let sink = values.clone();
        scope.spawn(async move {
            stream
                .for_each(|value| {
                    sink.lock().push(value);
                    future::ready(())
                })
                .await;
            Ok(())
        });
        Self { values }
    }

    /// Get the number of values recorded so far.
    pub fn count(&self) -> usize {
        self.values.lock().len()
    }

    /// Access the recorded values with a closure.
    pub fn with_values<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Vec<T>) -> R,
    {
        let values = self.values.lock();
        f(&values)
    }
}

impl<T: Clone> Recorder<T> {
    pub fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }
}

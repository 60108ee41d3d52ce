//! Timers owned by a page controller. Everything spawned here is
//! aborted when its owner is dropped.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};

/// A set of background tasks that live as long as the set does.
#[derive(Default)]
pub struct Tasks {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Tasks {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(future);

        let mut handles = self.handles();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Runs `f` every `period`, starting one period from now.
    pub fn every<F, Fut>(&self, period: Duration, mut f: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);

            loop {
                ticker.tick().await;
                f().await;
            }
        });
    }

    /// Runs `future` once, after `delay`.
    pub fn after<F>(&self, delay: Duration, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn(async move {
            sleep(delay).await;
            future.await;
        });
    }

    /// How many tasks haven't finished yet.
    pub fn pending(&self) -> usize {
        self.handles().iter().filter(|h| !h.is_finished()).count()
    }

    pub fn cancel_all(&self) {
        for handle in self.handles().drain(..) {
            handle.abort();
        }
    }

    fn handles(&self) -> MutexGuard<Vec<JoinHandle<()>>> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Tasks {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

/// Runs only the last of a burst of calls, once `delay` has passed
/// without another one.
pub struct Debouncer {
    delay: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Debouncer {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn call<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            future.await;
        });

        if let Some(previous) = self.pending().replace(handle) {
            previous.abort();
        }
    }

    pub fn cancel(&self) {
        if let Some(previous) = self.pending().take() {
            previous.abort();
        }
    }

    fn pending(&self) -> MutexGuard<Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

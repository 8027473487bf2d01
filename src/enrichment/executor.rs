use crate::enrichment::cancel::{CancellationSignal, Cancelled};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::future::Future;

/// Runs a batch of backend calls with at most `max_concurrent` in flight.
///
/// Results come back in input order whatever order the calls complete in, so callers
/// get deterministic output from concurrent fan-out. With `max_concurrent == 1` the
/// batch runs strictly one call at a time.
#[derive(Debug, Clone, Copy)]
pub struct BoundedExecutor {
    max_concurrent: usize,
}

impl BoundedExecutor {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Run every task to completion.
    ///
    /// Outstanding and pending tasks are dropped as soon as `cancel` fires.
    pub async fn run<I, T, F, Fut, R>(
        &self,
        items: I,
        task: F,
        cancel: &CancellationSignal,
    ) -> Result<Vec<R>, Cancelled>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = R>,
    {
        let work = stream::iter(items)
            .map(task)
            .buffered(self.max_concurrent)
            .collect::<Vec<R>>();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Cancelled),
            results = work => Ok(results),
        }
    }

    /// Run tasks until the first error, which drops every other outstanding task.
    pub async fn try_run<I, T, F, Fut, R, E>(
        &self,
        items: I,
        task: F,
        cancel: &CancellationSignal,
    ) -> Result<Result<Vec<R>, E>, Cancelled>
    where
        I: IntoIterator<Item = T>,
        F: FnMut(T) -> Fut,
        Fut: Future<Output = Result<R, E>>,
    {
        let work = stream::iter(items)
            .map(task)
            .buffered(self.max_concurrent)
            .try_collect::<Vec<R>>();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Cancelled),
            results = work => Ok(results),
        }
    }
}

impl Default for BoundedExecutor {
    fn default() -> Self {
        Self::new(1)
    }
}

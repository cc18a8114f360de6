use futures::stream::{self, StreamExt};
use std::fmt::Display;
use std::future::Future;

/// Counts of items a pool run finished
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolSummary {
    pub succeeded: usize,
    pub failed: usize,
}

impl PoolSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Runs `worker` over every item with at most `limit` futures in flight.
///
/// All futures are polled on the calling task, so the limit bounds pending
/// I/O rather than threads. Items finish in any order. A failing item is
/// logged and counted; it never cancels its siblings. A `limit` of zero is
/// treated as one.
pub async fn run_bounded<I, F, Fut, E>(items: I, limit: usize, worker: F) -> PoolSummary
where
    I: IntoIterator,
    F: FnMut(I::Item) -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let limit = limit.max(1);
    ::log::trace!("Starting pool with {} slots", limit);

    stream::iter(items)
        .map(worker)
        .buffer_unordered(limit)
        .fold(PoolSummary::default(), |mut summary, result| async move {
            match result {
                Ok(()) => summary.succeeded += 1,
                Err(e) => {
                    ::log::debug!("Pool item failed: {}", e);
                    summary.failed += 1;
                }
            }
            summary
        })
        .await
}

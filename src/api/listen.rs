use std::future::Future;

use tokio::task::JoinHandle;

use crate::error::StoreResult;
use crate::remote::datastore::ChangeEvent;

/// A live sequence of snapshot values.
///
/// The first value is the state at registration time; afterwards a fresh
/// value arrives whenever the underlying data changes. The sequence only
/// ends when the caller cancels: dropping the subscription (or calling
/// [`Subscription::cancel`]) detaches from the change feed and stops the
/// background task.
pub struct Subscription<T> {
    receiver: async_channel::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> Subscription<T> {
    pub(crate) fn new(receiver: async_channel::Receiver<T>, task: JoinHandle<()>) -> Self {
        Self { receiver, task }
    }

    /// Waits for the next value. Returns `None` once the subscription has
    /// been cancelled and the already-delivered values are drained.
    pub async fn recv(&self) -> Option<T> {
        self.receiver.recv().await.ok()
    }

    /// Returns an already-delivered value without waiting, if any.
    pub fn try_recv(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }

    /// Stops delivery. Values received before cancellation stay readable.
    pub fn cancel(&self) {
        self.task.abort();
        self.receiver.close();
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Runs `refresh` once for the initial value, then re-runs it for every
/// change event accepted by `matches`, delivering each result in order.
///
/// A failed refresh after registration is logged and skipped; the next
/// change triggers another attempt. The error from the initial refresh
/// propagates to the caller instead, so a subscription that could never
/// produce a value is never handed out.
pub(crate) async fn spawn_watcher<T, M, F, Fut>(
    changes: async_channel::Receiver<ChangeEvent>,
    matches: M,
    refresh: F,
) -> StoreResult<Subscription<T>>
where
    T: Send + 'static,
    M: Fn(&ChangeEvent) -> bool + Send + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = StoreResult<T>> + Send + 'static,
{
    let (sender, receiver) = async_channel::unbounded();
    let initial = refresh().await?;
    let _ = sender.send(initial).await;

    let task = tokio::spawn(async move {
        while let Ok(event) = changes.recv().await {
            if !matches(&event) {
                continue;
            }
            match refresh().await {
                Ok(value) => {
                    if sender.send(value).await.is_err() {
                        break;
                    }
                }
                Err(err) => {
                    log::warn!("subscription refresh failed: {err}");
                }
            }
        }
    });

    Ok(Subscription::new(receiver, task))
}

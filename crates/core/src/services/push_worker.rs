use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::models::event::PushEvent;
use crate::models::settings::ReconnectPolicy;
use crate::providers::traits::PushFeed;

/// Consumer side of the push subscription.
pub trait PushSink: Send + Sync {
    /// Apply one event. Returns whether it changed any state.
    fn deliver(&self, event: PushEvent) -> bool;

    /// Once true the worker stops instead of reconnecting.
    fn is_closed(&self) -> bool;
}

/// Keeps a push subscription open and feeds its events, one at a time,
/// into a [`PushSink`].
///
/// A single task drains the queue, so updates for the same symbol are
/// never applied concurrently. When the subscription fails or its queue
/// closes, the worker waits according to its [`ReconnectPolicy`] and
/// subscribes again. The backoff resets after every successful subscribe.
pub struct PushWorker {
    feed: Arc<dyn PushFeed>,
    policy: ReconnectPolicy,
    capacity: usize,
}

impl PushWorker {
    pub fn new(feed: Arc<dyn PushFeed>, policy: ReconnectPolicy, capacity: usize) -> Self {
        Self {
            feed,
            policy,
            capacity,
        }
    }

    /// Run the worker on the current tokio runtime.
    pub fn spawn(self, sink: Arc<dyn PushSink>) -> JoinHandle<()> {
        tokio::spawn(self.run(sink))
    }

    pub async fn run(self, sink: Arc<dyn PushSink>) {
        let mut backoff = self.policy.initial_backoff();

        while !sink.is_closed() {
            match self.feed.subscribe(self.capacity).await {
                Ok(mut events) => {
                    info!("push subscription established");
                    backoff = self.policy.initial_backoff();

                    while let Some(event) = events.recv().await {
                        if sink.is_closed() {
                            return;
                        }
                        let applied = sink.deliver(event);
                        debug!(applied, "push event processed");
                    }
                    if sink.is_closed() {
                        return;
                    }
                    warn!(
                        backoff_ms = backoff.as_millis() as u64,
                        "push subscription closed, reconnecting"
                    );
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        backoff_ms = backoff.as_millis() as u64,
                        "push subscription failed, retrying"
                    );
                }
            }

            tokio::time::sleep(backoff).await;
            backoff = self.policy.next_backoff(backoff);
        }
    }
}

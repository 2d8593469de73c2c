//! Purpose: Deliver host-wide notices (sign-out, app lifecycle) to live bridges.
//! Exports: `HostNotifier`, `HostNotice`.
//! Role: Explicit observer registration replacing process-global broadcasts.
//! Invariants: A bridge's subscription lives exactly as long as the bridge; dispose aborts it.
//! Invariants: Publishing never blocks; slow subscribers lose notices, not the publisher.

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::bridge::Inbound;

const DEFAULT_CAPACITY: usize = 16;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostNotice {
    /// The session token was rejected; the host must sign in again.
    Unauthorized { message: String },
    AppPaused,
    AppResumed,
}

#[derive(Clone, Debug)]
pub struct HostNotifier {
    tx: broadcast::Sender<HostNotice>,
}

impl Default for HostNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl HostNotifier {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Returns how many bridges received the notice.
    pub fn publish(&self, notice: HostNotice) -> usize {
        self.tx.send(notice).unwrap_or(0)
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<HostNotice> {
        self.tx.subscribe()
    }
}

/// Forwarding task for one bridge; aborted when dropped.
#[derive(Debug)]
pub(crate) struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    pub(crate) fn spawn(
        mut rx: broadcast::Receiver<HostNotice>,
        bridge: mpsc::WeakUnboundedSender<Inbound>,
    ) -> Self {
        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(notice) => {
                        let Some(tx) = bridge.upgrade() else {
                            break;
                        };
                        if tx.send(Inbound::Host(notice)).is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "host notices dropped for slow bridge");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });
        Self { task }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

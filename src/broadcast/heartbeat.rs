//! Periodic keep-alive for attached viewers

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::broadcaster::Broadcaster;

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// Handle to the background keep-alive task.
///
/// The task only holds a weak reference to the broadcaster and exits on its
/// own once the broadcaster is dropped. Dropping the handle aborts the task.
pub struct Heartbeat {
    shutdown_tx: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Heartbeat {
    /// Start writing keep-alives to every viewer each `period`
    pub fn start(broadcaster: &Arc<Broadcaster>, period: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let weak = Arc::downgrade(broadcaster);
        // tokio intervals panic on a zero period
        let period = period.max(Duration::from_millis(1));

        let handle = tokio::spawn(async move {
            tracing::info!("Heartbeat started with interval {:?}", period);

            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let Some(broadcaster) = weak.upgrade() else {
                            break;
                        };
                        let clients = broadcaster.heartbeat();
                        tracing::trace!(clients, "Heartbeat sent");
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }

            tracing::info!("Heartbeat stopped");
        });

        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Stop the task and wait for it to finish
    pub async fn stop(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }
}

impl Drop for Heartbeat {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

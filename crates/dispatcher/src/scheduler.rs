//! Flush scheduler - fixed-interval ticks, forever

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

/// Handle to a running scheduler task
///
/// The task waits one interval, runs the tick, and waits again. A
/// notification on `rearm` restarts the wait so an explicit flush pushes the
/// next tick a full interval out instead of adding a second timer.
pub struct FlushScheduler {
    interval: Duration,
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl FlushScheduler {
    /// Spawn the scheduler task
    pub fn spawn<F, Fut>(interval: Duration, rearm: Arc<Notify>, tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(scheduler_loop(interval, rearm, stop_rx, tick));
        Self {
            interval,
            stop_tx,
            handle,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Stop after the tick in progress, if any, completes
    #[instrument(name = "flush_scheduler_stop", skip(self))]
    pub async fn stop(self) {
        // Err only if the loop already exited
        let _ = self.stop_tx.send(());
        if let Err(e) = self.handle.await {
            error!(error = ?e, "Scheduler task panicked");
        }
        debug!("Flush scheduler stopped");
    }
}

async fn scheduler_loop<F, Fut>(
    interval: Duration,
    rearm: Arc<Notify>,
    mut stop_rx: oneshot::Receiver<()>,
    mut tick: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    debug!(?interval, "Flush scheduler started");

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = rearm.notified() => continue,
            _ = tokio::time::sleep(interval) => tick().await,
        }
    }
}

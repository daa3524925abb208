//! Cooperative cancellation for a running crawl.
//!
//! The crawl checks the signal between articles and pages and wakes early
//! from its politeness delays, so an interrupted run still exports whatever
//! it has gathered.

use std::time::Duration;

use tokio::sync::watch;

/// Owner side: request the crawl to stop.
#[derive(Debug)]
pub struct StopHandle {
    tx: watch::Sender<bool>,
}

impl StopHandle {
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    #[must_use]
    pub fn signal(&self) -> StopSignal {
        StopSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Observer side, cloned into the crawler.
#[derive(Debug, Clone)]
pub struct StopSignal {
    rx: watch::Receiver<bool>,
}

#[must_use]
pub fn stop_pair() -> (StopHandle, StopSignal) {
    let (tx, rx) = watch::channel(false);
    (StopHandle { tx }, StopSignal { rx })
}

impl StopSignal {
    /// A signal that never fires.
    #[must_use]
    pub fn never() -> Self {
        let (_, signal) = stop_pair();
        signal
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Sleep for `duration` unless stopped first. Returns `true` when stopped.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        if self.is_stopped() {
            return true;
        }

        let rx = &mut self.rx;
        let stopped = async move {
            if rx.wait_for(|stopped| *stopped).await.is_err() {
                // Handle dropped without stopping: the signal can no longer fire.
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            () = tokio::time::sleep(duration) => false,
            () = stopped => true,
        }
    }
}

//! Per-recipient inbox cap enforcement.
//!
//! Creating a notification pushes its recipient onto a bounded queue; the
//! worker drains it and trims that recipient's inbox. A full queue drops
//! the request; the scheduled sweep catches whatever was missed.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use herald_core::Recipient;
use herald_database::NotificationStore;

/// Producer side of the retention queue.
#[derive(Debug, Clone)]
pub struct RetentionQueue {
    tx: mpsc::Sender<Recipient>,
}

impl RetentionQueue {
    /// Create a queue holding up to `capacity` pending recipients, plus the
    /// receiver for its worker.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Recipient>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }

    /// Request enforcement for `recipient`. Returns false if the request was
    /// dropped.
    pub fn push(&self, recipient: Recipient) -> bool {
        match self.tx.try_send(recipient) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!(recipient = %recipient, "Retention queue full, deferring to sweep");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(recipient = %recipient, "Retention worker stopped");
                false
            }
        }
    }
}

/// Consumer side: trims each queued recipient's inbox to the cap.
#[derive(Debug)]
pub struct RetentionWorker {
    rx: mpsc::Receiver<Recipient>,
    store: Arc<dyn NotificationStore>,
    cap: u64,
}

impl RetentionWorker {
    /// Create a worker.
    pub fn new(rx: mpsc::Receiver<Recipient>, store: Arc<dyn NotificationStore>, cap: u64) -> Self {
        Self { rx, store, cap }
    }

    /// Run until cancelled or every producer is gone.
    pub async fn run(mut self, mut cancel: watch::Receiver<bool>) {
        info!(cap = self.cap, "Retention worker started");

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        break;
                    }
                }
                next = self.rx.recv() => match next {
                    Some(recipient) => {
                        let mut batch = HashSet::from([recipient]);
                        while let Ok(more) = self.rx.try_recv() {
                            batch.insert(more);
                        }
                        self.enforce(batch).await;
                    }
                    None => break,
                },
            }
        }

        info!("Retention worker stopped");
    }

    /// Process everything already queued. Returns the number of rows evicted.
    pub async fn drain_pending(&mut self) -> u64 {
        let mut batch = HashSet::new();
        while let Ok(recipient) = self.rx.try_recv() {
            batch.insert(recipient);
        }
        self.enforce(batch).await
    }

    async fn enforce(&self, recipients: HashSet<Recipient>) -> u64 {
        let now = Utc::now();
        let mut evicted = 0;
        for recipient in recipients {
            match self.store.enforce_limit(recipient, self.cap, now).await {
                Ok(0) => {}
                Ok(n) => {
                    debug!(recipient = %recipient, evicted = n, "Inbox trimmed");
                    evicted += n;
                }
                Err(e) => warn!(recipient = %recipient, error = %e, "Inbox trim failed"),
            }
        }
        evicted
    }
}

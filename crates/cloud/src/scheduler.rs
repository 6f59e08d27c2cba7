//! Debounced, cancellable outbound uploads.
//!
//! Every `schedule` call supersedes the previous one: its timer is dropped
//! and, if its upload is already running, the upload is asked to stop at the
//! next checkpoint. Uploads never overlap.
//!
//! An attempt may carry a [`LocalUpdate`] guard for the local changes it is
//! meant to push. The guard stays with the pending slot across superseding
//! attempts and is released once the latest attempt has run.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::{LocalUpdate, ResultCloud};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UploadOutcome {
    Completed,
    /// Stopped early because a newer attempt superseded this one.
    Cancelled,
    /// Nothing to do, e.g. another local update held the gate.
    Skipped,
}

/// Pushes the whole local state of a trip to the remote.
#[async_trait]
pub trait Uploader: Send + Sync + 'static {
    /// Run one upload. Implementations check `cancel` before every remote
    /// step and return [`UploadOutcome::Cancelled`] once it fires.
    async fn run(&self, cancel: CancellationToken) -> ResultCloud<UploadOutcome>;
}

#[derive(Default)]
struct Pending {
    generation: u64,
    token: Option<CancellationToken>,
    handle: Option<JoinHandle<()>>,
    hold: Option<LocalUpdate>,
}

impl Pending {
    /// Drop the held guard if `generation` is still the latest attempt.
    fn release(pending: &Mutex<Pending>, generation: u64) {
        let mut pending = pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.generation == generation {
            pending.hold = None;
        }
    }
}

pub struct SyncScheduler {
    delay: Duration,
    pending: Arc<Mutex<Pending>>,
    upload_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Default for SyncScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_DEBOUNCE)
    }
}

impl SyncScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(Pending::default())),
            upload_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Arm a new upload attempt `delay` from now, superseding any pending or
    /// running one.
    pub fn schedule<U: Uploader>(&self, uploader: Arc<U>) {
        self.schedule_with(uploader, None);
    }

    /// Like [`schedule`](Self::schedule), keeping `hold` until an attempt
    /// that is not superseded has run.
    pub fn schedule_with<U: Uploader>(&self, uploader: Arc<U>, hold: Option<LocalUpdate>) {
        let token = CancellationToken::new();
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = pending.token.replace(token.clone()) {
            previous.cancel();
        }
        pending.generation += 1;
        let generation = pending.generation;
        if pending.hold.is_none() {
            pending.hold = hold;
        }

        let delay = self.delay;
        let upload_lock = Arc::clone(&self.upload_lock);
        let slot = Arc::clone(&self.pending);
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!("upload superseded before it started");
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let _running = upload_lock.lock().await;
            if token.is_cancelled() {
                debug!("upload superseded while waiting for the previous one");
                return;
            }
            let result = uploader.run(token).await;
            Pending::release(&slot, generation);
            match result {
                Ok(UploadOutcome::Completed) => info!("upload completed"),
                Ok(UploadOutcome::Cancelled) => debug!("upload cancelled"),
                Ok(UploadOutcome::Skipped) => debug!("upload skipped"),
                Err(err) => error!(%err, "background upload failed"),
            }
        });
        pending.handle = Some(handle);
    }

    /// Whether an attempt is armed or running.
    pub fn is_pending(&self) -> bool {
        let pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending
            .handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Wait for the most recent attempt to finish.
    pub async fn flush(&self) {
        let handle = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            pending.handle.take()
        };
        if let Some(handle) = handle
            && let Err(err) = handle.await
        {
            error!(%err, "upload task failed");
        }
    }

    /// Drop the pending attempt and stop a running upload.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = pending.token.take() {
            token.cancel();
        }
        pending.handle = None;
        pending.hold = None;
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

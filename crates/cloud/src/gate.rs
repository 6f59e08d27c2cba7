//! The "local update in progress" gate.
//!
//! While a session applies a remote merge, has local changes waiting for
//! their upload, or pushes an upload, snapshots arriving from the remote are
//! presumed to be echoes of its own writes (or to predate them) and are
//! dropped. Outgoing changes may hold the gate several times over; a merge
//! only enters a free gate.

use std::sync::{Arc, Mutex, PoisonError};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncState {
    #[default]
    Idle,
    Uploading,
    Merging,
}

#[derive(Debug, Default)]
struct GateState {
    holds: usize,
    sync: SyncState,
}

/// Shared between the merger and the uploader of one trip session.
#[derive(Clone, Debug, Default)]
pub struct LocalUpdateGate {
    state: Arc<Mutex<GateState>>,
}

impl LocalUpdateGate {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_state<R>(&self, f: impl FnOnce(&mut GateState) -> R) -> R {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn is_local_update(&self) -> bool {
        self.with_state(|state| state.holds > 0)
    }

    pub fn state(&self) -> SyncState {
        self.with_state(|state| state.sync)
    }

    /// Hold the gate while in `state`. `None` when it is already held.
    ///
    /// The gate is released when the returned guard drops, on success, error
    /// or unwinding alike.
    pub fn try_enter(&self, sync: SyncState) -> Option<LocalUpdate> {
        self.with_state(|state| {
            if state.holds > 0 {
                return None;
            }
            state.holds = 1;
            state.sync = sync;
            Some(LocalUpdate { gate: self.clone() })
        })
    }

    /// Hold the gate for an outgoing change, alongside other outgoing
    /// changes already holding it. `None` while a merge is being applied.
    pub fn enter_upload(&self) -> Option<LocalUpdate> {
        self.with_state(|state| {
            if state.sync == SyncState::Merging {
                return None;
            }
            state.holds += 1;
            state.sync = SyncState::Uploading;
            Some(LocalUpdate { gate: self.clone() })
        })
    }
}

/// Guard returned by [`LocalUpdateGate::try_enter`] and
/// [`LocalUpdateGate::enter_upload`].
#[derive(Debug)]
pub struct LocalUpdate {
    gate: LocalUpdateGate,
}

impl LocalUpdate {
    pub fn state(&self) -> SyncState {
        self.gate.state()
    }
}

impl Drop for LocalUpdate {
    fn drop(&mut self) {
        self.gate.with_state(|state| {
            state.holds = state.holds.saturating_sub(1);
            if state.holds == 0 {
                state.sync = SyncState::Idle;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_holds_and_releases() {
        let gate = LocalUpdateGate::new();
        assert_eq!(gate.state(), SyncState::Idle);

        let update = gate.try_enter(SyncState::Uploading).unwrap();
        assert!(gate.is_local_update());
        assert_eq!(update.state(), SyncState::Uploading);
        assert!(gate.try_enter(SyncState::Merging).is_none());

        drop(update);
        assert!(!gate.is_local_update());
        assert_eq!(gate.state(), SyncState::Idle);
    }

    #[test]
    fn outgoing_changes_share_the_gate() {
        let gate = LocalUpdateGate::new();

        let pending = gate.enter_upload().unwrap();
        let upload = gate.enter_upload().unwrap();
        assert!(gate.try_enter(SyncState::Merging).is_none());
        assert_eq!(gate.state(), SyncState::Uploading);

        drop(upload);
        assert!(gate.is_local_update());
        drop(pending);
        assert!(!gate.is_local_update());
        assert_eq!(gate.state(), SyncState::Idle);
    }

    #[test]
    fn no_upload_during_a_merge() {
        let gate = LocalUpdateGate::new();

        let merging = gate.try_enter(SyncState::Merging).unwrap();
        assert!(gate.enter_upload().is_none());

        drop(merging);
        assert!(gate.enter_upload().is_some());
    }

    #[test]
    fn released_on_error_path() {
        fn failing(gate: &LocalUpdateGate) -> Result<(), &'static str> {
            let _update = gate.try_enter(SyncState::Merging).ok_or("busy")?;
            Err("cache write failed")
        }

        let gate = LocalUpdateGate::new();
        assert_eq!(failing(&gate), Err("cache write failed"));
        assert!(!gate.is_local_update());
    }
}

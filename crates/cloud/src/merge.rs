//! Applies remote snapshots of the shared expenses to a trip's local list.

use engine::{Expense, Participants, merge_expenses};
use tracing::{debug, info};

use crate::{CacheKind, LocalCache, LocalUpdateGate, ResultCloud, Snapshot, SyncState};

/// What a merge did to the local list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MergeReport {
    /// A local update was in progress; the snapshot was taken as its echo.
    Ignored,
    /// The remote already matched the local list.
    Unchanged,
    Applied {
        added: usize,
        replaced: usize,
        removed: usize,
    },
}

#[derive(Clone, Debug)]
pub struct ExpenseMerger {
    trip_id: String,
    gate: LocalUpdateGate,
    cache: LocalCache,
}

impl ExpenseMerger {
    pub fn new(trip_id: &str, gate: LocalUpdateGate, cache: LocalCache) -> Self {
        Self {
            trip_id: trip_id.to_string(),
            gate,
            cache,
        }
    }

    /// Reconcile `local` with the remote records and persist the result.
    ///
    /// `local` is only replaced when something changed. A failed cache write
    /// is returned after the in-memory list was updated; it is not retried.
    pub fn merge(
        &self,
        local: &mut Vec<Expense>,
        participants: &Participants,
        remote: Vec<Expense>,
    ) -> ResultCloud<MergeReport> {
        if self.gate.is_local_update() {
            debug!(trip = %self.trip_id, "local update in progress, snapshot ignored");
            return Ok(MergeReport::Ignored);
        }

        let outcome = merge_expenses(local, remote, participants);
        if !outcome.has_changes() {
            debug!(trip = %self.trip_id, "remote expenses already in sync");
            return Ok(MergeReport::Unchanged);
        }

        let Some(_update) = self.gate.try_enter(SyncState::Merging) else {
            debug!(trip = %self.trip_id, "local update started, snapshot ignored");
            return Ok(MergeReport::Ignored);
        };
        let report = MergeReport::Applied {
            added: outcome.added,
            replaced: outcome.replaced,
            removed: outcome.removed,
        };
        *local = outcome.expenses;
        self.cache
            .save(&self.trip_id, CacheKind::Expenses, local.as_slice())?;
        info!(
            trip = %self.trip_id,
            added = outcome.added,
            replaced = outcome.replaced,
            removed = outcome.removed,
            "merged remote expenses"
        );
        Ok(report)
    }

    /// Decode a snapshot and merge it. A snapshot that cannot be decoded
    /// leaves `local` untouched.
    pub fn merge_snapshot(
        &self,
        local: &mut Vec<Expense>,
        participants: &Participants,
        snapshot: &Snapshot,
    ) -> ResultCloud<MergeReport> {
        let remote = snapshot.expenses()?;
        self.merge(local, participants, remote)
    }
}

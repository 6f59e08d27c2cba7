//! Key-based reconciliation of the local expense list against a remote
//! snapshot.
//!
//! The remote is authoritative: records are matched by their `order` key,
//! content differences are resolved in favour of the remote copy, keys the
//! remote no longer has are dropped locally, and keys only the remote has are
//! appended. Local records without a key are left alone.
//!
//! This module is pure. Applying the outcome (and guarding against the echo
//! of our own writes) is the caller's job.

use std::collections::{HashMap, HashSet};

use chrono::Utc;

use crate::{Expense, Participants, expense::order_key};

/// Result of a merge: the new local list plus what changed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MergeOutcome {
    pub expenses: Vec<Expense>,
    pub added: usize,
    pub replaced: usize,
    pub removed: usize,
}

impl MergeOutcome {
    /// `false` means the local list can stay as it is.
    pub fn has_changes(&self) -> bool {
        self.added > 0 || self.replaced > 0 || self.removed > 0
    }
}

/// Make every remote record usable for matching.
///
/// An empty split is filled with the current participants and a missing key
/// is synthesized from `millis` and the payer. Synthesized keys are not
/// stable: the same key-less record seen again later gets a different one.
pub fn normalize_remote(
    remote: Vec<Expense>,
    participants: &Participants,
    millis: i64,
) -> Vec<Expense> {
    remote
        .into_iter()
        .map(|record| {
            let mut record = record.with_default_split(participants);
            if record.key().is_none() {
                record.order = Some(order_key(millis, &record.payer));
            }
            record
        })
        .collect()
}

/// Merge `remote` into `local`, synthesizing missing keys with the current
/// time.
pub fn merge_expenses(
    local: &[Expense],
    remote: Vec<Expense>,
    participants: &Participants,
) -> MergeOutcome {
    merge_expenses_at(local, remote, participants, Utc::now().timestamp_millis())
}

/// Same as [`merge_expenses`] with an explicit clock for synthesized keys.
pub fn merge_expenses_at(
    local: &[Expense],
    remote: Vec<Expense>,
    participants: &Participants,
    millis: i64,
) -> MergeOutcome {
    let remote = normalize_remote(remote, participants, millis);

    let local_by_order: HashMap<&str, usize> = local
        .iter()
        .enumerate()
        .filter_map(|(index, expense)| expense.key().map(|key| (key, index)))
        .collect();
    let remote_keys: HashSet<String> = remote
        .iter()
        .filter_map(|expense| expense.key().map(str::to_string))
        .collect();

    let mut outcome = MergeOutcome {
        expenses: local.to_vec(),
        ..Default::default()
    };

    for record in remote {
        let local_index = record
            .key()
            .and_then(|key| local_by_order.get(key))
            .copied();
        match local_index {
            None => {
                outcome.expenses.push(record);
                outcome.added += 1;
            }
            Some(index) => {
                if !outcome.expenses[index].same_content(&record) {
                    outcome.expenses[index] = record;
                    outcome.replaced += 1;
                }
            }
        }
    }

    let to_remove: Vec<usize> = outcome
        .expenses
        .iter()
        .enumerate()
        .filter(|(_, expense)| expense.key().is_some_and(|key| !remote_keys.contains(key)))
        .map(|(index, _)| index)
        .collect();
    for index in to_remove.iter().rev() {
        outcome.expenses.remove(*index);
    }
    outcome.removed = to_remove.len();

    outcome
}

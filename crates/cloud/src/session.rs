//! A trip opened for editing.
//!
//! The session owns the in-memory state of one trip, writes every change
//! through to the local cache and, once the trip is linked to a remote copy,
//! keeps the shared expenses in sync: local changes are pushed by a debounced
//! full upload and remote snapshots are merged back.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::Utc;
use engine::{
    CloudLink, Expense, ExpenseDraft, ExpenseMode, InviteCode, Itinerary, Participants,
    ResultEngine, Settlement, TripConfig, TripMeta, normalize_remote, order_key, settle,
};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    CacheKind, CloudError, CollectionPath, Document, DocumentStore, ExpenseDocument,
    ExpenseMerger, LocalCache, LocalUpdateGate, MergeReport, ResultCloud, Snapshot,
    SyncScheduler, SyncState, TripDocument, UploadOutcome, Uploader,
    documents::day_key,
    remote::{read_days, read_expenses},
};

const INVITE_CODE_ATTEMPTS: usize = 8;

/// Everything the cache holds about one trip.
#[derive(Clone, Debug, PartialEq)]
pub struct TripState {
    pub meta: TripMeta,
    pub config: TripConfig,
    pub itinerary: Itinerary,
    pub expenses: Vec<Expense>,
    pub personal_expenses: Vec<Expense>,
    pub participants: Participants,
    pub cloud: CloudLink,
    /// Whether the local copy was last refreshed from or pushed to the remote.
    pub synced: bool,
}

impl TripState {
    fn load(cache: &LocalCache, meta: TripMeta) -> ResultCloud<Self> {
        let id = meta.id.clone();
        let mut config: TripConfig = cache.load(&id, CacheKind::Config)?.unwrap_or_default();
        if let Some(rate) = cache.load(&id, CacheKind::Rate)? {
            config.rate = rate;
        }
        Ok(Self {
            meta,
            config,
            itinerary: cache.load(&id, CacheKind::Days)?.unwrap_or_default(),
            expenses: cache.load(&id, CacheKind::Expenses)?.unwrap_or_default(),
            personal_expenses: cache.load(&id, CacheKind::PersonalExpenses)?.unwrap_or_default(),
            participants: cache.load(&id, CacheKind::Participants)?.unwrap_or_default(),
            cloud: cache.load(&id, CacheKind::Cloud)?.unwrap_or_default(),
            synced: cache.load(&id, CacheKind::Synced)?.unwrap_or(false),
        })
    }

    /// Write every key of the trip and its index entry.
    pub(crate) fn save(&self, cache: &LocalCache) -> ResultCloud<()> {
        let id = self.meta.id.as_str();
        cache.save(id, CacheKind::Config, &self.config)?;
        cache.save(id, CacheKind::Rate, &self.config.rate)?;
        cache.save(id, CacheKind::Days, &self.itinerary)?;
        cache.save(id, CacheKind::Expenses, self.expenses.as_slice())?;
        cache.save(id, CacheKind::PersonalExpenses, self.personal_expenses.as_slice())?;
        cache.save(id, CacheKind::Participants, &self.participants)?;
        cache.save(id, CacheKind::Cloud, &self.cloud)?;
        cache.save(id, CacheKind::Synced, &self.synced)?;
        save_meta(cache, &self.meta)
    }

    fn remote_trip_id(&self) -> Option<String> {
        self.cloud.active_trip_id().map(ToString::to_string)
    }
}

fn save_meta(cache: &LocalCache, meta: &TripMeta) -> ResultCloud<()> {
    let mut index = cache.load_index()?;
    index.upsert(meta.clone());
    cache.save_index(&index)
}

/// Give every key-less expense a key. Returns whether any was missing.
fn assign_missing_keys(expenses: &mut [Expense]) -> bool {
    let millis = Utc::now().timestamp_millis();
    let mut changed = false;
    for expense in expenses.iter_mut().filter(|expense| expense.key().is_none()) {
        expense.order = Some(order_key(millis, &expense.payer));
        changed = true;
    }
    changed
}

pub struct TripSession {
    trip_id: String,
    cache: LocalCache,
    remote: Arc<dyn DocumentStore>,
    gate: LocalUpdateGate,
    merger: ExpenseMerger,
    scheduler: SyncScheduler,
    state: Mutex<TripState>,
}

impl std::fmt::Debug for TripSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TripSession")
            .field("trip_id", &self.trip_id)
            .field("cache", &self.cache)
            .field("sync", &self.gate.state())
            .finish_non_exhaustive()
    }
}

impl TripSession {
    /// Load a trip of the index from the cache.
    pub fn open(
        trip_id: &str,
        cache: LocalCache,
        remote: Arc<dyn DocumentStore>,
        debounce: Duration,
    ) -> ResultCloud<Arc<Self>> {
        let meta = cache
            .load_index()?
            .get(trip_id)
            .cloned()
            .ok_or_else(|| CloudError::NotFound(format!("trip {trip_id}")))?;
        let state = TripState::load(&cache, meta)?;
        let gate = LocalUpdateGate::new();
        debug!(trip = trip_id, linked = state.cloud.active_trip_id().is_some(), "trip opened");

        Ok(Arc::new(Self {
            trip_id: trip_id.to_string(),
            merger: ExpenseMerger::new(trip_id, gate.clone(), cache.clone()),
            cache,
            remote,
            gate,
            scheduler: SyncScheduler::new(debounce),
            state: Mutex::new(state),
        }))
    }

    pub fn trip_id(&self) -> &str {
        &self.trip_id
    }

    pub fn sync_state(&self) -> SyncState {
        self.gate.state()
    }

    /// A copy of the current state.
    pub async fn snapshot(&self) -> TripState {
        self.state.lock().await.clone()
    }

    /// Record a shared expense at the front of the list.
    ///
    /// On a linked trip the record is written to the remote right away and
    /// the gate stays held until the scheduled upload has run, so snapshots
    /// that predate the record cannot merge it away.
    pub async fn add_expense(self: &Arc<Self>, draft: ExpenseDraft) -> ResultCloud<Expense> {
        let (expense, outgoing) = {
            let mut state = self.state.lock().await;
            let expense = draft.into_expense(ExpenseMode::Shared, &state.participants)?;
            let outgoing = state.remote_trip_id().map(|remote_id| {
                let document = ExpenseDocument::shared(&expense, &state.participants);
                (remote_id, document, self.gate.enter_upload())
            });
            state.expenses.insert(0, expense.clone());
            self.cache
                .save(&self.trip_id, CacheKind::Expenses, state.expenses.as_slice())?;
            (expense, outgoing)
        };

        if let Some((remote_id, document, hold)) = outgoing {
            self.scheduler.schedule_with(Arc::clone(self), hold);
            if let Some(key) = expense.key() {
                let path = CollectionPath::shared_expenses(&remote_id);
                let document = Document::encode(key, &document)?;
                if let Err(err) = self.remote.upsert(&path, document).await {
                    warn!(%path, %err, "expense left for the scheduled upload");
                }
            }
        }
        Ok(expense)
    }

    /// Delete the shared expense at `index`, locally and on the remote.
    pub async fn remove_expense(self: &Arc<Self>, index: usize) -> ResultCloud<Expense> {
        let (expense, outgoing) = {
            let mut state = self.state.lock().await;
            if index >= state.expenses.len() {
                return Err(CloudError::NotFound(format!("expense #{}", index + 1)));
            }
            let outgoing = state
                .remote_trip_id()
                .map(|remote_id| (remote_id, self.gate.enter_upload()));
            let expense = state.expenses.remove(index);
            self.cache
                .save(&self.trip_id, CacheKind::Expenses, state.expenses.as_slice())?;
            (expense, outgoing)
        };

        if let Some((remote_id, hold)) = outgoing {
            // A running upload must not write the record back after the
            // delete.
            self.scheduler.schedule_with(Arc::clone(self), hold);
            if let Some(key) = expense.key() {
                self.delete_remote(&CollectionPath::shared_expenses(&remote_id), key)
                    .await;
            }
        }
        Ok(expense)
    }

    /// Record a personal expense. Linked trips write it straight to the
    /// remote.
    pub async fn add_personal_expense(&self, draft: ExpenseDraft) -> ResultCloud<Expense> {
        let (expense, remote_id) = {
            let mut state = self.state.lock().await;
            let expense = draft.into_expense(ExpenseMode::Personal, &state.participants)?;
            state.personal_expenses.insert(0, expense.clone());
            self.cache.save(
                &self.trip_id,
                CacheKind::PersonalExpenses,
                state.personal_expenses.as_slice(),
            )?;
            (expense, state.remote_trip_id())
        };

        if let Some(remote_id) = remote_id
            && let Some(key) = expense.key()
        {
            let path = CollectionPath::personal_expenses(&remote_id);
            let document = Document::encode(key, &ExpenseDocument::personal(&expense))?;
            if let Err(err) = self.remote.upsert(&path, document).await {
                warn!(%path, %err, "personal expense kept locally only");
            }
        }
        Ok(expense)
    }

    pub async fn remove_personal_expense(&self, index: usize) -> ResultCloud<Expense> {
        let (expense, remote_id) = {
            let mut state = self.state.lock().await;
            if index >= state.personal_expenses.len() {
                return Err(CloudError::NotFound(format!("personal expense #{}", index + 1)));
            }
            let expense = state.personal_expenses.remove(index);
            self.cache.save(
                &self.trip_id,
                CacheKind::PersonalExpenses,
                state.personal_expenses.as_slice(),
            )?;
            (expense, state.remote_trip_id())
        };

        if let Some(remote_id) = remote_id
            && let Some(key) = expense.key()
        {
            self.delete_remote(&CollectionPath::personal_expenses(&remote_id), key)
                .await;
        }
        Ok(expense)
    }

    async fn delete_remote(&self, path: &CollectionPath, key: &str) {
        match self.remote.delete(path, key).await {
            Ok(true) => debug!(%path, key, "remote document deleted"),
            Ok(false) => debug!(%path, key, "remote document already gone"),
            Err(err) => warn!(%path, key, %err, "remote delete failed"),
        }
    }

    /// Replace the participant set. Past expenses keep their splits.
    pub async fn set_participants(self: &Arc<Self>, participants: Participants) -> ResultCloud<()> {
        let linked = {
            let mut state = self.state.lock().await;
            state.participants = participants;
            self.cache
                .save(&self.trip_id, CacheKind::Participants, &state.participants)?;
            state.remote_trip_id().is_some()
        };
        if linked {
            self.schedule_upload();
        }
        Ok(())
    }

    /// Apply an edit to the itinerary and persist it.
    pub async fn edit_itinerary<R>(
        self: &Arc<Self>,
        edit: impl FnOnce(&mut Itinerary) -> ResultEngine<R>,
    ) -> ResultCloud<R> {
        let (result, linked) = {
            let mut state = self.state.lock().await;
            let result = edit(&mut state.itinerary)?;
            state.meta.days_count = u32::try_from(state.itinerary.len()).unwrap_or(u32::MAX);
            self.cache
                .save(&self.trip_id, CacheKind::Days, &state.itinerary)?;
            save_meta(&self.cache, &state.meta)?;
            (result, state.remote_trip_id().is_some())
        };
        if linked {
            self.schedule_upload();
        }
        Ok(result)
    }

    /// Paid and owed totals plus the transfers that settle the shared
    /// expenses.
    pub async fn settle(&self) -> Settlement {
        let state = self.state.lock().await;
        settle(&state.expenses, &state.participants)
    }

    /// Arm a debounced upload.
    pub fn schedule_upload(self: &Arc<Self>) {
        self.scheduler.schedule(Arc::clone(self));
    }

    /// Wait for the pending upload, if any.
    pub async fn flush(&self) {
        self.scheduler.flush().await;
    }

    /// Push the whole trip to the remote: the trip document, then the days,
    /// then the shared expenses.
    ///
    /// The first upload creates the remote trip and an invite code and links
    /// the local trip to it. `cancel` is checked before every remote step; a
    /// cancelled upload leaves the remote partially written until the next
    /// one.
    pub async fn upload(&self, cancel: CancellationToken) -> ResultCloud<UploadOutcome> {
        let (snapshot, _update) = {
            let mut state = self.state.lock().await;
            if state.itinerary.is_empty() {
                return Err(CloudError::EmptyTrip);
            }
            if assign_missing_keys(&mut state.expenses) {
                self.cache
                    .save(&self.trip_id, CacheKind::Expenses, state.expenses.as_slice())?;
            }
            let Some(update) = self.gate.enter_upload() else {
                debug!(trip = %self.trip_id, "merge in progress, upload skipped");
                return Ok(UploadOutcome::Skipped);
            };
            (state.clone(), update)
        };

        let remote_id = snapshot
            .remote_trip_id()
            .unwrap_or_else(|| Uuid::new_v4().simple().to_string());
        let invite_code = match snapshot.cloud.invite_code.clone() {
            Some(code) => code,
            None => self.fresh_invite_code().await?,
        };

        if cancel.is_cancelled() {
            return Ok(UploadOutcome::Cancelled);
        }
        let document = TripDocument::new(
            &snapshot.config,
            snapshot.itinerary.len(),
            &snapshot.participants,
            invite_code.clone(),
        );
        self.remote.put_trip(&remote_id, &document).await?;
        if snapshot.cloud.active_trip_id().is_none() {
            self.link(CloudLink::linked(&remote_id, invite_code.clone()))
                .await?;
            info!(trip = %self.trip_id, remote = %remote_id, code = %invite_code, "trip linked");
        }

        let days = CollectionPath::days(&remote_id);
        if cancel.is_cancelled() {
            return Ok(UploadOutcome::Cancelled);
        }
        self.remote.delete_all(&days).await?;
        for (index, day) in snapshot.itinerary.days().iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(UploadOutcome::Cancelled);
            }
            let mut day = day.clone();
            day.order = Some(u32::try_from(index).unwrap_or(u32::MAX));
            self.remote
                .upsert(&days, Document::encode(&day_key(index), &day)?)
                .await?;
        }

        // An empty local list never wipes the remote expenses.
        if !snapshot.expenses.is_empty() {
            let expenses = CollectionPath::shared_expenses(&remote_id);
            if cancel.is_cancelled() {
                return Ok(UploadOutcome::Cancelled);
            }
            self.remote.delete_all(&expenses).await?;
            for expense in &snapshot.expenses {
                if cancel.is_cancelled() {
                    return Ok(UploadOutcome::Cancelled);
                }
                let Some(key) = expense.key() else {
                    continue;
                };
                let document = ExpenseDocument::shared(expense, &snapshot.participants);
                self.remote
                    .upsert(&expenses, Document::encode(key, &document)?)
                    .await?;
            }
        }

        let mut link = CloudLink::linked(&remote_id, invite_code);
        link.last_synced_at = Some(Utc::now());
        self.link(link).await?;
        info!(
            trip = %self.trip_id,
            remote = %remote_id,
            days = snapshot.itinerary.len(),
            expenses = snapshot.expenses.len(),
            "trip uploaded"
        );
        Ok(UploadOutcome::Completed)
    }

    async fn link(&self, link: CloudLink) -> ResultCloud<()> {
        let mut state = self.state.lock().await;
        state.cloud = link;
        state.meta.is_cloud_trip = true;
        state.synced = true;
        self.cache.save(&self.trip_id, CacheKind::Cloud, &state.cloud)?;
        self.cache.save(&self.trip_id, CacheKind::Synced, &state.synced)?;
        save_meta(&self.cache, &state.meta)
    }

    async fn fresh_invite_code(&self) -> ResultCloud<InviteCode> {
        for _ in 0..INVITE_CODE_ATTEMPTS {
            let code = InviteCode::generate();
            if self.remote.find_trip_by_invite_code(&code).await?.is_none() {
                return Ok(code);
            }
            debug!(%code, "invite code taken");
        }
        Err(CloudError::Unavailable("no free invite code".to_string()))
    }

    /// Overwrite the local trip with the remote copy.
    ///
    /// Nothing local changes unless every remote read succeeded.
    pub async fn pull(&self) -> ResultCloud<()> {
        let remote_id = self
            .state
            .lock()
            .await
            .remote_trip_id()
            .ok_or(CloudError::NotLinked)?;
        let trip = self
            .remote
            .get_trip(&remote_id)
            .await?
            .ok_or_else(|| CloudError::NotFound(format!("trips/{remote_id}")))?;
        let days = read_days(self.remote.as_ref(), &CollectionPath::days(&remote_id)).await?;
        let expenses =
            read_expenses(self.remote.as_ref(), &CollectionPath::shared_expenses(&remote_id))
                .await?;

        let mut state = self.state.lock().await;
        trip.apply_to(&mut state.config);
        let participants = trip.participants();
        if !participants.is_empty() {
            state.participants = participants;
        }
        if !days.is_empty() {
            state.itinerary = Itinerary::new(days);
        }
        state.expenses = normalize_remote(
            expenses,
            &state.participants,
            Utc::now().timestamp_millis(),
        );
        state.cloud.invite_code = Some(trip.invite_code);
        state.cloud.last_synced_at = Some(Utc::now());
        state.synced = true;
        state.meta.destination = state.config.display_title().to_string();
        state.meta.start_date = state.config.start_date.clone();
        state.meta.days_count = u32::try_from(state.itinerary.len()).unwrap_or(u32::MAX);
        state.meta.is_cloud_trip = true;
        state.save(&self.cache)?;
        info!(
            trip = %self.trip_id,
            remote = %remote_id,
            days = state.itinerary.len(),
            expenses = state.expenses.len(),
            "trip pulled"
        );
        Ok(())
    }

    /// Merge one remote snapshot of the shared expenses.
    pub async fn apply_snapshot(&self, snapshot: &Snapshot) -> ResultCloud<MergeReport> {
        let mut state = self.state.lock().await;
        let TripState {
            expenses,
            participants,
            ..
        } = &mut *state;
        self.merger.merge_snapshot(expenses, participants, snapshot)
    }

    /// Follow the remote shared expenses until `shutdown` fires or the
    /// subscription ends.
    pub async fn watch(&self, shutdown: CancellationToken) -> ResultCloud<()> {
        let remote_id = self
            .state
            .lock()
            .await
            .remote_trip_id()
            .ok_or(CloudError::NotLinked)?;
        let mut subscription = self
            .remote
            .subscribe(&CollectionPath::shared_expenses(&remote_id))
            .await?;
        info!(trip = %self.trip_id, path = %subscription.path(), "watching remote expenses");

        loop {
            let snapshot = tokio::select! {
                _ = shutdown.cancelled() => break,
                snapshot = subscription.next() => match snapshot {
                    Some(snapshot) => snapshot,
                    None => break,
                },
            };
            if let Err(err) = self.apply_snapshot(&snapshot).await {
                warn!(trip = %self.trip_id, %err, "remote snapshot not applied");
            }
        }
        debug!(trip = %self.trip_id, "stopped watching");
        Ok(())
    }
}

#[async_trait]
impl Uploader for TripSession {
    async fn run(&self, cancel: CancellationToken) -> ResultCloud<UploadOutcome> {
        self.upload(cancel).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_are_filled() {
        let mut expenses = vec![
            Expense {
                item: "Tea".to_string(),
                amount: 3.0,
                payer: "A".to_string(),
                order: None,
                split_participants: vec![],
                time: None,
            },
            Expense::new("Bus".to_string(), 2.0, "B".to_string(), vec![]),
        ];
        let kept = expenses[1].order.clone();

        assert!(assign_missing_keys(&mut expenses));
        assert!(expenses[0].key().is_some_and(|key| key.ends_with("_A")));
        assert_eq!(expenses[1].order, kept);
        assert!(!assign_missing_keys(&mut expenses));
    }
}

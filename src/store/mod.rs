//! Synchronized entity store.
//!
//! Holds the leads, tasks, users, activity feed and settings in memory and mirrors every
//! mutation to the [`RemoteStore`]. Mutations apply locally and synchronously, then
//! spawn the remote write on the tokio runtime; callers may await the returned
//! [`PendingSync`] or drop it. Remote failures are logged and never roll back local state.
//!
//! Optimistic creations get a temporary id and an entry in the [`PendingTable`]. The
//! entry records whether the record was edited or deleted locally before the insert
//! resolved, which decides how the canonical row is adopted.

mod activity;
mod leads;
mod pending;
mod record;
mod tasks;
mod users;
pub mod views;

pub use pending::{is_temporary_id, next_temp_id, EntityKind, PendingState, TEMP_ID_PREFIX};

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::auth::{Identity, Session};
use crate::errors::AppError;
use crate::models::{Activity, Lead, Settings, Task, User};
use crate::remote::{RemoteStore, ACTIVITY_FEED_LIMIT};
use pending::PendingTable;
use record::Record;

const NOTICE_CAPACITY: usize = 64;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Best-effort message for the surrounding application to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Result of the remote half of a mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// The remote write succeeded; local state already matched.
    Applied,
    /// An optimistic record was replaced by its canonical row.
    Reconciled { temp_id: String, canonical_id: String },
    /// The record was deleted locally before its insert resolved; the remote row was removed again.
    Superseded { canonical_id: String },
    /// Write targeted a record whose insert is still in flight; it is folded into that insert.
    Deferred,
    /// Nothing to send (target missing, or the record only exists locally).
    Skipped,
    /// The change has no remote counterpart.
    LocalOnly,
    /// The remote call failed; local state was left as is.
    Failed(AppError),
}

impl SyncOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, SyncOutcome::Failed(_))
    }
}

/// Outcomes of a settled [`PendingSync`].
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub write: SyncOutcome,
    /// `None` when no activity was recorded (no session identity).
    pub activity: Option<SyncOutcome>,
}

enum Job {
    Spawned(JoinHandle<SyncOutcome>),
    Done(SyncOutcome),
}

impl Job {
    async fn finish(self) -> SyncOutcome {
        match self {
            Job::Done(outcome) => outcome,
            Job::Spawned(handle) => handle.await.unwrap_or_else(|err| {
                SyncOutcome::Failed(AppError::Internal(format!("sync task aborted: {}", err)))
            }),
        }
    }
}

/// Handle on the remote half of a mutation. Dropping it does not cancel anything.
pub struct PendingSync {
    write: Job,
    activity: Option<Job>,
}

impl PendingSync {
    fn new(write: Job, activity: Option<Job>) -> Self {
        Self { write, activity }
    }

    fn idle() -> Self {
        Self::new(Job::Done(SyncOutcome::Skipped), None)
    }

    /// Wait for the remote write and the activity insert to finish.
    pub async fn settled(self) -> SyncReport {
        let write = self.write.finish().await;
        let activity = match self.activity {
            Some(job) => Some(job.finish().await),
            None => None,
        };
        SyncReport { write, activity }
    }
}

/// Tables that failed during a bulk load.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub failures: Vec<(EntityKind, AppError)>,
    /// The session changed while loading; results were discarded.
    pub stale: bool,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.stale
    }

    fn fail(&mut self, kind: EntityKind, err: AppError) {
        error!(entity = %kind, table = kind.table(), op = "select", error = %err, "Failed to fetch collection");
        self.failures.push((kind, err));
    }
}

/// Point-in-time copy of the store's collections.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub identity: Option<Identity>,
    pub current_user: Option<User>,
    pub users: Vec<User>,
    pub leads: Vec<Lead>,
    pub tasks: Vec<Task>,
    pub activities: Vec<Activity>,
    pub settings: Settings,
}

pub(crate) struct State {
    identity: Option<Identity>,
    current_user: Option<User>,
    users: Vec<User>,
    leads: Vec<Lead>,
    tasks: Vec<Task>,
    activities: Vec<Activity>,
    settings: Settings,
    pending: PendingTable,
    /// Bumped on every load/clear so late bulk-fetch results can be recognized.
    generation: u64,
}

/// How the remote half of an update or delete is routed.
enum Route {
    Remote,
    Deferred,
    LocalOnly,
}

impl State {
    fn new(settings: Settings) -> Self {
        Self {
            identity: None,
            current_user: None,
            users: Vec::new(),
            leads: Vec::new(),
            tasks: Vec::new(),
            activities: Vec::new(),
            settings,
            pending: PendingTable::default(),
            generation: 0,
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            identity: self.identity.clone(),
            current_user: self.current_user.clone(),
            users: self.users.clone(),
            leads: self.leads.clone(),
            tasks: self.tasks.clone(),
            activities: self.activities.clone(),
            settings: self.settings.clone(),
        }
    }

    /// Writes to records that only exist locally never reach the remote store.
    fn route_write(&mut self, id: &str, deleting: bool) -> Route {
        if !is_temporary_id(id) {
            return Route::Remote;
        }
        let pending = if deleting {
            self.pending.mark_discarded(id)
        } else {
            self.pending.mark_modified(id)
        };
        if pending {
            Route::Deferred
        } else {
            Route::LocalOnly
        }
    }

    fn actor_id(&self) -> Option<String> {
        self.identity.as_ref().map(|i| i.user_id.clone())
    }
}

struct Inner {
    remote: Arc<dyn RemoteStore>,
    state: Mutex<State>,
    notices: broadcast::Sender<Notice>,
}

/// Cloneable handle to the synchronized entity store.
#[derive(Clone)]
pub struct Store {
    inner: Arc<Inner>,
}

impl Store {
    pub fn new(remote: Arc<dyn RemoteStore>, settings: Settings) -> Self {
        let (notices, _) = broadcast::channel(NOTICE_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                remote,
                state: Mutex::new(State::new(settings)),
                notices,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn remote(&self) -> Arc<dyn RemoteStore> {
        Arc::clone(&self.inner.remote)
    }

    fn notify(&self, notice: Notice) {
        // No receivers is fine.
        let _ = self.inner.notices.send(notice);
    }

    /// Surface a rejected mutation before returning it to the caller.
    fn reject(&self, err: AppError) -> AppError {
        warn!(error = %err, "Rejected mutation");
        self.notify(Notice::error(err.message()));
        err
    }

    fn spawn<F>(&self, work: F) -> Job
    where
        F: Future<Output = SyncOutcome> + Send + 'static,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Job::Spawned(handle.spawn(work)),
            Err(err) => {
                error!(error = %err, "No async runtime available for remote sync");
                Job::Done(SyncOutcome::Failed(AppError::Internal(
                    "no async runtime available".to_string(),
                )))
            }
        }
    }

    pub fn subscribe_notices(&self) -> broadcast::Receiver<Notice> {
        self.inner.notices.subscribe()
    }

    // ==================== LIFECYCLE ====================

    /// Populate every collection for `identity`.
    ///
    /// The four table reads and the profile read run concurrently. A failed read leaves
    /// its collection untouched and is reported; nothing is retried.
    pub async fn load(&self, identity: Identity) -> LoadReport {
        let generation = {
            let mut state = self.state();
            state.generation += 1;
            state.identity = Some(identity.clone());
            state.generation
        };
        info!(user_id = %identity.user_id, "Loading CRM data");

        let remote = self.remote();
        let (leads, tasks, users, activities, profile) = tokio::join!(
            remote.list_leads(None),
            remote.list_tasks(None),
            remote.list_users(),
            remote.list_activities(Some(ACTIVITY_FEED_LIMIT)),
            remote.get_user(&identity.user_id),
        );

        let mut report = LoadReport::default();
        {
            let mut state = self.state();
            if state.generation != generation {
                warn!(user_id = %identity.user_id, "Session changed during load; discarding results");
                report.stale = true;
                return report;
            }

            match leads {
                Ok(leads) => state.leads = leads,
                Err(err) => report.fail(EntityKind::Lead, err),
            }
            match tasks {
                Ok(tasks) => state.tasks = tasks,
                Err(err) => report.fail(EntityKind::Task, err),
            }
            match users {
                Ok(users) => state.users = users,
                Err(err) => report.fail(EntityKind::User, err),
            }
            match activities {
                Ok(mut activities) => {
                    activities.truncate(ACTIVITY_FEED_LIMIT);
                    state.activities = activities;
                }
                Err(err) => report.fail(EntityKind::Activity, err),
            }
            match profile {
                Ok(Some(user)) => state.current_user = Some(user),
                Ok(None) => report.fail(
                    EntityKind::User,
                    AppError::NotFound(format!("Profile {} not found", identity.user_id)),
                ),
                Err(err) => report.fail(EntityKind::User, err),
            }

            info!(
                leads = state.leads.len(),
                tasks = state.tasks.len(),
                users = state.users.len(),
                activities = state.activities.len(),
                "CRM data loaded"
            );
        }

        for (kind, _) in &report.failures {
            self.notify(Notice::error(format!("Failed to load {}.", kind.table())));
        }
        report
    }

    /// Drop all session data. Settings are process-wide and survive.
    pub fn clear(&self) {
        let mut state = self.state();
        state.generation += 1;
        state.identity = None;
        state.current_user = None;
        state.users.clear();
        state.leads.clear();
        state.tasks.clear();
        state.activities.clear();
        state.pending.clear();
        info!("CRM data cleared");
    }

    /// Follow `session`: load on every new identity, clear when it goes away.
    pub fn attach_session(&self, session: Arc<dyn Session>) -> JoinHandle<()> {
        let mut identities = session.subscribe();
        let store = self.clone();
        tokio::spawn(async move {
            loop {
                let identity = identities.borrow_and_update().clone();
                match identity {
                    Some(identity) => {
                        store.load(identity).await;
                    }
                    None => store.clear(),
                }
                if identities.changed().await.is_err() {
                    debug!("Session dropped; detaching store");
                    break;
                }
            }
        })
    }

    // ==================== READS ====================

    pub fn snapshot(&self) -> Snapshot {
        self.state().snapshot()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state().identity.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state().current_user.clone()
    }

    pub fn users(&self) -> Vec<User> {
        self.state().users.clone()
    }

    pub fn leads(&self) -> Vec<Lead> {
        self.state().leads.clone()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.state().tasks.clone()
    }

    pub fn activities(&self) -> Vec<Activity> {
        self.state().activities.clone()
    }

    pub fn settings(&self) -> Settings {
        self.state().settings.clone()
    }

    pub fn lead(&self, id: &str) -> Option<Lead> {
        self.find::<Lead>(id)
    }

    pub fn task(&self, id: &str) -> Option<Task> {
        self.find::<Task>(id)
    }

    pub fn user(&self, id: &str) -> Option<User> {
        self.find::<User>(id)
    }

    /// Number of optimistic records still waiting for their canonical id.
    pub fn pending_count(&self) -> usize {
        self.state().pending.len()
    }

    fn find<R: Record>(&self, id: &str) -> Option<R> {
        R::collection(&self.state())
            .iter()
            .find(|r| r.id() == id)
            .cloned()
    }

    // ==================== SETTINGS ====================

    /// Replace the settings. They have no remote table, so only the activity is synced.
    pub fn update_settings(&self, settings: Settings) -> Result<PendingSync, AppError> {
        settings.validate().map_err(|err| self.reject(err))?;

        let staged = {
            let mut state = self.state();
            state.settings = settings;
            activity::stage(&mut state, crate::models::Action::SettingsUpdated)
        };
        Ok(PendingSync::new(
            Job::Done(SyncOutcome::LocalOnly),
            self.spawn_activity(staged),
        ))
    }

    // ==================== GENERIC MUTATION PATHS ====================

    /// Insert `record` (carrying a temporary id) and spawn its remote insert.
    fn commit_create<R, F, Fut>(
        &self,
        record: R,
        action: crate::models::Action,
        insert: F,
    ) -> PendingSync
    where
        R: Record,
        F: FnOnce(Arc<dyn RemoteStore>, R) -> Fut,
        Fut: Future<Output = Result<R, AppError>> + Send + 'static,
    {
        let temp_id = record.id().to_string();
        let staged = {
            let mut state = self.state();
            R::collection_mut(&mut state).insert(0, record.clone());
            state.pending.begin(&temp_id);
            activity::stage(&mut state, action)
        };
        debug!(entity = %R::KIND, id = %temp_id, "Inserted optimistic record");

        let request = insert(self.remote(), record);
        let store = self.clone();
        let write = self.spawn(async move {
            match request.await {
                Ok(row) => store.reconcile_created(temp_id, row).await,
                Err(err) => {
                    store.state().pending.finish(&temp_id);
                    error!(entity = %R::KIND, op = "insert", id = %temp_id, error = %err, "Remote insert failed; keeping optimistic record");
                    SyncOutcome::Failed(err)
                }
            }
        });

        PendingSync::new(write, self.spawn_activity(staged))
    }

    /// Adopt the canonical row for `temp_id` according to what happened locally meanwhile.
    async fn reconcile_created<R: Record>(&self, temp_id: String, row: R) -> SyncOutcome {
        let canonical_id = row.id().to_string();

        enum Followup<T> {
            None,
            Update(T),
            Delete,
        }

        let followup = {
            let mut state = self.state();
            let pending = state.pending.finish(&temp_id);
            let slot = R::collection_mut(&mut state)
                .iter_mut()
                .find(|r| r.id() == temp_id);

            match (pending, slot) {
                (Some(PendingState::Discarded), _) => Followup::Delete,
                (Some(PendingState::Modified), Some(local)) => {
                    local.set_id(canonical_id.clone());
                    Followup::Update(local.clone())
                }
                (_, Some(local)) => {
                    *local = row;
                    Followup::None
                }
                (_, None) => {
                    debug!(entity = %R::KIND, id = %temp_id, "Optimistic record no longer present; not re-adding");
                    Followup::None
                }
            }
        };

        match followup {
            Followup::None => {
                debug!(entity = %R::KIND, temp_id = %temp_id, id = %canonical_id, "Reconciled optimistic record");
                SyncOutcome::Reconciled {
                    temp_id,
                    canonical_id,
                }
            }
            Followup::Update(local) => {
                let changes = local.full_changes();
                match R::push_changes(self.inner.remote.as_ref(), &canonical_id, &changes).await {
                    Ok(()) => SyncOutcome::Reconciled {
                        temp_id,
                        canonical_id,
                    },
                    Err(err) => {
                        error!(entity = %R::KIND, op = "update", id = %canonical_id, error = %err, "Failed to push edits made before insert resolved");
                        SyncOutcome::Failed(err)
                    }
                }
            }
            Followup::Delete => {
                match R::push_delete(self.inner.remote.as_ref(), &canonical_id).await {
                    Ok(()) => {
                        info!(entity = %R::KIND, id = %canonical_id, "Removed row deleted locally before its insert resolved");
                        SyncOutcome::Superseded { canonical_id }
                    }
                    Err(err) => {
                        error!(entity = %R::KIND, op = "delete", id = %canonical_id, error = %err, "Failed to remove superseded row");
                        SyncOutcome::Failed(err)
                    }
                }
            }
        }
    }

    /// Edit the record `id` in place and send `changes` for it.
    ///
    /// `edit` returns the change set to send and the activity to record. A missing
    /// target is a no-op.
    fn commit_update<R: Record>(
        &self,
        id: &str,
        edit: impl FnOnce(&mut R) -> (R::Changes, crate::models::Action),
    ) -> PendingSync {
        let (route, changes, staged) = {
            let mut state = self.state();
            let Some(record) = R::collection_mut(&mut state)
                .iter_mut()
                .find(|r| r.id() == id)
            else {
                debug!(entity = %R::KIND, id = %id, "Update target not present locally");
                return PendingSync::idle();
            };
            let (changes, action) = edit(record);
            let updated = record.clone();
            R::after_update(&mut state, &updated);
            let route = state.route_write(id, false);
            (route, changes, activity::stage(&mut state, action))
        };

        let write = match route {
            Route::Remote => self.spawn_changes::<R>(id.to_string(), changes),
            Route::Deferred => Job::Done(SyncOutcome::Deferred),
            Route::LocalOnly => {
                warn!(entity = %R::KIND, id = %id, "Record was never stored remotely; keeping edit local");
                Job::Done(SyncOutcome::Skipped)
            }
        };
        PendingSync::new(write, self.spawn_activity(staged))
    }

    /// Remove the record `id` and delete its remote row.
    fn commit_delete<R: Record>(
        &self,
        id: &str,
        action: impl FnOnce(&R) -> crate::models::Action,
    ) -> PendingSync {
        let (route, staged) = {
            let mut state = self.state();
            let collection = R::collection_mut(&mut state);
            let Some(position) = collection.iter().position(|r| r.id() == id) else {
                debug!(entity = %R::KIND, id = %id, "Delete target not present locally");
                return PendingSync::idle();
            };
            let removed = collection.remove(position);
            let route = state.route_write(id, true);
            (route, activity::stage(&mut state, action(&removed)))
        };

        let write = match route {
            Route::Remote => {
                let remote = self.remote();
                let id = id.to_string();
                self.spawn(async move {
                    match R::push_delete(remote.as_ref(), &id).await {
                        Ok(()) => SyncOutcome::Applied,
                        Err(err) => {
                            error!(entity = %R::KIND, op = "delete", id = %id, error = %err, "Remote delete failed");
                            SyncOutcome::Failed(err)
                        }
                    }
                })
            }
            Route::Deferred => Job::Done(SyncOutcome::Deferred),
            Route::LocalOnly => Job::Done(SyncOutcome::Skipped),
        };
        PendingSync::new(write, self.spawn_activity(staged))
    }

    fn spawn_changes<R: Record>(&self, id: String, changes: R::Changes) -> Job {
        let remote = self.remote();
        self.spawn(async move {
            match R::push_changes(remote.as_ref(), &id, &changes).await {
                Ok(()) => SyncOutcome::Applied,
                Err(err) => {
                    error!(entity = %R::KIND, op = "update", id = %id, error = %err, "Remote update failed; keeping local edit");
                    SyncOutcome::Failed(err)
                }
            }
        })
    }
}

//! Activity feed: optimistic append, truncation and reconciliation.

use chrono::Utc;
use tracing::{debug, error};

use super::{next_temp_id, EntityKind, Job, State, Store, SyncOutcome};
use crate::models::{Action, NewActivity};
use crate::remote::ACTIVITY_FEED_LIMIT;

/// An activity inserted locally and waiting for its remote insert.
pub(super) struct StagedActivity {
    temp_id: String,
    row: NewActivity,
}

/// Prepend an activity for the acting user and truncate the feed.
///
/// Returns `None` when there is no session identity to attribute it to.
pub(super) fn stage(state: &mut State, action: Action) -> Option<StagedActivity> {
    let Some(user_id) = state.actor_id() else {
        debug!(action = %action, "No acting user; activity not recorded");
        return None;
    };

    let temp_id = next_temp_id();
    let row = NewActivity {
        user_id,
        action: action.to_string(),
        timestamp: Utc::now(),
    };

    state
        .activities
        .insert(0, row.clone().into_activity(temp_id.clone()));
    state.activities.truncate(ACTIVITY_FEED_LIMIT);
    state.pending.begin(&temp_id);

    Some(StagedActivity { temp_id, row })
}

impl Store {
    pub(super) fn spawn_activity(&self, staged: Option<StagedActivity>) -> Option<Job> {
        let StagedActivity { temp_id, row } = staged?;
        let remote = self.remote();
        let store = self.clone();

        Some(self.spawn(async move {
            let inserted = remote.insert_activity(&row).await;

            let mut state = store.state();
            state.pending.finish(&temp_id);
            match inserted {
                Ok(activity) => {
                    let canonical_id = activity.id.clone();
                    // Entries pushed out of the feed meanwhile stay out.
                    match state.activities.iter_mut().find(|a| a.id == temp_id) {
                        Some(slot) => *slot = activity,
                        None => {
                            debug!(id = %temp_id, "Activity left the feed before its insert resolved")
                        }
                    }
                    SyncOutcome::Reconciled {
                        temp_id,
                        canonical_id,
                    }
                }
                Err(err) => {
                    error!(entity = %EntityKind::Activity, op = "insert", id = %temp_id, error = %err, "Failed to record activity");
                    SyncOutcome::Failed(err)
                }
            }
        }))
    }
}

//! Temporary ids and the table of creations awaiting their canonical id.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Prefix shared by every locally synthesized id. Canonical ids are UUIDs and never carry it.
pub const TEMP_ID_PREFIX: &str = "temp-";

static NEXT_TEMP_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-wide unique temporary id.
pub fn next_temp_id() -> String {
    format!(
        "{}{}",
        TEMP_ID_PREFIX,
        NEXT_TEMP_ID.fetch_add(1, Ordering::Relaxed)
    )
}

pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Kinds of records the store keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    User,
    Lead,
    Task,
    Activity,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::User => "user",
            EntityKind::Lead => "lead",
            EntityKind::Task => "task",
            EntityKind::Activity => "activity",
        }
    }

    /// Remote table backing this kind.
    pub fn table(&self) -> &'static str {
        match self {
            EntityKind::User => "profiles",
            EntityKind::Lead => "leads",
            EntityKind::Task => "tasks",
            EntityKind::Activity => "activities",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What happened locally to an optimistic record while its insert was in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingState {
    /// Untouched since insertion.
    InFlight,
    /// Edited locally; the edit still has to reach the remote row.
    Modified,
    /// Deleted locally; the remote row must not be adopted.
    Discarded,
}

/// Outstanding optimistic creations keyed by temporary id.
#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    entries: HashMap<String, PendingState>,
}

impl PendingTable {
    pub fn begin(&mut self, temp_id: &str) {
        self.entries
            .insert(temp_id.to_string(), PendingState::InFlight);
    }

    /// Flag an in-flight record as edited. Returns false when the id is not pending.
    pub fn mark_modified(&mut self, temp_id: &str) -> bool {
        match self.entries.get_mut(temp_id) {
            Some(state) => {
                if *state == PendingState::InFlight {
                    *state = PendingState::Modified;
                }
                true
            }
            None => false,
        }
    }

    /// Flag an in-flight record as deleted. Returns false when the id is not pending.
    pub fn mark_discarded(&mut self, temp_id: &str) -> bool {
        match self.entries.get_mut(temp_id) {
            Some(state) => {
                *state = PendingState::Discarded;
                true
            }
            None => false,
        }
    }

    /// Remove the entry, returning its final local state.
    pub fn finish(&mut self, temp_id: &str) -> Option<PendingState> {
        self.entries.remove(temp_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

//! Per-entity glue for the generic mutation paths.

use async_trait::async_trait;

use super::{EntityKind, State};
use crate::errors::AppError;
use crate::models::{Lead, LeadChanges, Task, TaskChanges, User};
use crate::remote::RemoteStore;

/// A mutable entity kept in one of the store's collections.
#[async_trait]
pub(crate) trait Record: Clone + Send + Sync + 'static {
    const KIND: EntityKind;

    /// Payload of a remote update for this entity.
    type Changes: Send + Sync + 'static;

    fn id(&self) -> &str;

    fn set_id(&mut self, id: String);

    /// Every field, for whole-record writes.
    fn full_changes(&self) -> Self::Changes;

    fn collection(state: &State) -> &Vec<Self>;

    fn collection_mut(state: &mut State) -> &mut Vec<Self>;

    /// Keep other state that mirrors this record in step with a local update.
    fn after_update(_state: &mut State, _record: &Self) {}

    async fn push_changes(
        remote: &dyn RemoteStore,
        id: &str,
        changes: &Self::Changes,
    ) -> Result<(), AppError>;

    async fn push_delete(remote: &dyn RemoteStore, id: &str) -> Result<(), AppError>;
}

#[async_trait]
impl Record for Lead {
    const KIND: EntityKind = EntityKind::Lead;
    type Changes = LeadChanges;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn full_changes(&self) -> LeadChanges {
        LeadChanges::from(self)
    }

    fn collection(state: &State) -> &Vec<Self> {
        &state.leads
    }

    fn collection_mut(state: &mut State) -> &mut Vec<Self> {
        &mut state.leads
    }

    async fn push_changes(
        remote: &dyn RemoteStore,
        id: &str,
        changes: &LeadChanges,
    ) -> Result<(), AppError> {
        remote.update_lead(id, changes).await
    }

    async fn push_delete(remote: &dyn RemoteStore, id: &str) -> Result<(), AppError> {
        remote.delete_lead(id).await
    }
}

#[async_trait]
impl Record for Task {
    const KIND: EntityKind = EntityKind::Task;
    type Changes = TaskChanges;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn full_changes(&self) -> TaskChanges {
        TaskChanges::from(self)
    }

    fn collection(state: &State) -> &Vec<Self> {
        &state.tasks
    }

    fn collection_mut(state: &mut State) -> &mut Vec<Self> {
        &mut state.tasks
    }

    async fn push_changes(
        remote: &dyn RemoteStore,
        id: &str,
        changes: &TaskChanges,
    ) -> Result<(), AppError> {
        remote.update_task(id, changes).await
    }

    async fn push_delete(remote: &dyn RemoteStore, id: &str) -> Result<(), AppError> {
        remote.delete_task(id).await
    }
}

/// Profile rows are always written whole.
#[async_trait]
impl Record for User {
    const KIND: EntityKind = EntityKind::User;
    type Changes = User;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn full_changes(&self) -> User {
        self.clone()
    }

    fn collection(state: &State) -> &Vec<Self> {
        &state.users
    }

    fn collection_mut(state: &mut State) -> &mut Vec<Self> {
        &mut state.users
    }

    fn after_update(state: &mut State, record: &Self) {
        if let Some(current) = state.current_user.as_mut().filter(|u| u.id == record.id) {
            *current = record.clone();
        }
    }

    async fn push_changes(
        remote: &dyn RemoteStore,
        _id: &str,
        changes: &User,
    ) -> Result<(), AppError> {
        remote.update_user(changes).await
    }

    async fn push_delete(remote: &dyn RemoteStore, id: &str) -> Result<(), AppError> {
        remote.delete_user(id).await
    }
}

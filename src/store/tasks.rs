//! Task mutations.

use std::sync::Arc;

use chrono::Utc;

use super::{next_temp_id, PendingSync, Store};
use crate::errors::AppError;
use crate::models::{Action, NewTask, Task, TaskChanges, TaskStatus};
use crate::remote::RemoteStore;

impl Store {
    /// Create a task optimistically. An empty `assigned_to` defaults to the acting user.
    pub fn add_task(&self, mut new_task: NewTask) -> Result<PendingSync, AppError> {
        new_task.validate().map_err(|err| self.reject(err))?;

        if new_task.assigned_to.trim().is_empty() {
            if let Some(actor) = self.state().actor_id() {
                new_task.assigned_to = actor;
            }
        }

        let task = new_task.into_task(next_temp_id(), Utc::now());
        let action = Action::TaskCreated(task.title.clone());
        Ok(self.commit_create(
            task,
            action,
            |remote: Arc<dyn RemoteStore>, task: Task| async move {
                remote.insert_task(&task).await
            },
        ))
    }

    pub fn update_task(&self, task: Task) -> Result<PendingSync, AppError> {
        crate::models::require(&[&task.title], "Title and Due Date are required.")
            .map_err(|err| self.reject(err))?;

        let id = task.id.clone();
        Ok(self.commit_update::<Task>(&id, move |record| {
            *record = task;
            (
                TaskChanges::from(&*record),
                Action::TaskUpdated(record.title.clone()),
            )
        }))
    }

    pub fn delete_task(&self, id: &str) -> PendingSync {
        self.commit_delete::<Task>(id, |task| Action::TaskDeleted(task.title.clone()))
    }

    pub fn update_task_status(&self, id: &str, status: TaskStatus) -> PendingSync {
        self.commit_update::<Task>(id, |record| {
            let changes = TaskChanges::status(status);
            changes.apply(record);
            (
                changes,
                Action::TaskStatusChanged {
                    title: record.title.clone(),
                    status,
                },
            )
        })
    }
}

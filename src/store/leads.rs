//! Lead mutations.

use std::sync::Arc;

use chrono::Utc;

use super::{next_temp_id, PendingSync, Store};
use crate::errors::AppError;
use crate::models::{Action, Lead, LeadChanges, NewLead};
use crate::remote::RemoteStore;

impl Store {
    fn check_stage(&self, stage: &str) -> Result<(), AppError> {
        if self.state().settings.has_stage(stage) {
            Ok(())
        } else {
            Err(self.reject(AppError::Validation(format!(
                "Unknown pipeline stage: {}",
                stage
            ))))
        }
    }

    /// Create a lead optimistically. An empty `assigned_to` defaults to the acting user.
    pub fn add_lead(&self, mut new_lead: NewLead) -> Result<PendingSync, AppError> {
        new_lead.validate().map_err(|err| self.reject(err))?;
        self.check_stage(&new_lead.status)?;

        if new_lead.assigned_to.trim().is_empty() {
            if let Some(actor) = self.state().actor_id() {
                new_lead.assigned_to = actor;
            }
        }

        let lead = new_lead.into_lead(next_temp_id(), Utc::now());
        let action = Action::LeadAdded(lead.name.clone());
        Ok(self.commit_create(
            lead,
            action,
            |remote: Arc<dyn RemoteStore>, lead: Lead| async move {
                remote.insert_lead(&lead).await
            },
        ))
    }

    /// Replace a lead wholesale.
    pub fn update_lead(&self, lead: Lead) -> Result<PendingSync, AppError> {
        crate::models::require(&[&lead.name, &lead.email], "Name and Email are required.")
            .map_err(|err| self.reject(err))?;
        self.check_stage(&lead.status)?;

        let id = lead.id.clone();
        Ok(self.commit_update::<Lead>(&id, move |record| {
            *record = lead;
            (
                LeadChanges::from(&*record),
                Action::LeadUpdated(record.name.clone()),
            )
        }))
    }

    pub fn delete_lead(&self, id: &str) -> PendingSync {
        self.commit_delete::<Lead>(id, |lead| Action::LeadDeleted(lead.name.clone()))
    }

    /// Move a lead to another pipeline stage, sending only the status column.
    pub fn update_lead_status(&self, id: &str, stage: &str) -> Result<PendingSync, AppError> {
        self.check_stage(stage)?;

        Ok(self.commit_update::<Lead>(id, |record| {
            let changes = LeadChanges::status(stage);
            changes.apply(record);
            (
                changes,
                Action::LeadStatusChanged {
                    name: record.name.clone(),
                    status: stage.to_string(),
                },
            )
        }))
    }

    /// Drop a lead onto a board column. Returns `None` when nothing changes.
    pub fn move_lead(&self, id: &str, stage: &str) -> Result<Option<PendingSync>, AppError> {
        match self.lead(id) {
            Some(lead) if lead.status != stage => self.update_lead_status(id, stage).map(Some),
            _ => Ok(None),
        }
    }
}

//! User mutations.
//!
//! Users are never inserted optimistically: a login and its profile are provisioned
//! remotely first, so no other record can reference a user that does not exist yet.

use tracing::{error, info};

use super::{activity, Job, Notice, PendingSync, Store, SyncOutcome};
use crate::errors::AppError;
use crate::models::{require, Action, NewUserRequest, User};
use crate::store::record::Record;

impl Store {
    /// Provision a user with a login. Local state changes only after the remote call succeeds.
    ///
    /// The returned [`PendingSync`] tracks the activity insert; its write is already applied.
    pub async fn add_user(
        &self,
        request: NewUserRequest,
    ) -> Result<(User, PendingSync), AppError> {
        request.validate().map_err(|err| self.reject(err))?;

        self.notify(Notice::info("User creation started..."));
        let id = match self.remote().create_user_with_password(&request).await {
            Ok(id) => id,
            Err(err) => {
                error!(entity = "user", op = "create_user_with_password", email = %request.email, error = %err, "User provisioning failed");
                self.notify(Notice::error(format!(
                    "Failed to create user: {}",
                    err.message()
                )));
                return Err(AppError::Provisioning(err.message().to_string()));
            }
        };

        let user = request.into_user(id);
        info!(user_id = %user.id, "User provisioned");

        let staged = {
            let mut state = self.state();
            state.users.insert(0, user.clone());
            activity::stage(&mut state, Action::UserAdded(user.name.clone()))
        };
        let activity = self.spawn_activity(staged);
        self.notify(Notice::success("User created successfully!"));
        Ok((
            user,
            PendingSync::new(Job::Done(SyncOutcome::Applied), activity),
        ))
    }

    /// Replace a user's profile; the current user reference follows if it is the same person.
    pub fn update_user(&self, user: User) -> Result<PendingSync, AppError> {
        require(&[&user.name, &user.email], "Name and Email are required.")
            .map_err(|err| self.reject(err))?;

        let id = user.id.clone();
        Ok(self.commit_update::<User>(&id, move |record| {
            *record = user;
            (record.clone(), Action::UserUpdated(record.name.clone()))
        }))
    }

    /// Update the acting user's own profile and its entry in the users collection together.
    pub fn update_current_user(&self, user: User) -> Result<PendingSync, AppError> {
        require(&[&user.name, &user.email], "Name and Email are required.")
            .map_err(|err| self.reject(err))?;

        let staged = {
            let mut state = self.state();
            if state.identity.as_ref().map(|i| i.user_id.as_str()) != Some(user.id.as_str()) {
                drop(state);
                return Err(self.reject(AppError::Validation(
                    "Only the signed-in user's own profile can be updated here.".to_string(),
                )));
            }
            state.current_user = Some(user.clone());
            if let Some(entry) = state.users.iter_mut().find(|u| u.id == user.id) {
                *entry = user.clone();
            }
            activity::stage(&mut state, Action::OwnProfileUpdated)
        };

        let write = self.spawn_changes::<User>(user.id.clone(), user.full_changes());
        Ok(PendingSync::new(write, self.spawn_activity(staged)))
    }

    pub fn delete_user(&self, id: &str) -> PendingSync {
        self.commit_delete::<User>(id, |user| Action::UserDeleted(user.name.clone()))
    }
}

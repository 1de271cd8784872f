//! Session collaborator.
//!
//! Supplies the acting identity and notifies subscribers whenever it changes.
//! `LocalSession` authenticates against the repository's bcrypt credential table.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{NewUserRequest, UserRole};
use crate::remote::RemoteStore;

/// The authenticated user acting on the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: String,
}

/// Authentication provider.
#[async_trait]
pub trait Session: Send + Sync {
    /// Current identity, if signed in.
    fn current(&self) -> Option<Identity>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError>;

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AppError>;

    async fn sign_out(&self);

    /// Receiver that observes every identity change.
    fn subscribe(&self) -> watch::Receiver<Option<Identity>>;
}

/// Session backed by the local SQLite credential table.
pub struct LocalSession {
    repo: Repository,
    identity: watch::Sender<Option<Identity>>,
}

impl LocalSession {
    pub fn new(repo: Repository) -> Self {
        let (identity, _) = watch::channel(None);
        Self { repo, identity }
    }

    fn establish(&self, identity: Identity) -> Identity {
        tracing::info!(user_id = %identity.user_id, "Session established");
        self.identity.send_replace(Some(identity.clone()));
        identity
    }
}

#[async_trait]
impl Session for LocalSession {
    fn current(&self) -> Option<Identity> {
        self.identity.borrow().clone()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let invalid = || AppError::Unauthorized("Invalid login credentials".to_string());

        let credential = self.repo.find_credential(email).await?.ok_or_else(invalid)?;
        if !bcrypt::verify(password, &credential.password_hash)? {
            tracing::warn!(email = %email, "Rejected sign-in");
            return Err(invalid());
        }

        Ok(self.establish(Identity {
            user_id: credential.user_id,
            email: credential.email,
        }))
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let email = email.trim();
        let name = email.split('@').next().unwrap_or(email).to_string();
        let request = NewUserRequest {
            name,
            email: email.to_string(),
            phone: String::new(),
            role: UserRole::Member,
            avatar: None,
            password: password.to_string(),
        };
        let user_id = self.repo.create_user_with_password(&request).await?;
        Ok(self.establish(Identity {
            user_id,
            email: email.to_string(),
        }))
    }

    async fn sign_out(&self) {
        if let Some(previous) = self.identity.send_replace(None) {
            tracing::info!(user_id = %previous.user_id, "Session cleared");
        }
    }

    fn subscribe(&self) -> watch::Receiver<Option<Identity>> {
        self.identity.subscribe()
    }
}

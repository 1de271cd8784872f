//! Remote store interface.
//!
//! Row-level access to the `profiles`, `leads`, `tasks` and `activities` tables plus
//! the one atomic procedure that provisions a login together with its profile.

use async_trait::async_trait;

use crate::errors::AppError;
use crate::models::{
    Activity, Lead, LeadChanges, NewActivity, NewUserRequest, Task, TaskChanges, User,
};

/// Row limit used for the activity feed.
pub const ACTIVITY_FEED_LIMIT: usize = 20;

/// Persistence collaborator of the store.
///
/// Insert methods take a record with a placeholder id and return the canonical row.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    // ==================== USERS ====================

    /// All profiles ordered by name.
    async fn list_users(&self) -> Result<Vec<User>, AppError>;

    async fn get_user(&self, id: &str) -> Result<Option<User>, AppError>;

    /// Replace the profile row with the given fields.
    async fn update_user(&self, user: &User) -> Result<(), AppError>;

    async fn delete_user(&self, id: &str) -> Result<(), AppError>;

    /// Create a login credential and its profile in one step; returns the new user id.
    async fn create_user_with_password(&self, request: &NewUserRequest)
        -> Result<String, AppError>;

    // ==================== LEADS ====================

    /// Leads newest first by `created_at`.
    async fn list_leads(&self, limit: Option<usize>) -> Result<Vec<Lead>, AppError>;

    async fn get_lead(&self, id: &str) -> Result<Option<Lead>, AppError>;

    async fn insert_lead(&self, lead: &Lead) -> Result<Lead, AppError>;

    async fn update_lead(&self, id: &str, changes: &LeadChanges) -> Result<(), AppError>;

    async fn delete_lead(&self, id: &str) -> Result<(), AppError>;

    // ==================== TASKS ====================

    /// Tasks newest first by `created_at`.
    async fn list_tasks(&self, limit: Option<usize>) -> Result<Vec<Task>, AppError>;

    async fn get_task(&self, id: &str) -> Result<Option<Task>, AppError>;

    async fn insert_task(&self, task: &Task) -> Result<Task, AppError>;

    async fn update_task(&self, id: &str, changes: &TaskChanges) -> Result<(), AppError>;

    async fn delete_task(&self, id: &str) -> Result<(), AppError>;

    // ==================== ACTIVITIES ====================

    /// Activities newest first by `timestamp`.
    async fn list_activities(&self, limit: Option<usize>) -> Result<Vec<Activity>, AppError>;

    async fn insert_activity(&self, activity: &NewActivity) -> Result<Activity, AppError>;
}
